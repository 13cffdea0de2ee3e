use signal_intelligence::{
    store::TowerFilter, CsvLoader, Error, LoadReport, MemoryTowerStore, TowerStore,
};
use std::io::Write;
use tempfile::NamedTempFile;

const ROWS: &str = "\
GSM,262,2,801,86355,0,13.285512,52.522202,1000,7,1,1282569574,1300155341,-61
UMTS,262,2,801,1,0,13.285512,52.522202,1000,7,1,1282569574,1300155341,-61
LTE,262,2
UMTS,262,2,801,2,0,,52.5,1000,7,1,1282569574,1300155341,-61

GSM,abc,2,801,3,0,13.3,52.5,1000,7,1,1282569574,1300155341,-70
";

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file
}

#[tokio::test]
async fn loads_valid_rows_and_skips_short_ones() -> anyhow::Result<()> {
    let file = csv_file(ROWS);
    let store = MemoryTowerStore::default();

    let report = CsvLoader::new(file.path()).run(&store).await?;
    assert_eq!(
        LoadReport {
            existing: 0,
            parsed: 4,
            skipped: 1,
            inserted: 4,
        },
        report
    );

    let towers = store.find_all().await?;
    assert_eq!(4, towers.len());

    let missing_lon = store.find_by_cell(2).await?.expect("cell 2 loaded");
    assert_eq!(None, missing_lon.attributes.lon);
    assert_eq!(Some(52.5), missing_lon.attributes.lat);
    assert_eq!(Some(1000), missing_lon.attributes.range);

    let bad_mcc = store.find_by_cell(3).await?.expect("cell 3 loaded");
    assert_eq!(None, bad_mcc.attributes.mcc);
    assert_eq!(Some(-70), bad_mcc.attributes.average_signal);

    assert_eq!(2, store.count_matching(&TowerFilter::Radio("GSM".to_string())).await?);
    Ok(())
}

#[tokio::test]
async fn second_run_does_not_insert() -> anyhow::Result<()> {
    let file = csv_file(ROWS);
    let store = MemoryTowerStore::default();
    let loader = CsvLoader::new(file.path());

    loader.run(&store).await?;
    let report = loader.run(&store).await?;

    assert_eq!(4, report.existing);
    assert_eq!(0, report.inserted);
    assert_eq!(4, store.count().await?);
    Ok(())
}

#[tokio::test]
async fn file_without_usable_rows_loads_nothing() -> anyhow::Result<()> {
    let file = csv_file("GSM,262\n\nLTE\n");
    let store = MemoryTowerStore::default();

    let report = CsvLoader::new(file.path()).run(&store).await?;
    assert_eq!(2, report.skipped);
    assert_eq!(0, report.inserted);
    assert_eq!(0, store.count().await?);
    Ok(())
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = MemoryTowerStore::default();

    let result = CsvLoader::new(dir.path().join("missing.csv"))
        .run(&store)
        .await;
    assert!(matches!(result, Err(Error::Io(_))));
}
