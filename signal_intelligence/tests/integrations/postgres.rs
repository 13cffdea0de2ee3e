use chrono::{TimeZone, Utc};
use signal_intelligence::{
    store::{Bounds, PageRequest, SortDirection, SortField},
    CsvLoader, Error, PgTowerStore, TowerAttributes, TowerStore,
};
use sqlx::PgPool;
use std::io::Write;

fn tower(radio: &str, mcc: i32, lon: f64, lat: f64, samples: i32) -> TowerAttributes {
    TowerAttributes {
        radio: Some(radio.to_string()),
        mcc: Some(mcc),
        lon: Some(lon),
        lat: Some(lat),
        samples: Some(samples),
        ..Default::default()
    }
}

#[sqlx::test]
async fn insert_and_get_by_id(pool: PgPool) -> anyhow::Result<()> {
    let store = PgTowerStore::new(pool);
    let created_at = Utc.with_ymd_and_hms(2016, 4, 1, 0, 0, 0).unwrap();
    let attributes = TowerAttributes {
        range: Some(1000),
        average_signal: Some(-61),
        created: Some(created_at),
        ..tower("GSM", 310, -122.4, 37.7, 5)
    };

    let created = store.insert(attributes.clone()).await?;
    let fetched = store.find_by_id(created.id).await?.expect("tower exists");

    assert_eq!(attributes, fetched.attributes);
    assert_eq!(None, store.find_by_id(created.id + 1).await?);
    Ok(())
}

#[sqlx::test]
async fn patch_and_replace(pool: PgPool) -> anyhow::Result<()> {
    let store = PgTowerStore::new(pool);
    let created = store.insert(tower("GSM", 310, -122.4, 37.7, 5)).await?;

    let patched = store
        .patch(
            created.id,
            TowerAttributes {
                samples: Some(50),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(Some(50), patched.attributes.samples);
    assert_eq!(Some("GSM".to_string()), patched.attributes.radio);
    assert_eq!(Some(310), patched.attributes.mcc);

    let replaced = store
        .replace(
            created.id,
            TowerAttributes {
                radio: Some("LTE".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(created.id, replaced.id);
    assert_eq!(None, replaced.attributes.mcc);
    assert_eq!(None, replaced.attributes.samples);

    assert!(matches!(
        store.patch(created.id + 10, TowerAttributes::default()).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        store.replace(created.id + 10, TowerAttributes::default()).await,
        Err(Error::NotFound(_))
    ));
    Ok(())
}

#[sqlx::test]
async fn delete_missing_is_not_found(pool: PgPool) -> anyhow::Result<()> {
    let store = PgTowerStore::new(pool);
    let created = store.insert(TowerAttributes::default()).await?;

    store.delete(created.id).await?;
    assert!(matches!(
        store.delete(created.id).await,
        Err(Error::NotFound(id)) if id == created.id
    ));
    Ok(())
}

#[sqlx::test]
async fn filters_match_the_memory_store(pool: PgPool) -> anyhow::Result<()> {
    let store = PgTowerStore::new(pool);
    let inserted = store
        .insert_many(vec![
            tower("GSM", 262, 0.0, 0.0, 100),
            tower("LTE", 262, 10.0, 10.0, 101),
            tower("GSM", 310, 10.5, 5.0, 7),
            TowerAttributes {
                lat: None,
                ..tower("GSM", 262, 5.0, 5.0, 1)
            },
        ])
        .await?;
    let ids: Vec<i64> = inserted.iter().map(|tower| tower.id).collect();

    let within = store
        .find_within_bounds(Bounds {
            min_lon: 0.0,
            max_lon: 10.0,
            min_lat: 0.0,
            max_lat: 10.0,
        })
        .await?;
    assert_eq!(
        vec![ids[0], ids[1]],
        within.iter().map(|tower| tower.id).collect::<Vec<_>>()
    );

    let over_100 = store.find_by_samples_greater_than(100).await?;
    assert_eq!(vec![ids[1]], over_100.iter().map(|t| t.id).collect::<Vec<_>>());

    let gsm_262 = store.find_by_radio_and_mcc("GSM", 262).await?;
    assert_eq!(
        vec![ids[0], ids[3]],
        gsm_262.iter().map(|t| t.id).collect::<Vec<_>>()
    );

    assert_eq!(3, store.count_by_radio("GSM").await?);
    assert_eq!(4, store.count().await?);
    Ok(())
}

#[sqlx::test]
async fn pages_with_nulls_last(pool: PgPool) -> anyhow::Result<()> {
    let store = PgTowerStore::new(pool);
    let towers = [Some(5), None, Some(30), Some(5)]
        .into_iter()
        .map(|samples| TowerAttributes {
            samples,
            ..Default::default()
        })
        .collect();
    let inserted = store.insert_many(towers).await?;
    let ids: Vec<i64> = inserted.iter().map(|tower| tower.id).collect();

    let request = PageRequest::new(0, 3, SortField::Samples, SortDirection::Asc)?;
    let page = store.find_page(None, &request).await?;
    assert_eq!(
        vec![ids[0], ids[3], ids[2]],
        page.content.iter().map(|t| t.id).collect::<Vec<_>>()
    );
    assert_eq!(4, page.total_elements);
    assert_eq!(2, page.total_pages);

    let request = PageRequest::new(1, 3, SortField::Samples, SortDirection::Asc)?;
    let page = store.find_page(None, &request).await?;
    assert_eq!(vec![ids[1]], page.content.iter().map(|t| t.id).collect::<Vec<_>>());
    assert!(page.last);
    Ok(())
}

#[sqlx::test]
async fn csv_load_is_idempotent(pool: PgPool) -> anyhow::Result<()> {
    let store = PgTowerStore::new(pool);
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        "GSM,262,2,801,86355,0,13.285512,52.522202,1000,7,1,1282569574,1300155341,-61"
    )?;
    writeln!(file, "LTE,262")?;

    let loader = CsvLoader::new(file.path());
    let first = loader.run(&store).await?;
    assert_eq!(1, first.inserted);
    assert_eq!(1, first.skipped);

    let second = loader.run(&store).await?;
    assert_eq!(1, second.existing);
    assert_eq!(0, second.inserted);

    let tower = store.find_by_cell(86355).await?.expect("loaded tower");
    assert_eq!(
        Utc.timestamp_opt(1_282_569_574, 0).single(),
        tower.attributes.created
    );
    Ok(())
}
