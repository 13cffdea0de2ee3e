use crate::{store, CsvLoader, Settings};
use anyhow::{bail, Result};

/// Load the configured CSV file into an empty store and exit
#[derive(Debug, clap::Args)]
pub struct Cmd {}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let Some(csv_file) = &settings.csv_file else {
            bail!("csv_file is not configured");
        };
        if settings.database.is_none() {
            tracing::warn!("no database configured, loaded towers are discarded on exit");
        }

        let (shutdown_trigger, shutdown) = triggered::trigger();
        let store = store::open(settings, shutdown).await?;
        let report = CsvLoader::new(csv_file).run(store.as_ref()).await;
        shutdown_trigger.trigger();

        let report = report?;
        tracing::info!(?report, "load complete");
        Ok(())
    }
}
