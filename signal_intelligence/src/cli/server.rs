use crate::{api, store, CsvLoader, Settings};
use anyhow::Result;
use tokio::signal;

/// Load the dataset if needed and serve the REST API
#[derive(Debug, clap::Args)]
pub struct Cmd {}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        // Install the prometheus metrics exporter
        service_metrics::start_metrics(&settings.metrics)?;

        // configure shutdown trigger
        let (shutdown_trigger, shutdown) = triggered::trigger();

        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => shutdown_trigger.trigger(),
                _ = signal::ctrl_c() => shutdown_trigger.trigger(),
            }
        });

        let store = store::open(settings, shutdown.clone()).await?;

        // ingestion finishes before the listener is bound
        if let Some(csv_file) = &settings.csv_file {
            match CsvLoader::new(csv_file).run(store.as_ref()).await {
                Ok(report) => tracing::info!(?report, "csv ingestion finished"),
                Err(err) => {
                    tracing::error!(?err, path = %csv_file.display(), "csv ingestion failed")
                }
            }
        }

        api::Server::new(settings.listen, store)
            .run(shutdown)
            .await?;
        Ok(())
    }
}
