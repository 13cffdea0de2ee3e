use std::time::Duration;

const DURATION: Duration = Duration::from_secs(300);

/// Periodically report pool size and idle connections as gauges until
/// `shutdown` fires.
pub fn start(
    app_name: &str,
    pool: sqlx::Pool<sqlx::Postgres>,
    shutdown: triggered::Listener,
) -> tokio::task::JoinHandle<()> {
    let size_name = format!("{app_name}_db_pool_size");
    let idle_name = format!("{app_name}_db_pool_idle");
    tokio::spawn(async move { run(size_name, idle_name, pool, shutdown).await })
}

async fn run(
    size_name: String,
    idle_name: String,
    pool: sqlx::Pool<sqlx::Postgres>,
    shutdown: triggered::Listener,
) {
    let mut trigger = tokio::time::interval(DURATION);

    loop {
        let shutdown = shutdown.clone();

        tokio::select! {
            _ = shutdown => {
                tracing::info!("db_store: MetricTracker shutting down");
                break;
            }
            _ = trigger.tick() => {
                metrics::gauge!(size_name.clone()).set(pool.size() as f64);
                metrics::gauge!(idle_name.clone()).set(pool.num_idle() as f64);
            }
        }
    }
}
