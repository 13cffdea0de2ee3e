//! Prometheus exporter and request timing shared by the service binaries.

mod error;
pub mod settings;

pub use error::{Error, Result};
pub use settings::Settings;

use metrics_exporter_prometheus::PrometheusBuilder;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};

/// Install the Prometheus scrape endpoint described by `settings`.
pub fn start_metrics(settings: &Settings) -> Result {
    PrometheusBuilder::new()
        .with_http_listener(settings.endpoint)
        .install()?;
    tracing::info!(endpoint = %settings.endpoint, "metrics scrape endpoint listening");
    Ok(())
}

/// Measure the duration of a block and record it
#[macro_export]
macro_rules! record_duration {
    ( $metric_name:expr, $e:expr ) => {{
        let timer = std::time::Instant::now();
        let res = $e;
        ::metrics::histogram!($metric_name).record(timer.elapsed().as_secs_f64());
        res
    }};
}

/// Request metrics layer. Measures:
/// 1. Active requests, as a gauge incremented when a request arrives and
///    decremented once it has been responded to.
/// 2. Request handling duration in seconds.
#[derive(Clone)]
pub struct RequestsLayer {
    metric_name_count: &'static str,
    metric_name_time: &'static str,
}

#[macro_export]
macro_rules! request_layer {
    ( $metric_name:literal ) => {{
        $crate::RequestsLayer::new(
            concat!($metric_name, "_count"),
            concat!($metric_name, "_time"),
        )
    }};
}

impl RequestsLayer {
    pub fn new(metric_name_count: &'static str, metric_name_time: &'static str) -> Self {
        Self {
            metric_name_count,
            metric_name_time,
        }
    }
}

impl<S> Layer<S> for RequestsLayer {
    type Service = Requests<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Requests {
            metric_name_count: self.metric_name_count,
            metric_name_time: self.metric_name_time,
            inner,
        }
    }
}

#[derive(Clone)]
pub struct Requests<S> {
    metric_name_count: &'static str,
    metric_name_time: &'static str,
    inner: S,
}

impl<S, R> Service<R> for Requests<S>
where
    S: Service<R> + Clone + Send + 'static,
    R: Send + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, ctx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(ctx)
    }

    fn call(&mut self, req: R) -> Self::Future {
        let metric_name_count = self.metric_name_count;
        let metric_name_time = self.metric_name_time;

        let timer = Instant::now();
        metrics::gauge!(metric_name_count).increment(1.0);

        let clone = self.inner.clone();
        // take the service that was ready
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let res = inner.call(req).await;
            metrics::gauge!(metric_name_count).decrement(1.0);
            let elapsed_time = timer.elapsed();
            tracing::debug!("request processed in {elapsed_time:?}");
            metrics::histogram!(metric_name_time).record(elapsed_time.as_secs_f64());
            res
        })
    }
}
