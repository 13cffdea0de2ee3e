use axum::{
    body::Body,
    http::{header, Request},
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::{Level, Span};

pub type HttpTraceLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, fn(&Request<Body>) -> Span>;

/// Trace layer logging each request's method, uri and user agent, with
/// responses at debug and 5xx failures at warn.
pub fn new() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(make_span as fn(&Request<Body>) -> Span)
        .on_response(
            DefaultOnResponse::new()
                .level(Level::DEBUG)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(
            DefaultOnFailure::new()
                .level(Level::WARN)
                .latency_unit(LatencyUnit::Millis),
        )
}

fn make_span(request: &Request<Body>) -> Span {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .map(|value| value.to_str().unwrap_or("unknown"));

    tracing::info_span!(
        "http",
        method = %request.method(),
        uri = %request.uri(),
        user_agent,
    )
}
