//! REST surface over the tower store, rooted at `/api/cell-towers`.

pub mod handlers;
pub mod params;

use crate::{store::TowerStore, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub type SharedStore = Arc<dyn TowerStore>;

pub const BASE_PATH: &str = "/api/cell-towers";

pub fn router(store: SharedStore) -> Router {
    let towers = Router::new()
        .route(
            "/",
            post(handlers::create)
                .get(handlers::list)
                .delete(handlers::delete_all),
        )
        .route("/batch", post(handlers::create_batch))
        .route("/paged", get(handlers::list_paged))
        .route("/count", get(handlers::count))
        .route("/location", get(handlers::within_bounds))
        .route("/signal", get(handlers::by_signal))
        .route("/cell/:cell_id", get(handlers::get_by_cell))
        .route("/radio/:radio", get(handlers::by_radio))
        .route("/radio/:radio/paged", get(handlers::by_radio_paged))
        .route("/radio/:radio/count", get(handlers::count_by_radio))
        .route("/radio/:radio/mcc/:mcc", get(handlers::by_radio_and_mcc))
        .route("/mcc/:mcc", get(handlers::by_mcc))
        .route("/mcc/:mcc/paged", get(handlers::by_mcc_paged))
        .route("/net/:net", get(handlers::by_net))
        .route("/area/:area", get(handlers::by_area))
        .route("/changeable/:flag", get(handlers::by_changeable))
        .route("/samples/:min_samples", get(handlers::by_min_samples))
        .route(
            "/:id",
            get(handlers::get_tower)
                .put(handlers::replace)
                .patch(handlers::patch)
                .delete(handlers::delete),
        )
        .with_state(store);

    Router::new()
        .route("/health", get(handlers::health))
        .nest(BASE_PATH, towers)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(service_metrics::request_layer!("signal_intelligence_api_request"))
        .layer(custom_tracing::http_layer::new())
}

pub struct Server {
    listen: SocketAddr,
    app: Router,
}

impl Server {
    pub fn new(listen: SocketAddr, store: SharedStore) -> Self {
        Self {
            listen,
            app: router(store),
        }
    }

    /// Bind the configured address and serve until `shutdown` fires.
    pub async fn run(self, shutdown: triggered::Listener) -> Result {
        let listener = TcpListener::bind(self.listen).await?;
        self.serve(listener, shutdown).await
    }

    pub async fn serve(self, listener: TcpListener, shutdown: triggered::Listener) -> Result {
        tracing::info!(listen = %listener.local_addr()?, "api listening");
        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("stopping api server")
            })
            .await?;
        Ok(())
    }
}
