use signal_intelligence::{api::Server, MemoryTowerStore, TowerStore};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApi {
    pub base: String,
    pub client: reqwest::Client,
    pub store: Arc<dyn TowerStore>,
    _shutdown: triggered::Trigger,
}

impl TestApi {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

/// Serve the API on an ephemeral port backed by an empty in-memory store.
pub async fn spawn_api() -> TestApi {
    let store: Arc<dyn TowerStore> = Arc::new(MemoryTowerStore::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (trigger, shutdown) = triggered::trigger();

    let server = Server::new(addr, store.clone());
    tokio::spawn(server.serve(listener, shutdown));

    TestApi {
        base: format!("http://{addr}/api/cell-towers"),
        client: reqwest::Client::new(),
        store,
        _shutdown: trigger,
    }
}
