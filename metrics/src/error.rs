use thiserror::Error;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("metrics build error")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
