use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cell tower {0} not found")]
    NotFound(i64),
    #[error("no cell tower with cell id {0}")]
    CellNotFound(i32),
    #[error("invalid page request: {0}")]
    InvalidPage(String),
    #[error("sql error")]
    Sql(#[from] sqlx::Error),
    #[error("migration error")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("database error")]
    Database(#[from] db_store::Error),
    #[error("io error")]
    Io(#[from] std::io::Error),
    #[error("csv error")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::CellNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidPage(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(err = ?self, "request failed");
            (status, "internal error").into_response()
        } else {
            (status, self.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status() {
        assert_eq!(StatusCode::NOT_FOUND, Error::NotFound(4).status());
        assert_eq!(StatusCode::NOT_FOUND, Error::CellNotFound(86355).status());
        assert_eq!(
            StatusCode::BAD_REQUEST,
            Error::InvalidPage("size must be positive".to_string()).status()
        );
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            Error::Sql(sqlx::Error::PoolTimedOut).status()
        );
    }
}
