use config::{Config, Environment, File};
use serde::Deserialize;
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

#[derive(Debug, Deserialize)]
pub struct Settings {
    /// RUST_LOG compatible settings string. Default to
    /// "signal_intelligence=info,tower_http=info"
    #[serde(default = "default_log")]
    pub log: String,
    #[serde(default)]
    pub custom_tracing: custom_tracing::Settings,
    /// Listen address for the REST API. Default to 0.0.0.0:8080
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// CSV dataset loaded into an empty store on startup
    pub csv_file: Option<PathBuf>,
    /// Settings passed to the db_store crate. Towers are kept in memory
    /// when absent.
    pub database: Option<db_store::Settings>,
    #[serde(default)]
    pub metrics: service_metrics::Settings,
}

fn default_log() -> String {
    "signal_intelligence=info,tower_http=info".to_string()
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

impl Settings {
    /// Settings can be loaded from a given optional path and
    /// can be overridden with environment variables.
    ///
    /// Environment overrides have the same name as the entries
    /// in the settings file in uppercase and prefixed with "SI__".
    /// Example: "SI__DATABASE__URL" will override the database url.
    pub fn new<P: AsRef<Path>>(path: Option<P>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        if let Some(file) = path {
            builder = builder
                .add_source(File::with_name(&file.as_ref().to_string_lossy()).required(false));
        }

        builder
            .add_source(
                Environment::with_prefix("SI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_a_file() {
        let settings = Settings::new(None::<&Path>).expect("default settings");
        assert_eq!(default_listen(), settings.listen);
        assert!(settings.csv_file.is_none());
        assert!(settings.database.is_none());
    }

    #[test]
    fn reads_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            r#"
            listen = "127.0.0.1:9090"
            csv_file = "data/towers.csv"

            [database]
            url = "postgres://localhost/towers"
            max_connections = 2
            "#
        )
        .expect("write settings");

        let settings = Settings::new(Some(file.path())).expect("settings");
        assert_eq!("127.0.0.1:9090".parse::<SocketAddr>().unwrap(), settings.listen);
        assert_eq!(Some(PathBuf::from("data/towers.csv")), settings.csv_file);
        let database = settings.database.expect("database section");
        assert_eq!("postgres://localhost/towers", database.url);
        assert_eq!(2, database.max_connections);
    }
}
