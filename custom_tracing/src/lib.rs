use anyhow::Result;
use notify::{event::DataChange, Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing_subscriber::{
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

#[cfg(feature = "http-1")]
pub mod http_layer;
mod settings;

pub use settings::Settings;

/// Install a global subscriber filtered by `og_filter`. While the process
/// runs, writing a filter directive to the file named in `settings` replaces
/// the active filter; emptying or removing that file restores `og_filter`.
pub async fn init(og_filter: String, settings: Settings) -> Result<()> {
    let (filtered_layer, reload_handle) = reload::Layer::new(EnvFilter::new(&og_filter));

    tracing_subscriber::registry()
        .with(filtered_layer)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    let state = State {
        og_filter,
        tracing_cfg_file: PathBuf::from(settings.tracing_cfg_file),
        reload_handle,
    };

    if let Ok(content) = fs::read_to_string(&state.tracing_cfg_file) {
        state.handle_change(content)?;
    }

    tokio::spawn(async move {
        if let Err(err) = state.watch().await {
            tracing::warn!(?err, "tracing error watching configuration for update")
        }
    });

    tracing::info!("custom tracing installed");

    Ok(())
}

#[derive(Clone)]
struct State {
    og_filter: String,
    tracing_cfg_file: PathBuf,
    reload_handle: Handle<EnvFilter, Registry>,
}

impl State {
    async fn watch(&self) -> Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::channel(10);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                // the receiver only goes away when the watch loop ends
                let _ = tx.blocking_send(res);
            },
            Config::default(),
        )?;

        watcher.watch(watch_dir(&self.tracing_cfg_file), RecursiveMode::NonRecursive)?;

        while let Some(res) = rx.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(?err, "tracing config watcher configuration file error");
                    continue;
                }
            };
            let Some(event_path) = event.paths.first() else {
                continue;
            };
            if !file_match(event_path, &self.tracing_cfg_file) {
                continue;
            }
            match event.kind {
                notify::EventKind::Modify(notify::event::ModifyKind::Data(DataChange::Content))
                | notify::EventKind::Modify(notify::event::ModifyKind::Data(DataChange::Any))
                | notify::EventKind::Create(_) => match fs::read_to_string(event_path) {
                    Ok(content) => self.handle_change(content)?,
                    Err(err) => {
                        tracing::warn!(?err, "tracing config watcher failed to read file")
                    }
                },
                notify::EventKind::Remove(_) => self.handle_delete()?,
                _event => {
                    tracing::debug!(?_event, "tracing config watcher ignored unhandled message")
                }
            }
        }

        Ok(())
    }

    fn handle_change(&self, content: String) -> Result<()> {
        match resolve_filter(&content, &self.og_filter) {
            FilterUpdate::Revert => self.handle_delete(),
            FilterUpdate::Invalid => {
                tracing::warn!(
                    filter = content.trim(),
                    "tracing config watcher failed to parse filter"
                );
                Ok(())
            }
            FilterUpdate::Replace(new_filter) => {
                self.reload_handle.modify(|filter| *filter = new_filter)?;
                tracing::info!(filter = content.trim(), "custom tracing config updated");
                Ok(())
            }
        }
    }

    fn handle_delete(&self) -> Result<()> {
        let og_filter = self.og_filter.clone();
        self.reload_handle
            .modify(|filter| *filter = EnvFilter::new(&og_filter))?;

        tracing::info!(
            filter = %self.og_filter,
            "tracing config file removed or emptied, reverting to configured filter"
        );
        Ok(())
    }
}

#[derive(Debug)]
enum FilterUpdate {
    Revert,
    Invalid,
    Replace(EnvFilter),
}

fn resolve_filter(content: &str, og_filter: &str) -> FilterUpdate {
    let content = content.trim();
    if content.is_empty() || content == og_filter {
        return FilterUpdate::Revert;
    }
    match EnvFilter::try_new(content) {
        Ok(filter) => FilterUpdate::Replace(filter),
        Err(_) => FilterUpdate::Invalid,
    }
}

fn watch_dir(file: &Path) -> &Path {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn file_match(event_path: &Path, file: &Path) -> bool {
    event_path.file_name().is_some() && event_path.file_name() == file.file_name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_reverts() {
        assert!(matches!(
            resolve_filter("  \n", "info"),
            FilterUpdate::Revert
        ));
    }

    #[test]
    fn valid_directive_replaces() {
        assert!(matches!(
            resolve_filter("signal_intelligence=trace\n", "info"),
            FilterUpdate::Replace(_)
        ));
    }

    #[test]
    fn garbage_directive_is_rejected() {
        assert!(matches!(
            resolve_filter("signal_intelligence=[[", "info"),
            FilterUpdate::Invalid
        ));
    }

    #[test]
    fn watches_parent_of_configured_file() {
        assert_eq!(Path::new("."), watch_dir(Path::new("tracing.cfg")));
        assert_eq!(
            Path::new("/etc/towers"),
            watch_dir(Path::new("/etc/towers/tracing.cfg"))
        );
    }

    #[test]
    fn matches_on_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracing.cfg");
        assert!(file_match(&path, Path::new("tracing.cfg")));
        assert!(!file_match(&dir.path().join("other.cfg"), Path::new("tracing.cfg")));
    }
}
