//! Settings push source: initial load with retry, then a file watcher that
//! re-reads the settings file and pushes `Event::SettingsChanged`.

use core_config::{RetryPolicy, Settings, SettingsProvider, TomlSettingsProvider};
use core_events::{AsyncEventSource, CHANNEL_SEND_FAILURES, Event};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::{self, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct SettingsEventSource {
    provider: TomlSettingsProvider,
    policy: RetryPolicy,
    watch: bool,
}

impl SettingsEventSource {
    pub fn new(provider: TomlSettingsProvider, policy: RetryPolicy, watch: bool) -> Self {
        Self {
            provider,
            policy,
            watch,
        }
    }
}

impl AsyncEventSource for SettingsEventSource {
    fn name(&self) -> &'static str {
        "settings"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let Self {
                provider,
                policy,
                watch,
            } = *self;
            if let Some(settings) = load_with_retry(&provider, &policy).await
                && !push(&tx, settings).await
            {
                return;
            }
            if !watch {
                return;
            }
            let (change_tx, mut change_rx) = mpsc::channel::<()>(8);
            let _watcher = match watch_file(provider.path(), change_tx) {
                Ok(w) => w,
                Err(e) => {
                    warn!(target: "config", error = %e, "settings_watch_failed");
                    return;
                }
            };
            loop {
                tokio::select! {
                    changed = change_rx.recv() => {
                        if changed.is_none() {
                            return;
                        }
                        // One re-read per burst of writes.
                        while change_rx.try_recv().is_ok() {}
                        debug!(target: "config", path = %provider.path().display(), "settings_file_changed");
                        if let Some(settings) = load_with_retry(&provider, &policy).await
                            && !push(&tx, settings).await
                        {
                            return;
                        }
                    }
                    _ = tx.closed() => return,
                }
            }
        })
    }
}

/// Read settings, retrying failures under `policy`. A missing file yields
/// defaults; an exhausted retry budget yields `None`.
pub async fn load_with_retry(provider: &dyn SettingsProvider, policy: &RetryPolicy) -> Option<Settings> {
    let mut attempt = 0;
    loop {
        match provider.get_settings() {
            Ok(Some(settings)) => return Some(settings),
            Ok(None) => return Some(Settings::default()),
            Err(e) => {
                let Some(delay) = policy.delay_for(attempt) else {
                    warn!(target: "config", error = %e, attempts = attempt + 1, "settings_retry_exhausted");
                    return None;
                };
                warn!(
                    target: "config",
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "settings_retry_scheduled"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

async fn push(tx: &Sender<Event>, settings: Settings) -> bool {
    info!(target: "config", prompts = settings.prompts.len(), "settings_pushed");
    if tx.send(Event::SettingsChanged(settings)).await.is_err() {
        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
        return false;
    }
    true
}

/// Watch the directory holding `path` so the file may be created, replaced
/// or removed; only events touching `path` are forwarded.
fn watch_file(path: &Path, changes: Sender<()>) -> notify::Result<RecommendedWatcher> {
    let target: PathBuf = path.file_name().map(PathBuf::from).unwrap_or_default();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            let relevant = event
                .paths
                .iter()
                .any(|p| p.file_name().is_some_and(|n| n == target.as_os_str()));
            if relevant && !event.kind.is_access() {
                let _ = changes.try_send(());
            }
        }
        Err(e) => warn!(target: "config", error = %e, "settings_watch_error"),
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(target: "config", dir = %dir.display(), "settings_watch_started");
    Ok(watcher)
}
