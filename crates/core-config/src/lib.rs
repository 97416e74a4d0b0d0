//! Settings schema, TOML settings provider and engine timing configuration.
//!
//! The engine only reads a cached copy of `Settings`; persistence belongs to a
//! `SettingsProvider`. The bundled `TomlSettingsProvider` reads
//! `promptdrop.toml` (or an override path). Unknown fields are ignored so the
//! file can carry data for other tools. A missing file is `Ok(None)` and a
//! malformed one is an error, letting the caller retry under `RetryPolicy`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf, time::Duration};
use tracing::{debug, info, warn};

mod retry;

pub use retry::RetryPolicy;

pub const DEFAULT_HOTKEY: &str = "Ctrl+Shift+P";
pub const DEFAULT_TEXT_TRIGGER: &str = "AI:";
pub const CONFIG_FILE_NAME: &str = "promptdrop.toml";

/// A stored prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    /// Creation time in unix milliseconds.
    #[serde(default)]
    pub created: u64,
}

impl Template {
    pub fn new(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            created: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_hotkey")]
    pub hotkey: String,
    #[serde(default = "Settings::default_text_trigger", alias = "textTrigger")]
    pub text_trigger: String,
    #[serde(default)]
    pub prompts: Vec<Template>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hotkey: Self::default_hotkey(),
            text_trigger: Self::default_text_trigger(),
            prompts: Vec::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl Settings {
    fn default_hotkey() -> String {
        DEFAULT_HOTKEY.to_string()
    }
    fn default_text_trigger() -> String {
        DEFAULT_TEXT_TRIGGER.to_string()
    }

    pub fn with_prompts(mut self, prompts: Vec<Template>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).context("parse settings")?;
        debug!(
            target: "config",
            prompts = settings.prompts.len(),
            text_trigger_len = settings.text_trigger.len(),
            "settings_parsed"
        );
        Ok(settings)
    }
}

/// Timing and sizing knobs for the session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Window after an insertion during which the surface's own change
    /// notifications are not treated as a new trigger.
    #[serde(default = "EngineConfig::default_insert_guard_ms")]
    pub insert_guard_ms: u64,
    /// How long the empty-library indicator stays up.
    #[serde(default = "EngineConfig::default_empty_state_ms")]
    pub empty_state_ms: u64,
    #[serde(default = "EngineConfig::default_max_visible_items")]
    pub max_visible_items: usize,
    /// Delay before the caret box is measured after a session opens.
    #[serde(default)]
    pub remeasure_delay_ms: u64,
    /// Delay before focus returns to the surface after leaving the form.
    #[serde(default)]
    pub focus_restore_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            insert_guard_ms: Self::default_insert_guard_ms(),
            empty_state_ms: Self::default_empty_state_ms(),
            max_visible_items: Self::default_max_visible_items(),
            remeasure_delay_ms: 0,
            focus_restore_delay_ms: 0,
        }
    }
}

impl EngineConfig {
    const fn default_insert_guard_ms() -> u64 {
        150
    }
    const fn default_empty_state_ms() -> u64 {
        1500
    }
    const fn default_max_visible_items() -> usize {
        8
    }

    pub fn insert_guard(&self) -> Duration {
        Duration::from_millis(self.insert_guard_ms)
    }
    pub fn empty_state(&self) -> Duration {
        Duration::from_millis(self.empty_state_ms)
    }
    pub fn remeasure_delay(&self) -> Duration {
        Duration::from_millis(self.remeasure_delay_ms)
    }
    pub fn focus_restore_delay(&self) -> Duration {
        Duration::from_millis(self.focus_restore_delay_ms)
    }
}

/// Source of settings. Implementations must not block for long; callers
/// retry failures under a `RetryPolicy`.
pub trait SettingsProvider: Send + Sync {
    /// `Ok(None)` when no settings exist yet.
    fn get_settings(&self) -> Result<Option<Settings>>;
}

/// Best-effort settings path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("promptdrop").join(CONFIG_FILE_NAME);
    }
    local
}

#[derive(Debug, Clone)]
pub struct TomlSettingsProvider {
    path: PathBuf,
}

impl TomlSettingsProvider {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(discover),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SettingsProvider for TomlSettingsProvider {
    fn get_settings(&self) -> Result<Option<Settings>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(target: "config", path = %self.path.display(), "settings_file_missing");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        match Settings::from_toml(&content) {
            Ok(s) => Ok(Some(s)),
            Err(e) => {
                warn!(target: "config", path = %self.path.display(), error = %e, "settings_parse_failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn missing_file_is_none() {
        let p = TomlSettingsProvider::new(Some(PathBuf::from("__nonexistent_hopefully__.toml")));
        assert!(p.get_settings().unwrap().is_none());
    }

    #[test]
    fn defaults_fill_absent_keys() {
        let s = Settings::from_toml("").unwrap();
        assert_eq!(s.hotkey, DEFAULT_HOTKEY);
        assert_eq!(s.text_trigger, DEFAULT_TEXT_TRIGGER);
        assert!(s.prompts.is_empty());
        assert_eq!(s.engine, EngineConfig::default());
        assert_eq!(s.engine.insert_guard(), Duration::from_millis(150));
    }

    #[test]
    fn parses_prompts_and_engine_table() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"
hotkey = "Mod+K"
textTrigger = ";;"

[engine]
insert_guard_ms = 50
max_visible_items = 4

[[prompts]]
id = "g1"
name = "Greeting"
content = "Hello [name]!"
created = 1700000000000

[[prompts]]
name = "Bare"
"#,
        )
        .unwrap();
        let s = TomlSettingsProvider::new(Some(tmp.path().to_path_buf()))
            .get_settings()
            .unwrap()
            .unwrap();
        assert_eq!(s.hotkey, "Mod+K");
        assert_eq!(s.text_trigger, ";;");
        assert_eq!(s.prompts.len(), 2);
        assert_eq!(s.prompts[0], Template {
            id: "g1".into(),
            name: "Greeting".into(),
            content: "Hello [name]!".into(),
            created: 1_700_000_000_000,
        });
        assert_eq!(s.prompts[1].content, "");
        assert_eq!(s.engine.insert_guard_ms, 50);
        assert_eq!(s.engine.max_visible_items, 4);
        assert_eq!(s.engine.empty_state_ms, 1500);
    }

    #[test]
    fn malformed_file_is_an_error_and_logged() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "prompts = 3\n").unwrap();
        let provider = TomlSettingsProvider::new(Some(tmp.path().to_path_buf()));
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let result = with_default(subscriber, || provider.get_settings());
        assert!(result.is_err());
        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("WARN config:"));
        assert!(log_output.contains("settings_parse_failed"));
    }
}
