//! promptdrop entrypoint: drives the completion engine against a simulated
//! page from a script, with settings pushed from a watched TOML file.
use anyhow::{Context, Result};
use clap::Parser;
use core_actions::Engine;
use core_config::{RetryPolicy, Settings, TomlSettingsProvider};
use core_events::{EVENT_CHANNEL_CAP, Event, EventSourceRegistry, TickEventSource};
use core_keymap::Platform;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod driver;
mod script;
mod settings_source;

use driver::{Driver, FieldKind};
use script::Step;
use settings_source::{SettingsEventSource, load_with_retry};

const TICK_INTERVAL: Duration = Duration::from_millis(25);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "promptdrop", version, about = "Prompt template dropdown driver")]
struct Args {
    /// Script to run; reads stdin when omitted.
    #[arg(long = "script")]
    pub script: Option<PathBuf>,
    /// Settings file path (overrides discovery of `promptdrop.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Kind of editable surface on the simulated page.
    #[arg(long = "field", value_enum, default_value_t = FieldKind::Multi)]
    pub field: FieldKind,
    /// Text already present in the surface.
    #[arg(long = "initial", default_value = "")]
    pub initial: String,
    /// Keep watching the settings file for changes while the script runs.
    #[arg(long = "watch")]
    pub watch: bool,
    /// Write logs to this directory instead of the working directory.
    #[arg(long = "log-dir")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    ScriptFinished,
    ShutdownEvent,
    ChannelClosed,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::ScriptFinished => "script_finished",
            ShutdownReason::ShutdownEvent => "shutdown_event",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

fn configure_logging(dir: &Path) -> Option<WorkerGuard> {
    let log_path = dir.join("promptdrop.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(dir, "promptdrop.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global subscriber already installed; drop the guard so the writer shuts down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn read_script(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("read script {}", p.display())),
        None => std::io::read_to_string(std::io::stdin()).context("read script from stdin"),
    }
}

struct Runtime {
    driver: Driver,
    steps: VecDeque<Step>,
    /// Next script step may not run before this instant.
    resume_at: Instant,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl Runtime {
    async fn run(&mut self) -> Result<ShutdownReason> {
        let span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter = span.enter();

        let reason = loop {
            if self.steps.is_empty() {
                break ShutdownReason::ScriptFinished;
            }
            let deadline = tokio::time::Instant::from_std(self.resume_at);
            tokio::select! {
                biased;
                event = self.rx.recv() => match event {
                    Some(Event::Shutdown) => break ShutdownReason::ShutdownEvent,
                    Some(event) => self.handle_event(event),
                    None => break ShutdownReason::ChannelClosed,
                },
                _ = tokio::time::sleep_until(deadline) => self.run_next_step(),
            }
        };

        self.rx.close();
        self.finalize_shutdown(reason).await;
        Ok(reason)
    }

    fn handle_event(&mut self, event: Event) {
        let now = Instant::now();
        if let Event::SettingsChanged(settings) = &event {
            debug!(target: "runtime.events", prompts = settings.prompts.len(), "settings_event");
        }
        let out = self.driver.handle(event, now);
        if out.redraw {
            trace!(target: "runtime", mode = ?self.driver.engine.mode(), "redraw");
        }
    }

    fn run_next_step(&mut self) {
        let Some(step) = self.steps.pop_front() else {
            return;
        };
        let now = Instant::now();
        if let Some(pause) = self.driver.step(&step, now) {
            self.resume_at = now + pause;
        }
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        if let Some(tx) = self.tx.take() {
            trace!(target: "runtime.shutdown", reason = reason.as_str(), "dropping_runtime_sender");
            drop(tx);
        }
        while let Some(handle) = self.source_handles.pop() {
            handle.abort();
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(_)) => trace!(target: "runtime.shutdown", reason = reason.as_str(), "event_source_task_stopped"),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(target: "runtime.shutdown", reason = reason.as_str(), "event_source_task_timeout"),
            }
        }
        log_shutdown_stage(reason, "complete");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_dir = args.log_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let _log_guard = configure_logging(&log_dir);
    install_panic_hook();
    info!(target: "runtime", "startup");

    let platform = Platform::current();
    let steps = script::parse(&read_script(args.script.as_deref())?, platform)?;

    // Settings are read once up front so the first step already sees them;
    // the source below pushes later changes.
    let provider = TomlSettingsProvider::new(args.config.clone());
    let policy = RetryPolicy {
        max_attempts: Some(3),
        ..RetryPolicy::default()
    };
    let settings = load_with_retry(&provider, &policy).await.unwrap_or_else(Settings::default);
    info!(
        target: "runtime.startup",
        config = %provider.path().display(),
        prompts = settings.prompts.len(),
        steps = steps.len(),
        field = ?args.field,
        "bootstrap_complete"
    );

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut registry = EventSourceRegistry::new();
    registry.register(TickEventSource::new(TICK_INTERVAL));
    if args.watch {
        registry.register(SettingsEventSource::new(provider, policy, true));
    }
    let source_handles = registry.spawn_all(&tx);

    let engine = Engine::new(settings, platform);
    let mut runtime = Runtime {
        driver: Driver::new(engine, args.field, &args.initial),
        steps: steps.into(),
        resume_at: Instant::now(),
        rx,
        tx: Some(tx),
        source_handles,
    };
    let reason = runtime.run().await?;
    debug!(target: "runtime", reason = %reason, "event_loop_exit");
    println!("{}", runtime.driver.text());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_reason_labels_are_stable() {
        assert_eq!(ShutdownReason::ScriptFinished.as_str(), "script_finished");
        assert_eq!(ShutdownReason::ShutdownEvent.as_str(), "shutdown_event");
        assert_eq!(ShutdownReason::ChannelClosed.as_str(), "channel_closed");
    }

    #[tokio::test]
    async fn runtime_runs_script_to_completion() {
        let settings = Settings::default().with_prompts(vec![core_config::Template::new(
            "g",
            "Greeting",
            "Hello [name]!",
        )]);
        let steps = script::parse(
            "type AI:Gre\nkey Enter\nfill World\nwait 5\nkey Enter",
            Platform::Other,
        )
        .unwrap();
        let (tx, rx) = mpsc::channel::<Event>(8);
        let mut registry = EventSourceRegistry::new();
        registry.register(TickEventSource::new(Duration::from_millis(1)));
        let source_handles = registry.spawn_all(&tx);
        let mut runtime = Runtime {
            driver: Driver::new(Engine::new(settings, Platform::Other), FieldKind::Single, ""),
            steps: steps.into(),
            resume_at: Instant::now(),
            rx,
            tx: Some(tx),
            source_handles,
        };
        let reason = runtime.run().await.unwrap();
        assert_eq!(reason, ShutdownReason::ScriptFinished);
        assert_eq!(runtime.driver.text(), "Hello World!");
    }

    #[tokio::test]
    async fn shutdown_event_stops_the_loop() {
        let (tx, rx) = mpsc::channel::<Event>(8);
        tx.send(Event::Shutdown).await.unwrap();
        let mut runtime = Runtime {
            driver: Driver::new(
                Engine::new(Settings::default(), Platform::Other),
                FieldKind::Multi,
                "",
            ),
            steps: VecDeque::from([Step::Wait(Duration::from_secs(60)), Step::Show]),
            resume_at: Instant::now() + Duration::from_secs(60),
            rx,
            tx: Some(tx),
            source_handles: Vec::new(),
        };
        assert_eq!(runtime.run().await.unwrap(), ShutdownReason::ShutdownEvent);
    }
}
