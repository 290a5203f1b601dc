//! Binary entry point: startup, logging, runtime construction.
use anyhow::{Context, Result};
use clap::Parser;
use core_events::{EVENT_CHANNEL_CAP, Event, EventSourceRegistry};
use core_explain::Explainer;
use core_input::LineCommandSource;
use core_render::{RenderOptions, ViewPrinter};
use core_session::Session;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

mod runtime;
use runtime::{RuntimeContext, StepmapRuntime};

const DEFAULT_LOG_FILE: &str = "stepmap.log";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "stepmap",
    version,
    about = "Watch positions move through document edits"
)]
struct Args {
    /// Configuration file path (overrides discovery of `stepmap.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Initial document text (replaces the configured one).
    #[arg(long = "doc")]
    pub doc: Option<String>,
    /// Disable coloured output.
    #[arg(long = "no-color")]
    pub no_color: bool,
    /// Log file path.
    #[arg(long = "log-file", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn run(&mut self, args: &Args) -> Result<RuntimeContext> {
        self.configure_logging(&args.log_file)?;
        Self::install_panic_hook();
        info!(target: "runtime", "startup");

        let config = core_config::load_from(args.config.clone())?;
        let mut session = Session::new(config.session());
        if let Some(doc) = args.doc.as_deref() {
            session.set_document(doc);
        }

        let render = RenderOptions {
            color: !args.no_color && std::io::stdout().is_terminal(),
        };
        session.add_observer(Box::new(ViewPrinter::new(std::io::stdout(), render)));

        let explainer = Explainer::from_config(config.explain());
        info!(
            target: "runtime.startup",
            config_override = args.config.is_some(),
            doc_override = args.doc.is_some(),
            doc_len = session.doc_len(),
            explain_configured = explainer.is_configured(),
            model = explainer.model(),
            color = render.color,
            "bootstrap_complete"
        );

        Ok(RuntimeContext {
            session,
            explainer: Arc::new(explainer),
            render,
        })
    }

    fn configure_logging(&mut self, log_path: &Path) -> Result<()> {
        let log_dir = match log_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let file_name = log_path
            .file_name()
            .with_context(|| format!("log path {} has no file name", log_path.display()))?;
        if log_path.exists() {
            let _ = std::fs::remove_file(log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, file_name);
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }

        Ok(())
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
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::new();
    let context = startup.run(&args)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let result = rt.block_on(async move {
        let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
        let mut registry = EventSourceRegistry::new();
        registry.register(LineCommandSource::stdin());
        let source_handles = registry.spawn_all(&tx);

        let mut runtime =
            StepmapRuntime::new(context, tx, rx, source_handles, Box::new(std::io::stdout()));
        runtime.run().await
    });
    // The stdin reader may still be parked in a blocking read.
    rt.shutdown_timeout(Duration::from_millis(200));
    info!(target: "runtime", "exit");
    result
}
