//! Configures `tracing_subscriber` to write to standard output.
//!
//! Tracing is disabled by default. Set `SPLITPACK_TRACING_MODE=stdout` and filter with `RUST_LOG`.
use anyhow::anyhow;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

const TRACING_MODE_VAR: &str = "SPLITPACK_TRACING_MODE";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracerMode {
  /// Output the Tracer logs to Stdout
  Stdout,
}

impl TracerMode {
  pub fn from_env() -> anyhow::Result<Vec<Self>> {
    match std::env::var(TRACING_MODE_VAR) {
      Ok(value) => Self::parse(&value),
      Err(_) => Ok(Vec::new()),
    }
  }

  pub fn parse(value: &str) -> anyhow::Result<Vec<Self>> {
    let mut tracer_modes = Vec::new();

    for mode in value.split(',').map(|mode| mode.trim()) {
      match mode {
        "stdout" => {
          if !tracer_modes.contains(&TracerMode::Stdout) {
            tracer_modes.push(TracerMode::Stdout);
          }
        }
        "" => {}
        value => return Err(anyhow!("Invalid value for {TRACING_MODE_VAR}: {value}")),
      }
    }

    Ok(tracer_modes)
  }
}

/// Keeps the non-blocking writer flushing until dropped
pub struct Tracer {
  #[allow(unused)]
  worker_guard: WorkerGuard,
}

impl Tracer {
  /// Installs the global subscriber.
  ///
  /// Returns None when no mode is enabled or when a global subscriber is already installed.
  pub fn new(options: &[TracerMode]) -> anyhow::Result<Option<Self>> {
    if !options.contains(&TracerMode::Stdout) {
      return Ok(None);
    }

    let (non_blocking, worker_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = tracing_subscriber::fmt::layer()
      .with_writer(non_blocking)
      .with_span_events(FmtSpan::CLOSE)
      .with_filter(EnvFilter::from_default_env());

    let subscriber = Registry::default().with(stdout_layer);
    if subscriber.try_init().is_err() {
      return Ok(None);
    }

    Ok(Some(Tracer { worker_guard }))
  }
}

/// Sets up tracing from `SPLITPACK_TRACING_MODE`. Safe to call more than once.
pub fn init_tracing() -> anyhow::Result<Option<Tracer>> {
  Tracer::new(&TracerMode::from_env()?)
}
