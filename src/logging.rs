use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Trace,
}

impl Verbosity {
    /// `-q` wins over any number of `-v`.
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Default filter when `RUST_LOG` is unset. sqlx logs every statement at
/// INFO, so its queries only show up at trace verbosity.
pub fn default_directives(verbosity: Verbosity) -> String {
    let sqlx = match verbosity {
        Verbosity::Quiet => Level::ERROR,
        Verbosity::Normal | Verbosity::Verbose => Level::WARN,
        Verbosity::Trace => Level::INFO,
    };
    format!("scouting_stats={},sqlx={}", verbosity.level(), sqlx)
}

/// Installs the stderr subscriber so stdout carries only command output.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
