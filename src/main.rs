// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fieldwise::app_config::{self, Config, TranslationProvider};
use fieldwise::app_controller::Controller;
use fieldwise::providers::mock::MockProvider;
use fieldwise::scheduler::CancellationGate;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    OpenAI,
    Anthropic,
    Gemini,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::Gemini => TranslationProvider::Gemini,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Simulated provider behavior
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliBehavior {
    /// Every request succeeds
    Working,
    /// Each field is rate limited once, then succeeds
    RateLimited,
    /// Every fifth request is rate limited
    Intermittent,
    /// Every request fails with an item error
    Failing,
    /// The credential does not match the endpoint
    WrongEndpoint,
    /// Streaming is refused for the account
    StreamingRejected,
}

impl CliBehavior {
    fn provider(self) -> MockProvider {
        match self {
            Self::Working => MockProvider::working(),
            Self::RateLimited => MockProvider::rate_limited_first(1),
            Self::Intermittent => MockProvider::intermittent(5),
            Self::Failing => MockProvider::failing(),
            Self::WrongEndpoint => MockProvider::wrong_endpoint(),
            Self::StreamingRejected => MockProvider::streaming_rejected(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate the fields of a JSON file
    Translate(TranslateArgs),

    /// Generate shell completions for fieldwise
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// JSON file of fields to translate
    #[arg(value_name = "INPUT.json")]
    input_path: PathBuf,

    /// Force overwrite of an existing output file
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider profile to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name, selects the concurrency profile
    #[arg(short, long)]
    model: Option<String>,

    /// Source locale (e.g., 'en')
    #[arg(short, long)]
    source_locale: Option<String>,

    /// Target locales, comma separated (e.g., 'fr,de,it')
    #[arg(short, long, value_delimiter = ',')]
    target_locales: Option<Vec<String>>,

    /// Override the model's concurrency cap
    #[arg(long, env = "FIELDWISE_MAX_CONCURRENCY")]
    max_concurrency: Option<usize>,

    /// Simulated provider behavior
    #[arg(short, long, value_enum, default_value = "working")]
    behavior: CliBehavior,

    /// Simulated latency per request in milliseconds
    #[arg(long, default_value_t = 300)]
    latency_ms: u64,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// fieldwise - batch field translation with adaptive concurrency
#[derive(Parser, Debug)]
#[command(name = "fieldwise")]
#[command(version)]
#[command(about = "Translate content fields into many locales with adaptive concurrency")]
#[command(long_about = "fieldwise translates every text field of a JSON document into the configured
locales, running as many requests in parallel as the provider tolerates.

EXAMPLES:
    fieldwise translate content.json                    # Translate using default config
    fieldwise translate -t fr,de,it content.json        # Choose target locales
    fieldwise translate -b rate-limited content.json    # Simulate a rate-limited provider
    fieldwise translate -m gpt-4.1-mini content.json    # Use a light model profile (cap 6)
    fieldwise completions bash > fieldwise.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // The logger accepts everything; filtering happens through max_level
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "fieldwise", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let mut config = Config::load_or_create(&options.config_path)?;

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.model = model.clone();
    }
    if let Some(source_locale) = &options.source_locale {
        config.source_locale = source_locale.clone();
    }
    if let Some(target_locales) = &options.target_locales {
        config.target_locales = target_locales.clone();
    }
    if options.max_concurrency.is_some() {
        config.translation.max_concurrency = options.max_concurrency;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;

    let gate = CancellationGate::new();
    let ctrl_c_gate = gate.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting in-flight fields (press Ctrl-C again to exit now)");
            ctrl_c_gate.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    let provider = options
        .behavior
        .provider()
        .with_latency(Duration::from_millis(options.latency_ms), options.latency_ms / 2)
        .with_chunk_delay(Duration::from_millis(options.latency_ms / 10));
    info!("Using simulated provider ({:?})", provider.behavior());

    match controller
        .run(&options.input_path, Arc::new(provider), gate, options.force_overwrite)
        .await
    {
        Ok(summary) if summary.failed > 0 => {
            warn!("{} of {} fields failed", summary.failed, summary.total);
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}
