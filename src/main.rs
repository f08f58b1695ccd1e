// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use mdtrans::app_config::{self, Config, TranslationProvider};
use mdtrans::app_controller::{Controller, RunOptions};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    OpenAI,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a markdown file (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for mdtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
struct TranslateArgs {
    /// Markdown file to translate
    #[arg(long = "in", value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output file, `-` for stdout (default: <stem>.<tgt>.<ext> next to the input)
    #[arg(long = "out", value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Source language code (e.g., 'en', 'ja', 'deu_Latn')
    #[arg(long)]
    src: Option<String>,

    /// Target language code (e.g., 'de', 'pt')
    #[arg(long)]
    tgt: Option<String>,

    /// Glossary JSON file of "term": "rendering" entries ("KEEP" leaves a term untranslated)
    #[arg(long, value_name = "FILE")]
    glossary: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "mdtrans.json")]
    config: String,

    /// Skip the LLM post-edit pass
    #[arg(long)]
    no_postedit: bool,

    /// Never route through English
    #[arg(long)]
    no_pivot: bool,

    /// Write <output>.debug.json with every pipeline stage
    #[arg(long)]
    debug: bool,

    /// Regex whose matches are never translated (repeatable)
    #[arg(long = "protect", value_name = "REGEX")]
    protect: Vec<String>,

    /// LLM provider for post-editing
    #[arg(long, value_enum)]
    postedit_provider: Option<CliTranslationProvider>,

    /// LLM model for post-editing
    #[arg(long)]
    postedit_model: Option<String>,

    /// Sampling temperature for post-editing
    #[arg(long)]
    postedit_temperature: Option<f32>,

    /// Sampling seed for reproducible post-edits
    #[arg(long)]
    seed: Option<u64>,

    /// Segments translated at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Load the models for the language pair and exit
    #[arg(long)]
    prefetch_only: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// mdtrans - Markdown-preserving machine translation
///
/// Translates markdown documents with offline MT models, routing through
/// English or a multilingual fallback model when no direct model exists,
/// and optionally polishes the result with an LLM.
#[derive(Parser, Debug)]
#[command(name = "mdtrans")]
#[command(version)]
#[command(about = "Markdown-preserving machine translation")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "mdtrans translates markdown documents while keeping links, code, numbers and placeholders intact.

EXAMPLES:
    mdtrans --in README.md --tgt de                   # Translate using default config
    mdtrans --in notes.md --src ja --tgt pt --debug   # Fallback model, with debug report
    mdtrans --in doc.md --tgt fr --no-postedit        # MT only
    mdtrans --in doc.md --glossary terms.json         # Enforce a glossary
    mdtrans --tgt de --prefetch-only                  # Load the models and exit
    mdtrans completions bash > mdtrans.bash           # Generate bash completions

CONFIGURATION:
    Configuration is stored in mdtrans.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
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
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Installed with the most verbose level; the effective level is set from config or CLI
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "mdtrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(args: &TranslateArgs, config: &mut Config) {
    if let Some(src) = &args.src {
        config.source_language = src.clone();
    }
    if let Some(tgt) = &args.tgt {
        config.target_language = tgt.clone();
    }
    if args.no_postedit {
        config.postedit.enabled = false;
    }
    if args.no_pivot {
        config.translation.allow_pivot = false;
    }
    config.translation.protected_patterns.extend(args.protect.iter().cloned());
    if let Some(provider) = &args.postedit_provider {
        config.postedit.provider = provider.clone().into();
    }
    if let Some(model) = &args.postedit_model {
        config.postedit.model = model.clone();
    }
    if let Some(temperature) = args.postedit_temperature {
        config.postedit.temperature = temperature;
    }
    if let Some(seed) = args.seed {
        config.postedit.seed = Some(seed);
    }
    if let Some(concurrency) = args.concurrency {
        config.translation.max_concurrent_segments = concurrency;
    }
    if let Some(log_level) = &args.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &args.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&args.config)?;
    apply_overrides(&args, &mut config);
    log::set_max_level(config.log_level.to_level_filter());

    let input = match (&args.input, args.prefetch_only) {
        (Some(input), _) => input.clone(),
        (None, true) => PathBuf::new(),
        (None, false) => return Err(anyhow!("--in is required unless --prefetch-only is given")),
    };

    let controller = Controller::with_config(config)?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling translation");
            ctrl_c_token.cancel();
        }
    });

    let options = RunOptions {
        input,
        output: args.output.clone(),
        glossary: args.glossary.clone(),
        debug: args.debug,
        prefetch_only: args.prefetch_only,
    };

    match controller.run(options, cancel).await {
        Ok(summary) => {
            if let Some(report) = &summary.report_path {
                info!("Debug report: {}", report.display());
            }
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            Err(e).context("Translation failed")
        }
    }
}
