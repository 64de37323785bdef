//! firehose CLI: follow a keyword-filtered event stream from the terminal.
//!
//! # Commands
//! ```text
//! firehose run    --endpoint <url> --track rust,tokio [--keyword-file <path>]
//! firehose filter --input <recorded.jsonl>
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod cmd_filter;
mod cmd_run;
mod config;
mod logging;

use config::FirehoseConfig;

#[derive(Parser)]
#[command(
    name = "firehose",
    about = "Follow a keyword-filtered event stream",
    long_about = "
firehose keeps one filtered stream subscription open and hands it off to a
fresh connection whenever the tracked keywords change, without a gap in
delivery. Delivered texts are printed on stdout, logs go to stderr.

ENVIRONMENT VARIABLES:
  FIREHOSE_ENDPOINT       Stream filter endpoint URL
  FIREHOSE_BEARER_TOKEN   Bearer token sent with every subscription
  RUST_LOG                Overrides the configured log filter
",
    version
)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and print deliverable events until Ctrl-C
    Run(RunArgs),

    /// Apply the delivery filter to recorded line-delimited JSON
    Filter {
        /// Input file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Stream filter endpoint
    #[arg(long, env = "FIREHOSE_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long, env = "FIREHOSE_BEARER_TOKEN", hide_env_values = true)]
    bearer_token: Option<String>,

    /// Keywords to track (comma-separated or repeated)
    #[arg(short, long, value_delimiter = ',')]
    track: Vec<String>,

    /// File with one keyword per line, re-read periodically
    #[arg(long)]
    keyword_file: Option<PathBuf>,

    /// How often to re-read the keyword file, in milliseconds
    #[arg(long)]
    refresh_interval_ms: Option<u64>,
}

impl RunArgs {
    fn apply(self, config: &mut FirehoseConfig) {
        if self.endpoint.is_some() {
            config.endpoint = self.endpoint;
        }
        if self.bearer_token.is_some() {
            config.bearer_token = self.bearer_token;
        }
        if !self.track.is_empty() {
            config.track = self.track;
        }
        if self.keyword_file.is_some() {
            config.keyword_file = self.keyword_file;
        }
        if let Some(ms) = self.refresh_interval_ms {
            config.refresh_interval_ms = ms;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = FirehoseConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.log.level = "debug".into();
    }
    if cli.log_json {
        config.log.json = true;
    }
    logging::init_tracing(&config.log);

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut config);
            cmd_run::run(config).await
        }
        Commands::Filter { input } => cmd_filter::run(&input),
    }
}
