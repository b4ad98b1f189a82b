use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "tsgen.json";

#[derive(Parser)]
#[command(name = "tsgen", bin_name = "tsgen", version)]
#[command(about = "Keep TypeScript declaration files in sync with Rust types")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write changed declaration files and delete stale ones
    #[command(after_help = r#"EXAMPLES:
  tsgen generate
  tsgen generate --source crates/api/src --config crates/api/tsgen.json"#)]
    Generate(CommonArgs),

    /// Check that the declaration files are up to date without touching them
    #[command(after_help = r#"EXIT STATUS:
  0 when every file matches, 1 when any file differs, is missing or is stale"#)]
    Verify(CommonArgs),

    /// Generate once, then regenerate affected files on every change
    #[command(after_help = r#"Runs until an error occurs or standard input is closed."#)]
    Watch {
        #[command(flatten)]
        common: CommonArgs,

        /// Quiet period before a change is processed. Applies until the
        /// config file changes
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Root directory of the Rust sources
    #[arg(long, short = 's', value_name = "DIR", default_value = "src")]
    pub source: PathBuf,

    /// Config file [default: tsgen.json when present]
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    /// The explicit config file, else `tsgen.json` if it exists.
    pub fn config_file(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG);
            default.is_file().then_some(default)
        })
    }
}
