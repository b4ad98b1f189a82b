mod cli;
mod watcher;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use notify::RecursiveMode;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tsgen_codegen::{CodeGenerator, Config, RustSource, SyncMode, SyncReport, WatchEngine};

use cli::{Cli, Command, CommonArgs};

/// Log filter variable, using `RUST_LOG` syntax.
const LOG_ENV: &str = "TSGEN_LOG";

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Generate(args) => synchronize(&args, SyncMode::Apply),
        Command::Verify(args) => synchronize(&args, SyncMode::Verify),
        Command::Watch { common, debounce_ms } => watch(&common, debounce_ms),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = std::env::var(LOG_ENV)
        .map(|value| EnvFilter::builder().parse_lossy(value))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(args: &CommonArgs) -> Result<Config> {
    match args.config_file() {
        Some(path) => Config::from_file(&path).context("failed to load configuration"),
        None => Ok(Config::default()),
    }
}

/// Run one pass. `false` when the run should exit with a failure status.
fn synchronize(args: &CommonArgs, mode: SyncMode) -> Result<bool> {
    let mut generator = CodeGenerator::new(load_config(args)?);
    generator
        .add_source_dir(&args.source)
        .with_context(|| format!("failed to read sources from {}", args.source.display()))?;
    let report = generator.synchronize(mode)?;
    log_summary(&report);

    // Generation findings are warnings; verify fails on any of them.
    Ok(mode == SyncMode::Apply || report.success())
}

fn log_summary(report: &SyncReport) {
    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        deleted = report.deleted.len(),
        unchanged = report.unchanged.len(),
        findings = report.diagnostics.len(),
        "done"
    );
}

fn watch(args: &CommonArgs, debounce_ms: Option<u64>) -> Result<bool> {
    // Watch events carry absolute paths; the source must use the same root.
    let root = args
        .source
        .canonicalize()
        .with_context(|| format!("source root {} not found", args.source.display()))?;
    let config_file = args
        .config_file()
        .map(|path| {
            path.canonicalize()
                .with_context(|| format!("config file {} not found", path.display()))
        })
        .transpose()?;

    let config = load_config(args)?;

    let mut source = RustSource::new(&root);
    let mut watched = vec![(root.clone(), RecursiveMode::Recursive)];
    let mut extra_dirs: Vec<PathBuf> = manifest_dir(&root).into_iter().collect();
    if let Some(path) = &config_file {
        source = source.with_config_file(path);
        extra_dirs.extend(path.parent().map(Path::to_path_buf));
    }
    for dir in extra_dirs {
        if !dir.starts_with(&root) && !watched.iter().any(|(known, _)| *known == dir) {
            watched.push((dir, RecursiveMode::NonRecursive));
        }
    }

    let mut engine = WatchEngine::new(source, config);
    if let Some(path) = &config_file {
        engine = engine.with_config_file(path);
    }
    if let Some(ms) = debounce_ms {
        engine = engine.with_debounce(Duration::from_millis(ms));
    }

    let _watcher = watcher::start(engine.queue(), &watched).context("failed to watch sources")?;

    let cancel = engine.cancellation();
    thread::Builder::new()
        .name("tsgen-stdin".to_string())
        .spawn(move || {
            let _ = io::copy(&mut io::stdin().lock(), &mut io::sink());
            info!("standard input closed, stopping");
            cancel.cancel();
        })
        .context("failed to start input thread")?;

    Ok(engine.run().success)
}

/// Directory of the nearest `Cargo.toml` at or above the source root.
fn manifest_dir(root: &Path) -> Option<PathBuf> {
    root.ancestors()
        .find(|dir| dir.join("Cargo.toml").is_file())
        .map(Path::to_path_buf)
}
