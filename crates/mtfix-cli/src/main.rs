use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use mtfix_core::{
    CancellationToken, Engine, JsonLinesReporter, Mode, MultiReporter, RunOptions, Settings,
    TextReporter,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum Command {
    /// Report files whose timestamps disagree with their capture time
    Check,
    /// Like check, without the year/month folder constraint
    CheckNodir,
    /// Rewrite timestamps to the capture time where it is safe
    Fix,
    /// Like fix, without the year/month folder constraint
    FixNodir,
}

impl Command {
    fn mode(self) -> Mode {
        match self {
            Command::Check | Command::CheckNodir => Mode::Check,
            Command::Fix | Command::FixNodir => Mode::Fix,
        }
    }

    fn ignore_dir_constraint(self) -> bool {
        matches!(self, Command::CheckNodir | Command::FixNodir)
    }
}

#[derive(Parser)]
#[command(name = "mtfix", version, about = "Reconcile media capture times with filesystem timestamps")]
struct Cli {
    /// What to do with each file
    #[arg(value_enum)]
    command: Command,

    /// File or directory (walked recursively)
    target: PathBuf,

    /// Settings file (TOML)
    #[arg(long, env = "MTFIX_CONFIG")]
    config: Option<PathBuf>,

    /// Also write reported files as JSON Lines to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "mtfix=debug,mtfix_core=debug"
    } else if cli.quiet {
        "mtfix=warn,mtfix_core=warn"
    } else {
        "mtfix=info,mtfix_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let rendered = e.render().to_string();
            eprint!("{}", rendered);
            if !rendered.contains("Usage:") {
                eprintln!("\n{}", Cli::command().render_usage());
            }
            return ExitCode::from(1);
        }
    };

    init_tracing(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let mut reporter = MultiReporter::new();
    reporter.push(Box::new(TextReporter::new(
        BufWriter::new(io::stdout()),
        settings.utc_offset,
    )));
    if let Some(path) = &cli.report {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        reporter.push(Box::new(JsonLinesReporter::new(BufWriter::new(file))));
    }

    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("Ctrl-C handler not installed: {}", e);
    }

    let options = RunOptions {
        target: cli.target,
        mode: cli.command.mode(),
        ignore_dir_constraint: cli.command.ignore_dir_constraint(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let t_total = std::time::Instant::now();
    let engine = Engine::new(settings);
    let summary = runtime.block_on(engine.run(&options, &mut reporter, Some(&token)))?;
    info!(
        "{} files, {} flagged, {} fixed, {} errors ({:.2}s)",
        summary.total,
        summary.flagged,
        summary.fixed,
        summary.errors,
        t_total.elapsed().as_secs_f64()
    );
    Ok(())
}
