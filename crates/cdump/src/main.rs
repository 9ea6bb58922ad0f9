use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use cdump::{DumpConfig, analyse_path, run_dump};
use cdump_check::{CheckRegistry, Format};
use cdump_exec::OcCli;
use cdump_model::CheckId;
use cdump_observe::{LoggerConfig, LoggerFormat, logger_init};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "cdump", version, about = "Collect and analyse cluster diagnostic dumps")]
struct Cli {
    /// Log format: text, json or journald
    #[arg(long, global = true, env = "CDUMP_LOG_FORMAT", default_value = "text")]
    log_format: LoggerFormat,

    /// Log filter, e.g. `info` or `cdump.exec=debug`
    #[arg(long, global = true, env = "CDUMP_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect a dump from the current cluster, then analyse it
    Dump(DumpArgs),
    /// Analyse an existing dump directory or .tar.gz archive
    Analyse(AnalyseArgs),
}

#[derive(Args)]
struct DumpArgs {
    /// Maximum number of tasks running at once [default: available CPUs]
    #[arg(short = 'p', long)]
    parallelism: Option<usize>,

    /// Tail length of every log fetch [default: 1000]
    #[arg(long)]
    max_log_lines: Option<u32>,

    /// Deadline of a single task, in seconds [default: 120]
    #[arg(long, value_name = "SECS")]
    task_timeout: Option<u64>,

    /// Directory receiving the dump [default: rhmap-dumps]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write a plain directory tree instead of a .tar.gz archive
    #[arg(long)]
    no_archive: bool,

    /// Check to run after collection, by name or code; repeatable [default: all]
    #[arg(short, long = "check", value_name = "CHECK")]
    checks: Vec<CheckId>,

    /// The oc binary
    #[arg(long, env = "CDUMP_OC", default_value = "oc")]
    oc: PathBuf,
}

impl DumpArgs {
    fn config(&self) -> DumpConfig {
        let mut cfg = DumpConfig::default();
        if let Some(n) = self.parallelism {
            cfg.parallelism = n;
        }
        if let Some(n) = self.max_log_lines {
            cfg.max_log_lines = n;
        }
        if let Some(secs) = self.task_timeout {
            cfg.task_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if !self.checks.is_empty() {
            cfg.checks = self.checks.clone();
        }
        cfg.archive = !self.no_archive;
        cfg
    }
}

#[derive(Args)]
struct AnalyseArgs {
    /// Dump directory or .tar.gz archive
    path: PathBuf,

    /// Output format: json or yaml
    #[arg(short, long, default_value = "json")]
    format: Format,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,

    /// Check to run, by name or code; repeatable [default: all]
    #[arg(short, long = "check", value_name = "CHECK")]
    checks: Vec<CheckId>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger = LoggerConfig {
        format: cli.log_format,
        level: cli.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = logger_init(&logger) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let registry = Arc::new(CheckRegistry::builtin());
    let res = match cli.command {
        Command::Dump(args) => dump(args, registry).await,
        Command::Analyse(args) => analyse(args, &registry),
    };
    match res {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dump(args: DumpArgs, registry: Arc<CheckRegistry>) -> anyhow::Result<ExitCode> {
    let cfg = args.config();
    debug!(target: "cdump.dump", ?cfg, "starting dump");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(target: "cdump.dump", "interrupted; cancelling running tasks");
                cancel.cancel();
            }
        }
    });

    eprintln!("Starting dump...");
    let summary = run_dump(
        &cfg,
        Arc::new(OcCli::new(args.oc)),
        registry,
        &cancel,
        |_| {
            let mut err = io::stderr().lock();
            let _ = err.write_all(b".");
            let _ = err.flush();
        },
    )
    .await
    .context("dump failed")?;
    eprintln!();

    let errors = summary.errors();
    if !errors.is_empty() {
        eprintln!("The following errors occurred during the dump:");
        eprintln!("{errors}");
    }
    eprintln!("Dumped system information to: {}", summary.location.display());

    Ok(if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn analyse(args: AnalyseArgs, registry: &CheckRegistry) -> anyhow::Result<ExitCode> {
    let ids = if args.checks.is_empty() {
        registry.ids()
    } else {
        args.checks
    };
    let out = analyse_path(&args.path, &ids, registry, args.format, args.pretty)
        .with_context(|| format!("analyse {}", args.path.display()))?;

    println!("{}", out.rendered);
    for e in &out.analysis.errors {
        eprintln!("error: {e}");
    }
    Ok(if out.analysis.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
