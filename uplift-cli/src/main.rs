use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use fs_err as fs;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use uplift_cli::config::{self, CliOverrides, ConfigMerger};
use uplift_cli::render;
use uplift_core::pipeline::{inspect_upgrade, run_upgrade};
use uplift_core::settings::RunSettings;
use uplift_core::{OrchestratorError, execution_order};
use uplift_domain::{CancelToken, builtin_step_metas};
use uplift_edit::{FsProjectStore, ProjectStore};
use uplift_types::run::{RunOutcome, RunReport};

const EXIT_OK: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INCOMPLETE: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Parser)]
#[command(
    name = "uplift",
    version,
    about = "Dependency-ordered, resumable project upgrades driven by a reference map."
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inspect every step and preview the project rewrite without writing anything.
    Plan(PlanArgs),
    /// Run the upgrade: initialize every step and apply the ones with work to do.
    Run(RunArgs),
    /// List the upgrade steps in execution order.
    ListSteps(ListStepsArgs),
}

#[derive(Debug, Args)]
struct ProjectArgs {
    /// Project manifest to upgrade.
    #[arg(long, default_value = "Cargo.toml")]
    project: Utf8PathBuf,

    /// Reference map (.json or .toml). Default: [map] path from uplift.toml, else
    /// uplift-map.json next to the project.
    #[arg(long)]
    map: Option<Utf8PathBuf>,

    /// Config file (default: uplift.toml next to the project).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Step ids to skip (extends [steps] skip).
    #[arg(long)]
    skip: Vec<String>,

    /// Reference name patterns the upgrade cannot handle (extends [readiness] unsupported).
    #[arg(long)]
    unsupported: Vec<String>,

    /// Proceed even when unsupported references are declared.
    #[arg(long, default_value_t = false)]
    ignore_unsupported: bool,

    /// Do not back up the project file before rewriting it.
    #[arg(long, default_value_t = false)]
    no_backup: bool,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Write the JSON run report to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
struct ListStepsArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    report: &'a RunReport,

    #[serde(skip_serializing_if = "Option::is_none")]
    patch: Option<&'a str>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match real_main(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn real_main(cli: Cli) -> anyhow::Result<u8> {
    match cli.cmd {
        Command::ListSteps(args) => cmd_list_steps(args),
        Command::Plan(args) => block_on_cancellable(|cancel| cmd_plan(args, cancel)),
        Command::Run(args) => block_on_cancellable(|cancel| cmd_run(args, cancel)),
    }
}

/// Run `f` on a multi-thread runtime with Ctrl-C wired to its cancel token.
fn block_on_cancellable<F, Fut>(f: F) -> anyhow::Result<u8>
where
    F: FnOnce(CancelToken) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<u8>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;

    runtime.block_on(async {
        let cancel = CancelToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; stopping after the current step");
                on_signal.cancel();
            }
        });
        f(cancel).await
    })
}

fn settings_for(args: &ProjectArgs) -> anyhow::Result<RunSettings> {
    let loaded = config::load_or_default(&args.project, args.config.as_deref())
        .context("load uplift.toml config")?;
    let overrides = CliOverrides {
        map: args.map.clone(),
        skip: args.skip.clone(),
        unsupported: args.unsupported.clone(),
        ignore_unsupported: args.ignore_unsupported,
        no_backup: args.no_backup,
    };
    let settings = ConfigMerger::new(loaded).merge(&args.project, &overrides);
    debug!(
        "merged config: map={}, skip={:?}, unsupported={:?}, ignore_unsupported={}, backups={}",
        settings.map_path,
        settings.skip,
        settings.unsupported,
        settings.ignore_unsupported,
        settings.backups
    );
    Ok(settings)
}

fn store_for(settings: &RunSettings) -> Arc<dyn ProjectStore> {
    Arc::new(FsProjectStore::new(settings.project.clone()))
}

fn outcome_code(outcome: &RunOutcome) -> u8 {
    match outcome {
        RunOutcome::AllComplete => EXIT_OK,
        RunOutcome::SomeFailed { .. } | RunOutcome::Blocked { .. } => EXIT_INCOMPLETE,
    }
}

async fn cmd_plan(args: PlanArgs, cancel: CancelToken) -> anyhow::Result<u8> {
    let settings = settings_for(&args.project)?;
    let inspection = match inspect_upgrade(&settings, store_for(&settings), cancel).await {
        Err(OrchestratorError::Cancelled) => return Ok(EXIT_CANCELLED),
        other => other.context("inspect upgrade")?,
    };

    match args.format {
        OutputFormat::Text => {
            print!("{}", render::render_plan(&inspection.report));
            if let Some(patch) = inspection.preview.as_deref().filter(|p| !p.is_empty()) {
                println!();
                print!("{patch}");
            }
        }
        OutputFormat::Json => {
            let out = PlanOutput {
                report: &inspection.report,
                patch: inspection.preview.as_deref(),
            };
            println!("{}", serde_json::to_string_pretty(&out).context("serialize json")?);
        }
    }
    Ok(outcome_code(&inspection.report.outcome))
}

async fn cmd_run(args: RunArgs, cancel: CancelToken) -> anyhow::Result<u8> {
    let settings = settings_for(&args.project)?;
    let report = match run_upgrade(&settings, store_for(&settings), cancel).await {
        Err(OrchestratorError::Cancelled) => {
            warn!("run cancelled; rerun to resume");
            return Ok(EXIT_CANCELLED);
        }
        other => other.context("run upgrade")?,
    };

    print!("{}", render::render_run(&report));
    if let Some(path) = &args.report {
        write_json(path, &report)?;
        info!("wrote run report to {}", path);
    }
    Ok(outcome_code(&report.outcome))
}

fn cmd_list_steps(args: ListStepsArgs) -> anyhow::Result<u8> {
    let settings = settings_for(&args.project)?;
    let metas = builtin_step_metas(&settings.project, &settings.map_path, &settings.upgrade_options());
    let order = execution_order(&metas).context("order steps")?;
    let ordered: Vec<_> = order.into_iter().map(|i| metas[i].clone()).collect();

    match args.format {
        OutputFormat::Text => print!("{}", render::render_steps(&ordered)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ordered).context("serialize json")?);
        }
    }
    Ok(EXIT_OK)
}

fn write_json<T: Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    if let Some(dir) = path.parent().filter(|d| !d.as_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir))?;
    }
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}
