use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use statereel::{
    BatchOutcome, CancelToken, PhysioState, Pipeline, PipelineConfig, ProfileRegistry, ReelError,
    pipeline::load_batch_file,
};

#[derive(Parser, Debug)]
#[command(name = "statereel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Produce one video for a topic and state (requires `ffmpeg` on PATH).
    Run(RunArgs),
    /// Produce one video per `{topic, state}` entry of a JSON batch file.
    Batch(BatchArgs),
    /// Print the built-in state profile table as JSON.
    Profiles,
    /// Print the scene plan for a topic and state without fetching or encoding anything.
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
struct Common {
    /// Pipeline config JSON. Environment API keys are applied on top.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output width (even).
    #[arg(long)]
    width: Option<u32>,

    /// Output height (even).
    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Skip text-to-speech; narration is silent with estimated timing.
    #[arg(long)]
    no_tts: bool,

    /// Name outputs with an `_enhanced` suffix.
    #[arg(long)]
    enhanced: bool,

    /// Leave out the title and outro cards.
    #[arg(long)]
    no_cards: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long)]
    topic: String,

    /// One of calm, focus, energized, pre_sleep, stressed, neutral.
    #[arg(long)]
    state: String,

    /// Use this script JSON instead of generating one.
    #[arg(long)]
    script: Option<PathBuf>,

    #[command(flatten)]
    common: Common,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// JSON array of `{"topic": .., "state": ..}`.
    #[arg(long)]
    file: PathBuf,

    #[command(flatten)]
    common: Common,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[arg(long)]
    topic: String,

    #[arg(long)]
    state: String,

    #[arg(long)]
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => runtime()?.block_on(cmd_run(args)),
        Command::Batch(args) => runtime()?.block_on(cmd_batch(args)),
        Command::Profiles => cmd_profiles(),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")
}

fn load_config(common: &Common) -> anyhow::Result<PipelineConfig> {
    let mut cfg = PipelineConfig::load(common.config.as_deref())?;
    if let Some(w) = common.width {
        cfg.width = w;
    }
    if let Some(h) = common.height {
        cfg.height = h;
    }
    if let Some(dir) = &common.output_dir {
        cfg.output_dir = dir.clone();
    }
    if common.no_tts {
        cfg.narration.enabled = false;
    }
    cfg.enhanced |= common.enhanced;
    if common.no_cards {
        cfg.title_cards = false;
    }
    Ok(cfg)
}

fn build_pipeline(common: &Common, script: Option<PathBuf>) -> anyhow::Result<Pipeline> {
    let cfg = load_config(common)?;
    let mut pipeline = Pipeline::from_config(cfg)?;
    if let Some(path) = script {
        pipeline = pipeline.with_script_file(path);
    }
    Ok(pipeline)
}

/// First Ctrl-C cancels the run, a second one exits immediately.
fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling");
            token.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    cancel
}

async fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let state: PhysioState = args.state.parse()?;
    let pipeline = build_pipeline(&args.common, args.script)?;
    let cancel = cancel_on_ctrl_c();
    let report = match pipeline.run(&args.topic, state, &cancel).await {
        Ok(r) => r,
        Err(e) => {
            if let ReelError::Encoding {
                manifest_path: Some(p),
                ..
            } = &e
            {
                eprintln!("manifest {}", p.display());
            }
            return Err(e.into());
        }
    };
    eprintln!("wrote {}", report.output_path.display());
    eprintln!("manifest {}", report.manifest_path.display());
    Ok(())
}

async fn cmd_batch(args: BatchArgs) -> anyhow::Result<()> {
    let jobs = load_batch_file(&args.file)?;
    let pipeline = build_pipeline(&args.common, None)?;
    let cancel = cancel_on_ctrl_c();
    let outcomes = pipeline.run_batch(&jobs, &cancel).await;

    let mut failed = 0usize;
    for outcome in &outcomes {
        match outcome {
            BatchOutcome::Ok(r) => eprintln!("ok      {}", r.output_path.display()),
            BatchOutcome::Failed {
                topic,
                state,
                stage,
                error,
            } => {
                failed += 1;
                eprintln!("failed  {topic} ({state}) at {stage}: {error}");
            }
        }
    }
    let skipped = jobs.len() - outcomes.len();
    eprintln!(
        "{} ok, {failed} failed, {skipped} skipped",
        outcomes.len() - failed
    );
    if failed > 0 || skipped > 0 {
        anyhow::bail!("batch finished with {failed} failed and {skipped} skipped entries");
    }
    Ok(())
}

fn cmd_profiles() -> anyhow::Result<()> {
    let registry = ProfileRegistry::builtin()?;
    let profiles: Vec<_> = registry.iter().collect();
    println!("{}", serde_json::to_string_pretty(&profiles)?);
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let state: PhysioState = args.state.parse()?;
    let mut cfg = PipelineConfig::load(None)?;
    cfg.script_command = None;
    let mut pipeline = Pipeline::from_config(cfg)?;
    if let Some(path) = args.script {
        pipeline = pipeline.with_script_file(path);
    }
    let planned = pipeline.plan(&args.topic, state)?;
    println!("{}", serde_json::to_string_pretty(&planned)?);
    Ok(())
}
