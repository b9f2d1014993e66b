mod registry;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use registry::{init_run_logging, start_run, write_report, RunContext};
use seedsmith_core::{parse_record, tokenize, RecordError};
use seedsmith_pipeline::{PipelineEngine, PipelineError, PipelineSettings, Step};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("{0}")]
    Pipeline(#[from] PipelineError),
    #[error("record error: {0}")]
    Record(#[from] RecordError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "seedsmith", version, about = "Build an SQL seed script from flat data files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every pipeline step and assemble the seed script.
    Run(PipelineArgs),
    /// Run a single pipeline step.
    Step(StepArgs),
    /// Print the top-level fields of one record interior.
    Split(SplitArgs),
    /// Write the default settings file.
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Settings file (TOML); defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding the original data files.
    #[arg(long)]
    input_dir: Option<PathBuf>,
    /// Directory for intermediate files.
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// Path of the assembled seed script.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Schema file placed at the top of the seed script.
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Seed for the generated relationships.
    #[arg(long)]
    seed: Option<String>,
    /// Keep the work directory after assembling.
    #[arg(long, default_value_t = false)]
    keep_intermediates: bool,
    /// Output directory for run artifacts.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
}

#[derive(Args, Debug)]
struct StepArgs {
    /// Step name, e.g. `brands` or `product-retailers`.
    #[arg(value_name = "STEP")]
    step: Step,
    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct SplitArgs {
    /// Record interior, without the enclosing parentheses.
    record: String,
    /// Require exactly this many fields.
    #[arg(long)]
    fields: Option<usize>,
}

#[derive(Args, Debug)]
struct InitConfigArgs {
    #[arg(default_value = "seedsmith.toml")]
    path: PathBuf,
    /// Overwrite an existing file.
    #[arg(long, default_value_t = false)]
    force: bool,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_pipeline(args, None),
        Command::Step(args) => run_pipeline(args.pipeline, Some(args.step)),
        Command::Split(args) => run_split(args),
        Command::InitConfig(args) => run_init_config(args),
    }
}

fn run_pipeline(args: PipelineArgs, step: Option<Step>) -> Result<(), CliError> {
    let run_dir = args.run_dir.clone();
    let settings = resolve_settings(args)?;

    let run_id = Uuid::new_v4().to_string();
    let command = match step {
        Some(step) => format!("step {step}"),
        None => "run".to_string(),
    };
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command,
        run_dir,
        settings: settings.clone(),
    };
    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        command = %run_ctx.command,
        run_path = %run_paths.root.display()
    );
    let timer = Instant::now();

    let engine = PipelineEngine::new(settings)?.with_run_id(run_id.as_str());
    let outcome = match step {
        Some(step) => engine.run_step(step),
        None => engine.run(),
    };

    match outcome {
        Ok(result) => {
            write_report(&run_paths, &result.report)?;
            tracing::info!(
                event = "run_finished",
                status = "success",
                warnings = result.report.warnings.len(),
                duration_ms = timer.elapsed().as_millis() as u64
            );
            if let Some(path) = result.output_path {
                println!("{}", path.display());
            }
            Ok(())
        }
        Err(PipelineError::Failed {
            step,
            source,
            report,
        }) => {
            write_report(&run_paths, &report)?;
            tracing::error!(
                event = "run_finished",
                status = "failed",
                step = %step,
                error = %source,
                duration_ms = timer.elapsed().as_millis() as u64
            );
            Err(PipelineError::Failed {
                step,
                source,
                report,
            }
            .into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Settings file values, overridden by any flag given on the command line.
fn resolve_settings(args: PipelineArgs) -> Result<PipelineSettings, CliError> {
    let mut settings = PipelineSettings::load_or_default(args.config.as_deref())?;
    if let Some(input_dir) = args.input_dir {
        settings.input_dir = input_dir;
    }
    if let Some(work_dir) = args.work_dir {
        settings.work_dir = work_dir;
    }
    if let Some(output) = args.output {
        settings.output_path = output;
    }
    if let Some(schema) = args.schema {
        settings.schema_path = schema;
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if args.keep_intermediates {
        settings.keep_intermediates = true;
    }
    Ok(settings)
}

fn run_split(args: SplitArgs) -> Result<(), CliError> {
    let fields = match args.fields {
        Some(expected) => parse_record(&args.record, expected)?,
        None => tokenize(&args.record)?,
    };
    for (index, field) in fields.iter().enumerate() {
        println!("{}\t{field}", index + 1);
    }
    Ok(())
}

fn run_init_config(args: InitConfigArgs) -> Result<(), CliError> {
    if args.path.exists() && !args.force {
        return Err(CliError::InvalidConfig(format!(
            "{} already exists (use --force to overwrite)",
            args.path.display()
        )));
    }
    PipelineSettings::default().save(&args.path)?;
    println!("{}", args.path.display());
    Ok(())
}
