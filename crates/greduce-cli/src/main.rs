//! greduce - shader-job test-case reducer.
//!
//! Shrinks a shader job while an external interestingness test keeps
//! passing, leaving a tagged artifact trail in the working directory.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use greduce_core::driver::ReductionDriver;
use greduce_core::fileops;
use greduce_core::judge::CommandJudge;
use greduce_core::plan::ChunkPlan;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// greduce - shader-job test-case reducer
#[derive(Parser, Debug)]
#[command(name = "greduce")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Shader job to reduce (JSON file with companion shader files)
    shader_job: PathBuf,

    /// Interestingness test command; the candidate shader-job path is
    /// appended as the final argument, and exit status 0 means interesting
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    test_command: Vec<String>,

    /// Working directory for reduction artifacts
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Maximum number of reduction attempts (negative means unbounded)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    step_limit: i64,

    /// Attempt-index offset when continuing an interrupted reduction; implies
    /// the input is already known to be interesting
    #[arg(long, default_value_t = 0)]
    continue_previous: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let initial = fileops::read_shader_job(&cli.shader_job)
        .with_context(|| format!("failed to load shader job {}", cli.shader_job.display()))?;

    let short_name = cli
        .shader_job
        .file_stem()
        .context("shader job path has no file name")?
        .to_string_lossy()
        .into_owned();

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("failed to create working directory {}", cli.output.display()))?;

    let (program, args) = cli
        .test_command
        .split_first()
        .context("empty interestingness test command")?;
    let mut judge = CommandJudge::new(program.clone()).args(args.iter().cloned());

    let step_limit = if cli.step_limit < 0 {
        None
    } else {
        Some(u32::try_from(cli.step_limit).context("step limit out of range")?)
    };

    let mut driver = ReductionDriver::new(ChunkPlan::new());
    let outcome = driver
        .run(
            initial,
            &short_name,
            cli.continue_previous,
            &mut judge,
            &cli.output,
            step_limit,
        )
        .context("reduction failed")?;

    match outcome {
        Some(final_name) => {
            println!("{final_name}");
            Ok(())
        },
        None => bail!("initial shader job was never interesting; nothing was reduced"),
    }
}
