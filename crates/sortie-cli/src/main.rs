mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::run::RunExit;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sortie",
    about = "Run groups of benchmarks as sorties with shared setup and teardown",
    version,
    propagate_version = true
)]
struct Cli {
    /// Plan file (default: nearest sortie.yaml in this or a parent directory)
    #[arg(long, short = 'f', global = true, env = "SORTIE_FILE")]
    file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter sortie.yaml
    Init,

    /// Prepare, run and clean up every sortie in the plan
    Run {
        /// Active stages, overriding the plan (comma list or 'all')
        #[arg(long = "run-stage", value_name = "STAGES")]
        run_stage: Option<String>,
    },

    /// Show the sortie manifest and the setup order
    Plan,

    /// Validate the plan for common mistakes
    Validate,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root::init_target(cli.file.as_deref())),
        Commands::Run { run_stage } => cmd::run::run(
            &root::resolve_plan(cli.file.as_deref()),
            run_stage.as_deref(),
            cli.json,
        ),
        Commands::Plan => cmd::plan::run(&root::resolve_plan(cli.file.as_deref()), cli.json),
        Commands::Validate => {
            cmd::validate::run(&root::resolve_plan(cli.file.as_deref()), cli.json)
        }
    };

    if let Err(e) = result {
        if let Some(exit) = e.downcast_ref::<RunExit>() {
            eprintln!("error: {exit}");
            std::process::exit(exit.exit_code());
        }
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
