//! CLI binary for running and validating Relay pipeline definitions.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use relay_chain::{default_registry, DispatchMode, PipelineDefinition, Severity};
use relay_types::{Request, RunOutcome};

#[derive(Parser)]
#[command(name = "relay", version, about = "Two-stage gate/handler request pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline definition against its request.
    ///
    /// Exit status: 0 handled, 2 rejected, 3 unhandled, 1 on error.
    Run {
        /// Path to the pipeline definition (.json)
        definition: PathBuf,

        /// JSON file with a request object that replaces the definition's request
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Stop dispatch after the first handler that acts
        #[arg(long)]
        first_match: bool,

        /// Print the full run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Lint a pipeline definition
    Validate {
        /// Path to the pipeline definition (.json)
        definition: PathBuf,
    },

    /// Show information about a pipeline definition
    Info {
        /// Path to the pipeline definition (.json)
        definition: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            definition,
            request,
            first_match,
            json,
        } => cmd_run(&definition, request.as_deref(), first_match, json),
        Commands::Validate { definition } => cmd_validate(&definition),
        Commands::Info { definition } => cmd_info(&definition),
    }
}

fn cmd_run(
    path: &Path,
    request_path: Option<&Path>,
    first_match: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut definition = PipelineDefinition::load(path)?;
    if first_match {
        definition.dispatch_mode = DispatchMode::FirstMatch;
    }
    let request = match request_path {
        Some(p) => {
            tracing::debug!(path = %p.display(), "Replacing definition request");
            load_request(p)?
        }
        None => definition.request.clone(),
    };

    let pipeline = definition.build_with_request(&default_registry(), request)?;
    let report = pipeline.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pipeline: {}", report.pipeline);
        println!("Outcome: {}", report.outcome);
        if let Some(gate) = &report.rejected_by {
            println!("Rejected by: {gate}");
        }
        if !report.matched.is_empty() {
            println!("Handled by: {}", report.matched.join(", "));
        }
    }

    Ok(ExitCode::from(exit_status(report.outcome)))
}

fn load_request(path: &Path) -> anyhow::Result<Request> {
    let source = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&source)?)
}

fn exit_status(outcome: RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Handled => 0,
        RunOutcome::Rejected => 2,
        RunOutcome::Unhandled => 3,
    }
}

fn cmd_validate(path: &Path) -> anyhow::Result<ExitCode> {
    let definition = PipelineDefinition::load(path)?;
    let diagnostics = relay_chain::validate(&definition, &default_registry());

    if diagnostics.is_empty() {
        println!("Pipeline is valid");
        return Ok(ExitCode::SUCCESS);
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        println!("[{}] {}: {}", severity, diag.rule, diag.message);
        if let Some(fix) = &diag.fix {
            println!("        fix: {fix}");
        }
    }

    Ok(if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_info(path: &Path) -> anyhow::Result<ExitCode> {
    let definition = PipelineDefinition::load(path)?;

    println!("Pipeline: {}", definition.name);
    let dispatch = match definition.dispatch_mode {
        DispatchMode::FanOut => "fan_out",
        DispatchMode::FirstMatch => "first_match",
    };
    println!("Dispatch: {dispatch}");
    println!("Request fields: {}", definition.request.len());

    println!("\nGates ({}):", definition.gates.len());
    for node in &definition.gates {
        println!("  {} type={}", node.effective_id(), node.node_type);
    }
    println!("\nHandlers ({}):", definition.handlers.len());
    for node in &definition.handlers {
        println!("  {} type={}", node.effective_id(), node.node_type);
    }

    Ok(ExitCode::SUCCESS)
}
