//! inbetween-daemon: generates in-between frames between two keyframes.
//!
//! This binary can run in two modes:
//! - CLI mode: one job against pre-rendered frames on disk
//! - Daemon mode: JSON-RPC server for editor integration

use anyhow::{bail, Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use inbetween_daemon::api::InferenceClient;
use inbetween_daemon::cli::Cli;
use inbetween_daemon::config::InbetweenConfig;
use inbetween_daemon::generation::{JobOutcome, JobSupervisor, POLL_INTERVAL};
use inbetween_daemon::host::{FileRenderer, ProjectHost};
use inbetween_daemon::rpc::{run_server, ServerState};
use inbetween_daemon::types::JobRequest;

fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries JSON-RPC in daemon mode.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: &Cli) -> Result<()> {
    if !cli.is_daemon_mode() && !cli.is_cli_mode() {
        print_usage();
        return Ok(());
    }

    let mut config = InbetweenConfig::from_env();
    cli.apply_to(&mut config);

    let manifest = cli.manifest_path();
    let host = ProjectHost::open(FileRenderer::new(cli.frames_directory()), &manifest)
        .with_context(|| format!("failed to open project manifest {}", manifest.display()))?;
    let client = InferenceClient::new()?;

    if cli.is_daemon_mode() {
        run_daemon_mode(config, host, client)
    } else {
        run_cli_mode(config, host, client)
    }
}

/// Runs a single job and waits for it, polling like a host would.
fn run_cli_mode(
    config: InbetweenConfig,
    mut host: ProjectHost,
    client: InferenceClient,
) -> Result<()> {
    if let Some(problem) = config.validate() {
        bail!("invalid configuration: {}", problem);
    }
    let request = JobRequest::from_config(&config)?;

    info!(
        endpoint = %request.endpoint.url(),
        start_frame = request.start_frame,
        end_frame = request.end_frame,
        prompt = %request.prompt,
        output_dir = %request.output_dir.display(),
        "Starting in-betweening"
    );

    let supervisor = JobSupervisor::global();
    supervisor.start_job(request, client)?;
    let outcome = supervisor.wait_for_outcome(&mut host, POLL_INTERVAL);
    supervisor.acknowledge();
    host.drain_reports();
    host.save().context("failed to save project manifest")?;

    match outcome {
        Some(JobOutcome::Completed {
            report,
            output_dir,
            width,
            height,
            ..
        }) => {
            info!(
                frames = report.inserted.len(),
                width,
                height,
                output_dir = %output_dir.display(),
                "In-betweening complete"
            );
            Ok(())
        }
        Some(JobOutcome::Failed { error, .. }) => Err(error.into()),
        Some(JobOutcome::Cancelled { .. }) => bail!("in-betweening was cancelled"),
        None => bail!("job ended without reporting an outcome"),
    }
}

/// Runs the daemon mode (JSON-RPC server).
fn run_daemon_mode(
    config: InbetweenConfig,
    host: ProjectHost,
    client: InferenceClient,
) -> Result<()> {
    info!(
        endpoint = config.endpoint().label(),
        frames_dir = %host.renderer().frames_dir().display(),
        "inbetween-daemon JSON-RPC server reading stdin, writing stdout"
    );
    if let Some(problem) = config.validate() {
        tracing::warn!("{}; generate requests will be rejected until fixed", problem);
    }

    let state = ServerState::new(config, host, client, JobSupervisor::global());
    run_server(state)?;
    Ok(())
}

/// Prints usage information.
fn print_usage() {
    eprintln!("inbetween-daemon: generate in-between frames between two keyframes");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  Hosted model:");
    eprintln!("    inbetween-daemon --frames-dir renders --start 1 --end 10 \\");
    eprintln!("        --prompt \"a ball bounces\" --api-key $KEY");
    eprintln!();
    eprintln!("  Local server:");
    eprintln!("    inbetween-daemon --frames-dir renders --local-address http://127.0.0.1:8188");
    eprintln!();
    eprintln!("  Daemon mode (JSON-RPC server):");
    eprintln!("    inbetween-daemon --daemon --frames-dir renders");
    eprintln!();
    eprintln!("Run 'inbetween-daemon --help' for full options.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_usage_doesnt_panic() {
        print_usage();
    }
}
