//! CloudRunner CLI Entry Point
//!
//! Provides command-line interface for workflow validation and rehearsal.
//!
//! # Usage
//!
//! ```bash
//! # Validate a workflow (no operation is invoked)
//! cloudrunner network.yaml
//!
//! # Reconcile against a service registry first
//! cloudrunner network.yaml --registry registry.json
//!
//! # Rehearse the whole run with the local echo transport
//! cloudrunner network.yaml --simulate
//!
//! # Use a settings file
//! cloudrunner network.yaml --config cloudrunner.yaml --simulate
//! ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info, warn};

use cloudrunner::config::Settings;
use cloudrunner::execution::{EchoInvoker, Engine, ExecutionStore};
use cloudrunner::reconcile::{Reconciler, Registry, ServiceRegistry};
use cloudrunner::workflow::{lint, load_workflow};
use cloudrunner::{APP_NAME, VERSION};

/// Default workflow file used when none is specified.
const DEFAULT_WORKFLOW: &str = "workflow.yaml";

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    workflow_path: String,
    registry_path: Option<String>,
    config_path: Option<String>,
    simulate: bool,
    strict: bool,
    continue_on_failure: bool,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Cloud Provisioning Workflow Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: cloudrunner [OPTIONS] <WORKFLOW_FILE>");
    println!();
    println!("Arguments:");
    println!("  <WORKFLOW_FILE>        Path to workflow JSON or YAML file");
    println!();
    println!("Options:");
    println!("  --registry FILE        Reconcile services/operations against a registry");
    println!("  --config FILE          Load settings from a YAML file");
    println!("  --simulate             Execute with the local echo transport");
    println!("  --strict               Fail tasks with unresolved placeholders");
    println!("  --continue-on-failure  Keep running after a task fails");
    println!("  --verbose              Enable debug logging");
    println!("  --help                 Show this help message");
    println!("  --version              Show version information");
    println!();
    println!("Examples:");
    println!("  cloudrunner network.yaml");
    println!("  cloudrunner network.yaml --registry registry.json --simulate");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config {
        workflow_path: DEFAULT_WORKFLOW.to_string(),
        ..Config::default()
    };
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--simulate" => config.simulate = true,
            "--strict" => config.strict = true,
            "--continue-on-failure" => config.continue_on_failure = true,
            "--verbose" | "-v" => config.verbose = true,
            "--registry" => {
                i += 1;
                if i >= args.len() {
                    return Err("--registry requires a path argument".to_string());
                }
                config.registry_path = Some(args[i].clone());
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a path argument".to_string());
                }
                config.config_path = Some(args[i].clone());
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if positional_index > 0 {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.workflow_path = arg.clone();
                positional_index += 1;
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Main application flow. Returns whether the run succeeded.
async fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    let mut settings = match &config.config_path {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.engine.strict_placeholders |= config.strict;
    settings.engine.continue_on_failure |= config.continue_on_failure;

    // Load workflow
    let mut workflow = load_workflow(&config.workflow_path).map_err(|e| {
        error!("Failed to load workflow: {}", e);
        format!(
            "Could not load workflow from '{}': {}",
            config.workflow_path, e
        )
    })?;

    info!(
        "Workflow loaded: '{}' with {} tasks",
        workflow.name,
        workflow.tasks.len()
    );

    for finding in lint(&workflow) {
        warn!("{}", finding);
    }

    // Reconcile against the registry
    let invoker = match &config.registry_path {
        Some(path) => {
            let registry = Arc::new(ServiceRegistry::load(path)?);
            let known: Vec<String> = registry.services().iter().map(|s| s.name.clone()).collect();

            let reconciler = Reconciler::new(registry, None, settings.reconcile.clone());
            let outcome = reconciler.reconcile(workflow).await;

            for correction in &outcome.auto_corrected {
                info!("Corrected: {}", correction);
            }
            if !outcome.is_clean() {
                warn!(
                    "{} registry problems remain; affected tasks will likely fail",
                    outcome.remaining_errors.len()
                );
            }
            workflow = outcome.workflow;
            EchoInvoker::with_services(known)
        }
        None => EchoInvoker::new(),
    };

    let engine = Engine::new(Arc::new(invoker), ExecutionStore::new(), settings.engine);

    let report = if config.simulate {
        info!("Mode: SIMULATE (echo transport)");
        let report = engine.execute(workflow).await;
        if let Some(log) = engine.get_log(&report.execution_id) {
            info!("{}", log.render());
        }
        report
    } else {
        info!("Mode: VALIDATE (no operation is invoked)");
        engine.dry_run(&workflow)
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_success())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
