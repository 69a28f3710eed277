//! storage-cohort
//!
//! Command line companion for the StorageCohort custom resource: prints the
//! CRD, checks cohort manifests and lists cohorts from a cluster together
//! with their interpreted health.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storage_cohort::crd::crd_yaml;
use storage_cohort::validation::{DEVICE_PROVISIONER, LVM_PROVISIONER};
use storage_cohort::{
    get_cohort, health, list_cohorts, load_cohorts, CohortScope, ConditionStatus, Error, Result,
    StorageCohort, Validator,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// StorageCohort CRD tooling
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Provisioners recognised by the cluster
    #[arg(
        long = "known-provisioner",
        env = "KNOWN_PROVISIONERS",
        value_delimiter = ',',
        default_values = [LVM_PROVISIONER, DEVICE_PROVISIONER],
        global = true
    )]
    known_provisioners: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the StorageCohort CustomResourceDefinition as YAML
    Crd,

    /// Validate StorageCohort manifests and report their health
    Check {
        /// Manifest files, YAML or JSON, possibly with several documents
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List StorageCohorts from the cluster
    Get {
        /// Namespace to list from
        #[arg(short, long, env = "NAMESPACE", default_value = "default")]
        namespace: String,

        /// List across all namespaces
        #[arg(short = 'A', long)]
        all_namespaces: bool,
    },

    /// Show one StorageCohort from the cluster with its health and findings
    Describe {
        /// Cohort name
        name: String,

        /// Namespace of the cohort
        #[arg(short, long, env = "NAMESPACE", default_value = "default")]
        namespace: String,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("storage-cohort {}", storage_cohort::VERSION);

    if args.known_provisioners.iter().all(|p| p.trim().is_empty()) {
        return Err(Error::Configuration(
            "at least one known provisioner is required".to_string(),
        ));
    }
    let validator = Validator::new(args.known_provisioners.iter().map(|p| p.trim().to_string()));

    match args.command {
        Command::Crd => {
            print!("{}", crd_yaml()?);
        }
        Command::Check { files } => {
            if !check(&files, &validator, &mut std::io::stdout().lock())? {
                std::process::exit(1);
            }
        }
        Command::Get {
            namespace,
            all_namespaces,
        } => {
            let scope = if all_namespaces {
                CohortScope::All
            } else {
                CohortScope::Namespace(namespace)
            };
            get(&scope, &validator).await.inspect_err(retry_hint)?;
        }
        Command::Describe { name, namespace } => {
            describe(&namespace, &name, &validator)
                .await
                .inspect_err(retry_hint)?;
        }
    }

    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

/// Returns false when any file cannot be loaded or any cohort has
/// error-level findings. A bad file does not stop the remaining files
/// from being checked.
fn check(files: &[PathBuf], validator: &Validator, out: &mut impl Write) -> Result<bool> {
    let mut valid = true;

    for path in files {
        let cohorts = match load_cohorts(path) {
            Ok(cohorts) => cohorts,
            Err(e) => {
                error!("{}: {}", path.display(), e);
                writeln!(out, "{}: {}", path.display(), e)?;
                valid = false;
                continue;
            }
        };
        if cohorts.is_empty() {
            warn!("No StorageCohort documents in {}", path.display());
        }

        for cohort in &cohorts {
            let report = validator.validate(cohort);
            writeln!(
                out,
                "{}: {} health={} nodes={}",
                path.display(),
                cohort.name(),
                cohort.health(),
                cohort.node_names().len()
            )?;
            for issue in &report.issues {
                writeln!(out, "  {}", issue)?;
            }
            if let Err(e) = report.into_result() {
                error!("{}", e);
                valid = false;
            }
        }
    }

    Ok(valid)
}

async fn get(scope: &CohortScope, validator: &Validator) -> Result<()> {
    let client = kube::Client::try_default().await?;
    let cohorts = list_cohorts(client, scope).await?;

    println!(
        "{:<20} {:<24} {:<40} {:<16} {:>5}",
        "NAMESPACE", "NAME", "PROVISIONER", "HEALTH", "NODES"
    );
    for cohort in &cohorts.items {
        println!("{}", summary_row(cohort));
        let report = validator.validate(cohort);
        for issue in report.warnings() {
            warn!("{}: {}", cohort.name(), issue);
        }
        for issue in report.errors() {
            error!("{}: {}", cohort.name(), issue);
        }
    }

    Ok(())
}

async fn describe(namespace: &str, name: &str, validator: &Validator) -> Result<()> {
    let client = kube::Client::try_default().await?;
    let cohort = get_cohort(client, namespace, name).await?;

    print!("{}", serde_yaml::to_string(&cohort)?);
    println!("---");
    println!("health: {}", cohort.health());
    for node in cohort.node_names() {
        println!("node {}: {}", node, health::node_status(&cohort, node));
    }
    for issue in &validator.validate(&cohort).issues {
        println!("{}", issue);
    }

    Ok(())
}

fn retry_hint(e: &Error) {
    if e.is_transient() {
        warn!("Request to the API server failed, the command can be retried");
    }
}

fn summary_row(cohort: &StorageCohort) -> String {
    let provisioner = cohort.default_provisioner().unwrap_or("<none>");
    let nodes = cohort.node_names();
    let unhealthy = nodes
        .iter()
        .filter(|n| health::node_status(cohort, n) == ConditionStatus::False)
        .count();
    let node_column = if unhealthy > 0 {
        format!("{}({}!)", nodes.len(), unhealthy)
    } else {
        nodes.len().to_string()
    };

    format!(
        "{:<20} {:<24} {:<40} {:<16} {:>5}",
        cohort.metadata.namespace.as_deref().unwrap_or("-"),
        cohort.name(),
        provisioner,
        cohort.health().to_string(),
        node_column
    )
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error") => level.to_string(),
        _ => "info".to_string(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,kube=info,tower=warn", level)));

    // stdout carries command output, logs go to stderr
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
