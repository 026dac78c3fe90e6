// SDG Analytics - command-line entry point
// Thin wrapper: parse arguments, build the store and registry, run one operation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sdg_analytics::config::{load_config, Config};
use sdg_analytics::evaluation::{EvaluationEngine, EvaluationRecord};
use sdg_analytics::models::ModelRegistry;
use sdg_analytics::orchestrator::{Orchestrator, RunReport};
use sdg_analytics::storage::{AddressResolver, DatasetStore, Datatype};
use sdg_analytics::taxonomy::Sdg;

#[derive(Parser, Debug)]
#[command(name = "sdg-analytics")]
#[command(about = "Train, predict and evaluate SDG classifiers for course outlines")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build raw data and partitions from the annotation exports
    Prepare,

    /// List projects with data
    Projects {
        /// Only projects with this datatype (raw, train, dev, test, traindev, predictions)
        #[arg(short, long)]
        datatype: Option<Datatype>,
    },

    /// Show the stratified cross-validation folds of a project's traindev set
    Folds {
        #[arg(short, long)]
        project: String,
    },

    /// Train every model for every category on one project
    Train {
        /// Project name
        #[arg(short, long, conflicts_with = "select", required_unless_present = "select")]
        project: Option<String>,

        /// Project index as listed by `projects --datatype train`
        #[arg(short, long)]
        select: Option<usize>,
    },

    /// Predict a partition with every trained model
    Predict {
        #[arg(short, long)]
        datatype: Datatype,

        /// Model implementations to leave out (repeatable)
        #[arg(short, long)]
        ignore: Vec<String>,

        /// Keep prediction files that already exist
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Compare predictions with ground truth and write the results table
    Evaluate,

    /// Grid-search one ML model for one category and save the best configuration
    CrossValidate {
        #[arg(short, long)]
        project: String,

        #[arg(short, long)]
        model: String,

        /// Category, e.g. "SDG 7"
        #[arg(short = 'g', long)]
        category: Sdg,

        #[arg(short, long)]
        folds: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = load_config(cli.config.as_deref())?;
    let store = DatasetStore::new(AddressResolver::new(config.storage.clone()));
    let registry = ModelRegistry::with_builtin();

    match cli.command {
        Command::Prepare => prepare(&config, &store),
        Command::Projects { datatype } => list_projects(&store, datatype),
        Command::Folds { project } => show_folds(&config, &store, &project),
        Command::Train { project, select } => {
            let project = match (project, select) {
                (Some(project), _) => project,
                (None, Some(index)) => store
                    .select_project(config.training_datatype()?, index)
                    .context("Invalid project selection")?,
                (None, None) => anyhow::bail!("Either --project or --select is required"),
            };
            let report = Orchestrator::new(&config, &store, &registry).train_all(&project)?;
            print_report("Training", &report)
        }
        Command::Predict {
            datatype,
            ignore,
            no_overwrite,
        } => {
            let ignore: HashSet<String> = ignore.into_iter().collect();
            let report = Orchestrator::new(&config, &store, &registry).predict_all(
                datatype,
                &ignore,
                !no_overwrite,
            )?;
            print_report("Prediction", &report)
        }
        Command::Evaluate => {
            let results = EvaluationEngine::new(&store).evaluate_all()?;
            print_results(&results);
            Ok(())
        }
        Command::CrossValidate {
            project,
            model,
            category,
            folds,
        } => {
            let score = Orchestrator::new(&config, &store, &registry)
                .cross_validate(&project, &model, category, folds)
                .with_context(|| format!("Cross-validation of {} for {} failed", model, category))?;
            println!("Best mean accuracy for {} / {}: {:.4}", category, model, score);
            Ok(())
        }
    }
}

fn prepare(config: &Config, store: &DatasetStore) -> Result<()> {
    let projects = store.export_projects()?;
    if projects.is_empty() {
        println!(
            "No export directories under {}",
            config.storage.exports_path().display()
        );
        return Ok(());
    }

    for project in projects {
        let splits = store
            .prepare_project(&project, &config.data)
            .with_context(|| format!("Failed to prepare project {}", project))?;
        println!(
            "{}: train {}, dev {}, test {}, traindev {}",
            project,
            splits.train.len(),
            splits.dev.len(),
            splits.test.len(),
            splits.traindev.len()
        );
    }
    Ok(())
}

fn list_projects(store: &DatasetStore, datatype: Option<Datatype>) -> Result<()> {
    let projects = store.discover_projects(datatype)?;
    if projects.is_empty() {
        println!("No projects found");
    }
    for (index, project) in projects.iter().enumerate() {
        let datatypes: Vec<&str> = store
            .project_mappings(project)?
            .keys()
            .map(|d| d.as_str())
            .collect();
        println!("{:>3}  {:<30} {}", index, project, datatypes.join(", "));
    }
    Ok(())
}

fn show_folds(config: &Config, store: &DatasetStore, project: &str) -> Result<()> {
    let folds = store.k_folds(project, &config.data)?;
    for (i, (train, dev)) in folds.iter().enumerate() {
        println!("fold {}: train {}, dev {}", i, train.len(), dev.len());
    }
    Ok(())
}

fn print_report(operation: &str, report: &RunReport) -> Result<()> {
    println!("{}: {}", operation, report);
    for failure in &report.failed {
        println!("  failed {}: {}", failure.unit, failure.error);
    }
    if !report.is_success() {
        anyhow::bail!("{} finished with {} failed units", operation, report.failed.len());
    }
    Ok(())
}

fn format_metric(value: f64) -> String {
    if value.is_nan() {
        "-".to_string()
    } else {
        format!("{:.4}", value)
    }
}

fn print_results(results: &[EvaluationRecord]) {
    println!("{:-<110}", "");
    println!(
        "{:<7} {:<32} {:<20} {:<9} {:>9} {:>9} {:>9} {:>4} {:>4} {:>4} {:>4}",
        "SDG", "Model", "Project", "Datatype", "Precision", "Recall", "F1", "TP", "FP", "TN", "FN"
    );
    println!("{:-<110}", "");
    for row in results {
        println!(
            "{:<7} {:<32} {:<20} {:<9} {:>9} {:>9} {:>9} {:>4} {:>4} {:>4} {:>4}",
            row.sdg.key(),
            row.model_name,
            row.project_name,
            row.datatype.as_str(),
            format_metric(row.precision),
            format_metric(row.recall),
            format_metric(row.f1),
            row.tp,
            row.fp,
            row.tn,
            row.r#fn
        );
    }
    println!("{:-<110}", "");
}
