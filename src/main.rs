// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cryobox::config::consts::DEFAULT_CONFIG_FILE;
use cryobox::config::{
    check_launch, check_paths, default_projects_path, load_raw, WorkflowConfig,
};
use cryobox::form::run_form;
use cryobox::graph::WorkflowGraph;
use cryobox::project::{
    apply_labels, find_gain_file, launch_simulation, schedule_project, wait_for_acquisition,
    ProjectStore, PromptAnswer, RetryPolicy,
};
use cryobox::traits::{CommandScheduler, LogScheduler, Scheduler};
use cryobox::workflow::build_acquisition_workflow;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cryobox")]
#[command(about = "Build and launch streaming cryo-EM acquisition workflows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project for a new acquisition session and schedule it
    Launch {
        /// Config file (INI, or TOML/YAML by extension)
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Override a config value, e.g. --set SAMPLING=1.1
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Review the main fields in a terminal form first
        #[arg(long)]
        interactive: bool,

        /// Do not wait for the first movies to show up
        #[arg(long)]
        no_wait: bool,

        /// Create the project without scheduling it
        #[arg(long)]
        no_schedule: bool,

        /// Log what would be scheduled instead of running the scheduler
        #[arg(long)]
        dry_run: bool,
    },
    /// Schedule every protocol of an existing project
    Schedule {
        project: String,

        #[arg(long, value_name = "DIR")]
        projects_path: Option<PathBuf>,

        /// Class names or labels to leave unscheduled
        #[arg(long, num_args = 1..)]
        ignore: Vec<String>,

        #[arg(long)]
        dry_run: bool,
    },
    /// Color an existing project by its stage labels
    Labels {
        project: String,

        #[arg(long, value_name = "DIR")]
        projects_path: Option<PathBuf>,
    },
    /// Load, validate and build the workflow without touching the disk
    Check {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Commands::Launch {
            config,
            set,
            interactive,
            no_wait,
            no_schedule,
            dry_run,
        } => {
            let options = LaunchOptions {
                interactive,
                wait: !no_wait,
                schedule: !no_schedule,
                dry_run,
            };
            launch(config, &set, options).await
        }
        Commands::Schedule {
            project,
            projects_path,
            ignore,
            dry_run,
        } => {
            let store = open_project(&project, projects_path)?;
            let scheduler: Box<dyn Scheduler> = if dry_run {
                Box::new(LogScheduler::new())
            } else {
                Box::new(CommandScheduler::new(&default_scheduler_cmd())?)
            };
            let report = schedule_project(&store, scheduler.as_ref(), &ignore).await?;
            println!(
                "Scheduled {} protocols of '{}' ({} ignored)",
                report.scheduled.len(),
                store.name(),
                report.skipped.len()
            );
            Ok(())
        }
        Commands::Labels {
            project,
            projects_path,
        } => {
            let store = open_project(&project, projects_path)?;
            let settings = apply_labels(&store)?;
            println!(
                "Applied {} labels to '{}'",
                settings.labels.len(),
                store.name()
            );
            Ok(())
        }
        Commands::Check { config, set } => {
            let raw = load_raw(&config, &set)?;
            let cfg = WorkflowConfig::from_raw(&raw)?;
            check_launch(&cfg)?;
            let graph = build_acquisition_workflow(&cfg, None)?;
            print_graph(&cfg, &graph)?;
            Ok(())
        }
    }
}

struct LaunchOptions {
    interactive: bool,
    wait: bool,
    schedule: bool,
    dry_run: bool,
}

/// load → form → derive → validate → simulation → wait → build → persist →
/// schedule → labels
async fn launch(config: PathBuf, set: &[String], options: LaunchOptions) -> Result<()> {
    let mut raw = load_raw(&config, set)?;
    if options.interactive {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        run_form(&mut raw, &mut stdin.lock(), &mut stdout).context("interactive form")?;
    }

    let cfg = WorkflowConfig::from_raw(&raw)?;
    check_launch(&cfg)?;
    check_paths(&cfg)?;

    let _simulation = if cfg.acquisition.simulation && !options.dry_run {
        Some(launch_simulation(&cfg)?)
    } else {
        None
    };

    if options.wait {
        let found = wait_for_acquisition(
            &cfg.acquisition.deposition_pattern,
            RetryPolicy::default(),
            ask_to_keep_waiting,
        )
        .await?;
        tracing::info!(files = found.len(), "acquisition detected");
    }

    let gain = find_gain_file(&cfg.acquisition.deposition_dir, &cfg.acquisition.gain_pattern);
    let graph = build_acquisition_workflow(&cfg, gain.as_deref())?;

    let store = ProjectStore::create(&cfg.project.projects_path, &cfg.project.name)?;
    store.persist(&graph)?;

    if options.schedule {
        let scheduler: Box<dyn Scheduler> = if options.dry_run {
            Box::new(LogScheduler::new())
        } else {
            Box::new(CommandScheduler::new(&cfg.project.scheduler_cmd)?)
        };
        let report = schedule_project(&store, scheduler.as_ref(), &[]).await?;
        println!(
            "Scheduled {} protocols in '{}'",
            report.scheduled.len(),
            store.path().display()
        );
    }
    apply_labels(&store)?;
    Ok(())
}

fn ask_to_keep_waiting(message: &str) -> PromptAnswer {
    eprintln!("{}", message);
    eprint!("Keep waiting? [Y/n] ");
    let _ = io::stderr().flush();

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) if answer.trim().eq_ignore_ascii_case("n") => PromptAnswer::Cancel,
        Ok(_) => PromptAnswer::Continue,
        Err(_) => PromptAnswer::Cancel,
    }
}

fn open_project(name: &str, projects_path: Option<PathBuf>) -> Result<ProjectStore> {
    let projects_path =
        projects_path.unwrap_or_else(|| default_projects_path(&|var: &str| std::env::var(var).ok()));
    Ok(ProjectStore::open(&projects_path, name)?)
}

/// Scheduler command for projects opened without their config.
fn default_scheduler_cmd() -> String {
    std::env::var("CRYOBOX_SCHEDULER_CMD").unwrap_or_else(|_| "scipion schedule".to_string())
}

fn print_graph(cfg: &WorkflowConfig, graph: &WorkflowGraph) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "Project: {}", cfg.project_path().display())?;
    writeln!(out, "Watching: {}", cfg.acquisition.deposition_pattern)?;
    writeln!(out)?;

    for id in graph.execution_order()? {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let after: Vec<String> = node.prerequisites.iter().map(ToString::to_string).collect();
        write!(
            out,
            "{:>3}  {:<48} {:<34} {}",
            node.id,
            node.label,
            node.class.class_name(),
            node.stage
        )?;
        if !after.is_empty() {
            write!(out, "  after {}", after.join(","))?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    for label in graph.labels.iter() {
        writeln!(out, "{:<16} {}  {} protocols", label.name, label.color, label.nodes.len())?;
    }
    writeln!(out, "{} protocols in the summary", graph.summary.len())?;
    Ok(())
}
