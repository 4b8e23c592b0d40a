use anyhow::{Context, Result};
use appforge::cli::commands::{
    BuildCommand, CleanCommand, DevicesCommand, HistoryCommand, RunCommand, StepsCommand,
    WorkflowCommand,
};
use appforge::cli::output::*;
use appforge::cli::{Cli, Command};
use appforge::core::events::RunPhase;
use appforge::core::{Event, EventBus, ExecutionContext, WorkflowSpec};
use appforge::services::{BuildRequest, BuildService, RunSessionService};
use appforge::steps::StepRegistry;
use appforge::store::history::BuildHistoryStore;
use appforge::store::{AppStore, ProjectStore};
use appforge::toolchain::FlutterCli;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

/// Everything a command handler needs, wired once.
struct Services {
    events: EventBus,
    registry: Arc<StepRegistry>,
    projects: Arc<ProjectStore>,
    apps: Arc<AppStore>,
    history: Arc<BuildHistoryStore>,
    builds: BuildService<FlutterCli>,
    runs: RunSessionService<FlutterCli>,
}

impl Services {
    fn init(cli: &Cli) -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("appforge");
        let projects_dir = cli
            .projects_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("projects"));
        let output_dir = cli
            .output_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("outputs"));

        let toolchain = Arc::new(match &cli.flutter_bin {
            Some(binary) => FlutterCli::with_binary(binary.clone()),
            None => FlutterCli::new(),
        });
        let events = EventBus::default();
        let registry = Arc::new(StepRegistry::builtin());
        let projects = Arc::new(ProjectStore::new(projects_dir.clone()));
        let apps = Arc::new(AppStore::new(projects_dir.clone()));
        let history = Arc::new(BuildHistoryStore::new(projects_dir, output_dir.clone()));

        let builds = BuildService::new(
            toolchain.clone(),
            projects.clone(),
            apps.clone(),
            history.clone(),
            registry.clone(),
            events.clone(),
            output_dir,
        );
        let runs = RunSessionService::new(
            toolchain,
            projects.clone(),
            apps.clone(),
            registry.clone(),
            events.clone(),
        );

        Services {
            events,
            registry,
            projects,
            apps,
            history,
            builds,
            runs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; event-driven console output carries the
    // pipeline logs, so tracing stays quiet unless asked
    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let services = Services::init(&cli);

    match &cli.command {
        Command::Build(cmd) => build_app(cmd, &services).await?,
        Command::Run(cmd) => run_session(cmd, &services).await?,
        Command::Devices(cmd) => list_devices(cmd, &services).await?,
        Command::Steps(cmd) => list_steps(cmd, &services)?,
        Command::History(cmd) => show_history(cmd, &services)?,
        Command::Workflow(cmd) => run_workflow(cmd, &services).await?,
        Command::Clean(cmd) => clean_project(cmd, &services).await?,
    }

    Ok(())
}

async fn build_app(cmd: &BuildCommand, services: &Services) -> Result<()> {
    println!(
        "{} Building {} for {} ({}, {})",
        ROCKET,
        style(&cmd.app_id).bold(),
        style(cmd.platform).cyan(),
        cmd.build_type,
        cmd.output_type
    );

    // Mirror build logs to the console as they stream in
    let mut rx = services.events.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let Event::BuildLog { entry, .. } = event {
                println!("{}", format_log_entry(&entry));
            }
        }
    });

    let request = BuildRequest {
        app_id: cmd.app_id.clone(),
        platform: cmd.platform,
        build_type: cmd.build_type,
        output_type: cmd.output_type,
    };

    let build = services.builds.build(request);
    tokio::pin!(build);
    let result = loop {
        tokio::select! {
            result = &mut build => break result,
            _ = tokio::signal::ctrl_c() => {
                println!("\n{} Stopping build...", WARN);
                services.builds.stop().await;
            }
        }
    };
    printer.abort();

    match result {
        Ok(outcome) => {
            println!(
                "\n{} Build complete: {}",
                CHECK,
                style(outcome.output_path.display()).bold()
            );
            Ok(())
        }
        Err(e) => {
            println!("\n{} Build {}: {}", CROSS, style("failed").red(), e);
            std::process::exit(1);
        }
    }
}

async fn run_session(cmd: &RunCommand, services: &Services) -> Result<()> {
    let mut rx = services.events.subscribe();

    services
        .runs
        .start(&cmd.device, &cmd.project, cmd.app.as_deref(), cmd.mode)
        .await?;

    println!(
        "{} Run session started on {} ({} mode) - press Ctrl-C to stop",
        ROCKET,
        style(&cmd.device).bold(),
        cmd.mode
    );

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(Event::RunLog { entry }) => println!("{}", format_log_entry(&entry)),
                Ok(Event::RunStatus { status: RunPhase::Stopped, .. }) => {
                    println!("{} Run session ended", INFO);
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n{} Stopping run session...", WARN);
                services.runs.stop().await?;
                println!("{} Run session stopped", CHECK);
                break;
            }
        }
    }
    Ok(())
}

async fn list_devices(cmd: &DevicesCommand, services: &Services) -> Result<()> {
    let devices = services.runs.devices(cmd.project.as_deref()).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("{} No devices found", INFO);
        return Ok(());
    }
    println!("{} Attached devices:", INFO);
    for device in &devices {
        println!("  {}", format_device(device));
    }
    Ok(())
}

fn list_steps(cmd: &StepsCommand, services: &Services) -> Result<()> {
    let descriptors = services.registry.descriptors();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    println!("{} Available step types:", INFO);
    for descriptor in &descriptors {
        println!(
            "  {} ({}) - {}",
            style(descriptor.step_type).bold(),
            style(descriptor.category).cyan(),
            descriptor.description
        );
    }
    Ok(())
}

fn show_history(cmd: &HistoryCommand, services: &Services) -> Result<()> {
    let project_id = match &cmd.project {
        Some(project) => project.clone(),
        None => services.apps.get(&cmd.app_id)?.project_id,
    };

    let records = services.history.list(&project_id, &cmd.app_id, cmd.limit)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{} No builds recorded", INFO);
        return Ok(());
    }
    println!("{} Build history (latest {}):", INFO, cmd.limit);
    for record in &records {
        println!("  {}", format_build_record(record));
    }
    Ok(())
}

async fn run_workflow(cmd: &WorkflowCommand, services: &Services) -> Result<()> {
    let workflow =
        WorkflowSpec::from_file(&cmd.file).context("Failed to load workflow definition")?;
    let project = services.projects.get(&cmd.project)?;
    let app = services.apps.get(&cmd.app)?;

    let mut context =
        ExecutionContext::new(&cmd.project, project.path.clone(), app, Uuid::new_v4());
    context.apps_dir = Some(services.projects.apps_dir(&cmd.project));

    println!("{} Running workflow: {}", ROCKET, style(&workflow.name).bold());

    let mut rx = services.events.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                Event::WorkflowLog { entry, .. } => println!("{}", format_log_entry(&entry)),
                Event::WorkflowStepStatus { step_id, status, .. } => {
                    println!("  {} {}", style(&step_id).bold(), format_step_status(status));
                }
                _ => {}
            }
        }
    });

    let executor = appforge::WorkflowExecutor::new(services.registry.clone(), services.events.clone());
    let outcome = executor
        .execute(&workflow, &context, !cmd.continue_on_error)
        .await;
    printer.abort();

    println!(
        "\n{} Workflow {} in {}s",
        if outcome.succeeded() { CHECK } else { CROSS },
        format_workflow_status(outcome.status),
        outcome.duration_secs
    );
    if !outcome.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

async fn clean_project(cmd: &CleanCommand, services: &Services) -> Result<()> {
    println!("{} Cleaning project {}...", INFO, style(&cmd.project).bold());
    services.runs.clean(&cmd.project).await?;
    println!("{} Clean completed", CHECK);
    Ok(())
}
