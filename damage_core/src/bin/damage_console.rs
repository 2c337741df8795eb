use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{never, select, unbounded, Receiver};
use tracing::{info, warn};

use damage_core::{
    load_damage_zone_config_from_env, DamageZoneConfig, DamageZoneService, IngestPipeline,
    TemplateWatcher, ZoneCatalog,
};
use damage_runtime::{parse_command_line, CommandParseError, ConsoleCommand, VehicleId};

#[derive(Parser, Debug)]
#[command(author, version, about = "Operator console for the vehicle damage zone model", long_about = None)]
struct Args {
    /// Path to a damage zone config JSON file (defaults to DAMAGE_ZONE_CONFIG_PATH or the built-in copy)
    #[arg(long)]
    config: Option<PathBuf>,

    /// SVG template to load instead of the configured one
    #[arg(long)]
    template: Option<PathBuf>,

    /// Reload the catalog whenever the template file changes
    #[arg(long, default_value_t = false)]
    watch: bool,

    /// Number of ingestion workers (defaults to the configured count)
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DamageZoneConfig::from_file(path)
            .with_context(|| format!("Failed to load config at {}", path.display()))?,
        None => load_damage_zone_config_from_env().0.as_ref().clone(),
    };
    let config = match args.template.clone() {
        Some(path) => config.with_template_path(Some(path)),
        None => config,
    };

    let catalog = ZoneCatalog::from_config(&config).with_context(|| "Failed to load zone catalog")?;
    info!(
        target: "damage_zones::console",
        zones = catalog.len(),
        template = ?config.template_path(),
        "catalog ready"
    );

    let service = Arc::new(DamageZoneService::from_config(Arc::new(catalog), &config));
    let workers = args.workers.unwrap_or_else(|| config.ingest().workers());
    let pipeline = IngestPipeline::spawn(Arc::clone(&service), workers);

    let watcher = match (args.watch, config.template_path()) {
        (true, Some(path)) => Some(
            TemplateWatcher::watch(path)
                .with_context(|| format!("Failed to watch template at {}", path.display()))?,
        ),
        (true, None) => {
            warn!(
                target: "damage_zones::console",
                "--watch ignored: no template path configured"
            );
            None
        }
        (false, _) => None,
    };
    let reload_rx = watcher
        .as_ref()
        .map(|watcher| watcher.receiver().clone())
        .unwrap_or_else(never);
    let command_rx = spawn_stdin_listener();

    loop {
        select! {
            recv(command_rx) -> command => match command {
                Ok(command) => handle_command(command, &service, &pipeline)?,
                Err(_) => break,
            },
            recv(reload_rx) -> path => {
                if let Ok(path) = path {
                    let path = watcher.as_ref().and_then(TemplateWatcher::try_next).unwrap_or(path);
                    reload_template(&service, &config, path);
                }
            }
        }
    }

    let stats = pipeline.shutdown();
    info!(
        target: "damage_zones::console",
        applied = stats.applied,
        dropped = stats.dropped,
        failed = stats.failed,
        "console shutting down"
    );
    Ok(())
}

fn spawn_stdin_listener() -> Receiver<ConsoleCommand> {
    let (sender, receiver) = unbounded::<ConsoleCommand>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(target: "damage_zones::console", error = %err, "command read error");
                    break;
                }
            };
            match parse_command_line(&line) {
                Ok(command) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                Err(CommandParseError::Empty) => {}
                Err(err) => warn!(
                    target: "damage_zones::console",
                    input = line.trim(),
                    error = %err,
                    "invalid command"
                ),
            }
        }
    });
    receiver
}

fn handle_command(
    command: ConsoleCommand,
    service: &DamageZoneService,
    pipeline: &IngestPipeline,
) -> Result<()> {
    match command {
        ConsoleCommand::Register { vehicle } => {
            let created = service.register(&vehicle);
            info!(target: "damage_zones::console", %vehicle, created, "command.applied=register");
        }
        ConsoleCommand::Record(event) => {
            pipeline
                .enqueue(event)
                .with_context(|| "Ingest pipeline closed")?;
        }
        ConsoleCommand::Reset { vehicle } => match service.reset(&vehicle) {
            Ok(revision) => {
                info!(target: "damage_zones::console", %vehicle, revision, "command.applied=reset")
            }
            Err(err) => warn!(target: "damage_zones::console", error = %err, "reset failed"),
        },
        ConsoleCommand::Evict { vehicle } => {
            match service.evict(&vehicle) {
                Some(last) => info!(
                    target: "damage_zones::console",
                    %vehicle,
                    revision = last.revision,
                    "command.applied=evict"
                ),
                None => warn!(target: "damage_zones::console", %vehicle, "evict: vehicle not tracked"),
            }
        }
        ConsoleCommand::Render { vehicle, path } => render(service, &vehicle, path)?,
        ConsoleCommand::Status => print_status(service),
    }
    Ok(())
}

fn render(service: &DamageZoneService, vehicle: &VehicleId, path: Option<PathBuf>) -> Result<()> {
    let overlay = match service.current_overlay(vehicle) {
        Ok(overlay) => overlay,
        Err(err) => {
            warn!(target: "damage_zones::console", error = %err, "render failed");
            return Ok(());
        }
    };
    match path {
        Some(path) => {
            fs::write(&path, overlay.document.as_bytes())
                .with_context(|| format!("Failed to write overlay to {}", path.display()))?;
            info!(
                target: "damage_zones::console",
                %vehicle,
                revision = overlay.revision,
                path = %path.display(),
                "overlay written"
            );
        }
        None => println!("{}", overlay.document),
    }
    Ok(())
}

fn print_status(service: &DamageZoneService) {
    let catalog = service.catalog();
    let options = service.options();
    println!(
        "zones: {} require_registration={} unknown_tags={:?}",
        catalog.len(),
        options.require_registration,
        options.unknown_tags
    );
    for vehicle in service.tracked_vehicles() {
        let Ok(snapshot) = service.snapshot(&vehicle) else {
            continue;
        };
        let damaged: Vec<String> = snapshot
            .severities
            .iter()
            .filter(|(_, severity)| **severity > 0.0)
            .map(|(zone, severity)| format!("{}={:.2}", zone, severity))
            .collect();
        println!(
            "{} rev={} [{}]",
            vehicle,
            snapshot.revision,
            damaged.join(" ")
        );
    }
}

fn reload_template(service: &DamageZoneService, config: &DamageZoneConfig, path: PathBuf) {
    match ZoneCatalog::from_file(&path, config.markers()) {
        Ok(catalog) => {
            let report = service.reload_catalog(Arc::new(catalog));
            info!(
                target: "damage_zones::console",
                path = %path.display(),
                added = report.added_zones.len(),
                removed = report.removed_zones.len(),
                "template reloaded"
            );
        }
        Err(err) => warn!(
            target: "damage_zones::console",
            path = %path.display(),
            error = %err,
            "template reload rejected; keeping current catalog"
        ),
    }
}
