//! ABOUTME: tripwire entry point
//! ABOUTME: Loads configuration, starts the notifier and runs the capture loop on a blocking thread

mod cli;
mod surfaces;

use clap::Parser;
use cli::Cli;
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tw_alarm::{spawn_stdin_reader, ChannelCommands, Command, KeyBindings, SharedAlarm, Thresholds};
use tw_config::Config;
use tw_core::{telemetry, Error, Result};
use tw_monitor::{Monitor, MonitorReport};
use tw_notify::{AlarmNotifier, AlertManager, AlertSettings, BellSink, LogSink};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration - exit with non-zero if invalid
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing("development", "tripwire");
            error!(error = %e, "Failed to load configuration");
            process::exit(1);
        }
    };

    telemetry::init_tracing(&config.telemetry.env, "tripwire");
    info!("tripwire starting");
    debug!(?config, "Configuration loaded successfully");

    match run(&cli, &config).await {
        Ok(report) => info!(
            cycles = report.cycles,
            triggers = report.triggers,
            exit = ?report.exit,
            "tripwire stopped"
        ),
        Err(e) => {
            error!(error = %e, "tripwire failed");
            process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_from(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.check()?;
    Ok(config)
}

async fn run(cli: &Cli, config: &Config) -> Result<MonitorReport> {
    let bindings = KeyBindings::from_config(&config.controls)?;
    let alarm = SharedAlarm::new(Thresholds::from(&config.detection));

    let mut manager = AlertManager::new();
    manager.register_sink(Arc::new(LogSink::new()));
    if config.alarm.bell {
        manager.register_sink(Arc::new(BellSink::stdout()));
    }
    let (notifier, notifier_task) = AlarmNotifier::new(
        manager,
        AlertSettings::from(&config.alarm),
        alarm.subscribe(),
    )
    .spawn();

    let (sender, commands) = ChannelCommands::channel();
    spawn_stdin_reader(bindings, sender.clone())?;

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, shutting down");
            if let Err(e) = sender.send(Command::Exit) {
                debug!(error = %e, "Capture loop already stopped");
            }
        }
    });

    let surfaces = surfaces::open(cli, config, bindings)?;
    let mut monitor = Monitor::new(
        config,
        surfaces.source,
        surfaces.display,
        alarm,
        notifier,
    )?
    .with_commands(Box::new(commands));
    if let Some(keys) = surfaces.keys {
        monitor = monitor.with_commands(keys);
    }

    let outcome = tokio::task::spawn_blocking(move || monitor.run())
        .await
        .map_err(|e| Error::Internal(format!("Capture loop panicked: {}", e)));

    interrupt.abort();
    notifier_task.abort();

    outcome?
}
