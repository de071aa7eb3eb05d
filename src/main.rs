mod config;
mod dispatch;
mod health;
mod operator;
mod status;
mod transport;

use config::LinkConfig;
use dispatch::CommandDispatcher;
use health::{HttpStreamOwner, LinkSupervisor, StreamOwner};
use operator::{OperatorInput, HELP};
use rover_shared::{encode, SpeedSetting, TargetOverride};
use status::StatusLog;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use transport::{build_client, HttpTransport};

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = LinkConfig::from_env()?;

    info!("Rover link starting: {}", config.base_url);
    if let Some(ip) = config.target.ip() {
        info!("  Forwarding to {}:{}", ip, config.target.port().unwrap_or("default"));
    }

    let status = StatusLog::new();
    let client = build_client()?;

    let transport = Arc::new(HttpTransport::new(client.clone(), &config.base_url));
    let dispatcher = CommandDispatcher::new(transport, status.clone(), config.dispatch);
    dispatcher.set_target(config.target.clone());

    let stream = Arc::new(HttpStreamOwner::new(client, &config.base_url, status.clone()));
    let supervisor = Arc::new(LinkSupervisor::new(
        dispatcher.clone(),
        stream.clone(),
        status.clone(),
        config.supervisor,
    ));

    dispatcher.test_connection().await;
    stream.start().await;
    let supervisor_handle = supervisor.start()?;
    status.success("System initialized");
    info!("{}", HELP);

    let mut speed = config.initial_speed;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Main operator loop
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(line) = line else {
            break;
        };

        match OperatorInput::parse(&line) {
            OperatorInput::Command(raw) => {
                let command = encode(&raw, speed);
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher.dispatch(command).await;
                });
            }
            OperatorInput::SpeedUp => {
                speed.increase();
                report_speed(&status, speed);
            }
            OperatorInput::SpeedDown => {
                speed.decrease();
                report_speed(&status, speed);
            }
            OperatorInput::SetSpeed(value) => {
                speed = SpeedSetting::new(value);
                report_speed(&status, speed);
            }
            OperatorInput::Test => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher.test_connection().await;
                });
            }
            OperatorInput::RestartStream => {
                let stream = stream.clone();
                tokio::spawn(async move {
                    stream.restart().await;
                });
            }
            OperatorInput::Target { ip, port } => {
                let target = TargetOverride::new(ip.as_deref(), port.as_deref());
                status.info(format!(
                    "Target: {}:{}",
                    target.ip().unwrap_or("default"),
                    target.port().unwrap_or("default")
                ));
                dispatcher.set_target(target);
            }
            OperatorInput::ShowStatus => {
                for entry in status.snapshot().iter().rev() {
                    println!("[{}] {}", entry.severity, entry.render_line());
                }
                println!(
                    "speed={} in_flight={}",
                    speed.get(),
                    dispatcher.current_in_flight_count()
                );
            }
            OperatorInput::Help => println!("{}", HELP),
            OperatorInput::Quit => break,
            OperatorInput::Empty => {}
            OperatorInput::Invalid(reason) => warn!("{}", reason),
        }
    }

    info!("Shutting down");
    supervisor_handle.stop();
    dispatcher.shutdown();
    stream.stop().await;

    Ok(())
}

fn report_speed(status: &StatusLog, speed: SpeedSetting) {
    status.info(format!("Speed set to {}", speed.get()));
}
