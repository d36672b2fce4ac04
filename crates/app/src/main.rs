//! gesture-link: turn hand poses into actuator commands.
//!
//! `gesture-link run` drives the pipeline from a simulated hand into the
//! configured actuator endpoint; `gesture-link actuator` serves a loopback
//! actuator to point it at when no hardware is around.

mod config;
mod simulated_hand;

use anyhow::Context;
use clap::Parser;
use config::{ActuatorArgs, Cli, Command, Config, RunArgs};
use gesture_link_core::actuator::{AckMode, LoopbackActuator};
use gesture_link_core::{GateStatus, Pipeline, WsTransport};
use simulated_hand::SimulatedHand;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Actuator(args) => actuator(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = Config::try_from(args).context("invalid configuration")?;

    if config.print_config {
        config.print();
    }
    info!(seed = config.hand.seed, "simulated hand ready");

    let mut hand = SimulatedHand::new(config.hand.clone());
    let exhausted = hand.on_exhausted();

    let mut pipeline = Pipeline::new(
        hand,
        WsTransport::new(config.transport),
        config.endpoint.clone(),
        config.debounce,
    );
    let renderer = tokio::spawn(render_status(pipeline.subscribe_status()));

    let shutdown = async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("interrupted, shutting down"),
                Err(e) => warn!("cannot listen for Ctrl-C, shutting down: {e}"),
            },
            _ = exhausted => info!("frame limit reached"),
        }
    };

    let metrics = pipeline.run_until(shutdown).await;
    renderer.abort();

    if config.print_metrics {
        metrics.print_summary();
    }

    Ok(())
}

/// Follow the gate status the way the camera overlay shows it.
async fn render_status(mut status: watch::Receiver<GateStatus>) {
    let mut line = StatusLine::default();
    while status.changed().await.is_ok() {
        let current = *status.borrow_and_update();
        if let Some(text) = line.update(&current) {
            info!(status = %text, "gate status");
        }
    }
}

/// Last rendered status text; suppresses repeats.
#[derive(Debug, Default)]
struct StatusLine {
    shown: String,
}

impl StatusLine {
    /// The new text, if it differs from what is on screen.
    fn update(&mut self, status: &GateStatus) -> Option<&str> {
        let text = status.to_string();
        if text == self.shown {
            return None;
        }
        self.shown = text;
        Some(&self.shown)
    }
}

async fn actuator(args: ActuatorArgs) -> anyhow::Result<()> {
    let mode = AckMode::from(args.ack_mode);
    let (actuator, mut received) = LoopbackActuator::bind(&args.bind, mode)
        .await
        .with_context(|| format!("cannot bind {}", args.bind))?;
    info!(endpoint = %actuator.endpoint()?, "point `gesture-link run --endpoint` here");

    let server = tokio::spawn(actuator.serve());
    let mut commands = 0u64;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("cannot listen for Ctrl-C: {e}");
                }
                break;
            }
            Some(command) = received.recv() => {
                commands += 1;
                debug!(%command, total = commands, "command received");
            }
        }
    }

    server.abort();
    info!(commands, "loopback actuator stopped");
    Ok(())
}
