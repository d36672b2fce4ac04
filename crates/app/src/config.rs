//! Configuration for the gesture-link application.
//!
//! Handles parsing command-line arguments into validated run settings.
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments, using the defaults the hand
//! firmware expects. The seed is always printed so simulated runs are
//! reproducible.

use crate::simulated_hand::SimulatedHandConfig;
use anyhow::{bail, ensure, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gesture_link_core::actuator::AckMode;
use gesture_link_core::transport::Endpoint;
use gesture_link_core::{DebounceConfig, TransportConfig};
use std::time::Duration;

/// Command line of the `gesture-link` binary.
#[derive(Parser, Debug)]
#[command(
    name = "gesture-link",
    version,
    about = "Debounced hand-gesture commands for a WebSocket actuator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the gesture pipeline against an actuator
    Run(RunArgs),
    /// Serve a loopback actuator that logs and acknowledges commands
    Actuator(ActuatorArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Actuator WebSocket endpoint
    #[arg(long, default_value = "ws://192.168.137.21:81/ws")]
    pub endpoint: String,

    /// Seconds a changed gesture must wait after the last confirmation
    #[arg(long, default_value_t = 0.5)]
    pub debounce: f64,

    /// Seconds after a confirmation during which input is ignored
    #[arg(long, default_value_t = 0.5)]
    pub cooldown: f64,

    /// Connect and handshake limit
    #[arg(long, default_value_t = 5000)]
    pub connect_timeout_ms: u64,

    /// Limit for the actuator's acknowledgement
    #[arg(long, default_value_t = 2000)]
    pub ack_timeout_ms: u64,

    /// Time between simulated camera frames
    #[arg(long, default_value_t = 15)]
    pub frame_interval_ms: u64,

    /// Seed for the simulated hand (default: time-based)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Chance per frame that one finger reads wrong
    #[arg(long, default_value_t = 0.02)]
    pub flip_rate: f64,

    /// Chance per frame that no hand is detected
    #[arg(long, default_value_t = 0.05)]
    pub dropout_rate: f64,

    /// Chance per frame that the landmark set comes back truncated
    #[arg(long, default_value_t = 0.01)]
    pub glitch_rate: f64,

    /// Stop after this many frames (default: run until Ctrl-C)
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Print resolved configuration
    #[arg(long)]
    pub print_config: bool,

    /// Don't print metrics summary
    #[arg(long)]
    pub no_metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ActuatorArgs {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8081")]
    pub bind: String,

    /// How commands are acknowledged
    #[arg(long, value_enum, default_value_t = AckModeArg::Echo)]
    pub ack_mode: AckModeArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckModeArg {
    Echo,
    Close,
    Silent,
}

impl From<AckModeArg> for AckMode {
    fn from(arg: AckModeArg) -> Self {
        match arg {
            AckModeArg::Echo => AckMode::Echo,
            AckModeArg::Close => AckMode::Close,
            AckModeArg::Silent => AckMode::Silent,
        }
    }
}

/// Complete configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Actuator ===
    /// Actuator endpoint, already validated
    pub endpoint: String,

    /// Transport timeouts
    pub transport: TransportConfig,

    // === Gate ===
    /// Debounce and cooldown timers
    pub debounce: DebounceConfig,

    // === Source ===
    /// Simulated hand settings
    pub hand: SimulatedHandConfig,

    // === Behavior ===
    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,
}

impl TryFrom<RunArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: RunArgs) -> anyhow::Result<Self> {
        Endpoint::parse(&args.endpoint)?;

        let debounce = DebounceConfig::from_secs(args.debounce, args.cooldown)?;

        ensure!(args.connect_timeout_ms > 0, "--connect-timeout-ms must be positive");
        ensure!(args.ack_timeout_ms > 0, "--ack-timeout-ms must be positive");
        ensure!(args.frame_interval_ms > 0, "--frame-interval-ms must be positive");

        for (name, rate) in [
            ("--flip-rate", args.flip_rate),
            ("--dropout-rate", args.dropout_rate),
            ("--glitch-rate", args.glitch_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                bail!("{name} must be between 0 and 1, got {rate}");
            }
        }

        if args.max_frames == Some(0) {
            bail!("--max-frames must be at least 1");
        }

        let seed = match args.seed {
            Some(seed) => seed,
            None => time_seed().context("could not derive a seed from the clock")?,
        };

        Ok(Config {
            endpoint: args.endpoint,
            transport: TransportConfig {
                connect_timeout: Duration::from_millis(args.connect_timeout_ms),
                ack_timeout: Duration::from_millis(args.ack_timeout_ms),
                ..TransportConfig::default()
            },
            debounce,
            hand: SimulatedHandConfig {
                seed,
                frame_interval: Duration::from_millis(args.frame_interval_ms),
                flip_rate: args.flip_rate,
                dropout_rate: args.dropout_rate,
                glitch_rate: args.glitch_rate,
                max_frames: args.max_frames,
            },
            print_config: args.print_config,
            print_metrics: !args.no_metrics,
        })
    }
}

impl Config {
    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Endpoint: {}", self.endpoint);
        println!("Connect timeout: {} ms", self.transport.connect_timeout.as_millis());
        println!("Ack timeout: {} ms", self.transport.ack_timeout.as_millis());
        println!();
        println!("=== Gate ===");
        println!("Debounce: {:.2} s", self.debounce.debounce_delay.as_secs_f64());
        println!("Cooldown: {:.2} s", self.debounce.cooldown.as_secs_f64());
        println!();
        println!("=== Simulated Hand ===");
        println!("Seed: {}", self.hand.seed);
        println!("Frame interval: {} ms", self.hand.frame_interval.as_millis());
        println!("Flip rate: {:.2}%", self.hand.flip_rate * 100.0);
        println!("Dropout rate: {:.2}%", self.hand.dropout_rate * 100.0);
        println!("Glitch rate: {:.2}%", self.hand.glitch_rate * 100.0);
        match self.hand.max_frames {
            Some(n) => println!("Max frames: {n}"),
            None => println!("Max frames: (until Ctrl-C)"),
        }
        println!();
    }
}

fn time_seed() -> anyhow::Result<u64> {
    use std::time::{SystemTime, UNIX_EPOCH};
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64)
}
