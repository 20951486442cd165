use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::HandoffConfig;

pub mod commands;

#[derive(Parser)]
#[command(name = "audit-handoff")]
#[command(about = "Executor/auditor approval handoff monitor")]
#[command(long_about = "Blocks the executor while an auditor reviews a pull request, watches the \
                       auditor's heartbeat and SLA budgets, and opens a manual-approval fallback \
                       when the auditor never answers. Start with 'audit-handoff init'.")]
pub struct Cli {
    /// Configuration file (defaults to handoff-monitor.toml when present)
    #[arg(long, global = true, help = "Path to the configuration file")]
    pub config: Option<PathBuf>,

    /// Override the events directory
    #[arg(long, global = true, help = "Directory holding the state, logs and handoff documents")]
    pub events_dir: Option<PathBuf>,

    /// Override the state document location
    #[arg(long, global = true, help = "Path of the executor state document")]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Flags win over file and environment configuration
    pub fn apply_overrides(&self, config: &mut HandoffConfig) {
        if let Some(events_dir) = &self.events_dir {
            config.paths.events_dir = events_dir.clone();
        }
        if let Some(state_file) = &self.state_file {
            config.paths.state_file = Some(state_file.clone());
        }
        if let Some(Commands::Monitor {
            once,
            interval_ms,
            repeat_timeout_alerts,
        }) = &self.command
        {
            if *once {
                config.monitor.mode = crate::config::RunMode::SingleShot;
            }
            if let Some(interval_ms) = interval_ms {
                config.monitor.poll_interval_ms = *interval_ms;
            }
            if *repeat_timeout_alerts {
                config.monitor.repeat_timeout_alerts = true;
            }
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the poll loop that evaluates heartbeat, handoff documents and SLA timers
    Monitor {
        /// Evaluate once and exit
        #[arg(long, help = "Single-shot mode for cron or CI invocation")]
        once: bool,
        /// Poll interval in milliseconds
        #[arg(long, help = "Milliseconds between ticks in continuous mode")]
        interval_ms: Option<u64>,
        /// Re-raise timeout alerts on every tick
        #[arg(long, help = "Repeat ACK/RESULT timeout alerts on every tick instead of once per request")]
        repeat_timeout_alerts: bool,
    },
    /// Block the executor and publish a review request for a pull request
    Submit {
        /// Pull request number awaiting review
        pr: u64,
        /// Request identifier (a uuid is generated when omitted)
        #[arg(long, help = "Identifier recorded in the request document and state")]
        request_id: Option<String>,
        /// Who asked for the review
        #[arg(long, help = "Requester recorded in the request document")]
        requested_by: Option<String>,
    },
    /// Display the executor state, SLA timers and handoff documents
    Status,
    /// Return the executor to READY, keeping the monitor run history
    Reset,
    /// Create the events directory and a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long, help = "Force initialization, overwriting existing configuration")]
        force: bool,
    },
}
