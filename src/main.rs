use anyhow::Result;
use clap::Parser;

use audit_handoff::cli::commands::{
    init::InitCommand, monitor::MonitorCommand, reset::ResetCommand, show_usage,
    status::StatusCommand, submit::SubmitCommand, Command,
};
use audit_handoff::cli::{Cli, Commands};
use audit_handoff::config::HandoffConfig;
use audit_handoff::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    HandoffConfig::load_env_file()?;
    let mut config = HandoffConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    if let Err(e) = init_telemetry(&config.observability) {
        eprintln!("Warning: Failed to initialize telemetry: {e}");
    }

    match cli.command {
        // Default behavior: no subcommand - explain how to use the monitor
        None => tokio::runtime::Runtime::new()?.block_on(async { show_usage().await }),
        Some(Commands::Monitor { .. }) => tokio::runtime::Runtime::new()?
            .block_on(async { MonitorCommand::new(config).execute().await }),
        Some(Commands::Submit {
            pr,
            request_id,
            requested_by,
        }) => tokio::runtime::Runtime::new()?.block_on(async {
            SubmitCommand::new(pr, request_id, requested_by, config)
                .execute()
                .await
        }),
        Some(Commands::Status) => tokio::runtime::Runtime::new()?
            .block_on(async { StatusCommand::new(config).execute().await }),
        Some(Commands::Reset) => tokio::runtime::Runtime::new()?
            .block_on(async { ResetCommand::new(config).execute().await }),
        Some(Commands::Init { force }) => tokio::runtime::Runtime::new()?.block_on(async {
            InitCommand::with_standard_fs(force, config, cli.config)
                .execute()
                .await
        }),
    }
}
