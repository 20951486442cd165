use anyhow::Result;

pub mod init;
pub mod monitor;
pub mod reset;
pub mod status;
pub mod submit;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

pub async fn show_usage() -> Result<()> {
    println!("🛂 Audit Handoff - executor/auditor approval monitor");
    println!();
    println!("To get started:");
    println!("  ⚙️  audit-handoff init          # Create events directory and config");
    println!("  📨 audit-handoff submit <PR>   # Block the executor on a review request");
    println!("  👀 audit-handoff monitor       # Watch heartbeat, handoff documents and SLAs");
    println!("  📊 audit-handoff status        # Show executor state and timers");
    println!();
    println!("Operator commands:");
    println!("  🔄 audit-handoff reset         # Return the executor to READY");
    println!();
    println!("💡 Use 'audit-handoff monitor --once' from cron for single-shot evaluation.");
    Ok(())
}
