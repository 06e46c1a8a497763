use clap::Subcommand;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::services::VerificationService;

#[derive(Subcommand)]
pub enum VerificationCommands {
    #[command(about = "Delete expired unverified codes")]
    Cleanup,
}

pub async fn handle(cmd: VerificationCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        VerificationCommands::Cleanup => {
            let service = VerificationService::new().await?;
            let removed = service.cleanup_expired().await?;
            match output_format {
                OutputFormat::Json => println!("{}", json!({ "success": true, "data": { "removed": removed } })),
                OutputFormat::Text => println!("Removed {} expired code(s)", removed),
            }
        }
    }
    Ok(())
}
