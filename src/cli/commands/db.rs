use clap::Subcommand;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::connector::QueryCache;
use crate::database::manager::DatabaseManager;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Apply pending SQL migrations")]
    Migrate,

    #[command(about = "Check database connectivity")]
    Ping,

    #[command(about = "Remove expired query cache rows")]
    CachePurge,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Migrate => {
            DatabaseManager::migrate().await?;
            emit(output_format, json!({ "migrated": true }), "Migrations applied");
        }
        DbCommands::Ping => {
            DatabaseManager::health_check().await?;
            emit(output_format, json!({ "database": "ok" }), "Database reachable");
        }
        DbCommands::CachePurge => {
            let pool = DatabaseManager::pool().await?;
            let removed = QueryCache::new(pool).purge_expired().await?;
            emit(
                output_format,
                json!({ "removed": removed }),
                &format!("Removed {} expired cache row(s)", removed),
            );
        }
    }
    Ok(())
}

fn emit(format: OutputFormat, data: serde_json::Value, text: &str) {
    match format {
        OutputFormat::Json => println!("{}", json!({ "success": true, "data": data })),
        OutputFormat::Text => println!("{}", text),
    }
}
