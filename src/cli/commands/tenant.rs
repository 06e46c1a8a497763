use clap::Subcommand;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::database::manager::DatabaseManager;
use crate::database::models::Tenant;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "List all tenants")]
    List,

    #[command(about = "Show one tenant by slug")]
    Show {
        #[arg(help = "Tenant slug")]
        slug: String,
    },
}

pub async fn handle(cmd: TenantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;

    match cmd {
        TenantCommands::List => {
            let tenants = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY created_at DESC")
                .fetch_all(&pool)
                .await?;

            match output_format {
                OutputFormat::Json => println!("{}", json!({ "success": true, "data": tenants })),
                OutputFormat::Text => {
                    if tenants.is_empty() {
                        println!("No tenants");
                    }
                    for t in tenants {
                        println!("{}  {:<30} plan={:<12} status={:<9} active={}", t.id, t.slug, t.plan, t.status, t.is_active);
                    }
                }
            }
        }
        TenantCommands::Show { slug } => {
            let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE slug = $1")
                .bind(&slug)
                .fetch_optional(&pool)
                .await?;

            match tenant {
                Some(t) => match output_format {
                    OutputFormat::Json => println!("{}", json!({ "success": true, "data": t })),
                    OutputFormat::Text => {
                        println!("id:            {}", t.id);
                        println!("name:          {}", t.name);
                        println!("slug:          {}", t.slug);
                        println!("plan:          {}", t.plan);
                        println!("status:        {}", t.status);
                        if let Some(ends) = t.trial_ends_at {
                            println!("trial_ends_at: {}", ends);
                        }
                    }
                },
                None => anyhow::bail!("tenant not found: {}", slug),
            }
        }
    }
    Ok(())
}
