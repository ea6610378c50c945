use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::{info, warn};

use inventory_order_tracker::{
    config::{init_tracing, load_config},
    db::establish_connection_from_app_config,
    migrator::Migrator,
};

#[derive(Parser)]
#[command(
    name = "migration",
    about = "Apply or inspect the inventory-order-tracker schema",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations (default)
    Up {
        #[arg(long, help = "Apply at most this many migrations")]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(long, default_value_t = 1, help = "Number of migrations to roll back")]
        steps: u32,
    },
    /// List applied and pending migrations
    Status,
    /// Drop every table and reapply all migrations
    Fresh {
        #[arg(long, help = "Required; fresh destroys all data")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config().context("failed to load configuration")?;
    init_tracing(cfg.log_level(), cfg.log_json);

    let db = establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match cli.command.unwrap_or(Command::Up { steps: None }) {
        Command::Up { steps } => {
            info!(?steps, "Applying migrations");
            Migrator::up(&db, steps).await?;
            info!("Migration completed successfully");
        }
        Command::Down { steps } => {
            warn!(steps, "Rolling back migrations");
            Migrator::down(&db, Some(steps)).await?;
            info!("Rollback completed");
        }
        Command::Status => {
            for migration in Migrator::get_applied_migrations(&db).await? {
                println!("applied  {}", migration.name());
            }
            for migration in Migrator::get_pending_migrations(&db).await? {
                println!("pending  {}", migration.name());
            }
        }
        Command::Fresh { yes } => {
            if !yes {
                anyhow::bail!("refusing to drop all tables without --yes");
            }
            warn!("Dropping all tables and reapplying migrations");
            Migrator::fresh(&db).await?;
            info!("Fresh migration completed");
        }
    }

    Ok(())
}
