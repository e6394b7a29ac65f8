//! Operator commands: migrations, account seeding, token issuance, and
//! counter audit/repair against the Postgres stores.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use likely_api::jwt::JwtService;
use likely_common::ActorId;
use likely_engine::{ActorDirectory, PgDirectory, Reconciler};
use likely_events::PgLedger;

#[derive(Parser)]
#[command(name = "likely-admin", about = "Operator tooling for the likely service")]
struct Cli {
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run pending database migrations
    Migrate,
    /// Create an actor with a zero reputation count
    CreateActor {
        #[arg(long)]
        username: String,
    },
    /// Issue a bearer token for an actor (uses JWT_SECRET / JWT_ISSUER)
    IssueToken {
        #[arg(long)]
        actor: ActorId,
    },
    /// List actors whose cached count disagrees with the ledger
    Audit,
    /// Repair cached counts from the ledger. Run while the target is quiet.
    Reconcile {
        /// Single actor; all drifted actors when omitted
        #[arg(long)]
        actor: Option<ActorId>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("likely=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Migrate => {
            let pool = connect(cli.database_url.as_deref()).await?;
            println!("Running database migrations...");
            sqlx::migrate!("../../migrations").run(&pool).await?;
            println!("Migrations completed successfully.");
        }
        Command::CreateActor { username } => {
            let pool = connect(cli.database_url.as_deref()).await?;
            let actor = PgDirectory::new(pool).create(&username).await?;
            println!("{}", serde_json::to_string_pretty(&actor)?);
        }
        Command::IssueToken { actor } => {
            let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
            let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| "likely".to_string());
            let token = JwtService::new(&secret, issuer).create_token(actor)?;
            println!("{token}");
        }
        Command::Audit => {
            let reconciler = reconciler(connect(cli.database_url.as_deref()).await?);
            let drifted = reconciler.audit_all().await?;
            if drifted.is_empty() {
                println!("All counters match the ledger.");
            }
            for audit in drifted {
                println!(
                    "{} cached={} ledger={} drift={}",
                    audit.target,
                    audit.cached,
                    audit.ledger_sum,
                    audit.drift()
                );
            }
        }
        Command::Reconcile { actor } => {
            let reconciler = reconciler(connect(cli.database_url.as_deref()).await?);
            let targets = match actor {
                Some(id) => vec![id],
                None => reconciler
                    .audit_all()
                    .await?
                    .into_iter()
                    .map(|a| a.target)
                    .collect(),
            };
            for target in targets {
                let audit = reconciler.reconcile(target).await?;
                println!("{} {} -> {}", target, audit.cached, audit.ledger_sum);
            }
        }
    }

    Ok(())
}

async fn connect(database_url: Option<&str>) -> Result<PgPool> {
    let url = database_url.context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new().max_connections(2).connect(url).await?;
    Ok(pool)
}

fn reconciler(pool: PgPool) -> Reconciler {
    Reconciler::new(
        Arc::new(PgLedger::new(pool.clone())),
        Arc::new(PgDirectory::new(pool)),
    )
}
