//! CLI administration tool for outreach-analytics.
//!
//! Provides commands for inspecting analytics, managing the cache and
//! checking the database without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Rates for ad-hoc counters (no database needed)
//! cargo run --bin admin -- rates --sent 100 --delivered 95 --opened 30
//!
//! # Overview of a domain over the last 30 days
//! cargo run --bin admin -- overview campaigns --days 30
//!
//! # Drop cached entries of two campaigns
//! cargo run --bin admin -- cache invalidate --domain campaigns --entity c1 --entity c2
//!
//! # Drop every cached analytics entry
//! cargo run --bin admin -- cache flush
//!
//! # Run one warming pass
//! cargo run --bin admin -- cache warm
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server; see [`outreach_analytics::config`].

use outreach_analytics::application::services::AnalyticsService;
use outreach_analytics::application::warming::WarmingScheduler;
use outreach_analytics::config::{self, Config};
use outreach_analytics::domain::entities::{
    AnalyticsDomain, AnalyticsFilters, AnalyticsQuery, MetricsRecord,
};
use outreach_analytics::domain::rates::{RateSet, calculate_all_rates};
use outreach_analytics::infrastructure::persistence::PgMetricsRepository;
use outreach_analytics::server;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing outreach-analytics.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Compute rates for the given counters
    Rates(CounterArgs),

    /// Show aggregated metrics of a domain
    Overview {
        /// campaigns, mailboxes, domains, leads or templates
        domain: String,

        /// Restrict to these entity IDs
        #[arg(short, long = "entity")]
        entities: Vec<String>,

        /// Trailing window in days
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Cache operations
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Args)]
struct CounterArgs {
    #[arg(long, default_value_t = 0)]
    sent: u64,
    #[arg(long, default_value_t = 0)]
    delivered: u64,
    #[arg(long, default_value_t = 0)]
    opened: u64,
    #[arg(long, default_value_t = 0)]
    clicked: u64,
    #[arg(long, default_value_t = 0)]
    replied: u64,
    #[arg(long, default_value_t = 0)]
    bounced: u64,
    #[arg(long, default_value_t = 0)]
    unsubscribed: u64,
    #[arg(long, default_value_t = 0)]
    spam: u64,
}

impl From<CounterArgs> for MetricsRecord {
    fn from(args: CounterArgs) -> Self {
        MetricsRecord {
            sent: args.sent,
            delivered: args.delivered,
            opened_tracked: args.opened,
            clicked_tracked: args.clicked,
            replied: args.replied,
            bounced: args.bounced,
            unsubscribed: args.unsubscribed,
            spam_complaints: args.spam,
        }
    }
}

/// Cache management subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// Invalidate a domain, or selected entities of a domain
    Invalidate {
        #[arg(short, long)]
        domain: String,

        #[arg(short, long = "entity")]
        entities: Vec<String>,
    },

    /// Invalidate every analytics entry
    Flush {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Run one cache warming pass
    Warm,

    /// Check cache backend connectivity
    Check,
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rates(counters) => print_rates(counters.into()),
        Commands::Overview {
            domain,
            entities,
            days,
        } => {
            let config = config::load_from_env()?;
            show_overview(&config, &domain, entities, days).await?
        }
        Commands::Cache { action } => {
            let config = config::load_from_env()?;
            handle_cache_action(action, &config).await?
        }
        Commands::Db { action } => {
            let config = config::load_from_env()?;
            let pool = server::connect_database(&config).await?;
            handle_db_action(action, &pool).await?
        }
    }

    Ok(())
}

async fn build_service(config: &Config) -> Result<Arc<AnalyticsService>> {
    let pool = server::connect_database(config).await?;
    let cache = server::build_cache(config).await;
    let repository = Arc::new(PgMetricsRepository::new(Arc::new(pool)));

    Ok(Arc::new(AnalyticsService::new(
        repository,
        cache,
        config.analytics_settings(),
    )))
}

fn print_rate_table(rates: &RateSet) {
    let formatted = rates.formatted();
    let rows = [
        ("Delivery", formatted.delivery_rate),
        ("Open", formatted.open_rate),
        ("Click", formatted.click_rate),
        ("Click-to-open", formatted.click_to_open_rate),
        ("Reply", formatted.reply_rate),
        ("Bounce", formatted.bounce_rate),
        ("Unsubscribe", formatted.unsubscribe_rate),
        ("Spam", formatted.spam_rate),
    ];

    for (label, value) in rows {
        println!("  {:<15} {}", label, value.bright_green().bold());
    }
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    for warning in warnings {
        println!("  {} {}", "⚠️ ".yellow(), warning.yellow());
    }
}

/// Prints rates for counters given on the command line.
fn print_rates(metrics: MetricsRecord) {
    println!("{}", "📈 Rates".bright_blue().bold());
    println!();

    print_rate_table(&calculate_all_rates(&metrics));
    print_warnings(&metrics.funnel_warnings());
    println!();
}

/// Shows an overview through the service, so cached entries are used when present.
async fn show_overview(
    config: &Config,
    domain: &str,
    entities: Vec<String>,
    days: Option<u32>,
) -> Result<()> {
    let domain: AnalyticsDomain = domain.parse()?;
    let service = build_service(config).await?;

    let query = AnalyticsQuery::new(domain)
        .with_entities(entities)
        .with_filters(AnalyticsFilters {
            days,
            ..Default::default()
        });
    let overview = service.overview(query).await?;

    println!(
        "{} {} ({:?})",
        "📊 Overview:".bright_blue().bold(),
        domain.to_string().cyan(),
        overview.source
    );
    println!();

    let m = &overview.metrics;
    println!("  Sent:            {}", m.sent.to_string().bright_white().bold());
    println!("  Delivered:       {}", m.delivered.to_string().bright_white());
    println!("  Opened:          {}", m.opened_tracked.to_string().bright_white());
    println!("  Clicked:         {}", m.clicked_tracked.to_string().bright_white());
    println!("  Replied:         {}", m.replied.to_string().bright_white());
    println!("  Bounced:         {}", m.bounced.to_string().bright_white());
    println!();

    print_rate_table(&overview.rates);
    print_warnings(&overview.funnel_warnings);
    println!();

    Ok(())
}

/// Dispatches cache management commands.
async fn handle_cache_action(action: CacheAction, config: &Config) -> Result<()> {
    let service = build_service(config).await?;

    match action {
        CacheAction::Invalidate { domain, entities } => {
            let domain: AnalyticsDomain = domain.parse()?;
            let deleted = service.invalidate(Some(domain), &entities).await?;

            println!(
                "{} {} entries removed",
                "✅".green(),
                deleted.to_string().bright_white().bold()
            );
        }
        CacheAction::Flush { yes } => {
            println!(
                "  Prefix: {}",
                service.keys().all_pattern().bright_yellow()
            );

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Remove every cached analytics entry?")
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("{}", "❌ Cancelled".red());
                    return Ok(());
                }
            }

            let deleted = service.invalidate(None, &[]).await?;
            println!(
                "{} {} entries removed",
                "✅".green(),
                deleted.to_string().bright_white().bold()
            );
        }
        CacheAction::Warm => {
            println!("{}", "🔥 Warming cache...".bright_blue());

            let strategy = server::load_warming_strategy(config)?;
            let scheduler = WarmingScheduler::new(strategy, service);
            let report = scheduler.run_once().await;

            println!(
                "  Tasks: {}  Succeeded: {}  Failed: {}  ({} ms)",
                report.total.to_string().bright_white().bold(),
                report.succeeded.to_string().green(),
                if report.failed > 0 {
                    report.failed.to_string().red()
                } else {
                    report.failed.to_string().bright_black()
                },
                report.duration_ms
            );
        }
        CacheAction::Check => {
            let cache = service.cache();
            if cache.health_check().await {
                println!(
                    "{} Cache backend '{}' OK",
                    "✅".green(),
                    cache.backend_name()
                );
            } else {
                anyhow::bail!("cache backend '{}' is unreachable", cache.backend_name());
            }
        }
    }

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;
            let entities: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analytics_entities")
                .fetch_one(pool)
                .await?;
            let counter_rows: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM analytics_daily_counters")
                    .fetch_one(pool)
                    .await?;

            println!("  PostgreSQL:    {}", version.bright_white());
            println!(
                "  Entities:      {}",
                entities.to_string().bright_green().bold()
            );
            println!(
                "  Counter rows:  {}",
                counter_rows.to_string().bright_green().bold()
            );
            println!();
        }
    }

    Ok(())
}
