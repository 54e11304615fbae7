//! CLI administration tool for druginfo.
//!
//! Runs the same search and retrieval pipeline as the HTTP service against
//! the configured record store, without going through HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Search by name, generic name or ingredient
//! cargo run --bin admin -- search ibuprofen --mode weighted
//!
//! # Print a single sanitized record
//! cargo run --bin admin -- get ibuprofen-200mg
//!
//! # List facets
//! cargo run --bin admin -- classes
//! cargo run --bin admin -- manufacturers
//!
//! # Check the record store
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server: `STORE_BACKEND`, `DATABASE_URL` or `DATA_DIR`, and the
//! circuit breaker and retry settings.

use druginfo::application::services::DrugService;
use druginfo::config;
use druginfo::domain::entities::FacetCount;
use druginfo::domain::repositories::DrugRepository;
use druginfo::domain::search::{SearchMode, SearchQuery};
use druginfo::server::build_drug_service;
use druginfo::utils::sanitize::sanitize_record;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;

type Service = DrugService<dyn DrugRepository>;

/// CLI tool for querying druginfo stores.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Search drugs
    Search {
        /// Search term
        term: String,

        /// Search mode: standard, text or weighted
        #[arg(short, long)]
        mode: Option<SearchMode>,

        /// Therapeutic class filter
        #[arg(long = "class")]
        therapeutic_class: Option<String>,

        /// Manufacturer filter
        #[arg(long)]
        manufacturer: Option<String>,

        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        #[arg(short, long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=100))]
        limit: u32,
    },

    /// Print one drug record as sanitized JSON
    Get {
        /// Drug slug
        slug: String,
    },

    /// List therapeutic classes with record counts
    Classes,

    /// List manufacturers with record counts
    Manufacturers,

    /// Record store operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Record store subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check the record store and circuit state
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env().context("Invalid configuration")?;
    let service = build_drug_service(&config)
        .await
        .context("Failed to open record store")?;

    match cli.command {
        Commands::Search {
            term,
            mode,
            therapeutic_class,
            manufacturer,
            page,
            limit,
        } => {
            let query = SearchQuery::default()
                .with_term(Some(term))
                .with_therapeutic_class(therapeutic_class)
                .with_manufacturer(manufacturer)
                .with_page(page, limit)
                .with_mode(mode.unwrap_or(service.default_mode()));
            handle_search(&service, &query).await?
        }
        Commands::Get { slug } => handle_get(&service, &slug).await?,
        Commands::Classes => {
            println!("{}", "🏷  Therapeutic classes".bright_blue().bold());
            let classes = service.therapeutic_classes().await?;
            print_facets(&classes);
        }
        Commands::Manufacturers => {
            println!("{}", "🏭 Manufacturers".bright_blue().bold());
            let manufacturers = service.manufacturers().await?;
            print_facets(&manufacturers);
        }
        Commands::Db { action } => handle_db_action(action, &service).await?,
    }

    Ok(())
}

/// Prints one page of results.
///
/// # Output Format
///
/// ```text
/// 🔍 Results for "ibuprofen" (weighted)
///
///   Slug                           Name                           Class
///   ─────────────────────────────────────────────────────────────────────
///   ibuprofen-200mg                Ibuprofen                      NSAID
///
///   Page 1 of 1 (1 total)
/// ```
async fn handle_search(service: &Service, query: &SearchQuery) -> Result<()> {
    println!(
        "{} \"{}\" ({})",
        "🔍 Results for".bright_blue().bold(),
        query.term.as_deref().unwrap_or_default().cyan(),
        query.mode
    );
    println!();

    let page = service.list_drugs(query).await?;

    if page.data.is_empty() {
        println!("{}", "  No matching drugs".yellow());
        return Ok(());
    }

    println!(
        "  {:<30} {:<30} {}",
        "Slug".bright_white().bold(),
        "Name".bright_white().bold(),
        "Class".bright_white().bold()
    );
    println!("  {}", "─".repeat(75).bright_black());

    for record in &page.data {
        println!(
            "  {:<30} {:<30} {}",
            record.slug.bright_black(),
            record.drug_name.cyan(),
            record.therapeutic_class.as_deref().unwrap_or("-")
        );
    }

    println!();
    println!(
        "  Page {} of {} ({} total)",
        page.page,
        page.total_pages,
        page.total.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

async fn handle_get(service: &Service, slug: &str) -> Result<()> {
    let record = service
        .get_drug(slug)
        .await?
        .with_context(|| format!("Drug '{}' not found", slug))?;

    let sanitized = sanitize_record(&record)?;
    println!("{}", serde_json::to_string_pretty(&sanitized)?);

    Ok(())
}

fn print_facets(facets: &[FacetCount]) {
    println!();

    if facets.is_empty() {
        println!("{}", "  None found".yellow());
        return;
    }

    for facet in facets {
        println!(
            "  {:<50} {}",
            facet.name.cyan(),
            facet.count.to_string().bright_green()
        );
    }

    println!();
    println!("  Total: {}", facets.len().to_string().bright_white().bold());
    println!();
}

/// Handles record store diagnostic commands.
async fn handle_db_action(action: DbAction, service: &Service) -> Result<()> {
    match action {
        DbAction::Check => {
            println!(
                "{} {}...",
                "🔍 Checking record store".bright_blue(),
                service.circuit_key().bright_white()
            );

            service
                .check_store()
                .await
                .map_err(|e| anyhow::anyhow!("Record store check failed: {}", e))?;

            let status = service.circuit_status().await;
            println!("{}", "✅ Record store OK".green().bold());
            println!(
                "  Circuit: {:?} ({} recent failures)",
                status.state, status.failures
            );
        }
    }

    Ok(())
}
