mod assemble;
mod catalog;
mod crawler;
mod db;
mod detail;
mod error;
mod listing;
mod net;
mod settings;
mod taxonomy;
mod text;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::crawler::CrawlOptions;
use crate::net::HttpTransport;
use crate::settings::{Settings, SOURCE};
use crate::taxonomy::Taxonomy;

#[derive(Parser)]
#[command(name = "coloso_crawler", about = "Coloso course catalog crawler")]
struct Cli {
    /// SQLite database path (overrides COLOSO_DB_PATH)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and print the category tree
    Categories,
    /// Crawl every category and save the canonical lectures
    Crawl {
        /// Max course pages to visit (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Course pages fetched at once (overrides COLOSO_CONCURRENCY)
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Print lectures as TSV instead of saving them
        #[arg(long)]
        dry_run: bool,
    },
    /// Saved lectures table
    Lectures {
        /// Filter by canonical main category
        #[arg(short, long)]
        main: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Saved lecture counts per category
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    let endpoints = settings.endpoints();

    let result = match cli.command {
        Commands::Categories => {
            let transport = HttpTransport::new(&settings.user_agent, settings.timeout())?;
            let categories = catalog::fetch_categories(&transport, &endpoints).await?;
            let taxonomy = Taxonomy::coloso();
            for main in &categories {
                println!("{} ({})", main.title, main.id);
                for sub in &main.children {
                    let mapped = match taxonomy.map(&main.title, &sub.title) {
                        Ok((m, s)) => format!("{} / {}", m, s),
                        Err(_) => "(unmapped)".to_string(),
                    };
                    println!("  {:>6}  {:<24} -> {}", sub.id, sub.title, mapped);
                }
            }
            let leaves = catalog::leaves(&categories);
            println!("\n{} main categories, {} leaf categories", categories.len(), leaves.len());
            Ok(())
        }
        Commands::Crawl {
            limit,
            concurrency,
            dry_run,
        } => {
            let transport = Arc::new(HttpTransport::new(&settings.user_agent, settings.timeout())?);
            let options = CrawlOptions {
                concurrency: concurrency.unwrap_or(settings.concurrency).max(1),
                limit,
                progress: true,
            };

            let t_crawl = Instant::now();
            let report = crawler::crawl(transport, &endpoints, &options)
                .await
                .context("Coloso crawl aborted")?;
            println!(
                "Crawled {} URLs from {} categories ({} courses, {} skipped, {} categories unreadable) in {:.1}s",
                report.urls,
                report.categories,
                report.courses.len(),
                report.skipped_total(),
                report.skipped_categories,
                t_crawl.elapsed().as_secs_f64()
            );
            for (kind, n) in &report.skipped {
                println!("  skipped {:<24} {}", kind, n);
            }

            info!("Convert coloso courses to lectures and save lectures");
            let assembled = assemble::assemble(SOURCE, &report.courses, &Taxonomy::coloso());
            println!(
                "{} lectures ({} duplicates, {} without category mapping)",
                assembled.lectures.len(),
                assembled.duplicates,
                assembled.unmapped
            );

            if dry_run {
                for lecture in &assembled.lectures {
                    println!("{}", lecture.tsv());
                }
                return Ok(());
            }

            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let saved = db::save_or_update_lectures(&conn, SOURCE, &assembled.lectures)?;
            println!(
                "Saved to {}: {} inserted, {} updated.",
                settings.db_path, saved.inserted, saved.updated
            );
            Ok(())
        }
        Commands::Lectures { main, limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, main.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No lectures found. Run 'crawl' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:>7} | {:<32} | {:<12} | {:>8} | {:<24}",
                "#", "Id", "Title", "Instructor", "Price", "Category"
            );
            println!("{}", "-".repeat(100));
            for (i, r) in rows.iter().enumerate() {
                let category = format!("{} / {}", r.main_category, r.sub_category);
                println!(
                    "{:>3} | {:>7} | {:<32} | {:<12} | {:>8} | {:<24}",
                    i + 1,
                    r.source_id,
                    truncate(&r.title, 32),
                    truncate(&r.instructor, 12),
                    r.price,
                    truncate(&category, 24)
                );
            }
            println!("\n{} lectures", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:     {}", s.total);
            for (category, n) in &s.by_category {
                println!("  {:<20} {}", category, n);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
