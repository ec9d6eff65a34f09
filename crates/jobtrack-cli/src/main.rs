use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jobtrack_pipeline::{ParseJobRequest, SearchJobsRequest};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "jobtrack-cli")]
#[command(about = "Job application tracker command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve,
    /// Search job boards and print the normalized listings.
    Search {
        term: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        results: Option<u32>,
        /// Age cap in hours; `none` disables it.
        #[arg(long)]
        hours_old: Option<String>,
        /// Repeatable; defaults to the configured sources.
        #[arg(long = "site")]
        sites: Vec<String>,
    },
    /// Look up a single posting by URL.
    Parse { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jobtrack=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            jobtrack_web::serve_from_env().await?;
        }
        Commands::Search {
            term,
            location,
            results,
            hours_old,
            sites,
        } => {
            let hours_old = match hours_old.as_deref().map(str::trim) {
                None => None,
                Some(v) if v.eq_ignore_ascii_case("none") => Some(None),
                Some(v) => Some(Some(v.parse::<u32>()?)),
            };
            let request = SearchJobsRequest {
                search_term: term,
                location,
                results_wanted: results,
                hours_old,
                site_name: (!sites.is_empty()).then_some(sites),
            };
            let pipeline = jobtrack_pipeline::pipeline_from_env(Path::new("."))?;
            let response = pipeline.search(&request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Parse { url } => {
            let pipeline = jobtrack_pipeline::pipeline_from_env(Path::new("."))?;
            let response = pipeline.parse_job(&ParseJobRequest { url }).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
