#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the sample exchange.
//!
//! Runs the API server and offers offline helpers for checking uploads and
//! category colors against the same code the server uses.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sample_exchange_gateway::{Gateway, SampleFilter};
use sample_exchange_sample::{normalize_at, resolve_color};
use sample_exchange_sample_models::RawSampleRecord;
use sample_exchange_server_models::ApiImportPreview;
use sample_exchange_tabular::TabularFormat;

#[derive(Parser)]
#[command(name = "sample_exchange", about = "Sample exchange toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server (reads `BIND_ADDR`, `PORT`, and gateway variables)
    Serve,
    /// Parse a CSV/TSV upload and print the records it would import
    Preview {
        /// File to parse; `.tsv` and `.tab` files are tab-separated
        file: PathBuf,
        /// Honor quoted fields containing delimiters or newlines
        #[arg(long)]
        quoted: bool,
    },
    /// Print the display color for each category label
    Colors {
        /// Category labels, e.g. "Tissue Sample"
        #[arg(required = true)]
        labels: Vec<String>,
    },
    /// Fetch samples from the data store and print them as JSON
    Samples {
        /// Only public samples
        #[arg(long)]
        public: bool,
        /// Case-insensitive category substring
        #[arg(long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(sample_exchange_server::run_server())
            })
            .await??;
        }
        Commands::Preview { file, quoted } => {
            let format = if quoted {
                TabularFormat::Quoted
            } else {
                TabularFormat::Simple
            };
            let data = sample_exchange_tabular::parse_file(&file, format)?;
            log::info!(
                "{}: {} column(s), {} row(s)",
                file.display(),
                data.column_names.len(),
                data.rows.len()
            );

            let batch_time = chrono::Utc::now();
            let samples = data
                .rows
                .iter()
                .cloned()
                .map(|row| normalize_at(RawSampleRecord::from(row), batch_time))
                .collect();
            let preview = ApiImportPreview {
                column_names: data.column_names,
                rows: data.rows,
                samples,
            };
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        Commands::Colors { labels } => {
            for label in labels {
                println!("{label}\t{}", resolve_color(Some(&label)));
            }
        }
        Commands::Samples { public, category } => {
            let gateway = Gateway::from_env()?;
            let filter = SampleFilter {
                public_only: public,
                category,
            };
            let samples = gateway.fetch_samples(&filter).await?;
            log::info!("Fetched {} sample(s)", samples.len());
            println!("{}", serde_json::to_string_pretty(&samples)?);
        }
    }

    Ok(())
}
