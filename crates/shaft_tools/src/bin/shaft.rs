#![forbid(unsafe_code)]

//! shaft - ventilation-shaft configuration from the command line.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shaft_contracts::{ProductType, Vocabulary};
use shaft_engines::catalog_gateway::{GatewayConfig, HttpCatalogGateway};
use shaft_engines::constraint_table::option_catalog;
use shaft_engines::payload_codec::encode;
use shaft_tools::selection_cli::{
    render_normalize, render_options, render_payload, render_state, session_from_assignments,
    write_export,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shaft")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize field=value pairs and print selection, directives and coercions
    Normalize {
        /// Assignments such as tip=VBV diametr=710 tip_klapana=pov
        assignments: Vec<String>,
    },

    /// Print the matcher payload for the normalized selection
    Encode { assignments: Vec<String> },

    /// Print the legal options for a product type
    Options {
        /// Product type code or label; omitted means unconstrained
        #[arg(long)]
        tip: Option<String>,
    },

    /// Send the selection to the matcher and print the matched items
    Submit { assignments: Vec<String> },

    /// Submit, then export the result spreadsheet
    Export {
        /// Directory the spreadsheet is written into
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        assignments: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli.command) {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn gateway_from_env() -> Result<HttpCatalogGateway, String> {
    let config = GatewayConfig::from_env().map_err(|e| e.to_string())?;
    Ok(HttpCatalogGateway::new(config))
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Normalize { assignments } => {
            let session = session_from_assignments(&assignments)?;
            println!("{}", render_normalize(&session)?);
        }
        Commands::Encode { assignments } => {
            let session = session_from_assignments(&assignments)?;
            println!("{}", render_payload(&encode(&session.current().canonical))?);
        }
        Commands::Options { tip } => {
            let product_type = tip.as_deref().and_then(ProductType::parse_input);
            println!("{}", render_options(&option_catalog(product_type))?);
        }
        Commands::Submit { assignments } => {
            let gateway = gateway_from_env()?;
            let mut session = session_from_assignments(&assignments)?;
            let state = session.submit(&gateway).map_err(|e| e.to_string())?;
            println!("{}", render_state(state));
        }
        Commands::Export {
            out_dir,
            assignments,
        } => {
            let gateway = gateway_from_env()?;
            let mut session = session_from_assignments(&assignments)?;
            let state = session.submit(&gateway).map_err(|e| e.to_string())?;
            println!("{}", render_state(state));
            let doc = session.export(&gateway).map_err(|e| e.to_string())?;
            let path = write_export(&doc, &out_dir)?;
            info!(path = %path.display(), "export written");
            println!("{}", path.display());
        }
    }
    Ok(())
}
