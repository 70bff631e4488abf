//! 🚀 ddstore-cli — the front door, the bouncer, the maitre d' of ddstore.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Thin wrapper: parse args, set up logging, load config, and let the
//! library do the heavy lifting. Like a manager. 🦆

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_FULL_CONDENSED};
use ddstore::LoadReport;
use ddstore::mappings::{IndexKind, profile_mapping, text_mapping};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🗃️ Write column profiles and column text into Elasticsearch.
#[derive(Debug, Parser)]
#[command(name = "ddstore-cli", version, about)]
struct Cli {
    /// 🔧 TOML config file. If it isn't there, DDSTORE_* environment variables are all we get.
    #[arg(long, short, default_value = "ddstore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 🏗️ Create the text and profile indices (if missing) and apply their mappings.
    Init,
    /// 🗺️ Print both mappings as JSON. Touches no network.
    Mappings,
    /// 📝 Load an NDJSON file of text records.
    LoadText { file: PathBuf },
    /// 📊 Load an NDJSON file of profile records.
    LoadProfiles { file: PathBuf },
}

/// 🚀 main() — where it all begins. The "I pressed enter and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args
/// 3. Load config (the moment of truth)
/// 4. Run the command (send it and pray 🙏)
/// 5. Handle errors (cry)
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 RUST_LOG wins. otherwise: our crates at info, the HTTP stack politely quiet.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like Elasticsearch isn't reachable. \
                Check host, port and scheme under [store_config.Elasticsearch], \
                then check the cluster is actually running. \
                `curl http://localhost:9200` is a great first question to ask it. ☕"
            );
        }

        // 🗑️ Exit with prejudice.
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Mappings = cli.command {
        // 🗺️ no config needed to read a constant
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "text": text_mapping(),
                "profile": profile_mapping(),
            }))?
        );
        return Ok(());
    }

    let config_file = cli.config.as_path();
    let config_file_path_which_is_validated_to_exist = match config_file.try_exists().context(format!(
        "💀 Could not even check whether the config file exists. Permissions on the directory, perhaps? \
         Was checking here: '{}'",
        config_file.display()
    ))? {
        true => Some(config_file),
        false => None, // 💤 not there. environment variables it is.
    };

    let app_config = ddstore::app_config::load_config(config_file_path_which_is_validated_to_exist)
        .context("💀 In ddstore-cli, main, we couldn't load the config. Take a look at the file and the DDSTORE_* variables.")?;

    match cli.command {
        Command::Init => ddstore::init(app_config).await,
        Command::LoadText { file } => load(app_config, IndexKind::Text, &file).await,
        Command::LoadProfiles { file } => load(app_config, IndexKind::Profile, &file).await,
        Command::Mappings => Ok(()),
    }
}

async fn load(app_config: ddstore::app_config::AppConfig, kind: IndexKind, file: &Path) -> Result<()> {
    let report = ddstore::load(app_config, kind, file).await?;
    println!("{}", summary_table(&report));
    if report.failed() > 0 {
        anyhow::bail!(
            "💀 {} of {} {} records were not written. The warnings above name each one.",
            report.failed(),
            report.records,
            kind
        );
    }
    Ok(())
}

/// 🍽️ The end-of-load receipt.
fn summary_table(report: &LoadReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["index", "records", "created", "updated", "other", "failed", "elapsed"]);
    table.add_row(vec![
        Cell::new(report.kind),
        Cell::new(report.records).set_alignment(CellAlignment::Right),
        Cell::new(report.created).set_alignment(CellAlignment::Right),
        Cell::new(report.updated).set_alignment(CellAlignment::Right),
        Cell::new(report.other).set_alignment(CellAlignment::Right),
        Cell::new(report.failed()).set_alignment(CellAlignment::Right),
        Cell::new(format!("{:.2?}", report.elapsed)).set_alignment(CellAlignment::Right),
    ]);
    table
}
