//! simmodel-db - telescope simulation model database loader

use clap::Parser;
use tracing::{error, info};

use simmodel_db::{
    config::{Args, Command, ModelConfig},
    db::{CollectionKind, MemoryStore, MongoStore, ParameterValue, RecordKey},
    export::{build_export, read_taxonomy, write_export},
    ingest::fetch_file,
    logging::init_tracing,
    update::update_parameter,
    DatabaseLoader, LoadReport,
};

fn log_report(report: &LoadReport) {
    info!("======================================");
    info!("Descriptions read: {}", report.descriptions_read);
    info!(
        "Telescopes: {} values, {} descriptions, {} files uploaded ({} already stored)",
        report.telescopes.values,
        report.telescopes.descriptions,
        report.telescopes.files.uploaded,
        report.telescopes.files.skipped
    );
    info!(
        "Sites: {} values, {} descriptions, {} files uploaded ({} already stored)",
        report.sites.values,
        report.sites.descriptions,
        report.sites.files.uploaded,
        report.sites.files.skipped
    );
    info!("Post-load updates: {}", report.post_load_updates);
    info!("======================================");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let config = ModelConfig::load(args.model_config.as_deref())?;

    match args.command {
        Command::Load {
            dry_run,
            skip_post_updates,
        } => {
            info!("Input root: {}", args.input_root.display());
            let report = if dry_run {
                info!("Dry run: loading into memory only");
                let store = MemoryStore::new();
                DatabaseLoader::new(&store, &config, &args.input_root)
                    .load(!skip_post_updates)
                    .await?
            } else {
                let store = MongoStore::connect(&args.mongodb_uri, config.databases.clone()).await?;
                DatabaseLoader::new(&store, &config, &args.input_root)
                    .load(!skip_post_updates)
                    .await?
            };
            log_report(&report);
        }
        Command::Update {
            entity,
            version,
            parameter,
            value,
            site,
        } => {
            let store = MongoStore::connect(&args.mongodb_uri, config.databases.clone()).await?;
            let key = RecordKey {
                collection: if site {
                    CollectionKind::Sites
                } else {
                    CollectionKind::Telescopes
                },
                entity,
                version,
                parameter,
            };
            update_parameter(&store, &key, ParameterValue::Text(value)).await?;
        }
        Command::Export {
            version,
            only_applicable,
            taxonomy,
            output,
        } => {
            let store = MongoStore::connect(&args.mongodb_uri, config.databases.clone()).await?;
            let export_config = &config.export;
            let taxonomy_path = taxonomy.unwrap_or_else(|| export_config.taxonomy_path.clone());
            let output_path = output.unwrap_or_else(|| export_config.output_path.clone());
            let version = version.unwrap_or_else(|| export_config.version.clone());

            let taxonomy = read_taxonomy(&taxonomy_path)?;
            let export =
                build_export(&store, export_config, &taxonomy, &version, only_applicable).await?;
            write_export(&output_path, &export)?;
        }
        Command::FetchFile { filename, dest } => {
            let store = MongoStore::connect(&args.mongodb_uri, config.databases.clone()).await?;
            fetch_file(&store, &filename, &dest).await?;
        }
    }

    Ok(())
}
