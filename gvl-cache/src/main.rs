mod args;

use crate::args::{CliArgs, Command};
use clap::Parser as _;
use gvl_cache::api::{HttpFetch, VendorListApi};
use gvl_cache::db::{Database, KeyValueStore, MemoryStore};
use gvl_cache::{GvlConfig, GvlError, GvlManager};
use indicatif::ProgressStyle;
use serde::Serialize;
use std::io::Write as _;
use tracing::Instrument as _;
use tracing_indicatif::span_ext::IndicatifSpanExt as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

fn main() {
    let indicatif_layer = tracing_indicatif::IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_env("GVL_CACHE_LOG"))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();

    let args = CliArgs::parse();

    let result = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(v) => v.block_on(async_main(args)),
        Err(err) => {
            tracing::error!("Failed to create tokio runtime: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        tracing::error!("Error: {}", err);

        let mut src = std::error::Error::source(&err);
        while let Some(err) = src {
            tracing::error!("-> Caused by: {}", err);
            src = err.source();
        }

        std::process::exit(1);
    }
}

async fn async_main(args: CliArgs) -> Result<(), GvlError> {
    tracing::trace!("args = {:#?}", args);

    let config = args.gvl_config();
    let api = VendorListApi::new(&config)?;

    if args.in_memory {
        run(args.command, config, api, MemoryStore::new()).await
    } else {
        let database = Database::setup(&args.database).await?;
        run(args.command, config, api, database).await
    }
}

async fn run<F, S>(command: Command, config: GvlConfig, api: F, store: S) -> Result<(), GvlError>
where
    F: HttpFetch,
    S: KeyValueStore,
{
    let manager = GvlManager::builder(api, store)
        .config(config)
        .initialize()
        .await;

    let result = execute(&manager, command).await;
    manager.shutdown().await;

    result
}

async fn execute<F, S>(manager: &GvlManager<F, S>, command: Command) -> Result<(), GvlError>
where
    F: HttpFetch,
    S: KeyValueStore,
{
    match command {
        Command::Load { gvl_version } => {
            load(manager, gvl_version.as_deref()).await?;
            tracing::info!(
                "Vendor list version {} is cached",
                manager.get_version().await.as_deref().unwrap_or("<unknown>")
            );
        }
        Command::Name { ids } => {
            load(manager, None).await?;
            print_json(&manager.get_vendor_names(&ids))?;
        }
        Command::Info { id } => {
            load(manager, None).await?;
            print_json(&manager.get_vendor_info(id))?;
        }
        Command::Status => {
            print_json(&serde_json::json!({
                "loaded": manager.is_loaded(),
                "version": manager.get_version().await,
            }))?;
        }
        Command::Clear => {
            manager.clear().await;
            tracing::info!("Vendor list cache cleared");
        }
    }

    Ok(())
}

async fn load<F, S>(manager: &GvlManager<F, S>, version: Option<&str>) -> Result<(), GvlError>
where
    F: HttpFetch,
    S: KeyValueStore,
{
    let span = tracing::info_span!("load_vendor_list", endpoint = manager.config().endpoint.as_str());
    span.pb_set_style(&ProgressStyle::default_spinner());

    manager.load(version).instrument(span).await
}

fn print_json(value: &impl Serialize) -> Result<(), GvlError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;

    Ok(())
}
