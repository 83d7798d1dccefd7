//! Export the configured BI card as a spreadsheet and store it.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Context, Result};
use report_pipeline::config::{
    MetabaseConfig, MetabaseSettings, StorageSettings, StorageTarget, decrypt_oracle,
    load_settings,
};
use report_pipeline::domain::ports::SecretResolver;
use report_pipeline::domain::{CardId, Credentials, ReportProducer};
use report_pipeline::outbound::metabase::MetabaseClient;
use report_pipeline::telemetry::init_tracing;
use tokio::runtime::Builder;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

const PROGRAM: &str = "report-producer";

/// `report-producer` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "report-producer",
    about = "Export a BI card as a spreadsheet and write it to the content store",
    version
)]
struct CliArgs {
    /// Card to export. Falls back to `METABASE_CARD_ID` when omitted.
    #[arg(long = "card-id", value_name = "id")]
    card_id: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: CliArgs) -> Result<()> {
    init_tracing();
    let span = info_span!("report_producer", invocation_id = %Uuid::new_v4());
    produce(args).instrument(span).await
}

async fn produce(args: CliArgs) -> Result<()> {
    let metabase = MetabaseConfig::from_settings(&load_settings::<MetabaseSettings>(PROGRAM)?)?;
    let storage = StorageTarget::from_settings(&load_settings::<StorageSettings>(PROGRAM)?)?;
    let card_id = match args.card_id {
        Some(card_id) => CardId::new(card_id),
        None => metabase.require_card_id()?.clone(),
    };

    let oracle = decrypt_oracle(PROGRAM, [&metabase.password]).await?;
    let password = metabase
        .password
        .reveal(oracle.as_ref().map(|oracle| oracle as &dyn SecretResolver))
        .await?;
    let credentials = Credentials::new(metabase.username.as_str(), password.as_str());

    let client = MetabaseClient::new(&metabase.base_url, metabase.device_uuid.as_deref())?;
    let store = storage.open()?;
    let mut producer = ReportProducer::new(Box::new(client), Arc::new(store));
    let report = producer
        .run(&credentials, &card_id)
        .await
        .wrap_err_with(|| format!("produce report for card {card_id}"))?;

    info!(key = %report.key, bytes = report.size, sha256 = %report.sha256, "report stored");
    Ok(())
}
