//! Email stored reports named by a batch of change notifications.
//!
//! Reads a notification-topic event from `--event` or stdin, processes every
//! record in order, and exits non-zero when any record failed so the event
//! is redelivered.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use report_pipeline::config::{
    NotifierConfig, NotifierSettings, StorageSettings, StorageTarget, decrypt_oracle,
    load_settings,
};
use report_pipeline::domain::ReportDistributor;
use report_pipeline::domain::ports::SecretResolver;
use report_pipeline::inbound::events::{NotificationEvent, read_event_text};
use report_pipeline::outbound::mail::SmtpMailTransport;
use report_pipeline::telemetry::init_tracing;
use tokio::runtime::Builder;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

const PROGRAM: &str = "report-distributor";

/// `report-distributor` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "report-distributor",
    about = "Email stored reports referenced by storage change notifications",
    version
)]
struct CliArgs {
    /// Path to the JSON event. Read from stdin when omitted.
    #[arg(long = "event", value_name = "path")]
    event: Option<PathBuf>,
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
    let span = info_span!("report_distributor", invocation_id = %Uuid::new_v4());
    distribute(args).instrument(span).await
}

async fn distribute(args: CliArgs) -> Result<()> {
    let event = NotificationEvent::from_json(&read_event_text(args.event.as_deref())?)?;
    info!(records = event.len(), "notification event received");

    let notifier = NotifierConfig::from_settings(&load_settings::<NotifierSettings>(PROGRAM)?)?;
    let storage = StorageTarget::from_settings(&load_settings::<StorageSettings>(PROGRAM)?)?;

    let oracle = decrypt_oracle(PROGRAM, notifier.smtp_password.as_ref()).await?;
    let relay = notifier
        .relay(oracle.as_ref().map(|oracle| oracle as &dyn SecretResolver))
        .await?;
    let transport = SmtpMailTransport::starttls(&relay)?;
    let store = storage.open()?;

    let distributor = ReportDistributor::new(
        Arc::new(store),
        Arc::new(transport),
        Arc::new(DefaultClock),
        notifier.distribution.clone(),
    );
    let outcome = distributor.process_batch(event.messages()).await;

    if outcome.is_success() {
        return Ok(());
    }
    Err(eyre!(
        "{failed} of {total} notifications failed",
        failed = outcome.failures.len(),
        total = outcome.total()
    ))
}
