//! Bootstrap a BI server: wait for it, complete first-run setup when
//! pending, log in, and create a card. Prints the new card id.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Context, Result};
use report_pipeline::config::{MetabaseConfig, MetabaseSettings, decrypt_oracle, load_settings};
use report_pipeline::domain::ports::SecretResolver;
use report_pipeline::domain::{Credentials, ReportSetup, SetupRetryPolicy, TokioSleeper};
use report_pipeline::outbound::metabase::{MetabaseClient, SetupProfile};
use report_pipeline::telemetry::init_tracing;
use tokio::runtime::Builder;
use tracing::{Instrument, info_span};
use uuid::Uuid;

const PROGRAM: &str = "report-setup";

/// `report-setup` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "report-setup",
    about = "Initialise a BI server and create a report card",
    version
)]
struct CliArgs {
    /// Name of the card to create.
    #[arg(long = "card-name", value_name = "name", default_value = "test")]
    card_name: String,
    /// Readiness polling attempts, including the first.
    #[arg(long = "max-attempts", value_name = "count", default_value_t = 90)]
    max_attempts: u32,
    /// Seconds between readiness polls.
    #[arg(long = "delay-secs", value_name = "seconds", default_value_t = 10)]
    delay_secs: u64,
    /// Site name recorded during first-run setup.
    #[arg(long = "site-name", value_name = "name")]
    site_name: Option<String>,
    /// Administrator first name recorded during first-run setup.
    #[arg(long = "admin-first-name", value_name = "name")]
    admin_first_name: Option<String>,
    /// Administrator last name recorded during first-run setup.
    #[arg(long = "admin-last-name", value_name = "name")]
    admin_last_name: Option<String>,
    /// Site locale recorded during first-run setup.
    #[arg(long = "site-locale", value_name = "locale")]
    site_locale: Option<String>,
}

impl CliArgs {
    fn setup_profile(&self) -> SetupProfile {
        let defaults = SetupProfile::default();
        SetupProfile {
            site_name: self.site_name.clone().unwrap_or(defaults.site_name),
            first_name: self.admin_first_name.clone().unwrap_or(defaults.first_name),
            last_name: self.admin_last_name.clone().unwrap_or(defaults.last_name),
            site_locale: self.site_locale.clone().unwrap_or(defaults.site_locale),
        }
    }
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
    let span = info_span!("report_setup", invocation_id = %Uuid::new_v4());
    setup(args).instrument(span).await
}

async fn setup(args: CliArgs) -> Result<()> {
    let metabase = MetabaseConfig::from_settings(&load_settings::<MetabaseSettings>(PROGRAM)?)?;
    let oracle = decrypt_oracle(PROGRAM, [&metabase.password]).await?;
    let password = metabase
        .password
        .reveal(oracle.as_ref().map(|oracle| oracle as &dyn SecretResolver))
        .await?;
    let credentials = Credentials::new(metabase.username.as_str(), password.as_str());

    let client = MetabaseClient::new(&metabase.base_url, metabase.device_uuid.as_deref())?
        .with_setup_profile(args.setup_profile());
    let policy = SetupRetryPolicy {
        max_attempts: args.max_attempts,
        delay: Duration::from_secs(args.delay_secs),
    };
    let mut bootstrap = ReportSetup::new(Box::new(client), Arc::new(TokioSleeper), policy);
    let outcome = bootstrap
        .bootstrap(&credentials, &args.card_name)
        .await
        .wrap_err("bootstrap BI server")?;

    println!("card_id={}", outcome.card_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_profile_overrides_only_supplied_fields() {
        let args = CliArgs::parse_from(["report-setup", "--site-name", "Finance BI"]);
        let profile = args.setup_profile();
        assert_eq!(profile.site_name, "Finance BI");
        assert_eq!(profile.first_name, SetupProfile::default().first_name);
        assert_eq!(profile.site_locale, "en");
    }
}
