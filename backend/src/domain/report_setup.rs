//! Bootstrap flow for a fresh BI server: wait until it answers, complete
//! first-run setup when pending, log in, and create a card.
//!
//! This is the only place that retries: readiness polling uses a fixed delay
//! and a bounded attempt count.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::ports::{QueryClientError, ReportSource};
use super::{CardId, Credentials, ServerProperties};

const DEFAULT_MAX_ATTEMPTS: u32 = 90;
const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Fixed-delay retry policy for readiness polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupRetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl Default for SetupRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

/// Sleeping abstraction so tests can skip real delays.
#[async_trait]
pub trait SetupSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl SetupSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bootstrap failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    /// The server never answered the properties call.
    #[error("server not ready after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: QueryClientError,
    },
    /// A non-retried call failed.
    #[error(transparent)]
    Query(#[from] QueryClientError),
}

/// Result of a bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    /// Whether first-run setup was performed by this run.
    pub performed_initial_setup: bool,
    /// Card created by this run.
    pub card_id: CardId,
}

/// Drives the bootstrap sequence against one report source.
pub struct ReportSetup {
    source: Box<dyn ReportSource>,
    sleeper: Arc<dyn SetupSleeper>,
    policy: SetupRetryPolicy,
}

impl ReportSetup {
    /// Build a bootstrap driver.
    pub fn new(
        source: Box<dyn ReportSource>,
        sleeper: Arc<dyn SetupSleeper>,
        policy: SetupRetryPolicy,
    ) -> Self {
        Self {
            source,
            sleeper,
            policy,
        }
    }

    /// Poll the server properties until the call succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::RetriesExhausted`] carrying the last failure once
    /// the attempt budget is spent.
    pub async fn wait_for_server_properties(&self) -> Result<ServerProperties, SetupError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.source.server_properties().await {
                Ok(properties) => return Ok(properties),
                Err(last) if attempt >= max_attempts => {
                    return Err(SetupError::RetriesExhausted {
                        attempts: attempt,
                        last,
                    });
                }
                Err(error) => {
                    warn!(attempt, max_attempts, %error, "server properties unavailable; retrying");
                    self.sleeper.sleep(self.policy.delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run the full bootstrap and create a card named `card_name`.
    ///
    /// # Errors
    ///
    /// Fails on readiness exhaustion or on the first failing setup, login, or
    /// card-creation call.
    pub async fn bootstrap(
        &mut self,
        credentials: &Credentials,
        card_name: &str,
    ) -> Result<SetupOutcome, SetupError> {
        let properties = self.wait_for_server_properties().await?;

        let performed_initial_setup = match properties.pending_setup_token() {
            Some(token) => {
                info!("performing initial server setup");
                self.source
                    .complete_initial_setup(token, credentials)
                    .await?;
                true
            }
            None => {
                info!("initial setup has already been completed");
                false
            }
        };

        self.source.login(credentials).await?;
        let card_id = self.source.create_card(card_name).await?;
        info!(%card_id, card_name, "card created");

        Ok(SetupOutcome {
            performed_initial_setup,
            card_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::SessionToken;
    use crate::domain::ports::MockReportSource;

    #[derive(Default)]
    struct RecordingSleeper(Mutex<Vec<Duration>>);

    #[async_trait]
    impl SetupSleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().expect("sleeper mutex").push(duration);
        }
    }

    fn policy(max_attempts: u32) -> SetupRetryPolicy {
        SetupRetryPolicy {
            max_attempts,
            delay: Duration::from_secs(10),
        }
    }

    fn unavailable() -> QueryClientError {
        QueryClientError::transport("server properties", "connection refused")
    }

    #[tokio::test]
    async fn polls_with_fixed_delay_until_properties_arrive() {
        let mut source = MockReportSource::new();
        let mut calls = 0;
        source.expect_server_properties().times(3).returning(move || {
            calls += 1;
            if calls < 3 {
                Err(unavailable())
            } else {
                Ok(ServerProperties::default())
            }
        });
        let sleeper = Arc::new(RecordingSleeper::default());

        let setup = ReportSetup::new(Box::new(source), sleeper.clone(), policy(5));
        let properties = setup
            .wait_for_server_properties()
            .await
            .expect("third attempt succeeds");

        assert_eq!(properties, ServerProperties::default());
        assert_eq!(
            *sleeper.0.lock().expect("sleeper mutex"),
            vec![Duration::from_secs(10); 2]
        );
    }

    #[tokio::test]
    async fn gives_up_after_the_attempt_budget() {
        let mut source = MockReportSource::new();
        source
            .expect_server_properties()
            .times(2)
            .returning(|| Err(unavailable()));
        let sleeper = Arc::new(RecordingSleeper::default());

        let setup = ReportSetup::new(Box::new(source), sleeper.clone(), policy(2));
        let error = setup
            .wait_for_server_properties()
            .await
            .expect_err("budget is exhausted");

        assert_eq!(
            error,
            SetupError::RetriesExhausted {
                attempts: 2,
                last: unavailable()
            }
        );
        assert_eq!(sleeper.0.lock().expect("sleeper mutex").len(), 1);
    }

    #[tokio::test]
    async fn completes_pending_setup_before_creating_card() {
        let mut source = MockReportSource::new();
        source.expect_server_properties().returning(|| {
            Ok(ServerProperties {
                setup_token: Some("setup-123".to_owned()),
            })
        });
        source
            .expect_complete_initial_setup()
            .withf(|token, _| token.to_owned() == "setup-123")
            .times(1)
            .returning(|_, _| Ok(()));
        source
            .expect_login()
            .times(1)
            .returning(|_| Ok(SessionToken::new("s").expect("non-blank")));
        source
            .expect_create_card()
            .withf(|name| name.to_owned() == "monthly")
            .times(1)
            .returning(|_| Ok(CardId::new("1")));
        let sleeper = Arc::new(RecordingSleeper::default());

        let mut setup = ReportSetup::new(Box::new(source), sleeper.clone(), policy(1));
        let outcome = setup
            .bootstrap(&Credentials::new("a@b.c", "pw"), "monthly")
            .await
            .expect("bootstrap succeeds");

        assert!(outcome.performed_initial_setup);
        assert_eq!(outcome.card_id, CardId::new("1"));
    }

    #[tokio::test]
    async fn skips_setup_when_server_is_initialised() {
        let mut source = MockReportSource::new();
        source.expect_server_properties().returning(|| {
            Ok(ServerProperties {
                setup_token: Some("  ".to_owned()),
            })
        });
        source.expect_complete_initial_setup().never();
        source
            .expect_login()
            .returning(|_| Ok(SessionToken::new("s").expect("non-blank")));
        source
            .expect_create_card()
            .returning(|_| Ok(CardId::new("9")));
        let sleeper = Arc::new(RecordingSleeper::default());

        let mut setup = ReportSetup::new(Box::new(source), sleeper.clone(), policy(1));
        let outcome = setup
            .bootstrap(&Credentials::new("a@b.c", "pw"), "monthly")
            .await
            .expect("bootstrap succeeds");

        assert!(!outcome.performed_initial_setup);
    }
}
