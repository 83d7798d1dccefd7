//! Test doubles shared by unit tests (in `src/`) and integration tests (in
//! `tests/`). Compiled for tests and behind the `test-support` feature.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use crate::domain::EmailMessage;
use crate::domain::ports::{DeliveryError, MailTransport};

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Clock fixed at the given UTC calendar time.
    ///
    /// # Panics
    ///
    /// Panics when the components do not form a valid timestamp.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        match Utc
            .with_ymd_and_hms(year, month, day, hour, minute, second)
            .single()
        {
            Some(now) => Self(now),
            None => panic!("invalid fixed clock timestamp {year}-{month}-{day}T{hour}:{minute}:{second}"),
        }
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Mail transport that records every message instead of sending it.
///
/// A scripted failure, when set, is returned for every send and nothing is
/// recorded.
#[derive(Debug, Default)]
pub struct RecordingMailTransport {
    sent: Mutex<Vec<EmailMessage>>,
    failure: Mutex<Option<DeliveryError>>,
}

impl RecordingMailTransport {
    /// Transport that rejects every message with `error`.
    pub fn failing(error: DeliveryError) -> Self {
        Self {
            sent: Mutex::default(),
            failure: Mutex::new(Some(error)),
        }
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<EmailMessage> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }
        lock(&self.sent).push(message.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
