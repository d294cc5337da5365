//! Durable, at-least-once delivery of movement events to the downstream sink.
//!
//! Delivery is not idempotent: a retry after a non-committed partial success
//! can append the same event twice, so the sink's consumer must tolerate
//! duplicates.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_firehose::primitives::Blob;
use aws_sdk_firehose::types::Record;
use aws_sdk_firehose::Client;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::MovementEvent;

/// Append-only sink for movement events.
#[async_trait]
pub trait EventForwarder: Send + Sync {
    /// Durably append one event. On success exactly one record has been
    /// accepted by the sink for this call.
    async fn forward(&self, event: &MovementEvent) -> Result<()>;
}

#[async_trait]
impl<F: EventForwarder + ?Sized> EventForwarder for Arc<F> {
    async fn forward(&self, event: &MovementEvent) -> Result<()> {
        (**self).forward(event).await
    }
}

/// How the batch loop reacts when forwarding fails after retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Log the failure and continue with the next record. The movement event
    /// is lost.
    #[default]
    BestEffort,
    /// Fail the whole batch so the hosting runtime retries it from the last
    /// committed offset.
    FailBatch,
}

impl FromStr for DeliveryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "best-effort" => Ok(DeliveryPolicy::BestEffort),
            "fail-batch" => Ok(DeliveryPolicy::FailBatch),
            other => Err(Error::InvalidConfig {
                name: "DELIVERY_POLICY".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Forwarder appending one record per event to a Kinesis Firehose delivery
/// stream, as a JSON byte blob.
pub struct FirehoseForwarder {
    client: Client,
    stream_name: String,
}

impl FirehoseForwarder {
    pub fn new(client: Client, stream_name: impl Into<String>) -> Self {
        Self {
            client,
            stream_name: stream_name.into(),
        }
    }
}

#[async_trait]
impl EventForwarder for FirehoseForwarder {
    async fn forward(&self, event: &MovementEvent) -> Result<()> {
        let data = serde_json::to_vec(event)?;
        let record = Record::builder()
            .data(Blob::new(data))
            .build()
            .map_err(|e| Error::Forward {
                message: e.to_string(),
            })?;

        self.client
            .put_record()
            .delivery_stream_name(&self.stream_name)
            .record(record)
            .send()
            .await
            .map_err(|e| Error::Forward {
                message: e.to_string(),
            })?;

        Ok(())
    }
}

/// Decorator adding bounded retries with exponential backoff around an inner
/// forwarder, for transient sink unavailability. After `max_attempts` the
/// last error is returned to the caller.
pub struct RetryingForwarder<F> {
    inner: F,
    max_attempts: u32,
    base_delay: Duration,
}

impl<F> RetryingForwarder<F> {
    /// `max_attempts` counts the initial attempt; it is clamped to at least 1.
    pub fn new(inner: F, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }
}

#[async_trait]
impl<F: EventForwarder> EventForwarder for RetryingForwarder<F> {
    async fn forward(&self, event: &MovementEvent) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.forward(event).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        user_id = %event.user_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "sink append failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
