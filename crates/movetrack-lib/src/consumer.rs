//! Batch processing of raw stream records.
//!
//! One invocation processes one ordered batch, record by record: decode,
//! validate, classify against the cached position, forward significant
//! events, refresh the cache. Records inside a batch are strictly sequential
//! and in stream order; every await point is a cache or sink call.
//!
//! Failure semantics follow the batch as the unit of retry:
//!
//! - a record that decodes but fails field validation is logged and skipped;
//! - a base64/JSON decode error or a cache failure aborts the whole batch by
//!   returning `Err`, so the hosting runtime retries from the last committed
//!   offset;
//! - a forward failure after retries is handled per the configured
//!   [`DeliveryPolicy`].
//!
//! Re-processing the same batch converges to the same terminal cache state;
//! duplicate sink events from a retried batch are expected and must be
//! tolerated downstream.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::cache::LocationCache;
use crate::error::Result;
use crate::evaluator::{evaluate, Movement};
use crate::forwarder::{DeliveryPolicy, EventForwarder};
use crate::model::{CachedLocation, MovementEvent, RawPing};

/// One raw record as delivered by the inbound stream: a partition key and a
/// base64-encoded JSON payload.
#[derive(Debug, Clone)]
pub struct StreamRecord {
    pub partition_key: String,
    pub data: String,
}

/// Outcome counters for one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records that passed validation and updated the cache.
    pub processed: usize,
    /// Records skipped due to field validation failure.
    pub skipped: usize,
    /// Movement events accepted by the sink.
    pub forwarded: usize,
}

/// Drives one evaluation-and-forward cycle per record over an injected cache
/// and forwarder.
///
/// Correct classification for a user requires all of that user's pings to
/// arrive on the same partition (upstream partition key = user id); the
/// processor performs no per-user locking of its own.
pub struct PingProcessor<C, F> {
    cache: C,
    forwarder: F,
    threshold_m: f64,
    delivery_policy: DeliveryPolicy,
}

impl<C: LocationCache, F: EventForwarder> PingProcessor<C, F> {
    pub fn new(cache: C, forwarder: F, threshold_m: f64, delivery_policy: DeliveryPolicy) -> Self {
        Self {
            cache,
            forwarder,
            threshold_m,
            delivery_policy,
        }
    }

    /// Process one ordered batch of raw records.
    ///
    /// Returns `Err` only for batch-fatal conditions (payload decode errors,
    /// cache failures, or forward failures under [`DeliveryPolicy::FailBatch`]);
    /// the caller is expected to surface that to the hosting runtime so the
    /// batch is retried in full.
    pub async fn process_batch(&self, records: &[StreamRecord]) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        for record in records {
            let payload = BASE64.decode(record.data.as_bytes())?;
            let raw: RawPing = serde_json::from_slice(&payload)?;

            let ping = match raw.validate() {
                Ok(ping) => ping,
                Err(err) => {
                    warn!(
                        partition_key = %record.partition_key,
                        error = %err,
                        "skipping invalid record"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            let previous = self.cache.get(&ping.user_id).await?;
            let movement = evaluate(previous.as_ref(), &ping, self.threshold_m);

            match movement {
                Movement::New | Movement::Moved => {
                    let event = MovementEvent::from_ping(&ping);
                    match self.forwarder.forward(&event).await {
                        Ok(()) => {
                            summary.forwarded += 1;
                            info!(
                                user_id = %ping.user_id,
                                movement = ?movement,
                                threshold_m = self.threshold_m,
                                "movement event forwarded"
                            );
                        }
                        Err(err) => match self.delivery_policy {
                            DeliveryPolicy::BestEffort => {
                                error!(
                                    user_id = %ping.user_id,
                                    error = %err,
                                    "dropping movement event after retries"
                                );
                            }
                            DeliveryPolicy::FailBatch => return Err(err),
                        },
                    }
                }
                Movement::Unchanged => {
                    debug!(user_id = %ping.user_id, "user has not moved");
                }
            }

            // The cache always reflects the latest observation, significant
            // or not. A failed set aborts the batch: proceeding would leave
            // cache and sink inconsistent.
            self.cache
                .set(&ping.user_id, &CachedLocation::from_ping(&ping, Utc::now()))
                .await?;

            summary.processed += 1;
        }

        Ok(summary)
    }
}
