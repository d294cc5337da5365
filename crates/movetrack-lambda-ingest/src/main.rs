//! AWS Lambda function consuming Kinesis location batches.
//!
//! Each invocation receives one ordered batch of pings from a single shard,
//! runs the movement pipeline over it (Redis last-known-position cache,
//! Firehose event sink), and reports counters back to the runtime. A fatal
//! batch error propagates as a handler error so the runtime retries the
//! batch from the last committed offset.
//!
//! The upstream producer partitions the stream by user id, so all pings for
//! one user arrive on one shard in order; cross-shard invocations run in
//! parallel and share state only through the external cache.

#![deny(warnings)]

mod events;
mod tracing_init;

use std::sync::Arc;

use aws_config::BehaviorVersion;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::Serialize;
use tracing::{error, info};

use events::KinesisEvent;
use movetrack_lib::{
    EventForwarder, FirehoseForwarder, LocationCache, PingProcessor, PipelineConfig,
    RedisLocationCache, RetryingForwarder, StreamRecord,
};
use tracing_init::init_tracing;

/// Counters returned to the runtime for one processed batch.
#[derive(Debug, Serialize)]
struct BatchResponse {
    received: usize,
    processed: usize,
    skipped: usize,
    forwarded: usize,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = PipelineConfig::from_env()?;
    info!(
        cache_host = %config.cache_host,
        cache_port = config.cache_port,
        stream = %config.sink_stream_name,
        threshold_m = config.movement_threshold_m,
        delivery_policy = ?config.delivery_policy,
        "starting movetrack ingest"
    );

    let cache =
        RedisLocationCache::connect(&config.cache_host, config.cache_port, config.cache_retention)
            .await?;

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let firehose = aws_sdk_firehose::Client::new(&aws_config);
    let forwarder = RetryingForwarder::new(
        FirehoseForwarder::new(firehose, config.sink_stream_name.clone()),
        config.forward_max_attempts,
        config.forward_retry_base,
    );

    let processor = Arc::new(PingProcessor::new(
        cache,
        forwarder,
        config.movement_threshold_m,
        config.delivery_policy,
    ));

    lambda_runtime::run(service_fn(move |event| {
        let processor = Arc::clone(&processor);
        async move { handler(event, processor).await }
    }))
    .await
}

async fn handler<C: LocationCache, F: EventForwarder>(
    event: LambdaEvent<KinesisEvent>,
    processor: Arc<PingProcessor<C, F>>,
) -> Result<BatchResponse, Error> {
    let request_id = event.context.request_id.clone();
    let first_event_id = event
        .payload
        .records
        .first()
        .map(|r| r.event_id.clone())
        .unwrap_or_default();

    let records: Vec<StreamRecord> = event
        .payload
        .records
        .into_iter()
        .map(StreamRecord::from)
        .collect();

    info!(
        request_id = %request_id,
        records = records.len(),
        first_event_id = %first_event_id,
        "handling kinesis batch"
    );

    let summary = match processor.process_batch(&records).await {
        Ok(summary) => summary,
        Err(e) => {
            // Surfacing the error triggers the runtime's batch retry.
            error!(request_id = %request_id, error = %e, "batch processing failed");
            return Err(Error::from(e));
        }
    };

    info!(
        request_id = %request_id,
        processed = summary.processed,
        skipped = summary.skipped,
        forwarded = summary.forwarded,
        "batch processed"
    );

    Ok(BatchResponse {
        received: records.len(),
        processed: summary.processed,
        skipped: summary.skipped,
        forwarded: summary.forwarded,
    })
}
