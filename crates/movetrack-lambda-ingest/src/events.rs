//! Serde types for the Kinesis stream-trigger event shape.
//!
//! Only the fields the pipeline consumes are modeled; everything else in the
//! trigger payload (sequence numbers, ARNs, schema versions) is ignored.

use serde::Deserialize;

use movetrack_lib::StreamRecord;

/// One Kinesis trigger invocation: an ordered batch of records from a single
/// shard.
#[derive(Debug, Clone, Deserialize)]
pub struct KinesisEvent {
    #[serde(rename = "Records")]
    pub records: Vec<KinesisEventRecord>,
}

/// One record wrapper in the trigger payload.
#[derive(Debug, Clone, Deserialize)]
pub struct KinesisEventRecord {
    pub kinesis: KinesisRecordData,
    #[serde(rename = "eventID", default)]
    pub event_id: String,
}

/// The Kinesis-level record body: partition key plus base64-encoded payload.
#[derive(Debug, Clone, Deserialize)]
pub struct KinesisRecordData {
    #[serde(rename = "partitionKey")]
    pub partition_key: String,
    pub data: String,
}

impl From<KinesisEventRecord> for StreamRecord {
    fn from(record: KinesisEventRecord) -> Self {
        StreamRecord {
            partition_key: record.kinesis.partition_key,
            data: record.kinesis.data,
        }
    }
}
