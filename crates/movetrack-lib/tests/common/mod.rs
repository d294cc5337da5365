// Shared helpers for movetrack-lib integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::sync::Mutex;

use movetrack_lib::{Error, EventForwarder, MovementEvent, Result, StreamRecord};

/// Forwarder that records every accepted event, optionally failing every call.
#[derive(Default)]
pub struct RecordingForwarder {
    pub events: Mutex<Vec<MovementEvent>>,
    pub fail: bool,
}

impl RecordingForwarder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub async fn events(&self) -> Vec<MovementEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventForwarder for RecordingForwarder {
    async fn forward(&self, event: &MovementEvent) -> Result<()> {
        if self.fail {
            return Err(Error::Forward {
                message: "sink unavailable".to_string(),
            });
        }
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Build a stream record carrying a base64-encoded JSON ping, partitioned by
/// user id the way the upstream producer does.
pub fn ping_record(user_id: &str, lat: f64, lng: f64) -> StreamRecord {
    let payload = serde_json::json!({ "userID": user_id, "lat": lat, "lng": lng });
    StreamRecord {
        partition_key: user_id.to_string(),
        data: BASE64.encode(payload.to_string()),
    }
}

/// Build a stream record from an arbitrary JSON payload.
pub fn raw_record(partition_key: &str, payload: &serde_json::Value) -> StreamRecord {
    StreamRecord {
        partition_key: partition_key.to_string(),
        data: BASE64.encode(payload.to_string()),
    }
}
