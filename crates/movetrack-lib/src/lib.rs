//! Movetrack pipeline entry points.
//!
//! This crate implements a streaming location-update pipeline: decode batches
//! of per-user GPS pings from an ordered partitioned stream, compare each ping
//! against the user's last recorded position in a key-value cache, and forward
//! only significant movement (and first-sighting) events to a durable
//! append-only sink. Higher-level consumers (the Lambda binary, local tools)
//! should only depend on the types exported here instead of reimplementing
//! behavior.
//!
//! Correct per-user classification relies on the upstream producer using the
//! user identifier as the stream partition key, so that all pings for one user
//! arrive on the same partition in order. The cache layer performs no
//! client-side locking.

#![deny(warnings)]

pub mod cache;
pub mod config;
pub mod consumer;
pub mod error;
pub mod evaluator;
pub mod forwarder;
pub mod geo;
pub mod model;

pub use cache::{LocationCache, MemoryLocationCache, RedisLocationCache};
pub use config::PipelineConfig;
pub use consumer::{BatchSummary, PingProcessor, StreamRecord};
pub use error::{Error, Result};
pub use evaluator::{evaluate, Movement};
pub use forwarder::{DeliveryPolicy, EventForwarder, FirehoseForwarder, RetryingForwarder};
pub use geo::haversine_distance_m;
pub use model::{CachedLocation, LocationPing, MovementEvent, RawPing};
