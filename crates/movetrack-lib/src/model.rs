//! Data model for the location pipeline.
//!
//! Inbound payloads are untrusted: the stream delivers base64-encoded JSON of
//! the form `{"userID": "...", "lat": ..., "lng": ...}`. Decoding is split in
//! two steps so that a syntactically valid payload with missing or bad fields
//! can be skipped per record instead of failing the whole batch:
//! [`RawPing`] tolerates absent and wrong-typed fields, [`RawPing::validate`]
//! produces a well-formed [`LocationPing`] or a recoverable validation error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A decoded but not yet validated inbound payload.
///
/// Fields decode leniently: a missing or wrong-typed field becomes `None`
/// and is reported by [`RawPing::validate`] as a per-record validation
/// failure. Only JSON that does not parse at all is a decode error.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPing {
    #[serde(rename = "userID", default, deserialize_with = "lenient")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub lng: Option<f64>,
}

/// Deserialize a field into `None` on type mismatch instead of failing the
/// surrounding payload.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl RawPing {
    /// Validate field presence and coordinate ranges, producing a
    /// [`LocationPing`].
    ///
    /// The upstream producer does not enforce coordinate ranges, so they are
    /// checked here: lat ∈ [-90, 90], lng ∈ [-180, 180], both finite.
    pub fn validate(self) -> Result<LocationPing> {
        let user_id = self
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::invalid_ping("missing userID"))?;
        let lat = self.lat.ok_or_else(|| Error::invalid_ping("missing lat"))?;
        let lng = self.lng.ok_or_else(|| Error::invalid_ping("missing lng"))?;

        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::invalid_ping(format!("lat {lat} out of range")));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(Error::invalid_ping(format!("lng {lng} out of range")));
        }

        Ok(LocationPing { user_id, lat, lng })
    }
}

/// One validated location observation for a user. Ephemeral: one per inbound
/// record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPing {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub lat: f64,
    pub lng: f64,
}

/// The last accepted position for a user, as stored in the cache.
///
/// Overwritten on every processed ping regardless of movement classification,
/// so the cache always reflects the latest observation, not just the latest
/// significant one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLocation {
    pub lat: f64,
    pub lng: f64,
    pub recorded_at: DateTime<Utc>,
}

impl CachedLocation {
    /// Build a cache entry from an accepted ping.
    pub fn from_ping(ping: &LocationPing, recorded_at: DateTime<Utc>) -> Self {
        Self {
            lat: ping.lat,
            lng: ping.lng,
            recorded_at,
        }
    }
}

/// Outbound sink record, emitted only for `New` and `Moved` classifications.
/// Field names are wire-compatible with the inbound payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementEvent {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub lat: f64,
    pub lng: f64,
}

impl MovementEvent {
    /// Build a sink event from an accepted ping.
    pub fn from_ping(ping: &LocationPing) -> Self {
        Self {
            user_id: ping.user_id.clone(),
            lat: ping.lat,
            lng: ping.lng,
        }
    }
}
