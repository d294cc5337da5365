//! Movement classification for a new ping against the cached prior position.

use crate::geo::haversine_distance_m;
use crate::model::{CachedLocation, LocationPing};

/// Classification of one processed ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// First ping ever seen for this user.
    New,
    /// Within the movement threshold of the previous position.
    Unchanged,
    /// Beyond the movement threshold of the previous position.
    Moved,
}

/// Classify a ping given the user's previous cached position.
///
/// An absent previous position is always `New`. Otherwise the great-circle
/// distance to the previous position is compared against `threshold_m`
/// (meters); the boundary is exclusive, so a distance exactly equal to the
/// threshold classifies as `Unchanged`. Deterministic, no side effects.
pub fn evaluate(
    previous: Option<&CachedLocation>,
    ping: &LocationPing,
    threshold_m: f64,
) -> Movement {
    let Some(prev) = previous else {
        return Movement::New;
    };

    let distance_m = haversine_distance_m(prev.lat, prev.lng, ping.lat, ping.lng);
    if distance_m > threshold_m {
        Movement::Moved
    } else {
        Movement::Unchanged
    }
}
