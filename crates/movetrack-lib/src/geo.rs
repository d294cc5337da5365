//! Great-circle distance between two latitude/longitude pairs.
//!
//! The pipeline only needs a standard haversine approximation; geodesic
//! precision beyond that is out of scope. The unit is meters end to end:
//! the movement threshold in [`crate::config::PipelineConfig`] is expressed
//! in meters and compared directly against this function's output.

/// Physical constants for distance calculations.
pub mod constants {
    /// Mean Earth radius in meters.
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
}

/// Calculate the great-circle distance between two points in meters, using
/// the haversine formula.
///
/// Pure and total over finite inputs; non-finite coordinates propagate to a
/// NaN result without panicking. Callers validate coordinates before use, so
/// a NaN here never reaches the movement classification.
pub fn haversine_distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

    2.0 * constants::EARTH_RADIUS_M * a.sqrt().asin()
}
