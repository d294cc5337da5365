//! Environment-driven pipeline configuration.
//!
//! The original deployment wired its clients through process-wide singletons
//! configured at load time; here the configuration is read once into an
//! explicit value and the clients it describes are constructed and injected
//! by the binary.

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::forwarder::DeliveryPolicy;

/// Default movement threshold in meters.
pub const DEFAULT_THRESHOLD_M: f64 = 100.0;

/// Default number of sink delivery attempts per event.
pub const DEFAULT_FORWARD_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for forward retry backoff.
pub const DEFAULT_FORWARD_RETRY_BASE: Duration = Duration::from_millis(100);

/// Pipeline configuration, normally read from the environment at cold start.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Cache endpoint host (`REDIS_HOST`).
    pub cache_host: String,
    /// Cache endpoint port (`REDIS_PORT`).
    pub cache_port: u16,
    /// Destination delivery stream (`FIREHOSE_STREAM_NAME`).
    pub sink_stream_name: String,
    /// Movement classification threshold in meters (`MOVEMENT_THRESHOLD_M`).
    pub movement_threshold_m: f64,
    /// Optional per-key cache TTL (`CACHE_TTL_SECONDS`); `None` means entries
    /// never expire.
    pub cache_retention: Option<Duration>,
    /// Handling of forward failures inside a batch (`DELIVERY_POLICY`).
    pub delivery_policy: DeliveryPolicy,
    /// Sink delivery attempts per event (`FORWARD_MAX_ATTEMPTS`).
    pub forward_max_attempts: u32,
    /// Base delay for forward retry backoff (`FORWARD_RETRY_BASE_MS`).
    pub forward_retry_base: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_host: "127.0.0.1".to_string(),
            cache_port: 6379,
            sink_stream_name: "movement-events".to_string(),
            movement_threshold_m: DEFAULT_THRESHOLD_M,
            cache_retention: None,
            delivery_policy: DeliveryPolicy::default(),
            forward_max_attempts: DEFAULT_FORWARD_MAX_ATTEMPTS,
            forward_retry_base: DEFAULT_FORWARD_RETRY_BASE,
        }
    }
}

impl PipelineConfig {
    /// Read the configuration from the environment.
    ///
    /// `FIREHOSE_STREAM_NAME` is required; everything else falls back to the
    /// defaults above. Unparseable values are configuration errors, not
    /// silent fallbacks.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            cache_host: env::var("REDIS_HOST").unwrap_or(defaults.cache_host),
            cache_port: parse_var("REDIS_PORT")?.unwrap_or(defaults.cache_port),
            sink_stream_name: env::var("FIREHOSE_STREAM_NAME").map_err(|_| {
                Error::MissingConfig {
                    name: "FIREHOSE_STREAM_NAME".to_string(),
                }
            })?,
            movement_threshold_m: parse_var("MOVEMENT_THRESHOLD_M")?
                .unwrap_or(defaults.movement_threshold_m),
            cache_retention: match parse_var::<u64>("CACHE_TTL_SECONDS")? {
                // Redis rejects a zero expiry; unset the variable for the
                // never-expire default instead.
                Some(0) => {
                    return Err(Error::InvalidConfig {
                        name: "CACHE_TTL_SECONDS".to_string(),
                        value: "0".to_string(),
                    })
                }
                retention => retention.map(Duration::from_secs),
            },
            delivery_policy: match env::var("DELIVERY_POLICY") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.delivery_policy,
            },
            forward_max_attempts: parse_var("FORWARD_MAX_ATTEMPTS")?
                .unwrap_or(defaults.forward_max_attempts),
            forward_retry_base: parse_var::<u64>("FORWARD_RETRY_BASE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.forward_retry_base),
        })
    }
}

/// Parse an optional environment variable, distinguishing "absent" from
/// "present but invalid".
fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidConfig {
                name: name.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = PipelineConfig::default();
        assert_eq!(config.movement_threshold_m, 100.0);
        assert_eq!(config.cache_port, 6379);
        assert!(config.cache_retention.is_none());
        assert_eq!(config.delivery_policy, DeliveryPolicy::BestEffort);
        assert_eq!(config.forward_max_attempts, 3);
    }

    #[test]
    fn rejects_zero_cache_ttl() {
        // No other test in this crate reads these variables, so setting them
        // here does not race the rest of the suite.
        std::env::set_var("FIREHOSE_STREAM_NAME", "movement-events");
        std::env::set_var("CACHE_TTL_SECONDS", "0");

        let err = PipelineConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { ref name, .. } if name == "CACHE_TTL_SECONDS"));

        std::env::set_var("CACHE_TTL_SECONDS", "3600");
        let config = PipelineConfig::from_env().unwrap();
        assert_eq!(config.cache_retention, Some(Duration::from_secs(3600)));

        std::env::remove_var("CACHE_TTL_SECONDS");
        std::env::remove_var("FIREHOSE_STREAM_NAME");
    }

    #[test]
    fn parse_var_distinguishes_absent_from_invalid() {
        // Variable names are unique to this test to avoid clashing with
        // parallel test processes mutating the environment.
        assert_eq!(
            parse_var::<u16>("MOVETRACK_TEST_UNSET_VAR").unwrap(),
            None
        );

        std::env::set_var("MOVETRACK_TEST_BAD_PORT", "not-a-port");
        let err = parse_var::<u16>("MOVETRACK_TEST_BAD_PORT").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        std::env::remove_var("MOVETRACK_TEST_BAD_PORT");
    }
}
