//! Normalization of validated configuration into runtime values.
//!
//! Converts human-readable fields into the forms the rest of the gateway
//! operates on: duration strings become [`Duration`](std::time::Duration)s
//! and methods are uppercased. Running it twice yields the same tree.

use thiserror::Error;

use crate::config::duration::{parse_duration, parse_penalty, DurationError};
use crate::config::schema::{Config, RateLimiterConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    #[error("configuration has not passed validation")]
    NotValidated,

    /// Validation accepted a duration the parser rejects. Both use the same
    /// grammar, so this indicates an internal fault.
    #[error("internal inconsistency parsing {field} for {scope}: {source}")]
    Duration {
        scope: String,
        field: &'static str,
        #[source]
        source: DurationError,
    },
}

fn optimize_rate_limiter(rl: &mut RateLimiterConfig, scope: &str) -> Result<(), OptimizeError> {
    if !rl.enabled {
        return Ok(());
    }

    rl.window = rl.window.to_ascii_uppercase();
    rl.penalty = rl.penalty.to_ascii_uppercase();

    rl.window_duration = parse_duration(&rl.window).map_err(|source| OptimizeError::Duration {
        scope: scope.to_string(),
        field: "window",
        source,
    })?;
    rl.penalty_duration = parse_penalty(&rl.penalty).map_err(|source| OptimizeError::Duration {
        scope: scope.to_string(),
        field: "penalty",
        source,
    })?;
    rl.penalty_enabled = !rl.penalty_duration.is_zero();

    Ok(())
}

/// Optimize a config in place. Refuses a config that has not passed
/// validation.
pub fn optimize_config(config: &mut Config) -> Result<(), OptimizeError> {
    if !config.validated || config.validation_failed {
        return Err(OptimizeError::NotValidated);
    }

    let gw = &mut config.gateway;
    optimize_rate_limiter(&mut gw.rate_limit, "the gateway")?;

    for ep in gw.endpoints.iter_mut() {
        optimize_rate_limiter(&mut ep.rate_limit, &format!("endpoint '{}'", ep.name))?;
        ep.method = ep.method.to_ascii_uppercase();
    }

    Ok(())
}
