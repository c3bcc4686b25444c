//! Environment overrides
//!
//! These optionally override settings from config.toml (see config_file
//! module). Invalid values are logged and ignored.
//!
//! Environment variables (all optional):
//! - PHASMO_CATALOG_URL: Ghost catalog endpoint (http:// or https://)
//! - PHASMO_TIMER_POLL_MS: How often running timers are checked for completion

use crate::constants::{TIMER_POLL_INTERVAL_MS, TIMER_POLL_MAX_MS, TIMER_POLL_MIN_MS};
use crate::ghost::model::is_absolute_http_url;
use log::{debug, info, warn};
use std::env;

/// Parse the PHASMO_CATALOG_URL environment variable
///
/// Returns Some(url) for an absolute http(s) URL, None otherwise
pub fn parse_catalog_url() -> Option<String> {
    match env::var("PHASMO_CATALOG_URL") {
        Ok(val) => {
            let url = val.trim();
            if is_absolute_http_url(url) {
                info!("Catalog URL set via environment variable: {}", url);
                Some(url.to_string())
            } else {
                warn!(
                    "Invalid PHASMO_CATALOG_URL: '{}' (must start with http:// or https://). Using config file.",
                    val
                );
                None
            }
        }
        Err(_) => {
            debug!("PHASMO_CATALOG_URL not set.");
            None
        }
    }
}

/// Parse the PHASMO_TIMER_POLL_MS environment variable
///
/// Returns Some(ms) if within 50-1000 milliseconds
pub fn parse_timer_poll_interval() -> Option<u64> {
    match env::var("PHASMO_TIMER_POLL_MS") {
        Ok(val) => match val.parse::<u64>() {
            Ok(ms) if (TIMER_POLL_MIN_MS..=TIMER_POLL_MAX_MS).contains(&ms) => {
                info!("Timer poll interval set via environment variable: {} ms", ms);
                Some(ms)
            }
            Ok(ms) => {
                warn!(
                    "Invalid timer poll interval: {} (must be {}-{} ms). Using default.",
                    ms, TIMER_POLL_MIN_MS, TIMER_POLL_MAX_MS
                );
                None
            }
            Err(e) => {
                warn!("Failed to parse PHASMO_TIMER_POLL_MS: {}. Using default.", e);
                None
            }
        },
        Err(_) => {
            debug!("PHASMO_TIMER_POLL_MS not set.");
            None
        }
    }
}

/// Poll interval to use: the environment override or the default
pub fn timer_poll_interval_ms() -> u64 {
    parse_timer_poll_interval().unwrap_or(TIMER_POLL_INTERVAL_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each variable is exercised by a single test so parallel tests never
    // observe each other's values.

    #[test]
    fn test_parse_catalog_url() {
        env::set_var("PHASMO_CATALOG_URL", "https://example.com/ghosts");
        assert_eq!(
            parse_catalog_url(),
            Some("https://example.com/ghosts".to_string()),
            "Should accept https URL"
        );

        env::set_var("PHASMO_CATALOG_URL", "  http://localhost:8080/ghosts ");
        assert_eq!(
            parse_catalog_url(),
            Some("http://localhost:8080/ghosts".to_string()),
            "Should trim and accept http URL"
        );

        env::set_var("PHASMO_CATALOG_URL", "ftp://example.com/ghosts");
        assert_eq!(parse_catalog_url(), None, "Should reject non-http scheme");

        env::set_var("PHASMO_CATALOG_URL", "/ghosts");
        assert_eq!(parse_catalog_url(), None, "Should reject relative URL");

        env::set_var("PHASMO_CATALOG_URL", "");
        assert_eq!(parse_catalog_url(), None, "Should reject empty string");

        env::remove_var("PHASMO_CATALOG_URL");
        assert_eq!(parse_catalog_url(), None, "Should return None when not set");
    }

    #[test]
    fn test_parse_timer_poll_interval() {
        // Boundaries
        env::set_var("PHASMO_TIMER_POLL_MS", "50");
        assert_eq!(parse_timer_poll_interval(), Some(50), "Should accept 50 ms");

        env::set_var("PHASMO_TIMER_POLL_MS", "1000");
        assert_eq!(
            parse_timer_poll_interval(),
            Some(1000),
            "Should accept 1000 ms"
        );

        env::set_var("PHASMO_TIMER_POLL_MS", "250");
        assert_eq!(timer_poll_interval_ms(), 250);

        env::set_var("PHASMO_TIMER_POLL_MS", "49");
        assert_eq!(parse_timer_poll_interval(), None, "Should reject 49 ms");

        env::set_var("PHASMO_TIMER_POLL_MS", "1001");
        assert_eq!(parse_timer_poll_interval(), None, "Should reject 1001 ms");

        env::set_var("PHASMO_TIMER_POLL_MS", "-100");
        assert_eq!(
            parse_timer_poll_interval(),
            None,
            "Should reject negative value"
        );

        env::set_var("PHASMO_TIMER_POLL_MS", "100ms");
        assert_eq!(
            parse_timer_poll_interval(),
            None,
            "Should reject value with units"
        );

        env::remove_var("PHASMO_TIMER_POLL_MS");
        assert_eq!(parse_timer_poll_interval(), None);
        assert_eq!(timer_poll_interval_ms(), TIMER_POLL_INTERVAL_MS);
    }
}
