use std::env;
use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};
use tracing::warn;

const MAX_ADVANCE_DAYS: i64 = 365;
const MAX_ADVANCE_HOURS: i64 = 24 * 365;
const MAX_MINUTES_BETWEEN_SAME_PATIENT: i64 = 60 * 24 * 365;

/// Which persistence backend the scheduling services talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "memory" | "in_memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown scheduling store: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub clinic_utc_offset: FixedOffset,
    pub max_advance_days: i64,
    pub min_advance_hours: i64,
    pub min_minutes_between_same_patient: i64,
    pub scheduling_store: StoreBackend,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, falling back to anon key");
                    supabase_anon_key.clone()
                }),
            supabase_anon_key,
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            clinic_utc_offset: env::var("CLINIC_UTC_OFFSET")
                .ok()
                .and_then(|raw| {
                    let parsed = parse_utc_offset(&raw);
                    if parsed.is_none() {
                        warn!("CLINIC_UTC_OFFSET '{}' is not a valid offset, using +00:00", raw);
                    }
                    parsed
                })
                .unwrap_or_else(utc_offset),
            max_advance_days: env_number("BOOKING_MAX_ADVANCE_DAYS", 7, MAX_ADVANCE_DAYS),
            min_advance_hours: env_number("BOOKING_MIN_ADVANCE_HOURS", 2, MAX_ADVANCE_HOURS),
            min_minutes_between_same_patient: env_number(
                "BOOKING_MIN_MINUTES_BETWEEN_SAME_PATIENT",
                60,
                MAX_MINUTES_BETWEEN_SAME_PATIENT,
            ),
            scheduling_store: env::var("SCHEDULING_STORE")
                .ok()
                .and_then(|raw| match raw.parse() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        warn!("{}, using supabase", e);
                        None
                    }
                })
                .unwrap_or(StoreBackend::Supabase),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        };

        if config.scheduling_store == StoreBackend::Supabase && !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn env_number(key: &str, default: i64, max: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => parse_bounded(&raw, max).unwrap_or_else(|| {
            warn!("{} '{}' is not an integer between 0 and {}, using {}", key, raw, max, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_bounded(raw: &str, max: i64) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|value| (0..=max).contains(value))
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Parses `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return Some(utc_offset());
    }

    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_offsets() {
        assert_eq!(parse_utc_offset("-06:00").unwrap().local_minus_utc(), -6 * 3600);
        assert_eq!(parse_utc_offset("+0530").unwrap().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_malformed_offsets() {
        assert!(parse_utc_offset("06:00").is_none());
        assert!(parse_utc_offset("+25:00").is_none());
        assert!(parse_utc_offset("+6").is_none());
        assert!(parse_utc_offset("").is_none());
    }

    #[test]
    fn store_backend_parsing() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("Supabase".parse::<StoreBackend>().unwrap(), StoreBackend::Supabase);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn booking_numbers_must_be_in_range() {
        assert_eq!(parse_bounded("7", MAX_ADVANCE_DAYS), Some(7));
        assert_eq!(parse_bounded("365", MAX_ADVANCE_DAYS), Some(365));
        assert_eq!(parse_bounded("-1", MAX_ADVANCE_DAYS), None);
        assert_eq!(parse_bounded("seven", MAX_ADVANCE_DAYS), None);
        assert_eq!(parse_bounded("1000000000", MAX_ADVANCE_DAYS), None);
        assert_eq!(parse_bounded("9223372036854775807", MAX_ADVANCE_HOURS), None);
    }
}
