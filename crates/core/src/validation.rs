//! Input validation and parsing utilities.
//!
//! Timestamps, times of day and tenant identifiers arrive as strings from the storage layer and
//! the outer surfaces. They are parsed here once so the rule modules only see typed values.

use crate::constants::MAX_TENANT_ID_LEN;
use crate::{CoreError, CoreResult, Timestamp};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Validates that a tenant identifier is safe to use as a storage scope key.
///
/// Rules:
/// - Rejects empty or whitespace-only strings
/// - Bounds the length to avoid pathological inputs
/// - Restricts characters to `[A-Za-z0-9._-]`
///
/// # Errors
///
/// Returns `CoreError::InvalidTenant` if the tenant id is invalid.
pub fn validate_tenant_id(tenant_id: &str) -> CoreResult<()> {
    if tenant_id.trim().is_empty() {
        return Err(CoreError::InvalidTenant("tenant id cannot be empty".into()));
    }

    if tenant_id.len() > MAX_TENANT_ID_LEN {
        return Err(CoreError::InvalidTenant(format!(
            "tenant id exceeds maximum length of {} characters",
            MAX_TENANT_ID_LEN
        )));
    }

    if !tenant_id.is_ascii() {
        return Err(CoreError::InvalidTenant(
            "tenant id must contain only ASCII characters".into(),
        ));
    }

    let ok = tenant_id
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(CoreError::InvalidTenant(
            "tenant id contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    Ok(())
}

/// Parse an ISO-8601 timestamp.
///
/// RFC 3339 strings keep their offset. Offset-less `YYYY-MM-DDTHH:MM[:SS]` strings are read
/// as UTC, which is what the hosted backend emits for `timestamp without time zone` columns.
pub fn parse_timestamp(value: &str) -> CoreResult<Timestamp> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    Err(CoreError::InvalidTimestamp(value.to_string()))
}

/// Parse an optional timestamp, treating empty strings as absent.
pub fn parse_optional_timestamp(value: Option<&str>) -> CoreResult<Option<Timestamp>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_timestamp(v).map(Some),
        None => Ok(None),
    }
}

/// Parse a 24-hour `HH:MM` time of day. `HH:MM:SS` is tolerated.
pub fn parse_time_of_day(value: &str) -> CoreResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| CoreError::InvalidTimeOfDay(value.to_string()))
}

/// Parse a calendar date, `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> CoreResult<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidInput(format!("invalid date: {value}")))
}

/// Current time as a `Timestamp`. Sampled per call, never cached.
pub fn now() -> Timestamp {
    Utc::now().fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parse_date_accepts_iso_dates_only() {
        assert_eq!(
            parse_date(" 2026-03-01 ").ok(),
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );
        assert!(parse_date("01/03/2026").is_err());
    }

    #[test]
    fn validate_tenant_id_accepts_valid_ids() {
        assert!(validate_tenant_id("st-marys.sim").is_ok());
        assert!(validate_tenant_id("ward_7").is_ok());
        assert!(validate_tenant_id("a").is_ok());
    }

    #[test]
    fn validate_tenant_id_rejects_empty_and_whitespace() {
        let err = validate_tenant_id("  ").expect_err("should reject whitespace");
        assert!(matches!(err, CoreError::InvalidTenant(msg) if msg.contains("cannot be empty")));
    }

    #[test]
    fn validate_tenant_id_rejects_too_long() {
        let long = "t".repeat(254);
        let err = validate_tenant_id(&long).expect_err("should reject too long");
        assert!(
            matches!(err, CoreError::InvalidTenant(msg) if msg.contains("exceeds maximum length"))
        );
    }

    #[test]
    fn validate_tenant_id_rejects_invalid_characters() {
        for bad in ["bad/tenant", "bad tenant", "bad@tenant", "tenänt"] {
            assert!(validate_tenant_id(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn parse_timestamp_keeps_offset() {
        let ts = parse_timestamp("2026-03-01T08:00:00+02:00").expect("parse");
        assert_eq!(ts.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn parse_timestamp_reads_naive_as_utc() {
        let ts = parse_timestamp("2026-03-01T08:15").expect("parse");
        assert_eq!(ts.offset().local_minus_utc(), 0);
        assert_eq!(ts.minute(), 15);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(CoreError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn parse_optional_timestamp_treats_blank_as_absent() {
        assert!(parse_optional_timestamp(Some("  ")).expect("parse").is_none());
        assert!(parse_optional_timestamp(None).expect("parse").is_none());
    }

    #[test]
    fn parse_time_of_day_accepts_24_hour_times() {
        let t = parse_time_of_day("21:30").expect("parse");
        assert_eq!((t.hour(), t.minute()), (21, 30));
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("9am").is_err());
    }
}
