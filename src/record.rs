use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{GeoInfo, GeoLookup};

/// A single visit. Created fresh per request, persisted once, never
/// updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorRecord {
    /// Document id, derived from the partition key and creation time.
    pub id: String,
    /// Partition/lookup key. Always non-empty.
    pub ip_address: String,
    /// Raw `User-Agent` header value, may be empty.
    pub user_agent: String,
    pub country_info: GeoInfo,
    pub referer: Option<String>,
    pub accept_language: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VisitorRecord {
    /// Pure assembly, no I/O. The caller supplies the clock so record
    /// construction stays deterministic under test.
    pub fn new(
        ip_address: String,
        user_agent: String,
        geo: GeoLookup,
        referer: Option<String>,
        accept_language: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        debug_assert!(!ip_address.is_empty(), "ip_address must be non-empty");

        Self {
            id: format!("{}_{}", ip_address, now.timestamp()),
            ip_address,
            user_agent,
            country_info: geo.into_info(),
            referer,
            accept_language,
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_id_combines_ip_and_unix_timestamp() {
        let record = VisitorRecord::new(
            "203.0.113.195".to_string(),
            "curl/8.5.0".to_string(),
            GeoLookup::Unavailable,
            None,
            None,
            fixed_now(),
        );

        assert_eq!(
            record.id,
            format!("203.0.113.195_{}", fixed_now().timestamp())
        );
        assert_eq!(record.timestamp, fixed_now());
    }

    #[test]
    fn test_unavailable_geo_leaves_all_fields_empty() {
        let record = VisitorRecord::new(
            "127.0.0.1".to_string(),
            String::new(),
            GeoLookup::Unavailable,
            None,
            None,
            fixed_now(),
        );

        assert_eq!(record.country_info, GeoInfo::default());
    }

    #[test]
    fn test_serializes_iso8601_timestamp_and_camel_case_country_code() {
        let record = VisitorRecord::new(
            "203.0.113.195".to_string(),
            "curl/8.5.0".to_string(),
            GeoLookup::Located(GeoInfo {
                country: Some("United States".to_string()),
                country_code: Some("US".to_string()),
                ..GeoInfo::default()
            }),
            Some("https://example.com/".to_string()),
            Some("en-US".to_string()),
            fixed_now(),
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], "2025-06-01T12:30:45Z");
        assert_eq!(json["country_info"]["countryCode"], "US");
        assert_eq!(json["referer"], "https://example.com/");
    }

    #[test]
    fn test_round_trips_through_json() {
        let record = VisitorRecord::new(
            "2001:db8::1".to_string(),
            "Mozilla/5.0".to_string(),
            GeoLookup::Unavailable,
            None,
            Some("de-DE".to_string()),
            fixed_now(),
        );

        let json = serde_json::to_string(&record).unwrap();
        let back: VisitorRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
