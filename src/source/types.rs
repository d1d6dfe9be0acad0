// src/source/types.rs
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// One certificate entry as returned by crt.sh's JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Source-assigned id. crt.sh sends an integer; strings are accepted too.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// Subject names, newline-joined
    #[serde(default)]
    pub name_value: String,
    #[serde(default)]
    pub entry_timestamp: Option<String>,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub issuer_name: Option<String>,
    #[serde(default)]
    pub not_before: Option<String>,
    #[serde(default)]
    pub not_after: Option<String>,
}

impl CertificateRecord {
    /// Every subject name carried in `name_value`, trimmed, blanks skipped
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.name_value
            .split('\n')
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Parsed `entry_timestamp`, if present and well-formed
    pub fn entry_time(&self) -> Option<NaiveDateTime> {
        let raw = self.entry_timestamp.as_deref()?.trim();

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::String(s) => Ok(s),
        other => Err(serde::de::Error::custom(format!(
            "certificate id must be a number or string, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crtsh_entry() {
        let json = r#"{
            "issuer_ca_id": 183267,
            "issuer_name": "C=US, O=Let's Encrypt, CN=R3",
            "common_name": "api.example.com",
            "name_value": "api.example.com\nwww.api.example.com",
            "id": 9876543210,
            "entry_timestamp": "2024-05-01T12:34:56.789",
            "not_before": "2024-05-01T11:34:56",
            "not_after": "2024-07-30T11:34:55",
            "serial_number": "03ab"
        }"#;

        let record: CertificateRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.id, "9876543210");
        assert_eq!(
            record.names().collect::<Vec<_>>(),
            vec!["api.example.com", "www.api.example.com"]
        );
        let ts = record.entry_time().unwrap();
        assert_eq!(ts.to_string(), "2024-05-01 12:34:56.789");
    }

    #[test]
    fn test_string_id_and_missing_fields() {
        let record: CertificateRecord =
            serde_json::from_str(r#"{"id": "abc-1", "name_value": "example.com"}"#).unwrap();

        assert_eq!(record.id, "abc-1");
        assert!(record.entry_time().is_none());
        assert!(record.issuer_name.is_none());
    }

    #[test]
    fn test_invalid_id_rejected() {
        let result: Result<CertificateRecord, _> =
            serde_json::from_str(r#"{"id": null, "name_value": "example.com"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let record = CertificateRecord {
            id: "1".to_string(),
            name_value: String::new(),
            entry_timestamp: Some("2024-05-01T12:00:00Z".to_string()),
            common_name: None,
            issuer_name: None,
            not_before: None,
            not_after: None,
        };

        assert!(record.entry_time().is_some());
    }

    #[test]
    fn test_names_skip_blank_lines() {
        let record = CertificateRecord {
            id: "1".to_string(),
            name_value: "a.example.com\n\n b.example.com \r\n".to_string(),
            entry_timestamp: None,
            common_name: None,
            issuer_name: None,
            not_before: None,
            not_after: None,
        };

        assert_eq!(record.names().collect::<Vec<_>>(), vec!["a.example.com", "b.example.com"]);
    }
}
