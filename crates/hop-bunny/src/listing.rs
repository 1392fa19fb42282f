use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

use hop::RemoteEntry;
use hop::path::join_remote;

/// One object in a storage directory listing.
/// `GET https://storage.bunnycdn.com/{zone}/{path}/`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectListing {
    pub object_name: String,
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default)]
    pub length: u64,
    #[serde(default, deserialize_with = "bunny_time")]
    pub last_changed: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub checksum: String,
}

impl ObjectListing {
    /// Convert to an entry whose path is `dir` joined with the object name.
    pub fn into_entry(self, dir: &str) -> RemoteEntry {
        RemoteEntry {
            path: join_remote(dir, &self.object_name),
            name: self.object_name,
            is_directory: self.is_directory,
            size: self.length,
            last_modified: self.last_changed,
            checksum: self.checksum.to_uppercase(),
        }
    }
}

/// Parse a storage timestamp. The API sends `2025-08-29T11:10:09.594`
/// without a zone; RFC 3339 is accepted as well.
pub fn parse_bunny_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

fn bunny_time<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_bunny_time(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {value}"))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike};

    use super::*;

    #[test]
    fn parses_zoneless_timestamp() {
        let parsed = parse_bunny_time("2025-08-29T11:10:09.594").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2025, 8, 29).unwrap());
        assert_eq!(parsed.hour(), 11);
        assert_eq!(parsed.nanosecond(), 594_000_000);
    }

    #[test]
    fn parses_without_fraction_and_rfc3339() {
        assert!(parse_bunny_time("2025-08-29T11:10:09").is_some());
        let parsed = parse_bunny_time("2025-08-29T11:10:09+02:00").unwrap();
        assert_eq!(parsed.hour(), 9);
    }

    #[test]
    fn empty_timestamp_is_none() {
        assert_eq!(parse_bunny_time(""), None);
        assert_eq!(parse_bunny_time("yesterday"), None);
    }

    #[test]
    fn deserializes_listing_with_nulls() {
        let json = r#"[
            {"ObjectName": "index.html", "IsDirectory": false, "Length": 42,
             "LastChanged": "2025-08-29T11:10:09.594", "Checksum": "abc123", "Guid": "x"},
            {"ObjectName": "css", "IsDirectory": true, "Length": 0,
             "LastChanged": null, "Checksum": null}
        ]"#;
        let listing: Vec<ObjectListing> = serde_json::from_str(json).unwrap();

        let file = listing[0].last_changed;
        assert!(file.is_some());
        assert_eq!(listing[1].checksum, "");
        assert_eq!(listing[1].last_changed, None);
    }

    #[test]
    fn entry_path_is_joined_and_checksum_uppercased() {
        let object = ObjectListing {
            object_name: "site.css".into(),
            is_directory: false,
            length: 10,
            last_changed: None,
            checksum: "abcdef".into(),
        };
        let entry = object.into_entry("assets/css");
        assert_eq!(entry.path, "assets/css/site.css");
        assert_eq!(entry.name, "site.css");
        assert_eq!(entry.checksum, "ABCDEF");
    }
}
