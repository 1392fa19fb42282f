use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::edge_rule::Hostname;

/// Hostnames under this suffix are served by the CDN itself and need no
/// record in the account's DNS zones.
pub const MANAGED_SUFFIX: &str = ".b-cdn.net";

const RECORD_A: i32 = 0;
const RECORD_CNAME: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DnsZone {
    #[serde(default)]
    pub id: i64,
    pub domain: String,
    #[serde(default)]
    pub records: Vec<DnsRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DnsRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "Type")]
    pub record_type: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub ttl: i64,
}

/// A record that answers for one of the looked-up hostnames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRecord {
    /// The name that matched, either as stored or qualified with the zone domain.
    pub name: String,
    pub record_type: String,
    pub value: String,
    pub ttl: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostnameStatus {
    /// Served by the CDN's own domain.
    Managed,
    Found { record_type: String, value: String },
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameCheck {
    pub hostname: String,
    pub status: HostnameStatus,
}

impl HostnameCheck {
    pub fn is_missing(&self) -> bool {
        self.status == HostnameStatus::Missing
    }
}

pub fn record_type_name(record_type: i32) -> String {
    match record_type {
        0 => "A".to_owned(),
        1 => "AAAA".to_owned(),
        2 => "CNAME".to_owned(),
        3 => "TXT".to_owned(),
        4 => "MX".to_owned(),
        5 => "RDR".to_owned(),
        7 => "PZ".to_owned(),
        8 => "SRV".to_owned(),
        9 => "CAA".to_owned(),
        10 => "PTR".to_owned(),
        11 => "SCR".to_owned(),
        12 => "NS".to_owned(),
        other => format!("TYPE{other}"),
    }
}

fn is_address_record(record_type: i32) -> bool {
    record_type == RECORD_A || record_type == RECORD_CNAME
}

/// A and CNAME records across all zones whose name is one of `hostnames`.
///
/// Relative record names (no dot) are also tried qualified with the zone
/// domain. Comparison ignores case. Each record matches at most once.
pub fn matching_records(zones: &[DnsZone], hostnames: &[Hostname]) -> Vec<MatchedRecord> {
    let wanted: HashSet<String> = hostnames.iter().map(|h| h.value.to_lowercase()).collect();
    let mut matches = Vec::new();

    for zone in zones {
        for record in zone.records.iter().filter(|r| is_address_record(r.record_type)) {
            let mut candidates = vec![record.name.clone()];
            if record.name != zone.domain && !record.name.contains('.') {
                candidates.push(format!("{}.{}", record.name, zone.domain));
            }

            if let Some(name) = candidates
                .into_iter()
                .find(|name| wanted.contains(&name.to_lowercase()))
            {
                matches.push(MatchedRecord {
                    name,
                    record_type: record_type_name(record.record_type),
                    value: record.value.clone(),
                    ttl: record.ttl,
                });
            }
        }
    }

    matches
}

/// One check per hostname, in input order.
pub fn validate_hostnames(zones: &[DnsZone], hostnames: &[Hostname]) -> Vec<HostnameCheck> {
    let records = matching_records(zones, hostnames);

    hostnames
        .iter()
        .map(|hostname| {
            let status = if hostname.value.ends_with(MANAGED_SUFFIX) {
                HostnameStatus::Managed
            } else {
                records
                    .iter()
                    .find(|r| r.name.eq_ignore_ascii_case(&hostname.value))
                    .map(|r| HostnameStatus::Found {
                        record_type: r.record_type.clone(),
                        value: r.value.clone(),
                    })
                    .unwrap_or(HostnameStatus::Missing)
            };

            HostnameCheck {
                hostname: hostname.value.clone(),
                status,
            }
        })
        .collect()
}
