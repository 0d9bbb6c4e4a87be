use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::{Access, ResourceName, ScopeError, ScopeValue, ScopesRecord};

/// One user-facing scope. Defaults are applied by the configuration layer
/// before an entry reaches [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeEntry {
    pub resource: String,
    pub access: Access,
    pub targets: Vec<String>,
}

impl ScopeEntry {
    pub fn new(resource: impl Into<String>, access: Access, targets: Vec<String>) -> Self {
        Self { resource: resource.into(), access, targets }
    }
}

/// Builds the API record for a list of entries.
///
/// Fails on the first entry naming a resource type outside [`ResourceName::ALL`]
/// or naming one already seen. Types without an entry stay absent; targets are
/// copied as given, so an empty list stays empty.
pub fn encode(entries: &[ScopeEntry]) -> Result<ScopesRecord, ScopeError> {
    let mut record = ScopesRecord::default();
    for entry in entries {
        let name: ResourceName = entry.resource.parse()?;
        let slot = record.slot_mut(name);
        if slot.is_some() {
            return Err(ScopeError::DuplicateResourceName { name: entry.resource.clone() });
        }
        *slot = Some(ScopeValue::new(entry.access, entry.targets.clone()));
    }
    Ok(record)
}

/// Lists the record's scopes in canonical resource order.
///
/// Slots with an empty access or target list, or an access level other than
/// read/write, are left out rather than reported.
pub fn decode(record: &ScopesRecord) -> Vec<ScopeEntry> {
    ResourceName::ALL
        .iter()
        .filter_map(|&name| {
            let value = record.slot(name).as_ref()?;
            if value.access.is_empty() || value.targets.is_empty() {
                debug!(resource = %name, "skipping incomplete scope");
                return None;
            }
            match value.access.parse::<Access>() {
                Ok(access) => Some(ScopeEntry::new(name.as_str(), access, value.targets.clone())),
                Err(reason) => {
                    debug!(resource = %name, %reason, "skipping scope");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(resource: &str, access: Access, targets: &[&str]) -> ScopeEntry {
        ScopeEntry::new(resource, access, targets.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn round_trip_orders_entries_canonically() {
        let input = vec![
            entry("topics", Access::Read, &["*"]),
            entry("queues", Access::Write, &["Ak3zbsCzWxGqcJ2r0bAQP", "nqTJ8rAb5jU1tQWkyzMDV"]),
            entry("channels", Access::Read, &["*"]),
        ];
        let decoded = decode(&encode(&input).unwrap());
        assert_eq!(decoded, vec![input[2].clone(), input[1].clone(), input[0].clone()]);
    }

    #[test]
    fn round_trips_every_known_resource() {
        let input: Vec<_> = ResourceName::ALL
            .iter()
            .rev()
            .map(|n| entry(n.as_str(), Access::Write, &["*"]))
            .collect();
        let decoded = decode(&encode(&input).unwrap());
        assert_eq!(decoded.len(), ResourceName::ALL.len());
        for e in &input {
            assert!(decoded.contains(e), "{e:?} missing");
        }
    }

    #[test]
    fn empty_list_encodes_to_empty_record() {
        let record = encode(&[]).unwrap();
        assert_eq!(record, ScopesRecord::default());
        assert!(decode(&record).is_empty());
    }

    #[test]
    fn subset_leaves_other_slots_absent() {
        let record = encode(&[entry("domains", Access::Read, &["*"])]).unwrap();
        assert_eq!(record.iter().count(), 1);
        assert_eq!(decode(&record), vec![entry("domains", Access::Read, &["*"])]);
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let err = encode(&[
            entry("queues", Access::Read, &["*"]),
            entry("not-a-real-type", Access::Read, &["*"]),
        ])
        .unwrap_err();
        assert_eq!(err, ScopeError::UnknownResourceName { name: "not-a-real-type".into() });
    }

    #[test]
    fn duplicate_resource_is_rejected() {
        let err = encode(&[
            entry("queues", Access::Read, &["*"]),
            entry("queues", Access::Write, &["*"]),
        ])
        .unwrap_err();
        assert_eq!(err, ScopeError::DuplicateResourceName { name: "queues".into() });
    }

    #[test]
    fn wildcard_survives_the_round_trip() {
        let record = encode(&[entry("stats", Access::Read, &["*"])]).unwrap();
        assert_eq!(record.stats.as_ref().unwrap().targets, vec![crate::WILDCARD.to_string()]);
        assert_eq!(decode(&record)[0].targets, vec!["*".to_string()]);
    }

    #[test]
    fn empty_targets_are_not_turned_into_wildcard() {
        let record = encode(&[entry("events", Access::Write, &[])]).unwrap();
        assert_eq!(record.events.as_ref().unwrap().targets, Vec::<String>::new());
        assert!(decode(&record).is_empty());
    }

    #[test]
    fn incomplete_or_unknown_access_slots_are_omitted() {
        let record: ScopesRecord = serde_json::from_value(json!({
            "channels": { "targets": ["*"] },
            "domains": { "access": "read" },
            "events": { "access": "admin", "targets": ["*"] },
            "queues": { "access": "write", "targets": ["*"] }
        }))
        .unwrap();
        assert_eq!(decode(&record), vec![entry("queues", Access::Write, &["*"])]);
    }

    #[test]
    fn decoding_is_deterministic() {
        let record: ScopesRecord = serde_json::from_value(json!({
            "topics": { "access": "read", "targets": ["*"] },
            "messages": { "access": "write", "targets": ["*"] },
            "domains": { "access": "read", "targets": ["*"] }
        }))
        .unwrap();
        let first = decode(&record);
        assert_eq!(first, decode(&record));
        let order: Vec<_> = first.iter().map(|e| e.resource.as_str()).collect();
        assert_eq!(order, ["domains", "messages", "topics"]);
    }
}
