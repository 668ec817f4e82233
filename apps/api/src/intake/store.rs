use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::intake::models::{IntakeData, IntakeRecord};

/// In-memory intake store keyed by intake id. Records live for the lifetime
/// of the process; nothing is evicted.
#[derive(Clone, Default)]
pub struct IntakeStore {
    records: Arc<DashMap<Uuid, IntakeRecord>>,
}

impl IntakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, payload: IntakeData, user_id: Option<String>) -> IntakeRecord {
        let now = Utc::now();
        let record = IntakeRecord {
            id: Uuid::new_v4(),
            user_id,
            payload,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(record.id, record.clone());
        info!("Stored intake {} ({} in memory)", record.id, self.len());
        record
    }

    pub fn get(&self, id: Uuid) -> Option<IntakeRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    /// Looks up an id given as text; malformed ids are simply not found.
    pub fn get_str(&self, id: &str) -> Option<IntakeRecord> {
        Uuid::parse_str(id.trim()).ok().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_get() {
        let store = IntakeStore::new();
        let intake = IntakeData {
            nationality: Some("Kenyan".into()),
            ..Default::default()
        };
        let record = store.create(intake.clone(), Some("42".into()));

        let fetched = store.get(record.id).unwrap();
        assert_eq!(fetched.payload, intake);
        assert_eq!(fetched.user_id.as_deref(), Some("42"));
        assert_eq!(fetched.created_at, fetched.updated_at);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_str_handles_malformed_ids() {
        let store = IntakeStore::new();
        let record = store.create(IntakeData::default(), None);
        assert!(store.get_str(&record.id.to_string()).is_some());
        assert!(store.get_str("not-a-uuid").is_none());
        assert!(store.get_str(&Uuid::new_v4().to_string()).is_none());
    }

    #[test]
    fn test_clones_share_records() {
        let store = IntakeStore::new();
        let other = store.clone();
        let record = store.create(IntakeData::default(), None);
        assert!(other.get(record.id).is_some());
    }
}
