//! Ordered collection of configured notices.

use crate::notice::{Notice, NoticeKey, NoticeType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Notices keyed by their insertion-order identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeCatalog {
    notices: BTreeMap<NoticeKey, Notice>,
}

impl NoticeCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The two built-in notices used when nothing has been stored yet.
    pub fn defaults() -> Self {
        let mut notices = BTreeMap::new();
        notices.insert(0, Notice::default_renewal());
        notices.insert(1, Notice::default_expiration());
        Self { notices }
    }

    /// Build a catalog from a stored value, seeding defaults when it is absent or empty.
    pub fn from_stored(value: Option<serde_json::Value>) -> serde_json::Result<Self> {
        let catalog = match value {
            None | Some(serde_json::Value::Null) => Self::new(),
            Some(value) => serde_json::from_value(value)?,
        };

        if catalog.is_empty() {
            Ok(Self::defaults())
        } else {
            Ok(catalog)
        }
    }

    /// Serialize for storage.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Look up a notice.
    pub fn get(&self, key: NoticeKey) -> Option<&Notice> {
        self.notices.get(&key)
    }

    /// The notice with the lowest key.
    pub fn first(&self) -> Option<(NoticeKey, &Notice)> {
        self.notices.iter().next().map(|(k, n)| (*k, n))
    }

    /// Append a notice, returning its new key.
    pub fn insert(&mut self, notice: Notice) -> NoticeKey {
        let key = self.next_key();
        self.notices.insert(key, notice);
        key
    }

    /// Replace or create the notice stored under `key`.
    pub fn update(&mut self, key: NoticeKey, notice: Notice) -> Option<Notice> {
        self.notices.insert(key, notice)
    }

    /// Remove a notice. Keys of other notices are left untouched.
    pub fn remove(&mut self, key: NoticeKey) -> Option<Notice> {
        self.notices.remove(&key)
    }

    /// Notices of one type, in key order.
    pub fn of_type(&self, notice_type: NoticeType) -> Self {
        let notices = self
            .notices
            .iter()
            .filter(|(_, n)| n.notice_type == notice_type)
            .map(|(k, n)| (*k, n.clone()))
            .collect();
        Self { notices }
    }

    /// Retain notices matching a predicate.
    pub fn retain(&mut self, mut f: impl FnMut(NoticeKey, &Notice) -> bool) {
        self.notices.retain(|k, n| f(*k, n));
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (NoticeKey, &Notice)> {
        self.notices.iter().map(|(k, n)| (*k, n))
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    fn next_key(&self) -> NoticeKey {
        self.notices
            .keys()
            .next_back()
            .map(|k| k.saturating_add(1))
            .unwrap_or(0)
    }
}

impl FromIterator<(NoticeKey, Notice)> for NoticeCatalog {
    fn from_iter<I: IntoIterator<Item = (NoticeKey, Notice)>>(iter: I) -> Self {
        Self {
            notices: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::TriggerPeriod;
    use serde_json::json;

    #[test]
    fn test_defaults_seeded_when_missing() {
        let catalog = NoticeCatalog::from_stored(None).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(0).unwrap().notice_type, NoticeType::Renewal);
        assert_eq!(catalog.get(1).unwrap().notice_type, NoticeType::Expiration);
        assert_eq!(catalog.get(1).unwrap().send_period, TriggerPeriod::OneMonthBefore);
    }

    #[test]
    fn test_defaults_seeded_when_empty() {
        let catalog = NoticeCatalog::from_stored(Some(json!({}))).unwrap();
        assert_eq!(catalog, NoticeCatalog::defaults());
    }

    #[test]
    fn test_stored_catalog_round_trips_keys() {
        let stored = json!({
            "4": {"type": "expiration", "send_period": "-1week", "subject": "s", "message": "m"}
        });
        let catalog = NoticeCatalog::from_stored(Some(stored)).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.first().unwrap().0, 4);
        assert_eq!(catalog.to_value().unwrap()["4"]["send_period"], "-1week");
    }

    #[test]
    fn test_insert_appends_after_highest_key() {
        let mut catalog = NoticeCatalog::defaults();
        catalog.remove(0);
        let key = catalog.insert(Notice::default_renewal());
        assert_eq!(key, 2);

        let mut empty = NoticeCatalog::new();
        assert_eq!(empty.insert(Notice::default_renewal()), 0);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut catalog = NoticeCatalog::defaults();
        let replacement = Notice::new(
            NoticeType::Renewal,
            TriggerPeriod::TwoWeeksBefore,
            "Renewing",
            "Body",
        );

        let previous = catalog.update(0, replacement.clone());
        assert_eq!(previous, Some(Notice::default_renewal()));
        assert_eq!(catalog.get(0), Some(&replacement));
        assert_eq!(catalog.len(), 2);

        assert_eq!(catalog.update(7, replacement), None);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_of_type_filters_and_keeps_keys() {
        let mut catalog = NoticeCatalog::defaults();
        catalog.insert(Notice::new(
            NoticeType::Renewal,
            TriggerPeriod::OneWeekBefore,
            "Soon",
            "Body",
        ));

        let renewals = catalog.of_type(NoticeType::Renewal);
        let keys: Vec<_> = renewals.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![0, 2]);
    }
}
