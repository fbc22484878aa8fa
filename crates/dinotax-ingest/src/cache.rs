//! Taxon metadata cache shared by the lineage resolver and the tree builder

use crate::models::{TaxonId, TaxonRecord};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Records fetched during one run, keyed by id
///
/// Writers only ever insert complete records, so a poisoned lock still holds
/// consistent data and is recovered rather than propagated.
#[derive(Debug, Default)]
pub struct TaxonCache {
    records: RwLock<HashMap<TaxonId, TaxonRecord>>,
}

impl TaxonCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &TaxonId) -> Option<TaxonRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn insert(&self, record: TaxonRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> HashMap<TaxonId, TaxonRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FromIterator<TaxonRecord> for TaxonCache {
    fn from_iter<T: IntoIterator<Item = TaxonRecord>>(iter: T) -> Self {
        let records = iter.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            records: RwLock::new(records),
        }
    }
}
