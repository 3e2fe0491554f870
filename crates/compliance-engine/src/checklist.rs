use crate::config::PolicyConfig;
use shared_types::{Checklist, ProcessCategory};
use std::collections::BTreeMap;

/// Source of versioned, process-keyed checklists
pub trait ChecklistStore: Send + Sync {
    /// Latest checklist for a category
    fn lookup(&self, category: ProcessCategory) -> Option<&Checklist>;

    /// A specific checklist version
    fn lookup_version(&self, category: ProcessCategory, version: &str) -> Option<&Checklist>;
}

/// Checklists held in memory, loaded once and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct InMemoryChecklistStore {
    /// Versions per category, in insertion order; the last one is the latest
    checklists: BTreeMap<ProcessCategory, Vec<Checklist>>,
}

impl InMemoryChecklistStore {
    pub fn new(checklists: impl IntoIterator<Item = Checklist>) -> Self {
        let mut store = Self::default();
        for checklist in checklists {
            store.insert(checklist);
        }
        store
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.checklists())
    }

    /// Add a checklist; a version already present for the category is replaced
    pub fn insert(&mut self, checklist: Checklist) {
        let versions = self.checklists.entry(checklist.category).or_default();
        versions.retain(|c| c.version != checklist.version);
        versions.push(checklist);
    }

    pub fn categories(&self) -> impl Iterator<Item = ProcessCategory> + '_ {
        self.checklists.keys().copied()
    }
}

impl ChecklistStore for InMemoryChecklistStore {
    fn lookup(&self, category: ProcessCategory) -> Option<&Checklist> {
        self.checklists.get(&category).and_then(|v| v.last())
    }

    fn lookup_version(&self, category: ProcessCategory, version: &str) -> Option<&Checklist> {
        self.checklists
            .get(&category)
            .and_then(|v| v.iter().find(|c| c.version == version))
    }
}
