//! Resource lists: the context-variants of one resource name
//!
//! A list is ordered by decreasing priority; the head is the winning
//! variant. Merging consults the rule bits in a fixed order and reports the
//! outcome as a [`Change`]; an unresolved merge is a conflict error.

use crate::enums::Change;
use crate::error::{ComponentError, LcfgResult};
use crate::resource::Resource;
use crate::rules::{MergeRules, PrimaryKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// All context-variants of one resource name.
///
/// Lists are shared between components after a clone; the owning component
/// copies a shared list before mutating it (see `Component::merge_resource`).
/// Resources are shared between lists the same way and replaced wholesale,
/// never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceList {
    merge_rules: MergeRules,
    primary_key: PrimaryKey,
    entries: Vec<Arc<Resource>>,
}

impl ResourceList {
    /// Create an empty list with the given merge discipline.
    pub fn new(merge_rules: MergeRules, primary_key: PrimaryKey) -> Self {
        Self {
            merge_rules,
            primary_key,
            entries: Vec::new(),
        }
    }

    pub fn merge_rules(&self) -> MergeRules {
        self.merge_rules
    }

    pub fn primary_key(&self) -> PrimaryKey {
        self.primary_key
    }

    /// Number of variants held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// An empty list means the owning bucket should be cleared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The resource name all variants share, taken from the head.
    pub fn name(&self) -> Option<&str> {
        self.entries.first().map(|r| r.name())
    }

    /// The winning (highest-priority) variant.
    pub fn head(&self) -> Option<&Arc<Resource>> {
        self.entries.first()
    }

    /// The variant with the given context expression.
    pub fn find(&self, context: Option<&str>) -> Option<&Arc<Resource>> {
        self.entries.iter().find(|r| r.context() == context)
    }

    /// Iterate variants in decreasing-priority order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Resource>> {
        self.entries.iter()
    }

    /// Remove the variant with the given context expression.
    pub fn remove(&mut self, context: Option<&str>) -> Option<Arc<Resource>> {
        let idx = self.entries.iter().position(|r| r.context() == context)?;
        Some(self.entries.remove(idx))
    }

    /// Merge one resource into the list.
    ///
    /// The rules are consulted in this fixed order:
    /// 1. an invalid resource is rejected outright;
    /// 2. the *current* entry is the same-context variant when `CONTEXT` is
    ///    part of the primary key, otherwise the head;
    /// 3. `SQUASH_IDENTICAL`: an incoming entry identical to current
    ///    replaces it, refreshing the derivation;
    /// 4. `KEEP_ALL`: append (no-op when an identical variant exists);
    /// 5. `REPLACE`: unconditionally swap current for the incoming entry;
    /// 6. `USE_PRIORITY`: higher priority wins, lower is ignored, equal is
    ///    an unresolved conflict;
    /// 7. no accepting rule: conflict.
    ///
    /// After any accepting rule the list is re-sorted so the
    /// highest-priority variant sits at the head.
    pub fn merge_resource(&mut self, incoming: Arc<Resource>) -> LcfgResult<Change> {
        if !incoming.is_valid() {
            return Err(ComponentError::MergeConflict {
                resource: format!("invalid resource '{}'", incoming.name()),
            }
            .into());
        }

        let current_idx = if self.primary_key.contains(PrimaryKey::CONTEXT) {
            self.entries
                .iter()
                .position(|r| r.context() == incoming.context())
        } else if self.entries.is_empty() {
            None
        } else {
            Some(0)
        };

        let change = match current_idx {
            None => {
                self.entries.push(incoming);
                Change::Added
            }
            Some(idx) => {
                let rules = self.merge_rules;
                let current = Arc::clone(&self.entries[idx]);

                if rules.contains(MergeRules::SQUASH_IDENTICAL) && current.equals(&incoming) {
                    self.entries[idx] = incoming;
                    Change::Replaced
                } else if rules.contains(MergeRules::KEEP_ALL) {
                    if self.entries.iter().any(|r| r.equals(&incoming)) {
                        return Ok(Change::None);
                    }
                    self.entries.push(incoming);
                    Change::Added
                } else if rules.contains(MergeRules::REPLACE) {
                    self.entries[idx] = incoming;
                    Change::Replaced
                } else if rules.contains(MergeRules::USE_PRIORITY) {
                    if incoming.priority() > current.priority() {
                        self.entries[idx] = incoming;
                        Change::Replaced
                    } else if incoming.priority() < current.priority() {
                        return Ok(Change::None);
                    } else {
                        return Err(ComponentError::MergeConflict {
                            resource: incoming.name().to_string(),
                        }
                        .into());
                    }
                } else {
                    return Err(ComponentError::MergeConflict {
                        resource: incoming.name().to_string(),
                    }
                    .into());
                }
            }
        };

        self.sort();
        Ok(change)
    }

    /// Merge every variant of `src`, aggregating the strongest change.
    /// The source list is never mutated.
    pub fn merge_list(&mut self, src: &ResourceList) -> LcfgResult<Change> {
        let mut aggregate = Change::None;
        for entry in src.iter() {
            let change = self.merge_resource(Arc::clone(entry))?;
            aggregate = aggregate.combine(change);
        }
        Ok(aggregate)
    }

    /// Insert or overwrite the same-context variant, bypassing the merge
    /// rules. The status loader is authoritative, so it writes through
    /// this instead of `merge_resource`.
    pub fn put(&mut self, incoming: Arc<Resource>) -> Change {
        let change = match self
            .entries
            .iter()
            .position(|r| r.context() == incoming.context())
        {
            Some(idx) => {
                self.entries[idx] = incoming;
                Change::Replaced
            }
            None => {
                self.entries.push(incoming);
                Change::Added
            }
        };
        self.sort();
        change
    }

    /// Stable sort by decreasing priority.
    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| b.priority().cmp(&a.priority()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str, value: &str, priority: i32) -> Arc<Resource> {
        let mut r = Resource::new(name).expect("valid name");
        r.set_value(value).expect("valid value");
        Arc::new(r.with_priority(priority))
    }

    #[test]
    fn test_first_merge_adds() {
        let mut list = ResourceList::new(MergeRules::empty(), PrimaryKey::default());
        let change = list.merge_resource(resource("x", "1", 0)).expect("merge");
        assert_eq!(change, Change::Added);
        assert_eq!(list.name(), Some("x"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_priority_rule_keeps_highest_at_head() {
        let mut list = ResourceList::new(MergeRules::USE_PRIORITY, PrimaryKey::NAME);
        list.merge_resource(resource("x", "1", 5)).expect("merge");
        let change = list.merge_resource(resource("x", "2", 7)).expect("merge");
        assert_eq!(change, Change::Replaced);
        assert_eq!(list.len(), 1);
        assert_eq!(list.head().map(|r| r.value()).flatten(), Some("2"));

        let change = list.merge_resource(resource("x", "3", 2)).expect("merge");
        assert_eq!(change, Change::None);
        assert_eq!(list.head().map(|r| r.value()).flatten(), Some("2"));
    }

    #[test]
    fn test_equal_priority_is_conflict() {
        let mut list = ResourceList::new(MergeRules::USE_PRIORITY, PrimaryKey::NAME);
        list.merge_resource(resource("x", "1", 5)).expect("merge");
        let err = list
            .merge_resource(resource("x", "2", 5))
            .expect_err("conflict");
        assert!(err.to_string().contains("conflict"));
        assert_eq!(list.head().map(|r| r.value()).flatten(), Some("1"));
    }

    #[test]
    fn test_squash_identical_refreshes_entry() {
        let mut list = ResourceList::new(MergeRules::SQUASH_IDENTICAL, PrimaryKey::default());
        list.merge_resource(resource("x", "v", 0)).expect("merge");

        let mut refreshed = Resource::new("x").expect("valid name");
        refreshed.set_value("v").expect("valid value");
        refreshed.add_derivation(crate::derivation::SourceLocation::file_line("b.xml", 2));
        let change = list
            .merge_resource(Arc::new(refreshed))
            .expect("merge");
        assert_eq!(change, Change::Replaced);
        assert_eq!(list.len(), 1);
        assert_eq!(
            list.head().map(|r| r.derivation().len()),
            Some(1)
        );
    }

    #[test]
    fn test_keep_all_appends_and_dedups() {
        let mut list = ResourceList::new(MergeRules::KEEP_ALL, PrimaryKey::default());
        list.merge_resource(resource("x", "1", 0)).expect("merge");
        let change = list
            .merge_resource(Arc::new(
                Resource::new("x")
                    .map(|mut r| {
                        r.set_value("2").expect("valid value");
                        r.set_context("cluster=a");
                        r
                    })
                    .expect("valid name"),
            ))
            .expect("merge");
        assert_eq!(change, Change::Added);
        assert_eq!(list.len(), 2);

        // Identical variant is a no-op
        let change = list.merge_resource(resource("x", "1", 0)).expect("merge");
        assert_eq!(change, Change::None);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_replace_rule() {
        let mut list = ResourceList::new(MergeRules::REPLACE, PrimaryKey::NAME);
        list.merge_resource(resource("x", "1", 0)).expect("merge");
        let change = list.merge_resource(resource("x", "2", 0)).expect("merge");
        assert_eq!(change, Change::Replaced);
        assert_eq!(list.len(), 1);
        assert_eq!(list.head().map(|r| r.value()).flatten(), Some("2"));
    }

    #[test]
    fn test_no_rule_is_conflict() {
        let mut list = ResourceList::new(MergeRules::empty(), PrimaryKey::NAME);
        list.merge_resource(resource("x", "1", 0)).expect("merge");
        let err = list
            .merge_resource(resource("x", "2", 0))
            .expect_err("conflict");
        assert!(err.to_string().contains("conflict"));
    }

    #[test]
    fn test_context_primary_key_separates_variants() {
        let mut list = ResourceList::new(MergeRules::USE_PRIORITY, PrimaryKey::default());
        list.merge_resource(resource("x", "1", 0)).expect("merge");
        let variant = Arc::new(
            Resource::new("x")
                .map(|mut r| {
                    r.set_value("2").expect("valid value");
                    r.set_context("os=el7");
                    r
                })
                .expect("valid name")
                .with_priority(4),
        );
        let change = list.merge_resource(variant).expect("merge");
        assert_eq!(change, Change::Added);
        assert_eq!(list.len(), 2);
        // Highest priority is at the head
        assert_eq!(list.head().map(|r| r.priority()), Some(4));
        assert!(list.find(None).is_some());
        assert!(list.find(Some("os=el7")).is_some());
    }

    #[test]
    fn test_invalid_resource_rejected() {
        let mut list = ResourceList::new(MergeRules::REPLACE, PrimaryKey::default());
        // The setter API refuses to construct a value/type mismatch, so
        // build the invalid resource through serde.
        let json = r#"{"name":"x","value":"notanumber","value_type":"Integer"}"#;
        let bad: Resource = serde_json::from_str(json).expect("deserialized");
        let err = list.merge_resource(Arc::new(bad)).expect_err("invalid");
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_merge_list_aggregates_strongest() {
        let mut dst = ResourceList::new(MergeRules::USE_PRIORITY, PrimaryKey::NAME);
        dst.merge_resource(resource("x", "1", 1)).expect("merge");

        let mut src = ResourceList::new(MergeRules::USE_PRIORITY, PrimaryKey::NAME);
        src.merge_resource(resource("x", "2", 9)).expect("merge");

        let change = dst.merge_list(&src).expect("merge");
        assert_eq!(change, Change::Replaced);
        assert_eq!(src.len(), 1, "source must not be mutated");
    }
}
