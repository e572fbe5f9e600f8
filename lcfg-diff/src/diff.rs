//! Profile, component and resource diffs

use lcfg_core::{Component, Profile, Resource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The resource whose change marks a component as prodded: assigning it
/// forces a component restart even when nothing else changed.
const PROD_RESOURCE: &str = "ng_prod";

// ============================================================================
// RESOURCE DIFF
// ============================================================================

/// Classification of one resource between two profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceChange {
    #[default]
    None,
    Added,
    Removed,
    Modified,
}

impl ResourceChange {
    /// The hold-file marker for this change.
    pub fn marker(&self) -> char {
        match self {
            ResourceChange::None => ' ',
            ResourceChange::Added => '+',
            ResourceChange::Removed => '-',
            ResourceChange::Modified => '~',
        }
    }
}

impl fmt::Display for ResourceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceChange::None => "none",
            ResourceChange::Added => "added",
            ResourceChange::Removed => "removed",
            ResourceChange::Modified => "modified",
        };
        f.write_str(name)
    }
}

/// One resource's old and new variants. At least one side is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResource {
    old: Option<Arc<Resource>>,
    new: Option<Arc<Resource>>,
    change: ResourceChange,
}

impl DiffResource {
    /// Classify a pair of variants. Returns `None` when both sides are
    /// absent; equal sides classify as `ResourceChange::None`.
    pub fn classify(
        old: Option<Arc<Resource>>,
        new: Option<Arc<Resource>>,
    ) -> Option<DiffResource> {
        let change = match (&old, &new) {
            (None, None) => return None,
            (None, Some(_)) => ResourceChange::Added,
            (Some(_), None) => ResourceChange::Removed,
            (Some(o), Some(n)) if o.equals(n) => ResourceChange::None,
            (Some(_), Some(_)) => ResourceChange::Modified,
        };
        Some(DiffResource { old, new, change })
    }

    pub fn change(&self) -> ResourceChange {
        self.change
    }

    /// The resource name, from whichever side is present.
    pub fn name(&self) -> &str {
        match (&self.old, &self.new) {
            (Some(old), _) => old.name(),
            (None, Some(new)) => new.name(),
            // classify() rejects the double-None case
            (None, None) => "",
        }
    }

    pub fn old_resource(&self) -> Option<&Arc<Resource>> {
        self.old.as_ref()
    }

    pub fn new_resource(&self) -> Option<&Arc<Resource>> {
        self.new.as_ref()
    }

    pub fn old_value(&self) -> Option<&str> {
        self.old.as_ref().and_then(|r| r.value())
    }

    pub fn new_value(&self) -> Option<&str> {
        self.new.as_ref().and_then(|r| r.value())
    }
}

// ============================================================================
// COMPONENT DIFF
// ============================================================================

/// Classification of one component between two profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentChange {
    Added,
    Removed,
    Modified,
}

impl fmt::Display for ComponentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentChange::Added => "added",
            ComponentChange::Removed => "removed",
            ComponentChange::Modified => "modified",
        };
        f.write_str(name)
    }
}

/// One component's changed resources, sorted by resource name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffComponent {
    name: String,
    change: ComponentChange,
    entries: Vec<DiffResource>,
}

impl DiffComponent {
    /// Diff a pair of components. Returns `None` when both sides are
    /// absent or nothing changed.
    ///
    /// The change kind follows the presence pattern: added when the old
    /// side is absent, removed when the new side is absent, modified when
    /// both exist and any resource changed. Unchanged entries are elided.
    pub fn diff(
        name: &str,
        old: Option<&Component>,
        new: Option<&Component>,
    ) -> Option<DiffComponent> {
        let change = match (old, new) {
            (None, None) => return None,
            (None, Some(_)) => ComponentChange::Added,
            (Some(_), None) => ComponentChange::Removed,
            (Some(_), Some(_)) => ComponentChange::Modified,
        };

        let mut names: Vec<String> = Vec::new();
        if let Some(old) = old {
            names.extend(old.names());
        }
        if let Some(new) = new {
            for n in new.names() {
                if !names.contains(&n) {
                    names.push(n);
                }
            }
        }
        names.sort_by(|a, b| {
            a.to_ascii_lowercase()
                .cmp(&b.to_ascii_lowercase())
                .then_with(|| a.cmp(b))
        });

        let mut entries = Vec::new();
        for resource_name in &names {
            let old_res = old
                .and_then(|c| c.find_resource(resource_name))
                .map(Arc::clone);
            let new_res = new
                .and_then(|c| c.find_resource(resource_name))
                .map(Arc::clone);
            if let Some(entry) = DiffResource::classify(old_res, new_res) {
                if entry.change() != ResourceChange::None {
                    entries.push(entry);
                }
            }
        }

        if change == ComponentChange::Modified && entries.is_empty() {
            return None;
        }

        Some(DiffComponent {
            name: name.to_string(),
            change,
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn change(&self) -> ComponentChange {
        self.change
    }

    pub fn entries(&self) -> &[DiffResource] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the diff touches the distinguished `ng_prod` resource.
    pub fn was_prodded(&self) -> bool {
        self.entries.iter().any(|e| e.name() == PROD_RESOURCE)
    }
}

// ============================================================================
// PROFILE DIFF
// ============================================================================

/// Every changed component between two profiles, sorted by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffProfile {
    components: Vec<DiffComponent>,
}

impl DiffProfile {
    /// Diff two profiles component by component.
    pub fn diff(old: &Profile, new: &Profile) -> DiffProfile {
        let mut names = old.components().names();
        for name in new.components().names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.sort_by(|a, b| {
            a.to_ascii_lowercase()
                .cmp(&b.to_ascii_lowercase())
                .then_with(|| a.cmp(b))
        });

        let mut components = Vec::new();
        for name in &names {
            let old_comp = old.components().find(name).map(|c| c.as_ref());
            let new_comp = new.components().find(name).map(|c| c.as_ref());
            if let Some(diff) = DiffComponent::diff(name, old_comp, new_comp) {
                components.push(diff);
            }
        }
        DiffProfile { components }
    }

    pub fn components(&self) -> &[DiffComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&DiffComponent> {
        self.components.iter().find(|c| c.name() == name)
    }

    /// True when the named component's diff touches `ng_prod`.
    pub fn component_was_prodded(&self, name: &str) -> bool {
        self.find(name).map(DiffComponent::was_prodded).unwrap_or(false)
    }
}

/// Fast three-way classification of component names between two profiles:
/// `(modified, added, removed)`.
///
/// A component is modified when present on both sides with differing
/// canonical digests; the digest covers the resource-name set and every
/// resource's serialized fields.
pub fn quickdiff(old: &Profile, new: &Profile) -> (Vec<String>, Vec<String>, Vec<String>) {
    let old_names = old.components().names();
    let new_names = new.components().names();

    let mut modified = Vec::new();
    let mut added = Vec::new();
    let mut removed = Vec::new();

    for name in &old_names {
        match new.components().find(name) {
            Some(new_comp) => {
                let digests_differ = old
                    .components()
                    .find(name)
                    .map(|old_comp| old_comp.digest() != new_comp.digest())
                    .unwrap_or(false);
                if digests_differ {
                    modified.push(name.clone());
                }
            }
            None => removed.push(name.clone()),
        }
    }
    for name in &new_names {
        if !old.components().contains(name) {
            added.push(name.clone());
        }
    }

    (modified, added, removed)
}
