//! Components: open-addressed tables of resource lists
//!
//! A component maps resource names to their variant lists with linear
//! probing and wraparound. Probing stops at the first empty slot, so a
//! cleared slot is only ever produced by an emptied list; merges never
//! empty a list. Lists shared with another component (after a clone) are
//! copied before mutation, so no component observes a partial mutation
//! performed on behalf of another owner.

use crate::enums::Change;
use crate::error::{ComponentError, LcfgResult};
use crate::hash::bucket_index;
use crate::list::ResourceList;
use crate::resource::{valid_name, Resource};
use crate::rules::{MergeRules, PrimaryKey, SerializeOptions};
use crate::settings::{COMPONENT_DEFAULT_BUCKETS, LOAD_INIT, LOAD_MAX};
use crate::status::{self, StatusLine};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Result of probing the bucket array for a name.
enum Probe {
    /// The list for this name lives at the index
    Found(usize),
    /// The name is absent; the index is the insertion point
    Vacant(usize),
    /// Every slot is occupied by other names
    Full,
}

/// A named collection of resources owned by one subsystem on a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    name: String,
    merge_rules: MergeRules,
    primary_key: PrimaryKey,
    buckets: Vec<Option<Arc<ResourceList>>>,
    entries: usize,
}

impl Component {
    /// Create an empty component with the default bucket count.
    pub fn new(name: &str) -> LcfgResult<Self> {
        Self::with_buckets(name, COMPONENT_DEFAULT_BUCKETS)
    }

    /// Create an empty component with an explicit bucket count.
    pub fn with_buckets(name: &str, buckets: usize) -> LcfgResult<Self> {
        if !valid_name(name) {
            return Err(ComponentError::InvalidName {
                name: name.to_string(),
            }
            .into());
        }
        Ok(Self {
            name: name.to_string(),
            merge_rules: MergeRules::default(),
            primary_key: PrimaryKey::default(),
            buckets: vec![None; buckets.max(1)],
            entries: 0,
        })
    }

    pub fn with_merge_rules(mut self, merge_rules: MergeRules) -> Self {
        self.merge_rules = merge_rules;
        self
    }

    pub fn with_primary_key(mut self, primary_key: PrimaryKey) -> Self {
        self.primary_key = primary_key;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn merge_rules(&self) -> MergeRules {
        self.merge_rules
    }

    pub fn primary_key(&self) -> PrimaryKey {
        self.primary_key
    }

    pub fn set_merge_rules(&mut self, merge_rules: MergeRules) {
        self.merge_rules = merge_rules;
    }

    pub fn set_primary_key(&mut self, primary_key: PrimaryKey) {
        self.primary_key = primary_key;
    }

    /// Number of resource names held.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Current bucket count.
    pub fn buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of variants across all names.
    pub fn resource_count(&self) -> usize {
        self.buckets
            .iter()
            .flatten()
            .map(|list| list.len())
            .sum()
    }

    /// The variant list for a resource name, if present.
    pub fn find(&self, name: &str) -> Option<&Arc<ResourceList>> {
        match self.probe(name) {
            Probe::Found(idx) => self.buckets[idx].as_ref(),
            _ => None,
        }
    }

    /// The winning variant for a resource name.
    pub fn find_resource(&self, name: &str) -> Option<&Arc<Resource>> {
        self.find(name).and_then(|list| list.head())
    }

    /// True when a resource of this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Resource names in case-insensitive sorted order. All emission paths
    /// iterate in this order; bucket order is never exposed.
    pub fn names(&self) -> Vec<String> {
        self.sorted_slots()
            .into_iter()
            .filter_map(|idx| {
                self.buckets[idx]
                    .as_ref()
                    .and_then(|list| list.name())
                    .map(str::to_string)
            })
            .collect()
    }

    /// Iterate the variant lists in case-insensitive name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceList>> {
        self.sorted_slots()
            .into_iter()
            .filter_map(|idx| self.buckets[idx].as_ref())
    }

    // ------------------------------------------------------------------
    // Merge
    // ------------------------------------------------------------------

    /// Merge one resource into the component under its merge rules.
    ///
    /// A fresh list inherits the component's rules and primary key. A
    /// shared list is cloned before the merge and the slot republished,
    /// releasing the previous reference. A list emptied by the merge
    /// clears its slot.
    pub fn merge_resource(&mut self, resource: Arc<Resource>) -> LcfgResult<Change> {
        let name = resource.name().to_string();
        match self.probe(&name) {
            Probe::Found(idx) => {
                let slot = match self.buckets[idx].as_mut() {
                    Some(slot) => slot,
                    None => {
                        return Err(ComponentError::CapacityExhausted {
                            name,
                            buckets: self.buckets.len(),
                        }
                        .into())
                    }
                };
                let list = Arc::make_mut(slot);
                let change = list.merge_resource(resource)?;
                if list.is_empty() {
                    self.buckets[idx] = None;
                    self.entries -= 1;
                }
                Ok(change)
            }
            Probe::Vacant(idx) => {
                let mut list = ResourceList::new(self.merge_rules, self.primary_key);
                let change = list.merge_resource(resource)?;
                self.buckets[idx] = Some(Arc::new(list));
                self.entries += 1;
                self.maybe_resize()?;
                Ok(change)
            }
            Probe::Full => Err(ComponentError::CapacityExhausted {
                name,
                buckets: self.buckets.len(),
            }
            .into()),
        }
    }

    /// Merge every resource of `other` into this component. Iteration is
    /// in bucket order, which is reproducible for a given source table.
    pub fn merge_component(&mut self, other: &Component) -> LcfgResult<Change> {
        let mut aggregate = Change::None;
        for list in other.buckets.iter().flatten() {
            for entry in list.iter() {
                let change = self.merge_resource(Arc::clone(entry))?;
                aggregate = aggregate.combine(change);
            }
        }
        Ok(aggregate)
    }

    // ------------------------------------------------------------------
    // Status import
    // ------------------------------------------------------------------

    /// Apply one status-file line to the component.
    ///
    /// The status loader is authoritative: the field is applied to the
    /// existing same-name variant (or a fresh resource) without consulting
    /// the merge rules. Lines ignored by the parser report no change.
    pub fn import_status_line(
        &mut self,
        line: &str,
        lineno: usize,
        values_only: bool,
    ) -> LcfgResult<Change> {
        let parsed = match status::parse_line(line, lineno, values_only)? {
            Some(parsed) => parsed,
            None => return Ok(Change::None),
        };
        self.apply_status(&parsed)
    }

    /// Apply a whole status document, line by line. Blank lines are
    /// skipped; line numbers in errors are 1-based.
    pub fn import_status(&mut self, text: &str, values_only: bool) -> LcfgResult<Change> {
        let mut aggregate = Change::None;
        for (i, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let change = self.import_status_line(line, i + 1, values_only)?;
            aggregate = aggregate.combine(change);
        }
        Ok(aggregate)
    }

    /// Apply one parsed status line, see
    /// [`import_status_line`](Self::import_status_line).
    ///
    /// Fields accumulate on the winning variant; a context line moves the
    /// variant to its new context rather than forking it.
    pub fn apply_status(&mut self, status: &StatusLine) -> LcfgResult<Change> {
        match self.probe(&status.resource) {
            Probe::Found(idx) => {
                let slot = match self.buckets[idx].as_mut() {
                    Some(slot) => slot,
                    None => {
                        return Err(ComponentError::CapacityExhausted {
                            name: status.resource.clone(),
                            buckets: self.buckets.len(),
                        }
                        .into())
                    }
                };
                let list = Arc::make_mut(slot);
                let mut resource = match list.head() {
                    Some(head) => (**head).clone(),
                    None => Resource::new(&status.resource)?,
                };
                let old_context = resource.context().map(str::to_string);
                resource.set_attribute(status.symbol, &status.value)?;
                list.remove(old_context.as_deref());
                list.put(Arc::new(resource));
                Ok(Change::Modified)
            }
            Probe::Vacant(_) => {
                let mut resource = Resource::new(&status.resource)?;
                resource.set_attribute(status.symbol, &status.value)?;
                self.put_resource(Arc::new(resource))
            }
            Probe::Full => Err(ComponentError::CapacityExhausted {
                name: status.resource.clone(),
                buckets: self.buckets.len(),
            }
            .into()),
        }
    }

    /// Insert or overwrite the same-context variant for a resource,
    /// bypassing the merge rules.
    pub fn put_resource(&mut self, resource: Arc<Resource>) -> LcfgResult<Change> {
        let name = resource.name().to_string();
        match self.probe(&name) {
            Probe::Found(idx) => {
                let slot = match self.buckets[idx].as_mut() {
                    Some(slot) => slot,
                    None => {
                        return Err(ComponentError::CapacityExhausted {
                            name,
                            buckets: self.buckets.len(),
                        }
                        .into())
                    }
                };
                Ok(Arc::make_mut(slot).put(resource))
            }
            Probe::Vacant(idx) => {
                let mut list = ResourceList::new(self.merge_rules, self.primary_key);
                list.put(resource);
                self.buckets[idx] = Some(Arc::new(list));
                self.entries += 1;
                self.maybe_resize()?;
                Ok(Change::Added)
            }
            Probe::Full => Err(ComponentError::CapacityExhausted {
                name,
                buckets: self.buckets.len(),
            }
            .into()),
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Emit the status form of every variant, names sorted
    /// case-insensitively, variants in decreasing-priority order.
    pub fn to_status_string(&self, options: SerializeOptions) -> String {
        let mut out = String::new();
        for list in self.iter() {
            for resource in list.iter() {
                out.push_str(&resource.to_status(Some(&self.name), options));
            }
        }
        out
    }

    /// Write the status form to `out`.
    pub fn to_status<W: Write>(&self, out: &mut W, options: SerializeOptions) -> LcfgResult<()> {
        out.write_all(self.to_status_string(options).as_bytes())?;
        Ok(())
    }

    /// Feed this component's canonical bytes to a running MD5 state.
    pub fn update_signature(&self, md5: &mut Md5) {
        md5.update(self.to_status_string(SerializeOptions::signature()).as_bytes());
    }

    /// MD5 digest of this component alone; lets the diff engine compare
    /// components without serializing twice.
    pub fn digest(&self) -> [u8; 16] {
        let mut md5 = Md5::new();
        self.update_signature(&mut md5);
        md5.finalize().into()
    }

    /// Emit shell exports for every winning variant in sorted order,
    /// followed by the sorted resource-name list variable.
    pub fn to_export<W: Write>(
        &self,
        out: &mut W,
        value_prefix: &str,
        type_prefix: Option<&str>,
        options: SerializeOptions,
    ) -> LcfgResult<()> {
        let mut exported = Vec::new();
        for list in self.iter() {
            let resource = match list.head() {
                Some(resource) => resource,
                None => continue,
            };
            if !resource.is_active() && !options.contains(SerializeOptions::ALL_PRIORITIES) {
                continue;
            }
            match resource.to_export(&self.name, value_prefix, type_prefix, options) {
                Some(block) => {
                    out.write_all(block.as_bytes())?;
                    exported.push(resource.name().to_string());
                }
                None => continue,
            }
        }

        let list_var =
            crate::resource::build_env_var("_RESOURCES", &self.name, value_prefix);
        let joined = exported.join(" ");
        out.write_all(
            format!(
                "export {}='{}'\n",
                list_var,
                crate::resource::shell_quote(&joined)
            )
            .as_bytes(),
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Linear probe from the hashed slot with wraparound; the first empty
    /// slot means the name is absent.
    fn probe(&self, name: &str) -> Probe {
        let len = self.buckets.len();
        let start = bucket_index(name, len);
        for i in 0..len {
            let idx = (start + i) % len;
            match &self.buckets[idx] {
                None => return Probe::Vacant(idx),
                Some(list) if list.name() == Some(name) => return Probe::Found(idx),
                Some(_) => {}
            }
        }
        Probe::Full
    }

    /// Bucket indices sorted by case-insensitive resource name, with the
    /// raw name as a deterministic tiebreak.
    fn sorted_slots(&self) -> Vec<usize> {
        let mut slots: Vec<(String, usize)> = self
            .buckets
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.as_ref()
                    .and_then(|list| list.name())
                    .map(|name| (name.to_string(), idx))
            })
            .collect();
        slots.sort_by(|(a, _), (b, _)| {
            a.to_ascii_lowercase()
                .cmp(&b.to_ascii_lowercase())
                .then_with(|| a.cmp(b))
        });
        slots.into_iter().map(|(_, idx)| idx).collect()
    }

    /// Grow the table once the load factor reaches `LOAD_MAX`, targeting
    /// `LOAD_INIT`. Lists move as opaque references; the probe invariant
    /// is re-established by re-probing each name into the new array.
    fn maybe_resize(&mut self) -> LcfgResult<()> {
        if (self.entries as f64) / (self.buckets.len() as f64) < LOAD_MAX {
            return Ok(());
        }
        let target = (self.entries as f64 / LOAD_INIT).ceil() as usize + 1;
        self.rehash(target)
    }

    fn rehash(&mut self, new_len: usize) -> LcfgResult<()> {
        let old = std::mem::replace(&mut self.buckets, vec![None; new_len]);
        for slot in old.into_iter().flatten() {
            let name = match slot.name() {
                Some(name) => name.to_string(),
                None => continue,
            };
            match self.probe(&name) {
                Probe::Vacant(idx) => self.buckets[idx] = Some(slot),
                _ => {
                    return Err(ComponentError::CapacityExhausted {
                        name,
                        buckets: new_len,
                    }
                    .into())
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} resources)", self.name, self.entries)
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

    fn component(rules: MergeRules) -> Component {
        Component::new("sshd")
            .expect("valid name")
            .with_merge_rules(rules)
    }

    #[test]
    fn test_invalid_component_name() {
        assert!(Component::new("2bad").is_err());
        assert!(Component::new("").is_err());
    }

    #[test]
    fn test_priority_wins_scenario() {
        // USE_PRIORITY: insert (x,1,p5) then (x,2,p7); the higher
        // priority wins.
        let mut c = component(MergeRules::USE_PRIORITY);
        let first = c.merge_resource(resource("x", "1", 5)).expect("merge");
        let second = c.merge_resource(resource("x", "2", 7)).expect("merge");
        assert_eq!(first, Change::Added);
        assert_eq!(second, Change::Replaced);
        assert_eq!(c.len(), 1);
        assert_eq!(
            c.find_resource("x").and_then(|r| r.value()),
            Some("2")
        );
    }

    #[test]
    fn test_squash_identical_scenario() {
        // SQUASH_IDENTICAL refreshes the derivation of an identical entry.
        let mut c = component(MergeRules::SQUASH_IDENTICAL);
        let mut r = Resource::new("x").expect("valid name");
        r.set_value("v").expect("valid value");
        r.add_derivation(crate::derivation::SourceLocation::file_line("a", 1));
        let first = c.merge_resource(Arc::new(r.clone())).expect("merge");

        r.add_derivation(crate::derivation::SourceLocation::file_line("b", 2));
        let second = c.merge_resource(Arc::new(r)).expect("merge");

        assert_eq!(first, Change::Added);
        assert_eq!(second, Change::Replaced);
        assert_eq!(c.len(), 1);
        assert_eq!(
            c.find_resource("x").map(|r| r.derivation().len()),
            Some(2)
        );
    }

    #[test]
    fn test_conflict_scenario_keeps_first() {
        let mut c = component(MergeRules::USE_PRIORITY);
        c.merge_resource(resource("x", "1", 5)).expect("merge");
        let err = c
            .merge_resource(resource("x", "2", 5))
            .expect_err("conflict");
        assert!(err.to_string().contains("conflict"));
        assert_eq!(
            c.find_resource("x").and_then(|r| r.value()),
            Some("1")
        );
    }

    #[test]
    fn test_lookup_returns_head_with_matching_name() {
        let mut c = component(MergeRules::USE_PRIORITY);
        for (name, value) in [("a", "1"), ("b", "2"), ("c", "3")] {
            c.merge_resource(resource(name, value, 0)).expect("merge");
        }
        for (name, value) in [("a", "1"), ("b", "2"), ("c", "3")] {
            let list = c.find(name).expect("present");
            assert_eq!(list.name(), Some(name));
            assert_eq!(list.head().and_then(|r| r.value()), Some(value));
        }
        assert!(c.find("missing").is_none());
    }

    #[test]
    fn test_resize_preserves_lookup_and_load_bound() {
        let mut c = Component::with_buckets("big", 5)
            .expect("valid name")
            .with_merge_rules(MergeRules::USE_PRIORITY);
        for i in 0..50 {
            let name = format!("res_{}", i);
            c.merge_resource(resource(&name, "v", 0)).expect("merge");
            assert!(
                (c.len() as f64) / (c.buckets() as f64) <= LOAD_MAX,
                "load factor bound violated at {} entries / {} buckets",
                c.len(),
                c.buckets()
            );
        }
        for i in 0..50 {
            let name = format!("res_{}", i);
            assert!(c.contains(&name), "lost {} after resize", name);
        }
    }

    #[test]
    fn test_cow_on_shared_list() {
        let mut a = component(MergeRules::USE_PRIORITY);
        a.merge_resource(resource("x", "1", 0)).expect("merge");

        // Cloning shares the lists; mutating one component must not leak
        // into the other.
        let mut b = a.clone();
        b.merge_resource(resource("x", "2", 9)).expect("merge");

        assert_eq!(a.find_resource("x").and_then(|r| r.value()), Some("1"));
        assert_eq!(b.find_resource("x").and_then(|r| r.value()), Some("2"));
    }

    #[test]
    fn test_names_are_sorted_case_insensitively() {
        let mut c = component(MergeRules::REPLACE);
        for name in ["delta", "Alpha", "charlie", "Bravo"] {
            c.merge_resource(resource(name, "v", 0)).expect("merge");
        }
        assert_eq!(c.names(), vec!["Alpha", "Bravo", "charlie", "delta"]);
    }

    #[test]
    fn test_status_output_is_insertion_order_independent() {
        let mut fwd = component(MergeRules::REPLACE);
        let mut rev = component(MergeRules::REPLACE);
        let pairs = [("a", "1"), ("b", "2"), ("c", "3")];
        for (name, value) in pairs {
            fwd.merge_resource(resource(name, value, 0)).expect("merge");
        }
        for (name, value) in pairs.iter().rev() {
            rev.merge_resource(resource(name, value, 0)).expect("merge");
        }
        let options = SerializeOptions::signature();
        assert_eq!(fwd.to_status_string(options), rev.to_status_string(options));
        assert_eq!(fwd.digest(), rev.digest());
    }

    #[test]
    fn test_import_status_lines_builds_resource() {
        let mut c = component(MergeRules::USE_PRIORITY);
        c.import_status_line("sshd.port%t=integer", 1, false)
            .expect("type line");
        c.import_status_line("sshd.port=22", 2, false)
            .expect("value line");
        let r = c.find_resource("port").expect("present");
        assert_eq!(r.value(), Some("22"));
        assert_eq!(r.value_type(), crate::enums::ValueType::Integer);
    }

    #[test]
    fn test_import_status_document_round_trip() {
        let mut c = component(MergeRules::REPLACE);
        let mut r = Resource::new("port").expect("valid name");
        r.set_type(crate::enums::ValueType::Integer).expect("type");
        r.set_value("22").expect("value");
        c.merge_resource(Arc::new(r.with_priority(2))).expect("merge");

        let text = c.to_status_string(SerializeOptions::signature());
        let mut rebuilt = component(MergeRules::REPLACE);
        rebuilt.import_status(&text, false).expect("import");

        assert_eq!(
            rebuilt.to_status_string(SerializeOptions::signature()),
            text
        );
    }

    #[test]
    fn test_export_includes_resources_variable() {
        let mut c = component(MergeRules::REPLACE);
        c.merge_resource(resource("port", "22", 0)).expect("merge");
        c.merge_resource(resource("proto", "2", 0)).expect("merge");

        let mut out = Vec::new();
        c.to_export(&mut out, "LCFG_%s_", None, SerializeOptions::empty())
            .expect("export");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("export LCFG_SSHD_PORT='22'\n"));
        assert!(text.contains("export LCFG_SSHD_PROTO='2'\n"));
        assert!(text.ends_with("export LCFG_SSHD__RESOURCES='port proto'\n"));
    }
}
