//! Component sets: the open-addressed table of a profile's components
//!
//! Same probing, load-factor and resize discipline as the component's
//! resource table, with its own default size. The canonical byte stream
//! fed to the MD5 signature iterates components in case-insensitive name
//! order, so equal models hash identically regardless of insertion order.

use crate::component::Component;
use crate::enums::Change;
use crate::error::{ComponentError, LcfgResult};
use crate::hash::bucket_index;
use crate::rules::SerializeOptions;
use crate::settings::{COMPSET_DEFAULT_BUCKETS, LOAD_INIT, LOAD_MAX};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;

enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

/// The set of components describing one host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSet {
    buckets: Vec<Option<Arc<Component>>>,
    entries: usize,
}

impl Default for ComponentSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentSet {
    /// Create an empty set with the default bucket count.
    pub fn new() -> Self {
        Self::with_buckets(COMPSET_DEFAULT_BUCKETS)
    }

    /// Create an empty set with an explicit bucket count.
    pub fn with_buckets(buckets: usize) -> Self {
        Self {
            buckets: vec![None; buckets.max(1)],
            entries: 0,
        }
    }

    /// Number of components held.
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

    /// The component with the given name, if present.
    pub fn find(&self, name: &str) -> Option<&Arc<Component>> {
        match self.probe(name) {
            Probe::Found(idx) => self.buckets[idx].as_ref(),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Component names in case-insensitive sorted order.
    pub fn names(&self) -> Vec<String> {
        self.sorted_slots()
            .into_iter()
            .filter_map(|idx| {
                self.buckets[idx]
                    .as_ref()
                    .map(|comp| comp.name().to_string())
            })
            .collect()
    }

    /// Iterate components in case-insensitive name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.sorted_slots()
            .into_iter()
            .filter_map(|idx| self.buckets[idx].as_ref())
    }

    /// Insert a component; a duplicate name replaces the existing one.
    pub fn insert(&mut self, component: Arc<Component>) -> LcfgResult<Change> {
        let name = component.name().to_string();
        match self.probe(&name) {
            Probe::Found(idx) => {
                self.buckets[idx] = Some(component);
                Ok(Change::Replaced)
            }
            Probe::Vacant(idx) => {
                self.buckets[idx] = Some(component);
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

    /// Remove a component by name, clearing its slot.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Component>> {
        match self.probe(name) {
            Probe::Found(idx) => {
                let removed = self.buckets[idx].take();
                if removed.is_some() {
                    self.entries -= 1;
                }
                removed
            }
            _ => None,
        }
    }

    /// Merge every component of `other`: a component already present is
    /// merged resource-by-resource under its own rules; an absent one is
    /// inserted only when `take_new` is set.
    pub fn merge_components(
        &mut self,
        other: &ComponentSet,
        take_new: bool,
    ) -> LcfgResult<Change> {
        let mut aggregate = Change::None;
        for component in other.buckets.iter().flatten() {
            let change = match self.probe(component.name()) {
                Probe::Found(idx) => {
                    let slot = match self.buckets[idx].as_mut() {
                        Some(slot) => slot,
                        None => {
                            return Err(ComponentError::CapacityExhausted {
                                name: component.name().to_string(),
                                buckets: self.buckets.len(),
                            }
                            .into())
                        }
                    };
                    Arc::make_mut(slot).merge_component(component)?
                }
                _ if take_new => self.insert(Arc::clone(component))?,
                _ => Change::None,
            };
            aggregate = aggregate.combine(change);
        }
        Ok(aggregate)
    }

    /// Insert (replacing as needed) every component of `other` without
    /// delegating into per-resource merges. Used when a pre-built
    /// component must overwrite in full.
    pub fn transplant_components(&mut self, other: &ComponentSet) -> LcfgResult<Change> {
        let mut aggregate = Change::None;
        for component in other.buckets.iter().flatten() {
            let change = self.insert(Arc::clone(component))?;
            aggregate = aggregate.combine(change);
        }
        Ok(aggregate)
    }

    /// Emit the status form of every component in sorted order.
    pub fn to_status<W: Write>(&self, out: &mut W, options: SerializeOptions) -> LcfgResult<()> {
        for component in self.iter() {
            component.to_status(out, options)?;
        }
        Ok(())
    }

    /// The 32-character lowercase hex MD5 digest over the canonical
    /// serialization. The byte stream is the sole contract: components in
    /// case-insensitive name order, each contributing its metadata-enabled
    /// status lines in sorted resource order.
    pub fn signature(&self) -> String {
        let mut md5 = Md5::new();
        for component in self.iter() {
            component.update_signature(&mut md5);
        }
        hex::encode(md5.finalize())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn probe(&self, name: &str) -> Probe {
        let len = self.buckets.len();
        let start = bucket_index(name, len);
        for i in 0..len {
            let idx = (start + i) % len;
            match &self.buckets[idx] {
                None => return Probe::Vacant(idx),
                Some(component) if component.name() == name => return Probe::Found(idx),
                Some(_) => {}
            }
        }
        Probe::Full
    }

    fn sorted_slots(&self) -> Vec<usize> {
        let mut slots: Vec<(String, usize)> = self
            .buckets
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.as_ref().map(|comp| (comp.name().to_string(), idx))
            })
            .collect();
        slots.sort_by(|(a, _), (b, _)| {
            a.to_ascii_lowercase()
                .cmp(&b.to_ascii_lowercase())
                .then_with(|| a.cmp(b))
        });
        slots.into_iter().map(|(_, idx)| idx).collect()
    }

    fn maybe_resize(&mut self) -> LcfgResult<()> {
        if (self.entries as f64) / (self.buckets.len() as f64) < LOAD_MAX {
            return Ok(());
        }
        let target = (self.entries as f64 / LOAD_INIT).ceil() as usize + 1;
        let old = std::mem::replace(&mut self.buckets, vec![None; target]);
        for slot in old.into_iter().flatten() {
            let name = slot.name().to_string();
            match self.probe(&name) {
                Probe::Vacant(idx) => self.buckets[idx] = Some(slot),
                _ => {
                    return Err(ComponentError::CapacityExhausted {
                        name,
                        buckets: target,
                    }
                    .into())
                }
            }
        }
        Ok(())
    }
}
