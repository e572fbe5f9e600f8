//! Profiles: the whole-host configuration
//!
//! A profile is a thin composite over a component set, the two package
//! lists and the publication metadata the server stamps on each export.

use crate::compset::ComponentSet;
use crate::enums::Change;
use crate::error::LcfgResult;
use crate::packages::PackageList;
use crate::resource::Resource;
use crate::rules::MergeRules;
use serde::{Deserialize, Serialize};

/// The synthetic component carrying profile-level metadata resources.
const PROFILE_COMPONENT: &str = "profile";

/// The whole-host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    components: ComponentSet,
    active_packages: PackageList,
    inactive_packages: PackageList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    published_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    server_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_modified_file: Option<String>,
    #[serde(default)]
    mtime: i64,
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

impl Profile {
    /// Create an empty profile with the default package-list rules.
    pub fn new() -> Self {
        Self {
            components: ComponentSet::new(),
            active_packages: PackageList::new(MergeRules::active_packages()),
            inactive_packages: PackageList::new(MergeRules::inactive_packages()),
            published_by: None,
            published_at: None,
            server_version: None,
            last_modified: None,
            last_modified_file: None,
            mtime: 0,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentSet {
        &mut self.components
    }

    pub fn active_packages(&self) -> &PackageList {
        &self.active_packages
    }

    pub fn active_packages_mut(&mut self) -> &mut PackageList {
        &mut self.active_packages
    }

    pub fn inactive_packages(&self) -> &PackageList {
        &self.inactive_packages
    }

    pub fn inactive_packages_mut(&mut self) -> &mut PackageList {
        &mut self.inactive_packages
    }

    pub fn published_by(&self) -> Option<&str> {
        self.published_by.as_deref()
    }

    pub fn published_at(&self) -> Option<&str> {
        self.published_at.as_deref()
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    pub fn last_modified_file(&self) -> Option<&str> {
        self.last_modified_file.as_deref()
    }

    pub fn mtime(&self) -> i64 {
        self.mtime
    }

    pub fn set_published_by(&mut self, value: &str) {
        self.published_by = Some(value.to_string());
    }

    pub fn set_published_at(&mut self, value: &str) {
        self.published_at = Some(value.to_string());
    }

    pub fn set_server_version(&mut self, value: &str) {
        self.server_version = Some(value.to_string());
    }

    pub fn set_last_modified(&mut self, value: &str) {
        self.last_modified = Some(value.to_string());
    }

    pub fn set_last_modified_file(&mut self, value: &str) {
        self.last_modified_file = Some(value.to_string());
    }

    pub fn set_mtime(&mut self, mtime: i64) {
        self.mtime = mtime;
    }

    // ------------------------------------------------------------------
    // Merge
    // ------------------------------------------------------------------

    /// Merge another profile into this one.
    ///
    /// Components merge through the component set when the other profile
    /// has any and either this profile already has components or
    /// `take_new_comps` permits adopting them. Package lists always merge;
    /// a list created from empty picks up the default rules first.
    pub fn merge(&mut self, other: &Profile, take_new_comps: bool) -> LcfgResult<Change> {
        let mut aggregate = Change::None;

        if !other.components.is_empty() && (!self.components.is_empty() || take_new_comps) {
            let change = self
                .components
                .merge_components(&other.components, take_new_comps)?;
            aggregate = aggregate.combine(change);
        }

        if self.active_packages.is_empty() && self.active_packages.merge_rules().is_empty() {
            self.active_packages
                .set_merge_rules(MergeRules::active_packages());
        }
        if self.inactive_packages.is_empty() && self.inactive_packages.merge_rules().is_empty() {
            self.inactive_packages
                .set_merge_rules(MergeRules::inactive_packages());
        }

        let change = self.active_packages.merge_list(&other.active_packages)?;
        aggregate = aggregate.combine(change);
        let change = self
            .inactive_packages
            .merge_list(&other.inactive_packages)?;
        aggregate = aggregate.combine(change);

        Ok(aggregate)
    }

    // ------------------------------------------------------------------
    // Metadata resources
    // ------------------------------------------------------------------

    /// Read a named resource from the synthetic `profile` component.
    pub fn get_meta(&self, key: &str) -> Option<&str> {
        self.components
            .find(PROFILE_COMPONENT)
            .and_then(|comp| comp.find_resource(key))
            .and_then(|res| res.value())
    }

    /// The host name: the `node` meta resource, qualified by `domain`
    /// when present.
    pub fn nodename(&self) -> Option<String> {
        let node = self.get_meta("node")?;
        match self.get_meta("domain") {
            Some(domain) => Some(format!("{}.{}", node, domain)),
            None => Some(node.to_string()),
        }
    }

    /// The profile signature: the MD5 digest over the component set's
    /// canonical serialization.
    pub fn signature(&self) -> String {
        self.components.signature()
    }
}
