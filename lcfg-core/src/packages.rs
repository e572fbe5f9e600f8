//! Package lists
//!
//! A profile carries two package lists (active and inactive) next to its
//! components. Only the structural contract lives here: a package is a
//! name/version pair with context and priority, and a list merges under
//! the same rule bits as resources.

use crate::derivation::Derivation;
use crate::enums::Change;
use crate::error::{ComponentError, LcfgResult, ResourceError};
use crate::rules::MergeRules;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One package assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    #[serde(default)]
    derivation: Derivation,
    #[serde(default)]
    priority: i32,
}

impl Package {
    /// Create a package; names must be non-empty and whitespace-free.
    pub fn new(name: &str) -> LcfgResult<Self> {
        if name.is_empty() || name.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(ResourceError::InvalidName {
                name: name.to_string(),
            }
            .into());
        }
        Ok(Self {
            name: name.to_string(),
            version: None,
            context: None,
            derivation: Derivation::new(),
            priority: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn derivation(&self) -> &Derivation {
        &self.derivation
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_active(&self) -> bool {
        self.priority >= 0
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_derivation(mut self, derivation: Derivation) -> Self {
        self.derivation = derivation;
        self
    }

    /// Identity on (name, version, context); derivation and priority are
    /// metadata.
    pub fn equals(&self, other: &Package) -> bool {
        self.name == other.name && self.version == other.version && self.context == other.context
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}-{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// An ordered list of packages merged under the usual rule bits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageList {
    merge_rules: MergeRules,
    packages: Vec<Package>,
}

impl PackageList {
    /// Create an empty list with the given merge rules.
    pub fn new(merge_rules: MergeRules) -> Self {
        Self {
            merge_rules,
            packages: Vec::new(),
        }
    }

    pub fn merge_rules(&self) -> MergeRules {
        self.merge_rules
    }

    pub fn set_merge_rules(&mut self, merge_rules: MergeRules) {
        self.merge_rules = merge_rules;
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Package> {
        self.packages.iter()
    }

    /// The package with the given name and context.
    pub fn find(&self, name: &str, context: Option<&str>) -> Option<&Package> {
        self.packages
            .iter()
            .find(|p| p.name() == name && p.context() == context)
    }

    /// Merge one package under the list's rules; the rule order matches
    /// the resource merge.
    pub fn merge_package(&mut self, incoming: Package) -> LcfgResult<Change> {
        let current_idx = self
            .packages
            .iter()
            .position(|p| p.name() == incoming.name() && p.context() == incoming.context());

        let idx = match current_idx {
            None => {
                self.packages.push(incoming);
                return Ok(Change::Added);
            }
            Some(idx) => idx,
        };
        let rules = self.merge_rules;
        let current = self.packages[idx].clone();

        if rules.contains(MergeRules::SQUASH_IDENTICAL) && current.equals(&incoming) {
            self.packages[idx] = incoming;
            return Ok(Change::Replaced);
        }
        if rules.contains(MergeRules::KEEP_ALL) {
            if self.packages.iter().any(|p| p.equals(&incoming)) {
                return Ok(Change::None);
            }
            self.packages.push(incoming);
            return Ok(Change::Added);
        }
        if rules.contains(MergeRules::REPLACE) {
            self.packages[idx] = incoming;
            return Ok(Change::Replaced);
        }
        if rules.contains(MergeRules::USE_PRIORITY) {
            return if incoming.priority() > current.priority() {
                self.packages[idx] = incoming;
                Ok(Change::Replaced)
            } else if incoming.priority() < current.priority() {
                Ok(Change::None)
            } else {
                Err(ComponentError::MergeConflict {
                    resource: incoming.name().to_string(),
                }
                .into())
            };
        }

        Err(ComponentError::MergeConflict {
            resource: incoming.name().to_string(),
        }
        .into())
    }

    /// Merge every package of `src`, aggregating the strongest change.
    pub fn merge_list(&mut self, src: &PackageList) -> LcfgResult<Change> {
        let mut aggregate = Change::None;
        for package in src.iter() {
            let change = self.merge_package(package.clone())?;
            aggregate = aggregate.combine(change);
        }
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, version: &str, priority: i32) -> Package {
        Package::new(name)
            .expect("valid name")
            .with_version(version)
            .with_priority(priority)
    }

    #[test]
    fn test_package_name_validation() {
        assert!(Package::new("openssh-server").is_ok());
        assert!(Package::new("").is_err());
        assert!(Package::new("bad name").is_err());
    }

    #[test]
    fn test_active_rules_prefer_priority() {
        let mut list = PackageList::new(MergeRules::active_packages());
        list.merge_package(package("kernel", "5.14", 1)).expect("merge");
        let change = list
            .merge_package(package("kernel", "6.1", 5))
            .expect("merge");
        assert_eq!(change, Change::Replaced);
        assert_eq!(list.len(), 1);
        assert_eq!(
            list.find("kernel", None).and_then(Package::version),
            Some("6.1")
        );
    }

    #[test]
    fn test_inactive_rules_keep_all() {
        let mut list = PackageList::new(MergeRules::inactive_packages());
        list.merge_package(package("kernel", "5.14", 0)).expect("merge");
        let change = list
            .merge_package(package("kernel", "6.1", 0))
            .expect("merge");
        assert_eq!(change, Change::Added);
        assert_eq!(list.len(), 2);

        // An identical assignment is a no-op, not a duplicate
        let change = list
            .merge_package(package("kernel", "6.1", 0))
            .expect("merge");
        assert_eq!(change, Change::None);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_equal_priority_conflicts() {
        let mut list = PackageList::new(MergeRules::active_packages());
        list.merge_package(package("kernel", "5.14", 1)).expect("merge");
        assert!(list.merge_package(package("kernel", "6.1", 1)).is_err());
    }
}
