//! Merge rules, primary keys and serialization options

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// ============================================================================
// MERGE RULES
// ============================================================================

bitflags! {
    /// Rules consulted, in a fixed order, when a resource is merged into a
    /// list that already holds a variant of the same name:
    /// `SQUASH_IDENTICAL`, then `KEEP_ALL`, then `REPLACE`, then
    /// `USE_PRIORITY`. With no accepting rule the merge is a conflict.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MergeRules: u32 {
        /// Append every variant, deduplicating identical entries
        const KEEP_ALL = 1;
        /// An incoming entry identical to the current one replaces it,
        /// refreshing its derivation
        const SQUASH_IDENTICAL = 2;
        /// Resolve by context priority; equal priorities conflict
        const USE_PRIORITY = 4;
        /// Reserved, no observable behavior
        const USE_PREFIX = 8;
        /// The incoming entry unconditionally replaces the current one
        const REPLACE = 16;
    }
}

impl MergeRules {
    /// Default rules for active package lists.
    pub fn active_packages() -> Self {
        MergeRules::SQUASH_IDENTICAL | MergeRules::USE_PRIORITY
    }

    /// Default rules for inactive package lists.
    pub fn inactive_packages() -> Self {
        MergeRules::SQUASH_IDENTICAL | MergeRules::KEEP_ALL
    }
}

impl Default for MergeRules {
    fn default() -> Self {
        Self::empty()
    }
}

// Manual serde implementation (bitflags 2.x + serde)
impl Serialize for MergeRules {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MergeRules {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        Self::from_bits(bits).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid MergeRules bits: {:#06x}", bits))
        })
    }
}

// ============================================================================
// PRIMARY KEY
// ============================================================================

bitflags! {
    /// Which fields identify a resource variant within its list.
    ///
    /// `NAME` alone admits one variant per resource name; `NAME | CONTEXT`
    /// admits one variant per (name, context) pair.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PrimaryKey: u8 {
        const NAME = 1;
        const CONTEXT = 2;
    }
}

impl Default for PrimaryKey {
    fn default() -> Self {
        PrimaryKey::NAME | PrimaryKey::CONTEXT
    }
}

impl Serialize for PrimaryKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PrimaryKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        Self::from_bits(bits).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid PrimaryKey bits: {:#04x}", bits))
        })
    }
}

// ============================================================================
// SERIALIZATION OPTIONS
// ============================================================================

bitflags! {
    /// Options accepted by the serializers and the status parser.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SerializeOptions: u32 {
        /// Terminate the output with a newline
        const NEWLINE = 1;
        /// Emit valueless resources with an empty value instead of
        /// skipping them; on parse, accept value lines only
        const ALL_VALUES = 2;
        /// Emit a priority line for every resource, not only active ones
        const ALL_PRIORITIES = 4;
        /// Emit metadata fields (type, derivation, context, comment)
        const USE_META = 8;
        /// Tolerate lookups of names that do not exist
        const ALLOW_NOEXIST = 16;
    }
}

impl SerializeOptions {
    /// The option set the signature hasher uses: every field of every
    /// resource, so equal models produce equal bytes.
    pub fn signature() -> Self {
        SerializeOptions::USE_META | SerializeOptions::ALL_VALUES | SerializeOptions::ALL_PRIORITIES
    }
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for SerializeOptions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SerializeOptions {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        Self::from_bits(bits).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid SerializeOptions bits: {:#06x}", bits))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_rule_bits_match_wire_values() {
        assert_eq!(MergeRules::KEEP_ALL.bits(), 1);
        assert_eq!(MergeRules::SQUASH_IDENTICAL.bits(), 2);
        assert_eq!(MergeRules::USE_PRIORITY.bits(), 4);
        assert_eq!(MergeRules::USE_PREFIX.bits(), 8);
        assert_eq!(MergeRules::REPLACE.bits(), 16);
    }

    #[test]
    fn test_package_rule_defaults() {
        assert_eq!(
            MergeRules::active_packages(),
            MergeRules::SQUASH_IDENTICAL | MergeRules::USE_PRIORITY
        );
        assert_eq!(
            MergeRules::inactive_packages(),
            MergeRules::SQUASH_IDENTICAL | MergeRules::KEEP_ALL
        );
    }

    #[test]
    fn test_merge_rules_serde_rejects_unknown_bits() {
        let json = serde_json::to_string(&MergeRules::REPLACE).expect("serialize");
        assert_eq!(json, "16");
        let bad: Result<MergeRules, _> = serde_json::from_str("4096");
        assert!(bad.is_err());
    }

    #[test]
    fn test_default_primary_key_is_name_and_context() {
        assert_eq!(
            PrimaryKey::default(),
            PrimaryKey::NAME | PrimaryKey::CONTEXT
        );
    }
}
