//! Resources: typed, context-scoped configuration values

use crate::derivation::{Derivation, SourceLocation};
use crate::enums::{TypeSymbol, ValueType};
use crate::error::{LcfgResult, ResourceError};
use crate::rules::SerializeOptions;
use crate::status;
use crate::tags::TagList;
use crate::template::TemplateChain;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The LCFG identifier grammar, shared by resource and component names.
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z][A-Za-z0-9_]*$").expect("hard-coded pattern"));

/// True when `name` matches `[A-Za-z][A-Za-z0-9_]*`.
pub fn valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

// ============================================================================
// RESOURCE
// ============================================================================

/// A typed configuration value with derivation metadata, comment and a
/// context-derived priority.
///
/// The priority is computed externally from the context expression; the
/// core only compares it. A resource is *active* when its priority is
/// non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    name: String,
    value: Option<String>,
    value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    templates: Option<TemplateChain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    #[serde(default)]
    derivation: Derivation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(default)]
    priority: i32,
}

impl Resource {
    /// Create a string-typed resource with no value and priority 0.
    pub fn new(name: &str) -> LcfgResult<Self> {
        if !valid_name(name) {
            return Err(ResourceError::InvalidName {
                name: name.to_string(),
            }
            .into());
        }
        Ok(Self {
            name: name.to_string(),
            value: None,
            value_type: ValueType::String,
            templates: None,
            context: None,
            derivation: Derivation::new(),
            comment: None,
            priority: 0,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn templates(&self) -> Option<&TemplateChain> {
        self.templates.as_ref()
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn derivation(&self) -> &Derivation {
        &self.derivation
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Active means the context expression evaluated to a non-negative
    /// priority.
    pub fn is_active(&self) -> bool {
        self.priority >= 0
    }

    /// Name is well-formed and the value, if any, satisfies the type
    /// grammar.
    pub fn is_valid(&self) -> bool {
        if !valid_name(&self.name) {
            return false;
        }
        match &self.value {
            Some(value) => validate_value(self.value_type, value).is_ok(),
            None => true,
        }
    }

    /// Structural equality on (name, value, context); derivation, comment
    /// and priority are metadata and do not participate.
    pub fn equals(&self, other: &Resource) -> bool {
        self.name == other.name && self.value == other.value && self.context == other.context
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Rename the resource; fails unless the new name matches the
    /// identifier grammar.
    pub fn set_name(&mut self, name: &str) -> LcfgResult<()> {
        if !valid_name(name) {
            return Err(ResourceError::InvalidName {
                name: name.to_string(),
            }
            .into());
        }
        self.name = name.to_string();
        Ok(())
    }

    /// Set the value, enforcing the grammar of the current type.
    pub fn set_value(&mut self, value: &str) -> LcfgResult<()> {
        validate_value_for(&self.name, self.value_type, value)?;
        self.value = Some(value.to_string());
        Ok(())
    }

    /// Drop the value.
    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// Change the type; an existing value must satisfy the new grammar.
    /// Leaving the list type drops the template chain.
    pub fn set_type(&mut self, value_type: ValueType) -> LcfgResult<()> {
        if let Some(value) = &self.value {
            validate_value_for(&self.name, value_type, value)?;
        }
        self.value_type = value_type;
        if value_type != ValueType::List {
            self.templates = None;
        }
        Ok(())
    }

    /// Parse a status-file type annotation: the type keyword, optionally
    /// followed by `: <template chain>` for list types.
    pub fn set_type_annotation(&mut self, annotation: &str) -> LcfgResult<()> {
        let (keyword, chain) = match annotation.split_once(':') {
            Some((keyword, rest)) => (keyword.trim(), Some(rest.trim())),
            None => (annotation.trim(), None),
        };
        let value_type: ValueType = keyword.parse().map_err(crate::error::LcfgError::from)?;
        self.set_type(value_type)?;
        if let Some(chain) = chain {
            if value_type != ValueType::List {
                return Err(ResourceError::UnknownType {
                    given: annotation.to_string(),
                }
                .into());
            }
            self.templates = Some(chain.parse().map_err(crate::error::LcfgError::from)?);
        }
        Ok(())
    }

    /// The serialized type annotation, the inverse of
    /// [`set_type_annotation`](Self::set_type_annotation).
    pub fn type_annotation(&self) -> String {
        match &self.templates {
            Some(chain) if !chain.is_empty() => {
                format!("{}: {}", self.value_type.keyword(), chain)
            }
            _ => self.value_type.keyword().to_string(),
        }
    }

    /// Attach the template chain naming child resources of a list.
    pub fn set_templates(&mut self, templates: TemplateChain) -> LcfgResult<()> {
        if self.value_type != ValueType::List {
            return Err(ResourceError::UnknownType {
                given: format!("templates on {} resource", self.value_type),
            }
            .into());
        }
        self.templates = Some(templates);
        Ok(())
    }

    pub fn set_context(&mut self, context: &str) {
        self.context = if context.is_empty() {
            None
        } else {
            Some(context.to_string())
        };
    }

    pub fn set_comment(&mut self, comment: &str) {
        self.comment = if comment.is_empty() {
            None
        } else {
            Some(comment.to_string())
        };
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn set_derivation(&mut self, derivation: Derivation) {
        self.derivation = derivation;
    }

    /// Record one more source location.
    pub fn add_derivation(&mut self, location: SourceLocation) {
        self.derivation.push(location);
    }

    /// Accumulate the other resource's provenance.
    pub fn merge_derivation(&mut self, other: &Derivation) {
        self.derivation.merge(other);
    }

    /// Dispatch one parsed status-file field onto the matching mutator.
    /// Used by the status loader.
    pub fn set_attribute(&mut self, symbol: TypeSymbol, raw: &str) -> LcfgResult<()> {
        match symbol {
            TypeSymbol::Value => self.set_value(raw),
            TypeSymbol::Type => self.set_type_annotation(raw),
            TypeSymbol::Context => {
                self.set_context(raw);
                Ok(())
            }
            TypeSymbol::Comment => {
                self.set_comment(raw);
                Ok(())
            }
            TypeSymbol::Derivation => {
                self.derivation = raw.parse().map_err(crate::error::LcfgError::from)?;
                Ok(())
            }
            TypeSymbol::Priority => {
                let priority =
                    raw.parse::<i32>()
                        .map_err(|_| ResourceError::InvalidPriority {
                            given: raw.to_string(),
                        })?;
                self.priority = priority;
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn with_context(mut self, context: &str) -> Self {
        self.set_context(context);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.set_comment(comment);
        self
    }

    pub fn with_derivation(mut self, derivation: Derivation) -> Self {
        self.derivation = derivation;
        self
    }

    // ------------------------------------------------------------------
    // List helpers
    // ------------------------------------------------------------------

    /// The value of a list resource parsed as tags; an absent value is an
    /// empty list.
    pub fn tag_list(&self) -> LcfgResult<TagList> {
        match &self.value {
            Some(value) => Ok(value.parse().map_err(crate::error::LcfgError::from)?),
            None => Ok(TagList::new()),
        }
    }

    /// Synthesize the name of the child resource `field` for the given
    /// tag tuple, using this resource's template chain.
    pub fn child_resource_name(&self, tags: &TagList, field: &str) -> LcfgResult<String> {
        let chain = self
            .templates
            .as_ref()
            .ok_or_else(|| crate::error::TemplateError::NotFound {
                field: field.to_string(),
            })?;
        Ok(chain.build_name(tags, field)?)
    }

    // ------------------------------------------------------------------
    // Serializers
    // ------------------------------------------------------------------

    /// Emit the status-file lines for this resource, one line per
    /// populated field in the order type, derivation, context, comment,
    /// priority, value.
    ///
    /// Metadata lines require `USE_META`; `ALL_PRIORITIES` forces a
    /// priority line; `ALL_VALUES` emits a value line even when the
    /// resource has no value. This byte stream is the signature contract.
    pub fn to_status(&self, component: Option<&str>, options: SerializeOptions) -> String {
        let mut out = String::new();

        if options.contains(SerializeOptions::USE_META) {
            if self.value_type != ValueType::String || self.templates.is_some() {
                out.push_str(&status::emit_line(
                    component,
                    &self.name,
                    TypeSymbol::Type,
                    &self.type_annotation(),
                ));
            }
            if !self.derivation.is_empty() {
                out.push_str(&status::emit_line(
                    component,
                    &self.name,
                    TypeSymbol::Derivation,
                    &self.derivation.to_string(),
                ));
            }
            if let Some(context) = &self.context {
                out.push_str(&status::emit_line(
                    component,
                    &self.name,
                    TypeSymbol::Context,
                    context,
                ));
            }
            if let Some(comment) = &self.comment {
                out.push_str(&status::emit_line(
                    component,
                    &self.name,
                    TypeSymbol::Comment,
                    comment,
                ));
            }
        }

        let emit_priority = options.contains(SerializeOptions::ALL_PRIORITIES)
            || (options.contains(SerializeOptions::USE_META) && self.priority != 0);
        if emit_priority {
            out.push_str(&status::emit_line(
                component,
                &self.name,
                TypeSymbol::Priority,
                &self.priority.to_string(),
            ));
        }

        match &self.value {
            Some(value) => {
                out.push_str(&status::emit_line(
                    component,
                    &self.name,
                    TypeSymbol::Value,
                    value,
                ));
            }
            None if options.contains(SerializeOptions::ALL_VALUES) => {
                out.push_str(&status::emit_line(
                    component,
                    &self.name,
                    TypeSymbol::Value,
                    "",
                ));
            }
            None => {}
        }

        out
    }

    /// Emit shell export lines. The value is single-quoted with inner
    /// quotes escaped as `'\''`; a second line exports the type annotation
    /// when a type prefix template is given.
    ///
    /// Returns `None` for a valueless resource unless `ALL_VALUES` is set.
    pub fn to_export(
        &self,
        component: &str,
        value_prefix: &str,
        type_prefix: Option<&str>,
        options: SerializeOptions,
    ) -> Option<String> {
        let value = match self.value() {
            Some(value) => value,
            None if options.contains(SerializeOptions::ALL_VALUES) => "",
            None => return None,
        };

        let mut out = String::new();
        let var = build_env_var(&self.name, component, value_prefix);
        out.push_str("export ");
        out.push_str(&var);
        out.push_str("='");
        out.push_str(&shell_quote(value));
        out.push_str("'\n");

        if let Some(type_prefix) = type_prefix {
            let type_var = build_env_var(&self.name, component, type_prefix);
            out.push_str("export ");
            out.push_str(&type_var);
            out.push_str("='");
            out.push_str(&shell_quote(&self.type_annotation()));
            out.push_str("'\n");
        }

        Some(out)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

// ============================================================================
// VALUE VALIDATION
// ============================================================================

/// Check `value` against the grammar of `value_type`.
pub fn validate_value(value_type: ValueType, value: &str) -> Result<(), String> {
    match value_type {
        ValueType::String | ValueType::Publish | ValueType::Subscribe => Ok(()),
        ValueType::Integer => {
            let digits = value.strip_prefix('-').unwrap_or(value);
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                Ok(())
            } else {
                Err("expected a signed decimal integer".to_string())
            }
        }
        ValueType::Boolean => {
            if value == "yes" || value == "no" {
                Ok(())
            } else {
                Err("expected 'yes' or 'no'".to_string())
            }
        }
        ValueType::List => value
            .parse::<TagList>()
            .map(|_| ())
            .map_err(|e| e.to_string()),
    }
}

fn validate_value_for(name: &str, value_type: ValueType, value: &str) -> Result<(), ResourceError> {
    validate_value(value_type, value).map_err(|reason| ResourceError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        value_type,
        reason,
    })
}

// ============================================================================
// ENVIRONMENT EXPORT HELPERS
// ============================================================================

/// Build an environment-variable name from a prefix template holding one
/// `%s` marker for the component name, e.g. `LCFG_%s_` + `sshd` + `port`
/// gives `LCFG_SSHD_PORT`. The result is uppercased with every
/// non-alphanumeric byte mapped to `_`.
pub fn build_env_var(resource_name: &str, component: &str, prefix_template: &str) -> String {
    let prefix = prefix_template.replacen("%s", component, 1);
    let mut var = String::with_capacity(prefix.len() + resource_name.len());
    for c in prefix.chars().chain(resource_name.chars()) {
        if c.is_ascii_alphanumeric() {
            var.push(c.to_ascii_uppercase());
        } else {
            var.push('_');
        }
    }
    var
}

/// Escape a value for inclusion in single quotes: `'` becomes `'\''`.
pub fn shell_quote(value: &str) -> String {
    value.replace('\'', "'\\''")
}
