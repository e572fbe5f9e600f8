//! Name templates for list-typed resources
//!
//! A list resource carries a chain of templates naming its child resources.
//! Each template holds `$` placeholders that expand to tags, e.g. the
//! template `foo_$_$` with the tags `b c` names the resource `foo_b_c`.

use crate::error::TemplateError;
use crate::settings::TAGS_MAX_DEPTH;
use crate::tags::TagList;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TEMPLATE
// ============================================================================

/// A single parsed template.
///
/// Placeholder offsets are stored highest-first, matching the tail-first
/// order in which tags are consumed during name synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    text: String,
    placeholders: Vec<usize>,
    base_len: usize,
}

impl Template {
    /// Parse one whitespace-free token as a template.
    ///
    /// Validity: first char alphabetic, remaining chars alphanumeric,
    /// underscore or `$`, placeholder count in `[1, TAGS_MAX_DEPTH]`.
    pub fn from_token(token: &str) -> Result<Self, TemplateError> {
        if token.is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut chars = token.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() => {}
            _ => {
                return Err(TemplateError::Invalid {
                    template: token.to_string(),
                    reason: "first character must be alphabetic".to_string(),
                })
            }
        }

        let mut placeholders = Vec::new();
        for (offset, c) in chars {
            match c {
                '$' => placeholders.push(offset),
                c if c.is_ascii_alphanumeric() || c == '_' => {}
                c => {
                    return Err(TemplateError::Invalid {
                        template: token.to_string(),
                        reason: format!("invalid character '{}'", c),
                    })
                }
            }
        }

        if placeholders.is_empty() {
            return Err(TemplateError::Invalid {
                template: token.to_string(),
                reason: "no placeholders".to_string(),
            });
        }
        if placeholders.len() > TAGS_MAX_DEPTH {
            return Err(TemplateError::TooManyPlaceholders {
                template: token.to_string(),
                count: placeholders.len(),
                max: TAGS_MAX_DEPTH,
            });
        }

        // Tail-first substitution order
        placeholders.reverse();

        let base_len = match token.find("_$") {
            Some(i) => i,
            None => token.find('$').unwrap_or(token.len()),
        };

        Ok(Self {
            text: token.to_string(),
            placeholders,
            base_len,
        })
    }

    /// The raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Byte length of the template text.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Always false; empty templates are rejected at parse.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of `$` placeholders.
    pub fn pcount(&self) -> usize {
        self.placeholders.len()
    }

    /// The base name: the bytes before the first `_$`.
    pub fn base_name(&self) -> &str {
        &self.text[..self.base_len]
    }

    /// True when `field` equals the base name.
    pub fn matches_field(&self, field: &str) -> bool {
        self.base_name() == field
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ============================================================================
// TEMPLATE CHAIN
// ============================================================================

/// An ordered chain of templates, one per whitespace-separated token of the
/// source string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateChain {
    templates: Vec<Template>,
}

impl TemplateChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of templates in the chain.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when the chain holds no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Iterate the templates in chain order.
    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }

    /// Linear walk for the template whose base name equals `field`.
    pub fn find(&self, field: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.matches_field(field))
    }

    /// Synthesize the child-resource name for `field` from the tail of
    /// `tags`.
    ///
    /// The last `pcount` tags are consumed in reverse order, filling the
    /// placeholder positions from the highest offset downward: templates
    /// model nested list membership with the outermost tag first, so the
    /// rightmost placeholder takes the innermost (most recently seen) tag.
    /// The output length is exactly
    /// `template_len - pcount + sum(tag_lengths)`.
    pub fn build_name(&self, tags: &TagList, field: &str) -> Result<String, TemplateError> {
        let template = self.find(field).ok_or_else(|| TemplateError::NotFound {
            field: field.to_string(),
        })?;

        if tags.len() < template.pcount() {
            return Err(TemplateError::InsufficientTags {
                field: field.to_string(),
                needed: template.pcount(),
                available: tags.len(),
            });
        }

        let consumed: usize = tags
            .iter()
            .rev()
            .take(template.pcount())
            .map(|t| t.len())
            .sum();
        let mut name = String::with_capacity(template.len() - template.pcount() + consumed);
        name.push_str(template.text());

        // Offsets are highest-first, so earlier substitutions never shift
        // the later (lower) ones.
        for (&offset, tag) in template.placeholders.iter().zip(tags.iter().rev()) {
            name.replace_range(offset..offset + 1, tag.name());
        }

        Ok(name)
    }
}

impl fmt::Display for TemplateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, template) in self.templates.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(template.text())?;
        }
        Ok(())
    }
}

impl FromStr for TemplateChain {
    type Err = TemplateError;

    /// Tokenize on whitespace; each token becomes one template.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut templates = Vec::new();
        for token in s.split_ascii_whitespace() {
            templates.push(Template::from_token(token)?);
        }
        Ok(Self { templates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_validation() {
        assert!(Template::from_token("foo_$").is_ok());
        assert!(Template::from_token("foo_$_$").is_ok());
        assert!(Template::from_token("").is_err());
        assert!(Template::from_token("_foo$").is_err());
        assert!(Template::from_token("1foo$").is_err());
        assert!(Template::from_token("foo").is_err());
        assert!(Template::from_token("foo-$").is_err());
        assert!(Template::from_token("f_$_$_$_$_$_$").is_err());
    }

    #[test]
    fn test_base_name_stops_at_first_placeholder() {
        let t = Template::from_token("disk_part_$_$").expect("valid template");
        assert_eq!(t.base_name(), "disk_part");
        assert_eq!(t.pcount(), 2);
        assert!(t.matches_field("disk_part"));
        assert!(!t.matches_field("disk"));
    }

    #[test]
    fn test_chain_find() {
        let chain: TemplateChain = "foo_$ bar_$_$".parse().expect("valid chain");
        assert_eq!(chain.len(), 2);
        assert!(chain.find("foo").is_some());
        assert!(chain.find("bar").is_some());
        assert!(chain.find("baz").is_none());
    }

    #[test]
    fn test_build_name_consumes_tail_in_reverse() {
        // "foo_$_$" with tags "a b c" and field "foo" yields "foo_b_c";
        // "a" is unused because pcount is 2.
        let chain: TemplateChain = "foo_$_$".parse().expect("valid chain");
        let tags: TagList = "a b c".parse().expect("valid tags");
        let name = chain.build_name(&tags, "foo").expect("synthesis");
        assert_eq!(name, "foo_b_c");
    }

    #[test]
    fn test_build_name_length_arithmetic() {
        let chain: TemplateChain = "vol_$_$".parse().expect("valid chain");
        let tags: TagList = "alpha beta".parse().expect("valid tags");
        let template = chain.find("vol").expect("template present");
        let name = chain.build_name(&tags, "vol").expect("synthesis");
        assert_eq!(
            name.len(),
            template.len() - template.pcount() + "alpha".len() + "beta".len()
        );
        assert_eq!(name, "vol_alpha_beta");
    }

    #[test]
    fn test_build_name_failures() {
        let chain: TemplateChain = "foo_$_$".parse().expect("valid chain");
        let one_tag: TagList = "a".parse().expect("valid tags");
        assert!(matches!(
            chain.build_name(&one_tag, "foo"),
            Err(TemplateError::InsufficientTags { .. })
        ));
        let tags: TagList = "a b".parse().expect("valid tags");
        assert!(matches!(
            chain.build_name(&tags, "missing"),
            Err(TemplateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_chain_round_trips_through_display() {
        let chain: TemplateChain = "foo_$ bar_$_$".parse().expect("valid chain");
        let text = chain.to_string();
        assert_eq!(text, "foo_$ bar_$_$");
        let reparsed: TemplateChain = text.parse().expect("valid chain");
        assert_eq!(chain, reparsed);
    }
}
