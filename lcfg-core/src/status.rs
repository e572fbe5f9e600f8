//! Status-file line codec
//!
//! The line-oriented persistence format consumed and produced by the core:
//!
//! ```text
//! line := [ host '/' ] [ component '.' ] resource [ '%' type_char ] '=' value LF
//! ```
//!
//! Values are kept line-oriented by HTML-like escaping: `&`, `<`, `>` use
//! named references, control bytes use numeric references. Emission is the
//! exact inverse of parsing, and the emitted bytes are what the signature
//! hasher consumes.

use crate::enums::TypeSymbol;
use crate::error::StatusError;
use crate::resource::valid_name;

// ============================================================================
// VALUE ESCAPING
// ============================================================================

/// Escape a value for a status line.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            '\r' => out.push_str("&#13;"),
            c if (c as u32) < 0x20 => {
                out.push_str("&#");
                out.push_str(&(c as u32).to_string());
                out.push(';');
            }
            c => out.push(c),
        }
    }
    out
}

/// Undo [`escape_value`]. `lineno` is reported in errors.
pub fn unescape_value(value: &str, lineno: usize) -> Result<String, StatusError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tail.find(';').ok_or_else(|| StatusError::BadEscape {
            lineno,
            sequence: tail.chars().take(8).collect(),
        })?;
        let entity = &tail[1..end];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            _ => {
                let digits = entity
                    .strip_prefix('#')
                    .ok_or_else(|| StatusError::BadEscape {
                        lineno,
                        sequence: tail[..=end].to_string(),
                    })?;
                let code = digits
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| StatusError::BadEscape {
                        lineno,
                        sequence: tail[..=end].to_string(),
                    })?;
                out.push(code);
            }
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

// ============================================================================
// LINE EMISSION
// ============================================================================

/// Emit one status line for a resource field. The component prefix is
/// optional; host prefixes are accepted by the parser but never emitted by
/// the core.
pub fn emit_line(
    component: Option<&str>,
    resource: &str,
    symbol: TypeSymbol,
    value: &str,
) -> String {
    let mut out = String::new();
    if let Some(component) = component {
        out.push_str(component);
        out.push('.');
    }
    out.push_str(resource);
    if let Some(code) = symbol.code() {
        out.push('%');
        out.push(code);
    }
    out.push('=');
    out.push_str(&escape_value(value));
    out.push('\n');
    out
}

// ============================================================================
// LINE PARSING
// ============================================================================

/// One parsed status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub host: Option<String>,
    pub component: Option<String>,
    pub resource: String,
    pub symbol: TypeSymbol,
    pub value: String,
}

/// Parse one status line.
///
/// Returns `Ok(None)` for a metadata line whose type symbol is unknown when
/// `values_only` is in effect; otherwise unknown symbols are an error.
/// Empty values are tolerated silently.
pub fn parse_line(
    line: &str,
    lineno: usize,
    values_only: bool,
) -> Result<Option<StatusLine>, StatusError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let (key, raw_value) = line
        .split_once('=')
        .ok_or(StatusError::MissingSeparator { lineno })?;

    let (host, key) = match key.split_once('/') {
        Some((host, rest)) => (Some(host), rest),
        None => (None, key),
    };
    let (component, key) = match key.split_once('.') {
        Some((component, rest)) => (Some(component), rest),
        None => (None, key),
    };

    let (resource, symbol) = match key.split_once('%') {
        Some((resource, code)) => {
            let mut chars = code.chars();
            let symbol = match (chars.next(), chars.next()) {
                (Some(c), None) => TypeSymbol::from_code(c),
                _ => None,
            };
            match symbol {
                Some(symbol) => (resource, symbol),
                None if values_only => return Ok(None),
                None => {
                    return Err(StatusError::UnknownTypeSymbol {
                        lineno,
                        symbol: code.chars().next().unwrap_or('%'),
                    })
                }
            }
        }
        None => (key, TypeSymbol::Value),
    };

    if !valid_name(resource) {
        return Err(StatusError::InvalidKey {
            lineno,
            key: key.to_string(),
        });
    }
    if let Some(component) = component {
        if !valid_name(component) {
            return Err(StatusError::InvalidKey {
                lineno,
                key: format!("{}.{}", component, resource),
            });
        }
    }

    Ok(Some(StatusLine {
        host: host.map(str::to_string),
        component: component.map(str::to_string),
        resource: resource.to_string(),
        symbol,
        value: unescape_value(raw_value, lineno)?,
    }))
}
