//! Input validation for names that reach SQL.
//!
//! Type names and property values are always bound as parameters. Property
//! keys become part of a JSON path and pattern aliases are user-facing
//! labels, so both are checked before anything is compiled.

use trellis_core::{TrellisError, TrellisResult};

/// Longest accepted node or edge type.
pub const MAX_TYPE_LEN: usize = 128;

/// Longest accepted property key.
pub const MAX_KEY_LEN: usize = 256;

/// Longest accepted pattern alias.
pub const MAX_ALIAS_LEN: usize = 64;

// =============================================================================
// Validation
// =============================================================================

/// Validate a node type.
pub fn validate_node_type(t: &str) -> TrellisResult<()> {
    validate_type_name("Node type", t)
}

/// Validate an edge type.
pub fn validate_edge_type(t: &str) -> TrellisResult<()> {
    validate_type_name("Edge type", t)
}

fn validate_type_name(what: &str, t: &str) -> TrellisResult<()> {
    if t.is_empty() {
        return Err(TrellisError::invalid_input(format!(
            "{} must not be empty",
            what
        )));
    }
    if t.len() > MAX_TYPE_LEN {
        return Err(TrellisError::invalid_input(format!(
            "{} must be at most {} bytes",
            what, MAX_TYPE_LEN
        )));
    }
    if let Some(bad) = t
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')))
    {
        return Err(TrellisError::invalid_input(format!(
            "{} '{}' contains invalid character {:?}",
            what, t, bad
        )));
    }
    Ok(())
}

/// Validate a property key used in a filter or ordering.
pub fn validate_property_key(key: &str) -> TrellisResult<()> {
    if key.is_empty() {
        return Err(TrellisError::invalid_input("Property key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(TrellisError::invalid_input(format!(
            "Property key must be at most {} bytes",
            MAX_KEY_LEN
        )));
    }
    if key.chars().any(|c| c == '"' || c == '\\' || c.is_control()) {
        return Err(TrellisError::invalid_input(format!(
            "Property key {:?} must not contain quotes, backslashes or control characters",
            key
        )));
    }
    Ok(())
}

/// Validate a pattern alias: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_alias(alias: &str) -> TrellisResult<()> {
    let mut chars = alias.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !head_ok || alias.len() > MAX_ALIAS_LEN || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(TrellisError::invalid_input(format!(
            "Alias {:?} must match [A-Za-z_][A-Za-z0-9_]* and be at most {} bytes",
            alias, MAX_ALIAS_LEN
        )));
    }
    Ok(())
}

/// JSON path addressing a top-level property.
pub(crate) fn json_path(key: &str) -> String {
    format!("$.\"{}\"", key)
}
