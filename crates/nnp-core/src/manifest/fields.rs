//! Field iteration and effective field computation.

use super::{json_type, ManifestError};
use crate::cfg::{evaluate, CfgContext, CfgError, CfgKey, PredicateCache};
use crate::pkg::{PkgError, Requirement};
use serde_json::{Map, Value};

/// One field occurrence in a manifest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldEntry<'a> {
    /// `None` for plain fields, `cfg(P)` for block entries, `cfg(P).` for
    /// inline entries.
    pub cfg: Option<&'a str>,
    pub name: &'a str,
    pub value: &'a Value,
}

impl<'a> FieldEntry<'a> {
    /// The predicate text `P`, if the field is conditional.
    #[must_use]
    pub fn predicate(&self) -> Option<&'a str> {
        let cfg = self.cfg?;
        let block = cfg.strip_suffix('.').unwrap_or(cfg);
        CfgKey::recognize(block).map(|key| key.predicate())
    }

    /// Check if the entry came from a `cfg(P).field` key.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.cfg.is_some_and(|cfg| cfg.ends_with('.'))
    }
}

/// Iterate over every field entry in declaration order.
///
/// `cfg(P)` keys whose value is not an object, and malformed `cfg(` keys,
/// are treated as plain fields.
pub fn iter_fields(document: &Map<String, Value>) -> impl Iterator<Item = FieldEntry<'_>> {
    document.iter().flat_map(|(key, value)| entries_for(key, value))
}

fn entries_for<'a>(key: &'a str, value: &'a Value) -> Vec<FieldEntry<'a>> {
    match (CfgKey::recognize(key), value) {
        (Some(CfgKey::Block { .. }), Value::Object(fields)) => fields
            .iter()
            .map(|(name, value)| FieldEntry {
                cfg: Some(key),
                name,
                value,
            })
            .collect(),
        (Some(CfgKey::Inline { field, .. }), _) => vec![FieldEntry {
            cfg: Some(&key[..key.len() - field.len()]),
            name: field,
            value,
        }],
        _ => vec![FieldEntry {
            cfg: None,
            name: key,
            value,
        }],
    }
}

/// Iterate over `(cfg, value)` for every occurrence of one field.
pub fn iter_named<'a>(
    document: &'a Map<String, Value>,
    name: &'a str,
) -> impl Iterator<Item = (Option<&'a str>, &'a Value)> {
    iter_fields(document)
        .filter(move |entry| entry.name == name)
        .map(|entry| (entry.cfg, entry.value))
}

/// Merge every active field entry into one object.
///
/// Entries apply in declaration order. Object values merge key by key with
/// later entries winning; any other value replaces the previous one.
///
/// # Errors
/// Returns `InvalidPredicate` for unparseable `cfg(...)` text, or an
/// evaluation error when `ctx` is strict.
pub fn compute_effective(
    document: &Map<String, Value>,
    cache: &PredicateCache,
    ctx: &mut CfgContext,
) -> Result<Map<String, Value>, CfgError> {
    let mut result = Map::new();
    for entry in iter_fields(document) {
        if let Some(predicate) = entry.predicate() {
            if !evaluate(predicate, cache, ctx)? {
                continue;
            }
        }
        merge_field(&mut result, entry.name, entry.value);
    }
    Ok(result)
}

fn merge_field(result: &mut Map<String, Value>, name: &str, value: &Value) {
    match (result.get_mut(name), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key.clone(), value.clone());
            }
        }
        _ => {
            result.insert(name.to_string(), value.clone());
        }
    }
}

/// Active dependencies as parsed requirements, in declaration order.
///
/// # Errors
/// Returns a predicate error, `PKG_MANIFEST_INVALID` if `dependencies` is
/// not an object of strings, or `PKG_REQUIREMENT_INVALID` for a bad entry.
pub fn effective_dependencies(
    document: &Map<String, Value>,
    cache: &PredicateCache,
    ctx: &mut CfgContext,
) -> Result<Vec<(String, Requirement)>, ManifestError> {
    let effective = compute_effective(document, cache, ctx)?;
    parse_dependencies(&effective)
}

/// Parse the `dependencies` field of an already computed effective field set.
///
/// # Errors
/// Same as [`effective_dependencies`], minus predicate errors.
pub fn parse_dependencies(
    effective: &Map<String, Value>,
) -> Result<Vec<(String, Requirement)>, ManifestError> {
    let Some(deps) = effective.get("dependencies") else {
        return Ok(Vec::new());
    };
    let Some(deps) = deps.as_object() else {
        return Err(PkgError::manifest_invalid(format!(
            "'dependencies' must be an object, got {}",
            json_type(deps)
        ))
        .into());
    };

    let mut result = Vec::with_capacity(deps.len());
    for (name, line) in deps {
        let Some(line) = line.as_str() else {
            return Err(PkgError::manifest_invalid(format!(
                "dependency '{name}' must be a string, got {}",
                json_type(line)
            ))
            .into());
        };
        result.push((name.clone(), Requirement::parse_named(name, line)?));
    }
    Ok(result)
}
