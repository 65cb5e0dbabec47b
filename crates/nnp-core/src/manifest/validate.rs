//! Manifest field validation.
//!
//! Validators are registered per field name and run over every occurrence
//! of that field, conditional ones included. Validation is non-fatal: it
//! produces reports, never errors.

use super::fields::iter_fields;
use super::json_type;
use crate::pkg::{parse_version, ExternalRequirement, PackageName, Requirement};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Accepted values of the `categories` field.
pub const CATEGORIES: [&str; 7] = [
    "CLI",
    "Library",
    "Framework",
    "Application",
    "System",
    "Networking",
    "GUI",
];

const MAX_CATEGORIES: usize = 5;
const MAX_KEYWORDS: usize = 15;
const KEYWORD_LEN: std::ops::RangeInclusive<usize> = 3..=30;

/// Issues found for one field occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReport {
    pub cfg: Option<String>,
    pub name: String,
    pub value: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl FieldReport {
    fn new(cfg: Option<&str>, name: &str, value: &Value) -> Self {
        Self {
            cfg: cfg.map(str::to_string),
            name: name.to_string(),
            value: value.clone(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Where the field lives: `name`, `cfg(P)>name` for block entries or
    /// `cfg(P).name` for inline entries.
    #[must_use]
    pub fn location(&self) -> String {
        match self.cfg.as_deref() {
            None => self.name.clone(),
            Some(cfg) if cfg.ends_with('.') => format!("{cfg}{}", self.name),
            Some(cfg) => format!("{cfg}>{}", self.name),
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// A field validator. Reads the value, records issues on the report.
pub type Validator = fn(&Value, &mut FieldReport);

/// Field name to ordered validators.
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Vec<Validator>>,
}

impl ValidatorRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in validators for `name`, `version`,
    /// `categories`, `keywords`, `dependencies` and `pip_dependencies`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("name", validate_name);
        registry.register("version", validate_version);
        registry.register("categories", validate_categories);
        registry.register("keywords", validate_keywords);
        registry.register("dependencies", validate_dependencies);
        registry.register("pip_dependencies", validate_pip_dependencies);
        registry
    }

    /// Append a validator for `field`. Validators run in registration order.
    pub fn register(&mut self, field: impl Into<String>, validator: Validator) {
        self.validators.entry(field.into()).or_default().push(validator);
    }

    #[must_use]
    pub fn get(&self, field: &str) -> &[Validator] {
        self.validators
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Run `registry` over every field entry of `document`.
///
/// Only entries with at least one warning or error are returned.
#[must_use]
pub fn validate(document: &Map<String, Value>, registry: &ValidatorRegistry) -> Vec<FieldReport> {
    let mut reports = Vec::new();
    for entry in iter_fields(document) {
        let validators = registry.get(entry.name);
        if validators.is_empty() {
            continue;
        }
        let mut report = FieldReport::new(entry.cfg, entry.name, entry.value);
        for validator in validators {
            validator(entry.value, &mut report);
        }
        if !report.is_clean() {
            reports.push(report);
        }
    }
    reports
}

fn expect_str<'a>(value: &'a Value, report: &mut FieldReport) -> Option<&'a str> {
    let s = value.as_str();
    if s.is_none() {
        report.error(format!("expected a string, got {}", json_type(value)));
    }
    s
}

fn expect_str_array<'a>(value: &'a Value, report: &mut FieldReport) -> Option<Vec<&'a str>> {
    let items = value
        .as_array()
        .and_then(|items| items.iter().map(Value::as_str).collect::<Option<Vec<_>>>());
    if items.is_none() {
        report.error(format!("expected an array of strings, got {}", json_type(value)));
    }
    items
}

fn expect_object<'a>(
    value: &'a Value,
    report: &mut FieldReport,
) -> Option<&'a Map<String, Value>> {
    let object = value.as_object();
    if object.is_none() {
        report.error(format!("expected an object, got {}", json_type(value)));
    }
    object
}

fn validate_name(value: &Value, report: &mut FieldReport) {
    if let Some(name) = expect_str(value, report) {
        if let Err(e) = PackageName::parse(name) {
            report.error(e.to_string());
        }
    }
}

fn validate_version(value: &Value, report: &mut FieldReport) {
    if let Some(version) = expect_str(value, report) {
        if let Err(e) = parse_version(version) {
            report.error(e.to_string());
        }
    }
}

fn validate_categories(value: &Value, report: &mut FieldReport) {
    let Some(categories) = expect_str_array(value, report) else {
        return;
    };
    let unknown: Vec<&str> = categories
        .iter()
        .copied()
        .filter(|c| !CATEGORIES.contains(c))
        .collect();
    if !unknown.is_empty() {
        report.error(format!("Unsupported categories: {}", unknown.join(", ")));
    }
    if categories.len() > MAX_CATEGORIES {
        report.error(format!(
            "Packages can only have up to {MAX_CATEGORIES} categories."
        ));
    }
}

fn validate_keywords(value: &Value, report: &mut FieldReport) {
    let Some(keywords) = expect_str_array(value, report) else {
        return;
    };
    if keywords
        .iter()
        .any(|k| !KEYWORD_LEN.contains(&k.chars().count()))
    {
        report.error(format!(
            "Keywords must be between {} and {} characters.",
            KEYWORD_LEN.start(),
            KEYWORD_LEN.end()
        ));
    }
    if keywords.len() > MAX_KEYWORDS {
        report.error(format!("Packages can only have up to {MAX_KEYWORDS} keywords."));
    }
}

fn validate_dependencies(value: &Value, report: &mut FieldReport) {
    let Some(deps) = expect_object(value, report) else {
        return;
    };
    for (name, line) in deps {
        match line.as_str() {
            Some(line) => {
                if let Err(e) = Requirement::parse_named(name, line) {
                    report.error(e.to_string());
                }
            }
            None => report.error(format!(
                "dependency '{name}' must be a string, got {}",
                json_type(line)
            )),
        }
    }
}

fn validate_pip_dependencies(value: &Value, report: &mut FieldReport) {
    let Some(deps) = expect_object(value, report) else {
        return;
    };
    for (name, spec) in deps {
        match spec.as_str() {
            Some(spec) => {
                if let Err(e) = ExternalRequirement::parse(&format!("{name}{spec}")) {
                    report.error(e.to_string());
                }
            }
            None => report.error(format!(
                "pip dependency '{name}' must be a string, got {}",
                json_type(spec)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(value: Value) -> Vec<FieldReport> {
        match value {
            Value::Object(document) => validate(&document, &ValidatorRegistry::with_defaults()),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_valid_manifest_has_no_reports() {
        let reports = run(json!({
            "name": "@spekklez/foobar",
            "version": "1.6.4",
            "categories": ["CLI", "Library"],
            "keywords": ["parser", "cli"],
            "dependencies": {"eggs": "~1.2.0", "ham": "./ham"},
            "pip_dependencies": {"requests": ">=2.0", "six": ""},
            "description": "anything goes"
        }));
        assert!(reports.is_empty(), "{reports:?}");
    }

    #[test]
    fn test_invalid_name_and_version() {
        let reports = run(json!({"name": "@", "version": "1.0"}));
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].name, "name");
        assert_eq!(reports[1].name, "version");
        assert!(reports.iter().all(FieldReport::has_errors));
    }

    #[test]
    fn test_categories() {
        let reports = run(json!({"categories": ["CLI", "Games", "Toys"]}));
        assert_eq!(reports[0].errors, vec!["Unsupported categories: Games, Toys"]);

        let reports = run(json!({
            "categories": ["CLI", "Library", "Framework", "Application", "System", "GUI"]
        }));
        assert_eq!(
            reports[0].errors,
            vec!["Packages can only have up to 5 categories."]
        );

        let reports = run(json!({"categories": "CLI"}));
        assert_eq!(reports[0].errors.len(), 1);
    }

    #[test]
    fn test_keywords() {
        let reports = run(json!({"keywords": ["ab", "fine"]}));
        assert_eq!(
            reports[0].errors,
            vec!["Keywords must be between 3 and 30 characters."]
        );

        let boundary = "x".repeat(30);
        assert!(run(json!({"keywords": ["abc", boundary]})).is_empty());
        let too_long = "x".repeat(31);
        assert_eq!(run(json!({"keywords": [too_long]})).len(), 1);

        let many: Vec<String> = (0..16).map(|i| format!("keyword{i}")).collect();
        let reports = run(json!({ "keywords": many }));
        assert_eq!(
            reports[0].errors,
            vec!["Packages can only have up to 15 keywords."]
        );
    }

    #[test]
    fn test_dependencies() {
        let reports = run(json!({
            "dependencies": {"eggs": "--bogus 1.0.0", "ham": "not a selector", "spam": 3}
        }));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].errors.len(), 3);
        assert!(reports[0].errors[0].contains("PKG_REQUIREMENT_INVALID"));
    }

    #[test]
    fn test_pip_dependencies() {
        let reports = run(json!({"pip_dependencies": {"requests": "=>2.0", "six": ">=1.0"}}));
        assert_eq!(reports[0].errors.len(), 1);
        assert!(reports[0].errors[0].contains("requests=>2.0"));
    }

    #[test]
    fn test_conditional_entries_validated_with_location() {
        let reports = run(json!({
            "cfg(dev)": {"version": "bad"},
            "cfg(prod).keywords": ["x"],
            "name": "@/"
        }));
        let locations: Vec<String> = reports.iter().map(FieldReport::location).collect();
        assert_eq!(locations, ["cfg(dev)>version", "cfg(prod).keywords", "name"]);
    }

    #[test]
    fn test_custom_validator_runs_after_builtin() {
        fn warn_on_beta(value: &Value, report: &mut FieldReport) {
            if value.as_str().is_some_and(|v| v.contains("beta")) {
                report.warn("beta versions are discouraged");
            }
        }

        let mut registry = ValidatorRegistry::with_defaults();
        registry.register("version", warn_on_beta);
        assert_eq!(registry.get("version").len(), 2);
        assert!(registry.get("unknown").is_empty());

        let document = match json!({"version": "1.0.0-beta.1"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let reports = validate(&document, &registry);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].errors.is_empty());
        assert_eq!(reports[0].warnings.len(), 1);
    }

    #[test]
    fn test_validation_does_not_mutate_document() {
        let document = match json!({"keywords": ["ab"]}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let before = document.clone();
        let _ = validate(&document, &ValidatorRegistry::with_defaults());
        assert_eq!(document, before);
    }
}
