//! Placeholder substitution
//!
//! Values may reference variables as `${NAME}`. A bare `$NAME` is left alone.
//! Variables come from a flat [`Substitute`] map built per release. Every
//! placeholder that cannot be filled is reported at once, so an operator can
//! fix all of them in one pass.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::error::numbered;
use crate::values::Values;

/// Flat variable name to scalar mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Substitute(BTreeMap<String, JsonValue>);

impl Substitute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into `self`; keys of `other` win
    pub fn merge(&mut self, other: &Substitute) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Merge several sources in order, later sources winning
    pub fn merge_all<'a, I>(sources: I) -> Substitute
    where
        I: IntoIterator<Item = &'a Substitute>,
    {
        let mut result = Substitute::new();
        for source in sources {
            result.merge(source);
        }
        result
    }

    /// Text form of a variable, `None` when missing or blank
    pub fn rendered(&self, key: &str) -> Option<String> {
        let text = match self.0.get(key)? {
            JsonValue::Null => return None,
            JsonValue::String(s) => s.clone(),
            JsonValue::Bool(b) => b.to_string(),
            JsonValue::Number(n) => n.to_string(),
            other => other.to_string(),
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// Parse `KEY=VALUE` assignments
    pub fn parse_assignments(args: &[String]) -> Result<Substitute, String> {
        let mut substitute = Substitute::new();

        for arg in args {
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| format!("Invalid variable '{}'. Expected KEY=VALUE", arg))?;
            if key.is_empty() {
                return Err(format!("Invalid variable '{}'. Name is empty", arg));
            }
            substitute.insert(key, value);
        }

        Ok(substitute)
    }
}

impl From<BTreeMap<String, JsonValue>> for Substitute {
    fn from(map: BTreeMap<String, JsonValue>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for Substitute {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Every placeholder that could not be filled
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionError {
    /// Sorted, de-duplicated placeholders such as `${HOST}`
    pub unresolved: Vec<String>,
}

impl std::fmt::Display for SubstitutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = format!("Unable to replace {} variable(s):", self.unresolved.len());
        write!(f, "{}", numbered(&header, &self.unresolved))
    }
}

/// Result of a successful substitution
#[derive(Debug, Clone, PartialEq)]
pub struct Replaced {
    pub values: Values,
    /// The variables actually consumed
    pub used: Substitute,
}

/// Compiled placeholder patterns
#[derive(Debug, Clone)]
pub struct PatternSet {
    placeholder: Regex,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternSet {
    pub fn new() -> Self {
        Self {
            placeholder: Regex::new(r"\$\{([^{}]*)\}").expect("placeholder pattern is valid"),
        }
    }

    /// Variable names referenced by `text`, in order of appearance
    pub fn placeholders<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.placeholder
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// True when any string in `values` still holds a placeholder
    pub fn has_placeholders(&self, values: &Values) -> bool {
        fn walk(patterns: &PatternSet, value: &JsonValue) -> bool {
            match value {
                JsonValue::String(s) => patterns.placeholder.is_match(s),
                JsonValue::Array(items) => items.iter().any(|v| walk(patterns, v)),
                JsonValue::Object(map) => map
                    .iter()
                    .any(|(k, v)| patterns.placeholder.is_match(k) || walk(patterns, v)),
                _ => false,
            }
        }
        walk(self, values.inner())
    }

    /// Replace every `${NAME}` in `values` from `substitute`
    ///
    /// A string made of a single placeholder takes the variable's own scalar
    /// type; placeholders embedded in longer strings are interpolated as text.
    /// Missing and blank variables are both unresolved.
    pub fn replace(
        &self,
        values: &Values,
        substitute: &Substitute,
    ) -> Result<Replaced, SubstitutionError> {
        let mut pass = Pass {
            patterns: self,
            substitute,
            used: Substitute::new(),
            unresolved: BTreeSet::new(),
        };

        let replaced = pass.value(values.inner());

        if !pass.unresolved.is_empty() {
            return Err(SubstitutionError {
                unresolved: pass.unresolved.into_iter().collect(),
            });
        }

        Ok(Replaced {
            values: Values(replaced),
            used: pass.used,
        })
    }
}

/// State of one substitution walk
struct Pass<'a> {
    patterns: &'a PatternSet,
    substitute: &'a Substitute,
    used: Substitute,
    unresolved: BTreeSet<String>,
}

impl Pass<'_> {
    fn value(&mut self, value: &JsonValue) -> JsonValue {
        match value {
            JsonValue::String(s) => self.string(s),
            JsonValue::Array(items) => {
                JsonValue::Array(items.iter().map(|item| self.value(item)).collect())
            }
            JsonValue::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, item)| (self.interpolate(key), self.value(item)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn string(&mut self, text: &str) -> JsonValue {
        if let Some(caps) = self.patterns.placeholder.captures(text) {
            let whole = caps.get(0).map(|m| m.as_str().len()) == Some(text.len());
            if whole {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                return match self.lookup(name) {
                    Some(_) => self.typed(name),
                    None => JsonValue::String(text.to_string()),
                };
            }
        }

        JsonValue::String(self.interpolate(text))
    }

    /// Text interpolation, used for map keys and embedded placeholders
    fn interpolate(&mut self, text: &str) -> String {
        let patterns: &PatternSet = self.patterns;
        patterns
            .placeholder
            .replace_all(text, |caps: &Captures<'_>| {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                match self.lookup(name) {
                    Some(rendered) => rendered,
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Rendered variable; records usage or the unresolved placeholder
    fn lookup(&mut self, name: &str) -> Option<String> {
        match self.substitute.rendered(name) {
            Some(rendered) => {
                if let Some(value) = self.substitute.get(name) {
                    self.used.insert(name, value.clone());
                }
                Some(rendered)
            }
            None => {
                self.unresolved.insert(format!("${{{}}}", name));
                None
            }
        }
    }

    fn typed(&self, name: &str) -> JsonValue {
        match self.substitute.get(name) {
            Some(value @ (JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_))) => {
                value.clone()
            }
            _ => JsonValue::String(self.substitute.rendered(name).unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn values(yaml: &str) -> Values {
        Values::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_replace_simple() {
        let patterns = PatternSet::new();
        let substitute = Substitute::new().with("HOST", "db.internal").with("UNUSED", "x");

        let replaced = patterns
            .replace(&values("host: ${HOST}\nurl: postgres://${HOST}:5432"), &substitute)
            .unwrap();

        assert_eq!(replaced.values.get("host").unwrap(), "db.internal");
        assert_eq!(replaced.values.get("url").unwrap(), "postgres://db.internal:5432");
        assert_eq!(replaced.used, Substitute::new().with("HOST", "db.internal"));
    }

    #[test]
    fn test_placeholder_in_key() {
        let patterns = PatternSet::new();
        let input = Values(json!({"hosts": {"${NS}-svc": "x"}}));

        let err = patterns.replace(&input, &Substitute::new()).unwrap_err();
        assert_eq!(err.unresolved, vec!["${NS}".to_string()]);

        let replaced = patterns
            .replace(&input, &Substitute::new().with("NS", "prod"))
            .unwrap();
        assert_eq!(replaced.values.inner(), &json!({"hosts": {"prod-svc": "x"}}));
        assert_eq!(replaced.used, Substitute::new().with("NS", "prod"));
        assert!(!patterns.has_placeholders(&replaced.values));
        assert!(patterns.has_placeholders(&input));
    }

    #[test]
    fn test_blank_value_is_unresolved() {
        let patterns = PatternSet::new();
        let substitute = Substitute::new().with("H", "");

        let err = patterns
            .replace(&Values(json!({"host": "${H}"})), &substitute)
            .unwrap_err();

        assert_eq!(err.to_string(), "Unable to replace 1 variable(s):\n\t1. ${H}");
    }

    #[test]
    fn test_all_unresolved_reported_sorted() {
        let patterns = PatternSet::new();
        let err = patterns
            .replace(
                &values("a: ${ZETA}\nb: [\"${ALPHA}\", \"${ZETA}\"]\nc: x-${MID}-y"),
                &Substitute::new(),
            )
            .unwrap_err();

        assert_eq!(err.unresolved, vec!["${ALPHA}", "${MID}", "${ZETA}"]);
        assert_eq!(
            err.to_string(),
            "Unable to replace 3 variable(s):\n\t1. ${ALPHA}\n\t2. ${MID}\n\t3. ${ZETA}"
        );
    }

    #[test]
    fn test_bare_dollar_is_not_substituted() {
        let patterns = PatternSet::new();
        let replaced = patterns
            .replace(&values("cmd: echo $HOME"), &Substitute::new().with("HOME", "/root"))
            .unwrap();

        assert_eq!(replaced.values.get("cmd").unwrap(), "echo $HOME");
        assert!(replaced.used.is_empty());
    }

    #[test]
    fn test_whole_placeholder_keeps_scalar_type() {
        let patterns = PatternSet::new();
        let substitute = Substitute::new()
            .with("REPLICAS", 3)
            .with("DEBUG", true)
            .with("PORT", "8080");

        let replaced = patterns
            .replace(
                &values("replicas: ${REPLICAS}\ndebug: ${DEBUG}\nport: ${PORT}\nlabel: r${REPLICAS}"),
                &substitute,
            )
            .unwrap();

        assert_eq!(replaced.values.get("replicas").unwrap(), &json!(3));
        assert_eq!(replaced.values.get("debug").unwrap(), &json!(true));
        assert_eq!(replaced.values.get("port").unwrap(), &json!("8080"));
        assert_eq!(replaced.values.get("label").unwrap(), &json!("r3"));
    }

    #[test]
    fn test_non_string_leaves_untouched() {
        let patterns = PatternSet::new();
        let input = values("count: 2\nenabled: false\nnothing: null");
        let replaced = patterns.replace(&input, &Substitute::new()).unwrap();
        assert_eq!(replaced.values, input);
    }

    #[test]
    fn test_placeholders() {
        let patterns = PatternSet::new();
        assert_eq!(patterns.placeholders("${A}-${B} $C"), vec!["A", "B"]);
        assert!(patterns.has_placeholders(&values("a: [x, \"${Y}\"]")));
        assert!(!patterns.has_placeholders(&values("a: $Y")));
    }

    #[test]
    fn test_merge_later_wins() {
        let fetched = Substitute::new().with("A", "fetched").with("B", "fetched");
        let caller = Substitute::new().with("B", "caller");
        let env = Substitute::new().with("A", "env");

        let merged = Substitute::merge_all([&fetched, &caller, &env]);
        assert_eq!(merged.get("A").unwrap(), "env");
        assert_eq!(merged.get("B").unwrap(), "caller");
    }

    #[test]
    fn test_parse_assignments() {
        let parsed = Substitute::parse_assignments(&[
            "HOST=db".to_string(),
            "URL=a=b".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed.get("HOST").unwrap(), "db");
        assert_eq!(parsed.get("URL").unwrap(), "a=b");

        assert!(Substitute::parse_assignments(&["NOVALUE".to_string()]).is_err());
        assert!(Substitute::parse_assignments(&["=x".to_string()]).is_err());
    }

    proptest! {
        #[test]
        fn test_complete_substitute_never_errors(
            vars in proptest::collection::btree_map("[A-Z]{1,6}", "[a-z0-9.]{1,12}", 1..6),
            prefix in "[a-z ]{0,5}",
        ) {
            let names: Vec<&String> = vars.keys().collect();
            let mut map = serde_json::Map::new();
            for (index, name) in names.iter().enumerate() {
                map.insert(format!("whole{}", index), json!(format!("${{{}}}", name)));
                map.insert(format!("embedded{}", index), json!(format!("{}${{{}}}/x", prefix, name)));
            }
            map.insert("list".into(), json!(names.iter().map(|n| format!("${{{}}}", n)).collect::<Vec<_>>()));

            let substitute: Substitute = vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let patterns = PatternSet::new();
            let replaced = patterns.replace(&Values(JsonValue::Object(map)), &substitute);

            prop_assert!(replaced.is_ok());
            let replaced = replaced.unwrap();
            prop_assert!(!patterns.has_placeholders(&replaced.values));
            prop_assert_eq!(replaced.used.len(), vars.len());
        }
    }
}
