use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Matches a single `{name}` placeholder token. Names may contain anything but braces.
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]+)\}").unwrap());

/// The current value of a single form field.
///
/// Serialized untagged, so JSON strings map to [`FieldValue::Text`] and JSON booleans
/// (checkbox state) map to [`FieldValue::Flag`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Flag(_) => false,
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Flag(true) => write!(f, "Yes"),
            Self::Flag(false) => write!(f, "No"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Field name to current value. Rebuilt from form state on every preview or submission.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Replaces every `{key}` token in `body` whose key is present in `values`.
///
/// The body is scanned exactly once, left to right. Tokens naming unknown keys are copied
/// through untouched, and substituted text is never rescanned - a value that itself looks
/// like `{other}` stays literal.
pub fn substitute<'a>(body: &'a str, values: &FieldValues) -> Cow<'a, str> {
    if values.is_empty() {
        return Cow::Borrowed(body);
    }

    TOKEN_REGEX.replace_all(body, |caps: &Captures| match values.get(&caps[1]) {
        Some(value) => value.to_string(),
        None => caps[0].to_owned(),
    })
}

/// Returns the distinct placeholder names in `body`, in order of first appearance.
pub fn placeholders(body: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();

    for caps in TOKEN_REGEX.captures_iter(body) {
        let Some(name) = caps.get(1) else {
            continue;
        };

        if !names.contains(&name.as_str()) {
            names.push(name.as_str());
        }
    }

    names
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn values(pairs: &[(&str, FieldValue)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn replaces_all_occurrences() {
        let map = values(&[("name", "Alice".into())]);
        let out = substitute("{name} and {name} again", &map);

        assert_eq!(out, "Alice and Alice again");
    }

    #[test]
    fn single_pass() {
        let map = values(&[("a", "{b}".into()), ("b", "X".into())]);
        let out = substitute("{a} {b}", &map);

        assert_eq!(out, "{b} X");
    }

    #[test]
    fn unknown_tokens_untouched() {
        let map = values(&[("a", "1".into())]);

        assert_eq!(substitute("{unknown}", &map), "{unknown}");
        assert_eq!(substitute("{ a }", &map), "{ a }");
    }

    #[test]
    fn case_sensitive() {
        let map = values(&[("Name", "Alice".into())]);

        assert_eq!(substitute("{name} {Name}", &map), "{name} Alice");
    }

    #[test]
    fn checkbox_values() {
        let map = values(&[("agreed", true.into()), ("urgent", false.into())]);

        assert_eq!(substitute("{agreed}/{urgent}", &map), "Yes/No");
    }

    #[test]
    fn empty_map_borrows() {
        let out = substitute("{a}", &FieldValues::new());

        assert!(matches!(out, Cow::Borrowed("{a}")));
    }

    #[test]
    fn end_to_end_body() {
        let map = values(&[("name", "Alice".into()), ("priority", "High".into())]);
        let out = substitute("Hello {name}, priority {priority}", &map);

        assert_eq!(out, "Hello Alice, priority High");
    }

    #[test]
    fn placeholder_listing() {
        let names = placeholders("{b} {a} {b} {{c}} {}");

        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn untagged_json() {
        let map: FieldValues = serde_json::from_str(r#"{"a": "text", "b": true}"#).unwrap();

        assert_eq!(map["a"], FieldValue::Text("text".into()));
        assert_eq!(map["b"], FieldValue::Flag(true));
    }
}
