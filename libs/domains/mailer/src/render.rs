//! Template variable substitution.
//!
//! Templates use `{{name}}` placeholders, case-sensitive, no nested or
//! conditional syntax. Rendering is pure: every placeholder with a matching
//! key is replaced, every placeholder without one resolves to an empty
//! string, and the output never contains a leftover `{{...}}` token.
//! No HTML escaping is performed; template authors are administrators.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

use crate::error::{MailerError, MailerResult};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder regex is valid"));

/// Render a template string against a variable bag.
pub fn render(template: &str, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            variables.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Coerce a loosely-typed JSON variable bag into `map<string, string>`.
///
/// Producers sometimes hold variables as JSON; scalar values are coerced to
/// strings here, at the enqueue boundary, so the render path only ever sees
/// strings. Nested arrays/objects and non-object roots are rejected.
pub fn coerce_variables(value: &serde_json::Value) -> MailerResult<HashMap<String, String>> {
    let serde_json::Value::Object(map) = value else {
        return Err(MailerError::InvalidVariables(
            "variables must be a JSON object".to_string(),
        ));
    };

    let mut variables = HashMap::with_capacity(map.len());
    for (key, value) in map {
        let coerced = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => String::new(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(MailerError::InvalidVariables(format!(
                    "variable '{}' is not a scalar",
                    key
                )));
            }
        };
        variables.insert(key.clone(), coerced);
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_replaces_known_placeholders() {
        let out = render("Hi {{name}}, code {{code}}", &vars(&[("name", "Ann"), ("code", "42")]));
        assert_eq!(out, "Hi Ann, code 42");
    }

    #[test]
    fn test_render_missing_key_resolves_to_empty() {
        let out = render("Hi {{name}}, code {{code}}", &vars(&[("name", "Ann")]));
        assert_eq!(out, "Hi Ann, code ");
    }

    #[test]
    fn test_render_repeated_placeholder() {
        let out = render("{{x}} and {{x}} and {{x}}", &vars(&[("x", "again")]));
        assert_eq!(out, "again and again and again");
    }

    #[test]
    fn test_render_is_case_sensitive() {
        let out = render("{{Name}}-{{name}}", &vars(&[("name", "ann")]));
        assert_eq!(out, "-ann");
    }

    #[test]
    fn test_render_leaves_no_tokens_behind() {
        let out = render("{{a}}{{b}}{{c}}", &HashMap::new());
        assert!(!out.contains("{{"));
        assert_eq!(out, "");
    }

    #[test]
    fn test_render_does_not_escape_html() {
        let out = render("<p>{{body}}</p>", &vars(&[("body", "<b>hi</b>")]));
        assert_eq!(out, "<p><b>hi</b></p>");
    }

    #[test]
    fn test_render_without_placeholders_is_identity() {
        let out = render("plain text { not a token } {{", &HashMap::new());
        assert_eq!(out, "plain text { not a token } {{");
    }

    #[test]
    fn test_coerce_variables_scalars() {
        let value = json!({
            "name": "Somchai",
            "count": 3,
            "active": true,
            "note": null,
        });

        let variables = coerce_variables(&value).unwrap();
        assert_eq!(variables["name"], "Somchai");
        assert_eq!(variables["count"], "3");
        assert_eq!(variables["active"], "true");
        assert_eq!(variables["note"], "");
    }

    #[test]
    fn test_coerce_variables_rejects_nested() {
        let value = json!({ "items": [1, 2, 3] });
        assert!(coerce_variables(&value).is_err());

        let value = json!(["not", "an", "object"]);
        assert!(coerce_variables(&value).is_err());
    }
}
