//! Environment variable interpolation for YAML config files.
//!
//! Recognised forms:
//! - `$VAR` and `${VAR}` are replaced by the variable, which must be set
//! - `${VAR:-fallback}` uses `fallback` when VAR is unset or empty
//! - `${VAR-fallback}` uses `fallback` only when VAR is unset
//! - `$$` is a literal `$`

use regex::{Captures, Regex};
use std::sync::LazyLock;

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<escape>\$\$)
        | \$\{ (?P<braced>[A-Za-z_][A-Za-z0-9_]*) (?: (?P<op>:?-) (?P<fallback>[^}]*) )? \}
        | \$ (?P<bare>[A-Za-z_][A-Za-z0-9_]*)
        ",
    )
    .expect("Invalid interpolation pattern")
});

/// Output of [`interpolate`]: substituted text plus every failure found.
#[derive(Debug)]
pub struct InterpolationResult {
    pub text: String,
    pub errors: Vec<String>,
}

impl InterpolationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Substitute environment variables in `input` using the process environment.
///
/// Missing variables are collected rather than short-circuiting, so a config
/// author sees all of them at once.
pub fn interpolate(input: &str) -> InterpolationResult {
    interpolate_with(input, |name| std::env::var(name).ok())
}

/// Substitute variables in `input` using `lookup` as the environment.
pub fn interpolate_with<F>(input: &str, lookup: F) -> InterpolationResult
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    let text = VAR_PATTERN.replace_all(input, |caps: &Captures| {
        if caps.name("escape").is_some() {
            return "$".to_string();
        }

        let Some(name) = caps.name("braced").or_else(|| caps.name("bare")) else {
            return String::new();
        };
        let name = name.as_str();
        let value = lookup(name);

        match (caps.name("op").map(|m| m.as_str()), caps.name("fallback")) {
            (Some(":-"), Some(fallback)) => match value {
                Some(v) if !v.is_empty() => v,
                _ => fallback.as_str().to_string(),
            },
            (Some("-"), Some(fallback)) => value.unwrap_or_else(|| fallback.as_str().to_string()),
            _ => value.unwrap_or_else(|| {
                errors.push(format!("environment variable '{name}' is not set"));
                String::new()
            }),
        }
    });

    InterpolationResult {
        text: text.into_owned(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_braced_and_bare_variables() {
        let result = interpolate_with(
            "root: ${ROOT}/t and $ROOT",
            env(&[("ROOT", "/data")]),
        );
        assert!(result.is_ok());
        assert_eq!(result.text, "root: /data/t and /data");
    }

    #[test]
    fn test_fallback_on_unset_or_empty() {
        let lookup = env(&[("EMPTY", "")]);
        let result = interpolate_with("${EMPTY:-a} ${MISSING:-b} ${EMPTY-c} ${MISSING-d}", lookup);
        assert!(result.is_ok());
        assert_eq!(result.text, "a b  d");
    }

    #[test]
    fn test_escape_sequence() {
        let result = interpolate_with("cost: $$5", env(&[]));
        assert!(result.is_ok());
        assert_eq!(result.text, "cost: $5");
    }

    #[test]
    fn test_missing_variables_are_all_reported() {
        let result = interpolate_with("${ONE} $TWO", env(&[]));
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("ONE"));
        assert!(result.errors[1].contains("TWO"));
    }
}
