use journal_core::{JournalError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::env;

// Matches ${VAR} and ${VAR:-default}
static ENV_VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").expect("Invalid regex pattern")
});

/// Recursively substitute environment variables in every string field of a
/// config value. A referenced variable that is unset and has no `:-default`
/// is a configuration error.
pub fn substitute_env_vars(value: &mut Value) -> Result<()> {
    substitute_with(value, &|name| env::var(name).ok())
}

pub(crate) fn substitute_with(
    value: &mut Value,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<()> {
    match value {
        Value::String(s) => {
            *s = substitute_in_string(s, lookup)?;
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                substitute_with(v, lookup)?;
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                substitute_with(v, lookup)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn substitute_in_string(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String> {
    let mut result = input.to_string();
    let mut missing_vars = Vec::new();

    for cap in ENV_VAR_REGEX.captures_iter(input) {
        let full_match = &cap[0];
        let var_name = &cap[1];
        let default_value = cap.get(2).map(|m| m.as_str());

        match lookup(var_name) {
            Some(value) => {
                result = result.replace(full_match, &value);
            }
            None => match default_value {
                Some(default) => {
                    result = result.replace(full_match, default);
                }
                None => missing_vars.push(var_name.to_string()),
            },
        }
    }

    if !missing_vars.is_empty() {
        return Err(JournalError::Config(format!(
            "Missing required environment variables: {}. Please set these variables before loading the configuration.",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}
