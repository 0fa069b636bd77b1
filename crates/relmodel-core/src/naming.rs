//! Naming conventions shared by descriptors, entities and relation defaults.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ConfigError, Error, Result};

/// Convert `CamelCase` / `camelCase` to `snake_case`.
///
/// Acronyms stay together: `HTTPStatus` becomes `http_status`.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let chars: Vec<char> = s.chars().collect();
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit();
                let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
                if prev_lower || (next_lower && chars[i - 1].is_uppercase()) {
                    result.push('_');
                }
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Name of the conventional mutator for relation `key` (`set_<snake key>`).
pub fn mutator_name(key: &str) -> String {
    format!("set_{}", to_snake_case(key))
}

/// Name of the conventional accessor for relation `key` (`get_<snake key>`).
pub fn accessor_name(key: &str) -> String {
    format!("get_{}", to_snake_case(key))
}

/// Conventional foreign key column: `snake(name)_<key column>`.
pub fn foreign_key_for(name: &str, key_column: &str) -> String {
    format!("{}_{}", to_snake_case(name), key_column)
}

fn identifier_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"))
        .as_ref()
        .map_err(|e| {
            Error::Config(ConfigError {
                message: format!("identifier pattern failed to compile: {e}"),
                source: Some(Box::new(e.clone())),
            })
        })
}

/// Whether `name` is a plain SQL identifier usable as a key column.
pub fn is_identifier(name: &str) -> Result<bool> {
    Ok(identifier_pattern()?.is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_conversions() {
        assert_eq!(to_snake_case("User"), "user");
        assert_eq!(to_snake_case("RoleUser"), "role_user");
        assert_eq!(to_snake_case("userProfile"), "user_profile");
        assert_eq!(to_snake_case("HTTPStatus"), "http_status");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn conventional_names() {
        assert_eq!(mutator_name("userRoles"), "set_user_roles");
        assert_eq!(accessor_name("posts"), "get_posts");
        assert_eq!(foreign_key_for("User", "id"), "user_id");
        assert_eq!(foreign_key_for("authorProfile", "uuid"), "author_profile_uuid");
    }

    #[test]
    fn identifier_validation() {
        assert!(is_identifier("user_id").unwrap());
        assert!(is_identifier("_x1").unwrap());
        assert!(!is_identifier("1abc").unwrap());
        assert!(!is_identifier("id; DROP TABLE users").unwrap());
        assert!(!is_identifier("").unwrap());
    }
}
