//! Plugin names and the identifiers derived from them.

use std::fmt;

use regex::Regex;

use crate::error::ScaffoldError;

/// Converts a name to `PascalCase`.
///
/// Words are split on `-`, `_` and whitespace. The first letter of each
/// word is upper-cased and the rest lower-cased.
///
/// # Examples
///
/// ```
/// use hyt_scaffold::to_pascal_case;
///
/// assert_eq!(to_pascal_case("my-plugin-name"), "MyPluginName");
/// assert_eq!(to_pascal_case("hello_WORLD  mod"), "HelloWorldMod");
/// ```
#[must_use]
pub fn to_pascal_case(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect()
            })
        })
        .collect()
}

/// A validated plugin name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginName {
    raw: String,
    class: String,
    package: String,
}

impl PluginName {
    /// Validates `name`.
    ///
    /// A name starts with a letter and contains only letters, digits, `-`,
    /// `_` and spaces.
    ///
    /// # Errors
    ///
    /// Returns [`ScaffoldError::InvalidName`] otherwise.
    pub fn parse(name: &str) -> Result<Self, ScaffoldError> {
        let invalid = |reason| ScaffoldError::InvalidName {
            name: name.to_owned(),
            reason,
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(invalid("must start with a letter"));
        }
        let allowed = Regex::new(r"^[A-Za-z][A-Za-z0-9_ -]*$")
            .map_err(|_| invalid("could not be checked"))?;
        if !allowed.is_match(name) {
            return Err(invalid(
                "only letters, digits, '-', '_' and spaces are allowed",
            ));
        }

        Ok(Self {
            raw: name.to_owned(),
            class: to_pascal_case(name),
            package: name
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect(),
        })
    }

    /// Returns the name as given, trimmed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the `PascalCase` class name.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// Returns the lower-case Java package segment.
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("my-plugin"), "MyPlugin");
        assert_eq!(to_pascal_case("my_cool plugin"), "MyCoolPlugin");
        assert_eq!(to_pascal_case("--leading--dashes--"), "LeadingDashes");
        assert_eq!(to_pascal_case("HTTPServer"), "Httpserver");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn test_parse_derives_identifiers() {
        let name = PluginName::parse(" Better-Mobs ").unwrap();
        assert_eq!(name.as_str(), "Better-Mobs");
        assert_eq!(name.class_name(), "BetterMobs");
        assert_eq!(name.package_name(), "bettermobs");
        assert_eq!(name.to_string(), "Better-Mobs");
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        for bad in ["", "   ", "9lives", "-plugin", "my/plugin", "mob.spawner", "plugin!"] {
            assert!(
                matches!(
                    PluginName::parse(bad),
                    Err(ScaffoldError::InvalidName { .. })
                ),
                "accepted {bad:?}"
            );
        }
    }
}
