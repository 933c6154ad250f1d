use super::SanitizeFn;
use crate::domain::LogType;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

const REDACTED_VALUE: &str = "*****";

#[derive(Error, Debug)]
pub enum SanitizerError {
    #[error("Invalid redaction pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A pattern whose first capture group is a key and second a value to hide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionRule {
    pub pattern: String,
    /// Logs below this severity are left untouched by the rule.
    pub minimum_log_level: LogType,
}

/// Masks `key = "value"` style pairs in log messages.
///
/// A matched key keeps its first and last character (`name` becomes
/// `n***e`), the value becomes `*****`. Matching is case-insensitive.
/// When a matched value is in the exception list, the rule stops and the
/// message is returned as redacted so far.
#[derive(Debug, Clone)]
pub struct RedactionSanitizer {
    rules: Vec<(Regex, LogType)>,
    exceptions: HashSet<String>,
}

impl RedactionSanitizer {
    pub fn new<I, S>(rules: &[RedactionRule], exceptions: I) -> Result<Self, SanitizerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rules = rules
            .iter()
            .map(|rule| {
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (regex, rule.minimum_log_level))
                    .map_err(|source| SanitizerError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            exceptions: exceptions.into_iter().map(Into::into).collect(),
        })
    }

    pub fn sanitize(&self, message: &str, log_type: LogType) -> String {
        let mut sanitized = message.to_string();
        for (regex, minimum) in &self.rules {
            if log_type >= *minimum {
                sanitized = self.redact(&sanitized, regex);
            }
        }
        sanitized
    }

    /// Wraps the sanitizer for [`Logger::set_sanitize`](super::Logger::set_sanitize).
    pub fn into_sanitize_fn(self) -> SanitizeFn {
        Arc::new(move |message: &str, log_type: LogType| self.sanitize(message, log_type))
    }

    fn redact(&self, message: &str, regex: &Regex) -> String {
        let spans: Vec<(Range<usize>, Range<usize>)> = regex
            .captures_iter(message)
            .filter_map(|captures| Some((captures.get(1)?.range(), captures.get(2)?.range())))
            .collect();

        let mut redacted = message.to_string();
        // Last match first, so earlier ranges stay valid.
        for (key, value) in spans.into_iter().rev() {
            if self.exceptions.contains(&redacted[value.clone()]) {
                return redacted;
            }

            let masked_key = mask_key(&redacted[key.clone()]);
            if value.start > key.start {
                redacted.replace_range(value, REDACTED_VALUE);
                redacted.replace_range(key, &masked_key);
            } else {
                redacted.replace_range(key, &masked_key);
                redacted.replace_range(value, REDACTED_VALUE);
            }
        }
        redacted
    }
}

fn mask_key(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => format!("{first}***{last}"),
        _ => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME_PATTERN: &str = r#"(name) = \\*"(.*?[^\\]+)"#;
    const TOKEN_PATTERN: &str = r#"(token) = \\*"(.*?[^\\]+)"#;

    fn sanitizer() -> RedactionSanitizer {
        let rules = [
            RedactionRule {
                pattern: NAME_PATTERN.to_string(),
                minimum_log_level: LogType::Warning,
            },
            RedactionRule {
                pattern: TOKEN_PATTERN.to_string(),
                minimum_log_level: LogType::Warning,
            },
        ];
        RedactionSanitizer::new(&rules, ["Dan Jones", "Jack Jones"]).unwrap()
    }

    #[test]
    fn test_redacts_keys_and_values() {
        let message = r#"conversation = {name = \"John Smith\";\n; \n token = \"123453423\";\n"#;
        let expected = r#"conversation = {n***e = \"*****\";\n; \n t***n = \"*****\";\n"#;

        assert_eq!(sanitizer().sanitize(message, LogType::Error), expected);
    }

    #[test]
    fn test_below_minimum_level_is_untouched() {
        let message = r#"name = "John Smith""#;

        assert_eq!(sanitizer().sanitize(message, LogType::Info), message);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let message = r#"NAME = \"John Smith\""#;

        assert_eq!(
            sanitizer().sanitize(message, LogType::Warning),
            r#"N***E = \"*****\""#
        );
    }

    #[test]
    fn test_exception_value_is_kept() {
        let message = r#"name = \"Dan Jones\""#;

        assert_eq!(sanitizer().sanitize(message, LogType::Error), message);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let rules = [RedactionRule {
            pattern: "(unclosed".to_string(),
            minimum_log_level: LogType::Verbose,
        }];

        let result = RedactionSanitizer::new(&rules, Vec::<String>::new());

        assert!(matches!(result, Err(SanitizerError::InvalidPattern { .. })));
    }

    #[test]
    fn test_mask_short_keys() {
        assert_eq!(mask_key("id"), "i***d");
        assert_eq!(mask_key("x"), "***");
    }
}
