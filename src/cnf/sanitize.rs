//! Validation and escaping of caller-supplied config entries
//!
//! Rendering itself never escapes. Entries coming from callers (names,
//! alternate names) go through here first so they cannot inject new lines,
//! headers, comments or `$var` expansions into the rendered document.

use super::{ConfigBlock, ConfigValue};
use crate::error::ValidationError;

/// Option keys are limited to the characters the toolkit treats as a name
pub fn check_key(key: &str) -> Result<(), ValidationError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::UnsafeConfigKey(key.to_string()))
    }
}

/// Backslash-escape characters the config parser would otherwise interpret
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '$' | '#' | '"' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Validate every key, reject control characters and escape text values
pub fn sanitize_block(block: &ConfigBlock) -> Result<ConfigBlock, ValidationError> {
    let mut clean = ConfigBlock::new();
    for (key, value) in block.iter() {
        check_key(key)?;
        let value = match value {
            ConfigValue::Text(text) => {
                if text.chars().any(char::is_control) {
                    return Err(ValidationError::UnsafeConfigValue {
                        key: key.to_string(),
                        value: text.clone(),
                    });
                }
                ConfigValue::Text(escape_value(text))
            }
            number @ ConfigValue::Number(_) => number.clone(),
        };
        clean.insert(key, value);
    }
    Ok(clean)
}
