//! Identifier validation and quoting.
//!
//! Column and table names are interpolated into statement text, so every name
//! a schema declares is checked against a conservative pattern when the schema
//! is built.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use regex::Regex;

use crate::types::Dialect;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";
const TABLE_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$";

/// Thread-safe cache of compiled patterns.
struct RegexCache {
    cache: RwLock<HashMap<&'static str, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &'static str) -> Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern, regex.clone());
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

fn matches_pattern(value: &str, pattern: &'static str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid identifier pattern, treating as non-match"
            );
            false
        }
    }
}

/// Whether `name` is a plain column identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    matches_pattern(name, IDENTIFIER_PATTERN)
}

/// Whether `name` is a table name, optionally schema-qualified.
pub fn is_valid_table_name(name: &str) -> bool {
    matches_pattern(name, TABLE_PATTERN)
}

/// Quote an identifier for `dialect`, doubling embedded quote characters.
pub fn quote_ident(dialect: Dialect, name: &str) -> String {
    let q = dialect.quote_char();
    let escaped = name.replace(q, &format!("{q}{q}"));
    format!("{q}{escaped}{q}")
}
