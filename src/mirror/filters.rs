// src/mirror/filters.rs

//! Package id filtering with shell-style globs.

use crate::error::{Error, Result};
use regex::Regex;

/// Compiled include/exclude filter over package ids
///
/// Globs support `*` and `?`, match case-insensitively, and are anchored
/// to the whole id. An empty include list admits everything; excludes are
/// applied afterwards.
#[derive(Debug, Default)]
pub struct IdFilter {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

impl IdFilter {
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self> {
        Ok(Self {
            includes: compile_all(includes)?,
            excludes: compile_all(excludes)?,
        })
    }

    /// True when no patterns are configured
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    pub fn matches(&self, id: &str) -> bool {
        if !self.includes.is_empty() && !self.includes.iter().any(|re| re.is_match(id)) {
            return false;
        }
        !self.excludes.iter().any(|re| re.is_match(id))
    }
}

fn compile_all(globs: &[String]) -> Result<Vec<Regex>> {
    globs.iter().map(|g| compile_glob(g)).collect()
}

/// Compile one glob into an anchored case-insensitive regex
fn compile_glob(glob: &str) -> Result<Regex> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push_str("(?i)^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');

    Regex::new(&pattern)
        .map_err(|e| Error::Configuration(format!("invalid filter glob '{glob}': {e}")))
}
