//! # Rule Module
//!
//! Maps gamelog text to music actions. A rule file holds one binding per line:
//!
//! ```text
//! Spring has arrived!|Spring has arrived on the calendar;music/spring;0
//! A megabeast approaches!;music/battle/beast.ogg;5
//! It has started raining;sfx/rain.ogg;-1
//! ```
//!
//! Fields are `pattern;target;priority`. The pattern is a regular expression
//! searched anywhere in the line (not anchored). Rules are kept in declaration
//! order and the first matching rule wins.
//!
//! [`RuleBook`] wraps a [`RuleSet`] loaded from disk and reloads it whenever the
//! file's modification time changes, so bindings can be edited while a game runs.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// A malformed record in a rule file.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("line {line}: expected `pattern;target;priority`")]
    MissingField { line: usize },

    #[error("line {line}: priority `{value}` is not an integer")]
    BadPriority { line: usize, value: String },

    #[error("line {line}: invalid pattern: {source}")]
    BadPattern {
        line: usize,
        #[source]
        source: regex::Error,
    },
}

/// What to do with a malformed rule record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Log the record and keep going.
    #[default]
    Skip,
    /// Reject the whole file.
    Strict,
}

/// One pattern-to-action binding.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Regex,
    /// File path, folder path or season identifier.
    pub target: String,
    pub priority: i32,
}

impl Rule {
    pub fn new(pattern: &str, target: impl Into<String>, priority: i32) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            target: target.into(),
            priority,
        })
    }
}

/// Immutable, ordered collection of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parses rule-file text.
    ///
    /// Blank lines and lines starting with `#` are ignored. Under
    /// [`ParsePolicy::Skip`] a malformed record is logged and dropped; under
    /// [`ParsePolicy::Strict`] the first one aborts the parse.
    pub fn parse(text: &str, policy: ParsePolicy) -> Result<Self, RuleError> {
        let mut rules = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            if raw.trim().is_empty() || raw.starts_with('#') {
                continue;
            }

            match parse_record(raw, line) {
                Ok(rule) => rules.push(rule),
                Err(e) if policy == ParsePolicy::Skip => warn!("Skipping rule: {e}"),
                Err(e) => return Err(e),
            }
        }

        Ok(Self { rules })
    }

    /// Reads and parses a rule file.
    pub fn load(path: &Path, policy: ParsePolicy) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file {}", path.display()))?;
        let rules = Self::parse(&text, policy)
            .with_context(|| format!("Malformed rule file {}", path.display()))?;
        info!("Loaded {} rules from {}", rules.len(), path.display());
        Ok(rules)
    }

    /// Returns the target and priority of the first rule whose pattern occurs in `line`.
    pub fn find_match(&self, line: &str) -> Option<(&str, i32)> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(line))
            .map(|rule| (rule.target.as_str(), rule.priority))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_record(raw: &str, line: usize) -> Result<Rule, RuleError> {
    let mut fields = raw.splitn(3, ';');
    let (Some(pattern), Some(target), Some(priority)) = (fields.next(), fields.next(), fields.next()) else {
        return Err(RuleError::MissingField { line });
    };

    let priority = priority
        .trim()
        .parse::<i32>()
        .map_err(|_| RuleError::BadPriority {
            line,
            value: priority.trim().to_string(),
        })?;

    Rule::new(pattern, target, priority).map_err(|source| RuleError::BadPattern { line, source })
}

/// A rule file on disk plus its cached parse.
#[derive(Debug)]
pub struct RuleBook {
    path: PathBuf,
    policy: ParsePolicy,
    rules: RuleSet,
    modified: Option<SystemTime>,
}

impl RuleBook {
    /// Loads the rule file. Failure here is fatal to the caller.
    pub fn open(path: impl Into<PathBuf>, policy: ParsePolicy) -> Result<Self> {
        let path = path.into();
        let rules = RuleSet::load(&path, policy)?;
        let modified = modified_time(&path);
        Ok(Self {
            path,
            policy,
            rules,
            modified,
        })
    }

    /// Current rules, re-read first if the file changed since the last load.
    ///
    /// A failed reload keeps the previous rules.
    pub fn rules(&mut self) -> &RuleSet {
        let modified = modified_time(&self.path);
        if modified.is_some() && modified != self.modified {
            debug!("Rule file {} changed, reloading", self.path.display());
            match RuleSet::load(&self.path, self.policy) {
                Ok(rules) => self.rules = rules,
                Err(e) => warn!("Keeping previous rules: {e:#}"),
            }
            self.modified = modified;
        }
        &self.rules
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
