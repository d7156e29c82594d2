//! Text triggers: canned replies to chat messages.
//!
//! Rules are checked in order; the first match wins. Messages written by
//! automated accounts never trigger a reply.

use regex::Regex;

/// Pattern and reply of the built-in rule.
const AROUND_THE_WORLD_PATTERN: &str = r"(?i)around\s*the\s*world";
const AROUND_THE_WORLD_REPLY: &str = "Around the World 🌍🎶";

/// Ordered trigger rules.
#[derive(Debug, Clone)]
pub struct TriggerTable {
    rules: Vec<(Regex, String)>,
}

impl Default for TriggerTable {
    fn default() -> Self {
        let mut table = Self::empty();
        // The built-in pattern is a literal; failing to compile it is a bug.
        if let Ok(pattern) = Regex::new(AROUND_THE_WORLD_PATTERN) {
            table.rules.push((pattern, AROUND_THE_WORLD_REPLY.to_string()));
        }
        table
    }
}

impl TriggerTable {
    /// A table with no rules.
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. Patterns are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` does not compile.
    pub fn with_rule(mut self, pattern: &str, reply: impl Into<String>) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("(?i){pattern}"))?;
        self.rules.push((regex, reply.into()));
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Reply for a message, if any rule matches.
    #[must_use]
    pub fn reply_for(&self, author_bot: bool, content: &str) -> Option<&str> {
        if author_bot {
            return None;
        }
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(content))
            .map(|(_, reply)| reply.as_str())
    }
}
