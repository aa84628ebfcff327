//! Goal patterns with `?` placeholders.
//!
//! - `?` is an unnamed placeholder, given a synthetic name
//! - `?Name` is a named placeholder; the name runs over letters, digits and `_`
//! - `??` is a literal `?`
//!
//! Synthetic names are `<prefix><index>`, where the index is the placeholder's
//! position among all placeholders and the prefix is chosen so it does not
//! occur anywhere in the pattern text.

use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// A compiled goal pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalPattern {
    source: String,
    segments: Vec<Segment>,
    placeholders: Vec<String>,
}

impl GoalPattern {
    pub fn compile(pattern: &str) -> Self {
        let prefix = synthetic_prefix(pattern);
        let mut segments = Vec::new();
        let mut placeholders: Vec<String> = Vec::new();
        let mut text = String::new();
        let mut occurrence = 0usize;

        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '?' {
                text.push(c);
                continue;
            }
            if chars.peek() == Some(&'?') {
                chars.next();
                text.push('?');
                continue;
            }
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if !(next.is_alphanumeric() || next == '_') {
                    break;
                }
                name.push(next);
                chars.next();
            }
            if name.is_empty() {
                name = format!("{prefix}{occurrence}");
            }
            occurrence += 1;

            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            if !placeholders.contains(&name) {
                placeholders.push(name.clone());
            }
            segments.push(Segment::Placeholder(name));
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self {
            source: pattern.to_string(),
            segments,
            placeholders,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of first introduction, without repeats.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.placeholders.iter().position(|p| p == name)
    }

    /// The pattern with every placeholder written as its name and `??`
    /// resolved to `?`.
    pub fn canonical(&self) -> String {
        self.render(&HashMap::new())
    }

    /// Substitute the first occurrence of each placeholder that has a
    /// replacement. Other occurrences, and placeholders without a
    /// replacement, are written as their name.
    pub fn render(&self, replacements: &HashMap<String, String>) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut substituted = HashSet::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => match replacements.get(name) {
                    Some(value) if substituted.insert(name.as_str()) => out.push_str(value),
                    _ => out.push_str(name),
                },
            }
        }
        out
    }
}

impl fmt::Display for GoalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// `P_`, or the first of `P0_`, `P1_`, ... that the pattern does not contain.
fn synthetic_prefix(pattern: &str) -> String {
    if !pattern.contains("P_") {
        return "P_".into();
    }
    (0..)
        .map(|n| format!("P{n}_"))
        .find(|candidate| !pattern.contains(candidate.as_str()))
        .unwrap_or_else(|| "P_".into())
}
