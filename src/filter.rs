//! Test case selection by description.
//!
//! A [`Filter`] is compiled once from a [`FilterSpec`] and then answers
//! [`Filter::matches`] for every stanza of every data file. Matching is done
//! on raw bytes so data files in any encoding can be filtered: patterns are
//! compiled with Unicode mode off, and non-ASCII characters given on the
//! command line stand for their UTF-8 bytes.

use crate::error::Result;
use regex::bytes::{Regex, RegexBuilder};

/// Any run of bytes except a newline.
const ANY_PREFIX: &str = ".*";

/// Replaces every non-ASCII character with `\xHH` escapes of its UTF-8 bytes.
fn escape_non_ascii(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut buf = [0; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                escaped.push_str(&format!("\\x{:02X}", byte));
            }
        }
    }
    escaped
}

/// Include and exclude patterns as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub substrings: Vec<String>,
    pub prefixes: Vec<String>,
    pub regexes: Vec<String>,
    pub excludes: Vec<String>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.substrings.is_empty()
            && self.prefixes.is_empty()
            && self.regexes.is_empty()
            && self.excludes.is_empty()
    }
}

/// One alternative of a description pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Literal text that may appear anywhere in the description.
    Substring(String),
    /// Literal text the description must start with.
    Prefix(String),
    /// User regex that may match anywhere; inserted without escaping.
    Regex(String),
    /// User regex that must match at the start; inserted without escaping.
    AnchoredRegex(String),
}

impl Fragment {
    fn render(&self) -> String {
        let rendered = match self {
            Fragment::Substring(text) => format!("{}{}", ANY_PREFIX, regex::escape(text)),
            Fragment::Prefix(text) => regex::escape(text),
            Fragment::Regex(pattern) => format!("{}(?:{})", ANY_PREFIX, pattern),
            Fragment::AnchoredRegex(pattern) => pattern.clone(),
        };
        escape_non_ascii(&rendered)
    }
}

/// Assembles an alternation of fragments into a start-anchored regex.
#[derive(Debug, Default)]
pub struct PatternBuilder {
    fragments: Vec<Fragment>,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: Fragment) -> &mut Self {
        self.fragments.push(fragment);
        self
    }

    pub fn extend<I>(&mut self, fragments: I) -> &mut Self
    where
        I: IntoIterator<Item = Fragment>,
    {
        self.fragments.extend(fragments);
        self
    }

    /// Pattern source, or `None` when there are no alternatives.
    pub fn source(&self) -> Option<String> {
        if self.fragments.is_empty() {
            return None;
        }
        let alternatives: Vec<String> = self
            .fragments
            .iter()
            .map(|fragment| format!("(?:{})", fragment.render()))
            .collect();
        Some(format!("^(?:{})", alternatives.join("|")))
    }

    pub fn build(&self) -> Result<Option<Regex>> {
        match self.source() {
            Some(source) => Ok(Some(RegexBuilder::new(&source).unicode(false).build()?)),
            None => Ok(None),
        }
    }
}

/// Compiled include/exclude predicate over descriptions.
#[derive(Debug, Clone)]
pub struct Filter {
    /// `None` matches every description.
    include: Option<Regex>,
    /// `None` excludes nothing.
    exclude: Option<Regex>,
}

impl Filter {
    pub fn new(spec: &FilterSpec) -> Result<Self> {
        let mut include = PatternBuilder::new();
        include
            .extend(spec.substrings.iter().cloned().map(Fragment::Substring))
            .extend(spec.prefixes.iter().cloned().map(Fragment::Prefix))
            .extend(spec.regexes.iter().cloned().map(Fragment::Regex));

        let mut exclude = PatternBuilder::new();
        exclude.extend(spec.excludes.iter().cloned().map(Fragment::AnchoredRegex));

        Ok(Self {
            include: include.build()?,
            exclude: exclude.build()?,
        })
    }

    /// A filter that selects everything.
    pub fn all() -> Self {
        Self {
            include: None,
            exclude: None,
        }
    }

    pub fn matches(&self, description: &[u8]) -> bool {
        let included = self
            .include
            .as_ref()
            .map_or(true, |re| re.is_match(description));
        let excluded = self
            .exclude
            .as_ref()
            .map_or(false, |re| re.is_match(description));
        included && !excluded
    }
}
