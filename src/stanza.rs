//! Stanza scanning over `.datax` files.
//!
//! A data file is a sequence of stanzas separated by blank lines. Each
//! stanza describes one test case; its first line that is neither blank nor
//! a `#` comment is the test case description.

use std::io::{self, BufRead, Write};

/// Space, tab, newline, carriage return, vertical tab and form feed.
fn is_space(byte: &u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

/// True for lines made only of whitespace, terminator included.
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(is_space)
}

fn is_comment(line: &[u8]) -> bool {
    line.starts_with(b"#")
}

/// Length of the first line of `data`, including its `\n` if present.
fn line_len(data: &[u8]) -> usize {
    data.iter()
        .position(|&b| b == b'\n')
        .map_or(data.len(), |pos| pos + 1)
}

/// Drops a trailing `\n` or `\r\n`.
pub fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// First raw line of a stanza, without its terminator.
pub fn first_line(stanza: &[u8]) -> &[u8] {
    strip_terminator(&stanza[..line_len(stanza)])
}

/// Description of a stanza: its first line that is neither blank nor a
/// comment, without the line terminator.
pub fn description(stanza: &[u8]) -> Option<&[u8]> {
    stanza
        .split_inclusive(|&b| b == b'\n')
        .find(|line| !is_blank(line) && !is_comment(line))
        .map(strip_terminator)
}

/// Iterator over the stanzas of an in-memory data file.
///
/// Each item holds the stanza's lines with their terminators; the blank
/// lines separating stanzas are not part of any item.
#[derive(Debug, Clone)]
pub struct Stanzas<'a> {
    rest: &'a [u8],
}

impl<'a> Stanzas<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }
}

impl<'a> Iterator for Stanzas<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        loop {
            if self.rest.is_empty() {
                return None;
            }
            let len = line_len(self.rest);
            if !is_blank(&self.rest[..len]) {
                break;
            }
            self.rest = &self.rest[len..];
        }

        let mut end = 0;
        while end < self.rest.len() {
            let len = line_len(&self.rest[end..]);
            if is_blank(&self.rest[end..end + len]) {
                break;
            }
            end += len;
        }

        let (stanza, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(stanza)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    OutsideStanza,
    InsideMatched,
    InsideUnmatched,
}

/// Counts reported by [`copy_matching`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    pub stanzas: usize,
    pub selected: usize,
}

/// Copies the stanzas of `reader` whose first line satisfies `predicate`.
///
/// The predicate sees the raw first line of each stanza, comment or not,
/// without its terminator, and is called once per stanza. Selected stanzas
/// are written byte for byte; blank lines are never written.
pub fn copy_matching<R, W, F>(mut reader: R, mut writer: W, mut predicate: F) -> io::Result<CopyStats>
where
    R: BufRead,
    W: Write,
    F: FnMut(&[u8]) -> bool,
{
    let mut state = State::OutsideStanza;
    let mut stats = CopyStats::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }

        if is_blank(&line) {
            state = State::OutsideStanza;
            continue;
        }

        if state == State::OutsideStanza {
            stats.stanzas += 1;
            state = if predicate(strip_terminator(&line)) {
                stats.selected += 1;
                State::InsideMatched
            } else {
                State::InsideUnmatched
            };
        }

        if state == State::InsideMatched {
            writer.write_all(&line)?;
        }
    }

    writer.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, FilterSpec};

    const TWO_CASES: &[u8] = b"Add numbers\nadd:1:2:3\n\nSubtract numbers\nsub:3:2:1\n";

    fn copy_with(data: &[u8], filter: &Filter) -> (Vec<u8>, CopyStats) {
        let mut out = Vec::new();
        let stats = copy_matching(data, &mut out, |line| filter.matches(line)).unwrap();
        (out, stats)
    }

    fn prefixes(items: &[&str]) -> Filter {
        Filter::new(&FilterSpec {
            prefixes: items.iter().map(|s| s.to_string()).collect(),
            ..FilterSpec::default()
        })
        .unwrap()
    }

    #[test]
    fn test_description_skips_comments_and_blanks() {
        assert_eq!(
            description(b"# comment\n\nName args\nmore\n"),
            Some(&b"Name args"[..])
        );
    }

    #[test]
    fn test_description_keeps_inner_whitespace() {
        assert_eq!(
            description(b"  Two  spaces \r\ndata\r\n"),
            Some(&b"  Two  spaces "[..])
        );
        assert_eq!(description(b"No newline"), Some(&b"No newline"[..]));
    }

    #[test]
    fn test_description_absent() {
        assert_eq!(description(b"# only\n\n# comments\n"), None);
        assert_eq!(description(b""), None);
    }

    #[test]
    fn test_stanzas_iterator() {
        let data = b"\n\nfirst\nline\n\n\n# c\nsecond\n   \nthird";
        let stanzas: Vec<&[u8]> = Stanzas::new(data).collect();
        assert_eq!(
            stanzas,
            vec![&b"first\nline\n"[..], &b"# c\nsecond\n"[..], &b"third"[..]]
        );
        assert_eq!(first_line(stanzas[1]), b"# c");
        assert_eq!(description(stanzas[1]), Some(&b"second"[..]));
    }

    #[test]
    fn test_blank_lines() {
        assert!(is_blank(b"\n"));
        assert!(is_blank(b"\r\n"));
        assert!(is_blank(b" \t\x0b\x0c\r\n"));
        assert!(is_blank(b""));
        assert!(!is_blank(b" x\n"));
        assert!(!is_blank(b"\xa0\n"));
    }

    #[test]
    fn test_copy_separates_on_crlf_and_whitespace_lines() {
        let data = b"Add numbers\r\nadd:1\r\n\r\nSubtract numbers\r\nsub:1\r\n\x0b\r\nAdd more\r\nadd:2\r\n";
        let (out, stats) = copy_with(data, &prefixes(&["Add"]));
        assert_eq!(out, b"Add numbers\r\nadd:1\r\nAdd more\r\nadd:2\r\n");
        assert_eq!(stats, CopyStats { stanzas: 3, selected: 2 });
    }

    #[test]
    fn test_copy_end_anchor_sees_line_without_terminator() {
        let filter = Filter::new(&FilterSpec {
            regexes: vec!["numbers$".to_string()],
            ..FilterSpec::default()
        })
        .unwrap();
        let (out, _) = copy_with(b"Add numbers\nadd:1\n\nAdd numbers twice\nadd:2\n", &filter);
        assert_eq!(out, b"Add numbers\nadd:1\n");

        let filter = Filter::new(&FilterSpec {
            excludes: vec![".*slow$".to_string()],
            ..FilterSpec::default()
        })
        .unwrap();
        let (out, _) = copy_with(b"Big case slow\r\nx\r\n\r\nSmall case\r\ny\r\n", &filter);
        assert_eq!(out, b"Small case\r\ny\r\n");
    }

    #[test]
    fn test_copy_selects_by_prefix() {
        let (out, stats) = copy_with(TWO_CASES, &prefixes(&["Add"]));
        assert_eq!(out, b"Add numbers\nadd:1:2:3\n");
        assert_eq!(stats, CopyStats { stanzas: 2, selected: 1 });
    }

    #[test]
    fn test_copy_without_filters_keeps_all_stanzas() {
        let (out, stats) = copy_with(TWO_CASES, &Filter::all());
        assert_eq!(out, b"Add numbers\nadd:1:2:3\nSubtract numbers\nsub:3:2:1\n");
        assert_eq!(stats.selected, 2);
    }

    #[test]
    fn test_copy_is_lossless_within_stanza() {
        let data = b"Case one\n# inner comment\r\ndata:\"x\"\t\xff\n\n\n\nCase two\nother\n";
        let (out, _) = copy_with(data, &prefixes(&["Case one"]));
        assert_eq!(out, b"Case one\n# inner comment\r\ndata:\"x\"\t\xff\n");
    }

    #[test]
    fn test_copy_matches_raw_first_line() {
        let data = b"# Leading comment\nName of test\ndata\n\nName of other\ndata\n";
        let (out, stats) = copy_with(data, &prefixes(&["Name"]));
        assert_eq!(out, b"Name of other\ndata\n");
        assert_eq!(stats, CopyStats { stanzas: 2, selected: 1 });

        let (out, _) = copy_with(data, &prefixes(&["# Leading"]));
        assert_eq!(out, b"# Leading comment\nName of test\ndata\n");
    }

    #[test]
    fn test_copy_all_descriptions_round_trip() {
        let data = b"Alpha\n# c\na\n\nBeta\nb\n\n\nGamma\ng\n";
        let descriptions: Vec<String> = Stanzas::new(data)
            .filter_map(description)
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .collect();
        let names: Vec<&str> = descriptions.iter().map(String::as_str).collect();
        let (out, _) = copy_with(data, &prefixes(&names));
        let expected: Vec<u8> = Stanzas::new(data).flatten().copied().collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_copy_decision_held_for_stanza() {
        let data = b"Skip me\nAdd looks like a header\n\nAdd real\nx\n";
        let (out, _) = copy_with(data, &prefixes(&["Add"]));
        assert_eq!(out, b"Add real\nx\n");
    }
}
