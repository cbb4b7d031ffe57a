//! Template tokenizer.
//!
//! Splits raw template text into alternating literal text and tag fragments,
//! and classifies each fragment. Tags never span lines.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, TemplateError};

pub(crate) const VAR_START: &str = "{{";
pub(crate) const BLOCK_START: &str = "{%";

static TOKEN_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{.*?\}\}|\{%.*?%\}").expect("separator pattern is valid"));

static FRAGMENT_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\{\{|\{%)(?P<command>.*?)(?:\}\}|%\})$").expect("fragment pattern is valid")
});

/// Classification of a [`Fragment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Literal text, passed through unchanged.
    Text,
    /// `{{ name }}` interpolation.
    Variable,
    /// `{% command ... %}` that is not a close tag.
    OpenBlock,
    /// `{% end... %}`.
    CloseBlock,
}

/// A lexical unit of a template: literal text or one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment<'s> {
    raw: &'s str,
    clean: &'s str,
    kind: FragmentKind,
    line: usize,
}

impl<'s> Fragment<'s> {
    /// Classifies a raw piece of template text found on `line` (1-based).
    pub fn new(raw: &'s str, line: usize) -> Result<Self> {
        let Some(captures) = FRAGMENT_MATCH.captures(raw.trim()) else {
            return Ok(Fragment {
                raw,
                clean: raw,
                kind: FragmentKind::Text,
                line,
            });
        };

        let matched = captures.get(0).map_or("", |m| m.as_str());
        let clean = captures.name("command").map_or("", |m| m.as_str()).trim();

        let kind = if matched.starts_with(BLOCK_START) {
            if clean.starts_with("end") {
                FragmentKind::CloseBlock
            } else {
                FragmentKind::OpenBlock
            }
        } else if matched.starts_with(VAR_START) {
            FragmentKind::Variable
        } else {
            return Err(TemplateError::InvalidSyntax {
                fragment: raw.to_string(),
                line,
            });
        };

        Ok(Fragment {
            raw,
            clean,
            kind,
            line,
        })
    }

    /// The fragment exactly as it appears in the source.
    pub fn raw(&self) -> &'s str {
        self.raw
    }

    /// The trimmed command text inside the tag, or the raw text for literals.
    pub fn clean(&self) -> &'s str {
        self.clean
    }

    /// The fragment's classification.
    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    /// The 1-based source line the fragment starts on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Source text before and after the tag within the fragment.
    ///
    /// Non-empty only for a text piece that parsed as a tag once trimmed,
    /// such as ` {{x%} `. Literal text has no padding.
    pub fn padding(&self) -> (&'s str, &'s str) {
        if self.kind == FragmentKind::Text {
            return ("", "");
        }
        let start = self.raw.len() - self.raw.trim_start().len();
        let end = start + self.raw.trim().len();
        (&self.raw[..start], &self.raw[end..])
    }

    /// The first word of the tag's command, if any.
    pub fn command(&self) -> Option<&'s str> {
        self.clean.split_whitespace().next()
    }

    pub(crate) fn syntax_error(&self) -> TemplateError {
        TemplateError::InvalidSyntax {
            fragment: self.raw.to_string(),
            line: self.line,
        }
    }
}

/// Splits a template into classified fragments, dropping empty pieces.
///
/// # Example
///
/// ```
/// use onebot_template::fragment::{fragments, FragmentKind};
///
/// let kinds: Vec<_> = fragments("hi {{ name }}{% if x %}!{% end %}")
///     .unwrap()
///     .iter()
///     .map(|f| f.kind())
///     .collect();
///
/// assert_eq!(
///     kinds,
///     [
///         FragmentKind::Text,
///         FragmentKind::Variable,
///         FragmentKind::OpenBlock,
///         FragmentKind::Text,
///         FragmentKind::CloseBlock,
///     ]
/// );
/// ```
pub fn fragments(source: &str) -> Result<Vec<Fragment<'_>>> {
    let mut pieces = Vec::new();
    let mut cursor = 0;

    for tag in TOKEN_SEPARATOR.find_iter(source) {
        if tag.start() > cursor {
            pieces.push((cursor, &source[cursor..tag.start()]));
        }
        pieces.push((tag.start(), tag.as_str()));
        cursor = tag.end();
    }
    if cursor < source.len() {
        pieces.push((cursor, &source[cursor..]));
    }

    let mut line = 1;
    let mut counted = 0;
    pieces
        .into_iter()
        .map(|(offset, raw)| {
            line += source[counted..offset].matches('\n').count();
            counted = offset;
            Fragment::new(raw, line)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(FragmentKind, String)> {
        fragments(source)
            .unwrap()
            .into_iter()
            .map(|f| (f.kind(), f.clean().to_string()))
            .collect()
    }

    #[test]
    fn plain_text_is_one_fragment() {
        assert_eq!(
            kinds("just some text"),
            vec![(FragmentKind::Text, "just some text".into())]
        );
    }

    #[test]
    fn empty_source_has_no_fragments() {
        assert!(fragments("").unwrap().is_empty());
    }

    #[test]
    fn classifies_tags() {
        assert_eq!(
            kinds("a{{ x.y|raw }}{% each i in xs %}{% endeach %}b"),
            vec![
                (FragmentKind::Text, "a".into()),
                (FragmentKind::Variable, "x.y|raw".into()),
                (FragmentKind::OpenBlock, "each i in xs".into()),
                (FragmentKind::CloseBlock, "endeach".into()),
                (FragmentKind::Text, "b".into()),
            ]
        );
    }

    #[test]
    fn adjacent_tags_produce_no_empty_text() {
        let all = fragments("{{a}}{{b}}").unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|f| f.kind() == FragmentKind::Variable));
    }

    #[test]
    fn tags_do_not_span_lines() {
        assert_eq!(
            kinds("{{ a\n}}"),
            vec![(FragmentKind::Text, "{{ a\n}}".into())]
        );
    }

    #[test]
    fn separator_is_non_greedy() {
        assert_eq!(
            kinds("{{ a }} and {{ b }}"),
            vec![
                (FragmentKind::Variable, "a".into()),
                (FragmentKind::Text, " and ".into()),
                (FragmentKind::Variable, "b".into()),
            ]
        );
    }

    #[test]
    fn tracks_lines() {
        let all = fragments("one\n{{ a }}\nthree {% if b %}").unwrap();
        let lines: Vec<_> = all.iter().map(|f| f.line()).collect();
        assert_eq!(lines, vec![1, 2, 2, 3]);
    }

    #[test]
    fn command_word() {
        let all = fragments("{%   call  f x %}").unwrap();
        assert_eq!(all[0].command(), Some("call"));
        assert_eq!(all[0].raw(), "{%   call  f x %}");

        let empty = fragments("{% %}").unwrap();
        assert_eq!(empty[0].padding(), ("", ""));
        assert_eq!(empty[0].kind(), FragmentKind::OpenBlock);
        assert_eq!(empty[0].command(), None);
    }

    #[test]
    fn mismatched_delimiters_keep_surrounding_text() {
        let all = fragments("{{y}} {{x%} ").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].kind(), FragmentKind::Variable);
        assert_eq!(all[1].clean(), "x");
        assert_eq!(all[1].padding(), (" ", " "));
        assert_eq!(all[0].padding(), ("", ""));
    }

    #[test]
    fn text_has_no_padding() {
        let all = fragments("  spaced  ").unwrap();
        assert_eq!(all[0].kind(), FragmentKind::Text);
        assert_eq!(all[0].padding(), ("", ""));
    }
}
