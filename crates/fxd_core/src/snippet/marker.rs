//! Begin/end comment markers around snippet bodies.
//!
//! # Responsibility
//! - Emit marker pairs in the comment syntax of the snippet's own language.
//! - Parse marked text back into patches, tolerating hand-edited content
//!   outside marker pairs.
//!
//! # Invariants
//! - Comment style follows the snippet's `lang` attribute, never the host
//!   file, so one file can interleave snippets from different languages.
//! - Body text round-trips byte-for-byte through wrap then parse.

use crate::model::snippet::{Patch, SnippetSpec};
use crate::snippet::checksum::fnv1a_hex;
use std::error::Error;
use std::fmt::{Display, Formatter};

const BEGIN_SENTINEL: &str = "fxd:begin";
const END_SENTINEL: &str = "fxd:end";

/// Result type for marker operations.
pub type MarkerResult<T> = Result<T, MarkerError>;

/// Errors from marker parsing. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    /// `fxd:end` with no open `fxd:begin`.
    EndWithoutBegin { line: usize },
    /// `fxd:begin` while a previous begin is still open.
    NestedBegin { line: usize },
    /// Input ended while a begin was still open.
    UnterminatedSnippet { id: String, begin_line: usize },
    /// `fxd:end` id does not match the open begin id.
    MismatchedEnd {
        expected: String,
        found: String,
        line: usize,
    },
    /// Begin marker without the required `id` attribute.
    MissingId { line: usize },
    /// Marker line whose attribute list cannot be parsed.
    MalformedAttributes { line: usize, detail: String },
}

impl Display for MarkerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndWithoutBegin { line } => {
                write!(f, "line {line}: end marker without open begin")
            }
            Self::NestedBegin { line } => {
                write!(f, "line {line}: begin marker inside open snippet")
            }
            Self::UnterminatedSnippet { id, begin_line } => write!(
                f,
                "snippet `{id}` opened at line {begin_line} is never closed"
            ),
            Self::MismatchedEnd {
                expected,
                found,
                line,
            } => write!(
                f,
                "line {line}: end marker id `{found}` does not match open snippet `{expected}`"
            ),
            Self::MissingId { line } => {
                write!(f, "line {line}: begin marker is missing required `id`")
            }
            Self::MalformedAttributes { line, detail } => {
                write!(f, "line {line}: malformed marker attributes: {detail}")
            }
        }
    }
}

impl Error for MarkerError {}

/// Full-line comment delimiters for one language family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommentStyle {
    prefix: &'static str,
    suffix: &'static str,
}

const LINE_SLASH: CommentStyle = CommentStyle {
    prefix: "//",
    suffix: "",
};
const LINE_HASH: CommentStyle = CommentStyle {
    prefix: "#",
    suffix: "",
};
const BLOCK_C: CommentStyle = CommentStyle {
    prefix: "/*",
    suffix: "*/",
};
const BLOCK_HTML: CommentStyle = CommentStyle {
    prefix: "<!--",
    suffix: "-->",
};

const ALL_STYLES: [CommentStyle; 4] = [BLOCK_HTML, BLOCK_C, LINE_SLASH, LINE_HASH];

/// Picks the comment style for a snippet language tag.
///
/// Unknown tags fall back to `#`, the most widely tolerated full-line
/// comment.
fn comment_style(lang: Option<&str>) -> CommentStyle {
    match lang.map(str::to_ascii_lowercase).as_deref() {
        Some(
            "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "rust" | "rs" | "c" | "cpp" | "h"
            | "java" | "go" | "swift" | "kotlin",
        ) => LINE_SLASH,
        Some("css" | "scss" | "less") => BLOCK_C,
        Some("html" | "htm" | "xml" | "svg" | "md" | "markdown") => BLOCK_HTML,
        _ => LINE_HASH,
    }
}

/// Escapes an attribute value for embedding inside `key="..."`.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape_attr`]. Returns `None` on a dangling or unknown
/// escape sequence.
pub fn unescape_attr(value: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            _ => return None,
        }
    }
    Some(out)
}

/// Wraps a body in begin/end markers without a version attribute.
pub fn wrap(spec: &SnippetSpec, body: &str) -> String {
    wrap_inner(spec, None, body)
}

/// Wraps a body carrying the snippet's current store version, so a later
/// parse can report which revision an edit was based on.
pub fn wrap_versioned(spec: &SnippetSpec, version: u64, body: &str) -> String {
    wrap_inner(spec, Some(version), body)
}

fn wrap_inner(spec: &SnippetSpec, version: Option<u64>, body: &str) -> String {
    let style = comment_style(spec.lang.as_deref());
    let mut attrs = format!("id=\"{}\"", escape_attr(&spec.id));
    if let Some(lang) = &spec.lang {
        attrs.push_str(&format!(" lang=\"{}\"", escape_attr(lang)));
    }
    if let Some(file) = &spec.file {
        attrs.push_str(&format!(" file=\"{}\"", escape_attr(file)));
    }
    if let Some(order) = spec.order {
        attrs.push_str(&format!(" order=\"{order}\""));
    }
    if let Some(version) = version {
        attrs.push_str(&format!(" version=\"{version}\""));
    }
    attrs.push_str(&format!(
        " checksum=\"{}\"",
        fnv1a_hex(body.as_bytes())
    ));

    let begin = marker_line(style, BEGIN_SENTINEL, &attrs);
    let end = marker_line(
        style,
        END_SENTINEL,
        &format!("id=\"{}\"", escape_attr(&spec.id)),
    );
    format!("{begin}\n{body}\n{end}")
}

fn marker_line(style: CommentStyle, sentinel: &str, attrs: &str) -> String {
    if style.suffix.is_empty() {
        format!("{} {sentinel} {attrs}", style.prefix)
    } else {
        format!("{} {sentinel} {attrs} {}", style.prefix, style.suffix)
    }
}

#[derive(Debug)]
enum MarkerLine {
    Begin(Vec<(String, String)>),
    End(Vec<(String, String)>),
}

/// Parses marked text into patches, in order of appearance.
///
/// Lines outside begin/end pairs are ignored so hand-edited files with
/// surrounding prose or code still parse. Structural marker errors fail the
/// whole parse.
pub fn parse(text: &str) -> MarkerResult<Vec<Patch>> {
    let mut patches = Vec::new();
    let mut open: Option<(Vec<(String, String)>, usize, Vec<&str>)> = None;

    for (index, raw_line) in text.split('\n').enumerate() {
        let line_no = index + 1;
        match classify_line(raw_line, line_no)? {
            Some(MarkerLine::Begin(attrs)) => {
                if open.is_some() {
                    return Err(MarkerError::NestedBegin { line: line_no });
                }
                if attr_value(&attrs, "id").is_none() {
                    return Err(MarkerError::MissingId { line: line_no });
                }
                open = Some((attrs, line_no, Vec::new()));
            }
            Some(MarkerLine::End(end_attrs)) => {
                let Some((attrs, _, body_lines)) = open.take() else {
                    return Err(MarkerError::EndWithoutBegin { line: line_no });
                };
                let id = attr_value(&attrs, "id").unwrap_or_default();
                if let Some(end_id) = attr_value(&end_attrs, "id") {
                    if end_id != id {
                        return Err(MarkerError::MismatchedEnd {
                            expected: id,
                            found: end_id,
                            line: line_no,
                        });
                    }
                }
                patches.push(Patch {
                    id,
                    body: body_lines.join("\n"),
                    checksum_at_parse: attr_value(&attrs, "checksum"),
                    lang: attr_value(&attrs, "lang"),
                    file: attr_value(&attrs, "file"),
                    order: attr_value(&attrs, "order").and_then(|v| v.parse::<i64>().ok()),
                });
            }
            None => {
                if let Some((_, _, body_lines)) = open.as_mut() {
                    body_lines.push(raw_line);
                }
            }
        }
    }

    if let Some((attrs, begin_line, _)) = open {
        return Err(MarkerError::UnterminatedSnippet {
            id: attr_value(&attrs, "id").unwrap_or_default(),
            begin_line,
        });
    }
    Ok(patches)
}

fn attr_value(attrs: &[(String, String)], key: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

/// Recognizes a marker line under any known comment style.
///
/// Returns `Ok(None)` for ordinary content lines; only lines that carry a
/// marker sentinel can fail.
fn classify_line(raw_line: &str, line_no: usize) -> MarkerResult<Option<MarkerLine>> {
    let line = raw_line.strip_suffix('\r').unwrap_or(raw_line).trim();

    for style in ALL_STYLES {
        let Some(rest) = line.strip_prefix(style.prefix) else {
            continue;
        };
        let rest = if style.suffix.is_empty() {
            rest
        } else {
            match rest.strip_suffix(style.suffix) {
                Some(inner) => inner,
                None => continue,
            }
        };
        let content = rest.trim();

        if let Some(attr_text) = strip_sentinel(content, BEGIN_SENTINEL) {
            let attrs = parse_attrs(attr_text, line_no)?;
            return Ok(Some(MarkerLine::Begin(attrs)));
        }
        if let Some(attr_text) = strip_sentinel(content, END_SENTINEL) {
            let attrs = parse_attrs(attr_text, line_no)?;
            return Ok(Some(MarkerLine::End(attrs)));
        }
        // A comment in a known style, but not a marker: plain content.
        return Ok(None);
    }
    Ok(None)
}

/// Matches a sentinel followed by end-of-line or whitespace; `fxd:beginx`
/// is ordinary comment text, not a marker.
fn strip_sentinel<'line>(content: &'line str, sentinel: &str) -> Option<&'line str> {
    let rest = content.strip_prefix(sentinel)?;
    if rest.is_empty() {
        Some(rest)
    } else if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Parses a space-separated `key="escaped"` attribute list.
fn parse_attrs(text: &str, line_no: usize) -> MarkerResult<Vec<(String, String)>> {
    let malformed = |detail: &str| MarkerError::MalformedAttributes {
        line: line_no,
        detail: detail.to_string(),
    };

    let mut attrs = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| malformed("expected key=\"value\""))?;
        let key = &rest[..eq];
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(malformed(&format!("invalid attribute key `{key}`")));
        }
        rest = &rest[eq + 1..];
        if !rest.starts_with('"') {
            return Err(malformed("attribute value must be double-quoted"));
        }
        rest = &rest[1..];

        // Scan to the closing quote, honoring backslash escapes.
        let mut value_end = None;
        let mut escaped = false;
        for (offset, c) in rest.char_indices() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                value_end = Some(offset);
                break;
            }
        }
        let value_end = value_end.ok_or_else(|| malformed("unterminated attribute value"))?;
        let value = unescape_attr(&rest[..value_end])
            .ok_or_else(|| malformed("invalid escape sequence in attribute value"))?;
        attrs.push((key.to_string(), value));
        rest = rest[value_end + 1..].trim_start();
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::{escape_attr, parse, unescape_attr, wrap, MarkerError};
    use crate::model::snippet::SnippetSpec;

    #[test]
    fn escape_round_trips_reserved_characters() {
        for id in ["plain", "with=equals", "with\"quote", "line\nbreak", "back\\slash"] {
            assert_eq!(unescape_attr(&escape_attr(id)).unwrap(), id);
        }
    }

    #[test]
    fn unescape_rejects_dangling_and_unknown_escapes() {
        assert!(unescape_attr("trailing\\").is_none());
        assert!(unescape_attr("bad\\q").is_none());
    }

    #[test]
    fn comment_style_follows_snippet_lang() {
        let js = wrap(&SnippetSpec::new("a").lang("js"), "x");
        assert!(js.starts_with("// fxd:begin"));

        let py = wrap(&SnippetSpec::new("a").lang("py"), "x");
        assert!(py.starts_with("# fxd:begin"));

        let css = wrap(&SnippetSpec::new("a").lang("css"), "x");
        assert!(css.starts_with("/* fxd:begin"));
        assert!(css.lines().next().unwrap().ends_with("*/"));

        let html = wrap(&SnippetSpec::new("a").lang("html"), "x");
        assert!(html.starts_with("<!-- fxd:begin"));
        assert!(html.lines().next().unwrap().ends_with("-->"));
    }

    #[test]
    fn end_without_begin_is_an_error() {
        let err = parse("# fxd:end id=\"a\"").unwrap_err();
        assert_eq!(err, MarkerError::EndWithoutBegin { line: 1 });
    }

    #[test]
    fn begin_requires_id() {
        let err = parse("# fxd:begin lang=\"py\"").unwrap_err();
        assert_eq!(err, MarkerError::MissingId { line: 1 });
    }

    #[test]
    fn unterminated_snippet_is_an_error() {
        let err = parse("# fxd:begin id=\"a\"\nbody").unwrap_err();
        assert_eq!(
            err,
            MarkerError::UnterminatedSnippet {
                id: "a".to_string(),
                begin_line: 1
            }
        );
    }

    #[test]
    fn ordinary_comments_are_not_markers() {
        assert!(parse("# just a comment\n// another\nplain text").unwrap().is_empty());
    }
}
