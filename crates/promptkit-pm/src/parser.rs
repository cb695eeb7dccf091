//! Placeholder scanning for message templates.
//!
//! Templates mark substitution points as `{{name}}`, where `name` is an
//! identifier (`[A-Za-z_][A-Za-z0-9_]*`) optionally padded with whitespace
//! inside the braces. Anything that does not form a valid marker is kept as
//! literal text; scanning never fails.

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A piece of a tokenized template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text, copied verbatim when rendering.
    Text(&'a str),
    /// A recognized placeholder.
    Placeholder {
        /// Trimmed placeholder name.
        name: &'a str,
        /// The full marker as written, braces included.
        raw: &'a str,
    },
}

/// Split a template into literal text and placeholder segments.
///
/// Adjacent literal text is merged into a single [`Segment::Text`]. When a
/// `{{` does not open a valid marker, scanning resumes one byte later so that
/// `{{{name}}}` still yields `name` surrounded by literal braces.
///
/// # Examples
///
/// ```
/// use promptkit_pm::{Segment, segments};
///
/// let parts = segments("Hi {{ name }}!");
/// assert_eq!(
///     parts,
///     vec![
///         Segment::Text("Hi "),
///         Segment::Placeholder { name: "name", raw: "{{ name }}" },
///         Segment::Text("!"),
///     ]
/// );
/// ```
pub fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find(OPEN) {
        let open = cursor + offset;
        let inner_start = open + OPEN.len();
        let Some(close_offset) = template[inner_start..].find(CLOSE) else {
            break;
        };
        let close = inner_start + close_offset;
        let name = template[inner_start..close].trim();

        if !is_identifier(name) {
            // `{` is a single byte, so this stays on a char boundary.
            cursor = open + 1;
            continue;
        }

        if text_start < open {
            out.push(Segment::Text(&template[text_start..open]));
        }
        let end = close + CLOSE.len();
        out.push(Segment::Placeholder {
            name,
            raw: &template[open..end],
        });
        cursor = end;
        text_start = end;
    }

    if text_start < template.len() {
        out.push(Segment::Text(&template[text_start..]));
    }
    out
}

/// Extract the distinct placeholder names of a template in first-occurrence order.
///
/// # Examples
///
/// ```
/// use promptkit_pm::extract_placeholders;
///
/// let names = extract_placeholders("{{b}} {{a}} {{b}} {{}} {{1bad}}");
/// assert_eq!(names, vec!["b".to_owned(), "a".to_owned()]);
/// ```
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in segments(template) {
        if let Segment::Placeholder { name, .. } = segment
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_owned());
        }
    }
    names
}

/// Returns whether `s` is a valid placeholder or parameter identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
