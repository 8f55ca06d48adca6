//! Line splitting and eval marker detection

/// Delimiter between a statement and its rendered result
pub const EVAL_MARKER: &str = "=>";

/// A line split at its eval marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineParts<'a> {
    /// Text before the marker with trailing whitespace removed; the whole
    /// line when there is no marker
    pub expr_part: &'a str,
    /// Byte offset of the marker, if any
    pub marker: Option<usize>,
}

impl<'a> LineParts<'a> {
    pub fn has_marker(&self) -> bool {
        self.marker.is_some()
    }

    /// Byte offset just past the marker
    pub fn marker_end(&self) -> Option<usize> {
        self.marker.map(|offset| offset + EVAL_MARKER.len())
    }
}

/// Finds the first `=>` outside a double-quoted string literal
pub fn find_marker(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'=' if !in_string && bytes.get(i + 1) == Some(&b'>') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

pub fn split_marker(line: &str) -> LineParts<'_> {
    match find_marker(line) {
        Some(offset) => LineParts {
            expr_part: line[..offset].trim_end(),
            marker: Some(offset),
        },
        None => LineParts {
            expr_part: line.trim_end(),
            marker: None,
        },
    }
}

/// True when the caret at char `column` sits in an empty result slot: past
/// the line's marker with nothing but whitespace after the marker
pub fn caret_after_marker(line: &str, column: usize) -> bool {
    let Some(marker_end) = split_marker(line).marker_end() else {
        return false;
    };
    let caret = line
        .char_indices()
        .nth(column)
        .map(|(offset, _)| offset)
        .unwrap_or(line.len());
    caret >= marker_end && line[marker_end..].trim().is_empty()
}

/// Splits document text into lines
///
/// Lines end at `\n`; a trailing `\r` is dropped. Empty text is one empty
/// line.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_marker() {
        let parts = split_marker("x = 2 + 2  => 4");
        assert_eq!(parts.expr_part, "x = 2 + 2");
        assert_eq!(parts.marker, Some(11));
        assert_eq!(parts.marker_end(), Some(13));
    }

    #[test]
    fn test_no_marker() {
        let parts = split_marker("  just text  ");
        assert!(!parts.has_marker());
        assert_eq!(parts.expr_part, "  just text");
    }

    #[test]
    fn test_marker_inside_string_is_ignored() {
        let parts = split_marker(r#"concat("a=>b", "c") => a=>bc"#);
        assert_eq!(parts.expr_part, r#"concat("a=>b", "c")"#);
    }

    #[test]
    fn test_escaped_quote_in_string() {
        assert_eq!(find_marker(r#""q\"=>" =>"#), Some(8));
    }

    #[test]
    fn test_comparison_is_not_a_marker() {
        assert_eq!(find_marker("a >= b"), None);
        assert_eq!(find_marker("a == b"), None);
    }

    #[test]
    fn test_caret_after_marker() {
        assert!(caret_after_marker("x + 1 =>", 8));
        assert!(caret_after_marker("x + 1 => ", 9));
        assert!(!caret_after_marker("x + 1 =>", 7));
        assert!(caret_after_marker("é =>", 4));
    }

    #[test]
    fn test_filled_result_is_not_a_fresh_marker() {
        assert!(!caret_after_marker("x + 1 => 2", 10));
        assert!(!caret_after_marker("3 * 3 => 9", 8));
        assert!(!caret_after_marker("3 * 3 =>  9", 9));
    }

    #[test]
    fn test_caret_after_quoted_arrow() {
        assert!(!caret_after_marker(r#"s = "a=>"#, 8));
        assert!(!caret_after_marker(r#"concat("=>", "b")"#, 10));
        assert!(caret_after_marker(r#"concat("=>", "b") =>"#, 20));
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\r\nb\n"), vec!["a", "b", ""]);
        assert_eq!(split_lines(""), vec![""]);
    }
}
