//! DOT format helpers for dumping dependency graphs.
//!
//! Instruction labels contain register syntax such as `vgrf3<8>` and
//! `m[2]`, so they must be escaped before being embedded in Graphviz
//! record labels.

/// Escapes a string for use inside a quoted DOT label.
///
/// Quotes, backslashes and line breaks are escaped, as are the characters
/// that delimit fields in record-shaped nodes (`<`, `>`, `{`, `}`, `|`).
///
/// # Arguments
///
/// * `s` - The string to escape
///
/// # Returns
///
/// A new string with all special characters escaped.
///
/// # Examples
///
/// ```rust
/// use gensched::utils::escape_dot;
///
/// assert_eq!(escape_dot("mov vgrf1<8>"), "mov vgrf1\\<8\\>");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '<' | '>' | '{' | '}' | '|' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_dot_plain_mnemonic() {
        assert_eq!(escape_dot("add g4 g2 g3"), "add g4 g2 g3");
    }

    #[test]
    fn test_escape_dot_register_regions() {
        assert_eq!(escape_dot("vgrf3<8>"), "vgrf3\\<8\\>");
        assert_eq!(escape_dot("{a|b}"), "\\{a\\|b\\}");
    }

    #[test]
    fn test_escape_dot_quotes_and_backslashes() {
        assert_eq!(escape_dot("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_dot("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_escape_dot_line_breaks() {
        assert_eq!(escape_dot("line1\r\nline2"), "line1\\nline2");
    }
}
