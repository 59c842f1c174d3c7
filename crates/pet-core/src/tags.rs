//! Emotion marker extraction
//!
//! Replies carry bracketed markers such as `[F05]` or `[happy]`. The scanner
//! below pulls them out left to right and returns the text that should be
//! shown in the chat bubble.

/// Shown instead of an empty bubble when a reply was nothing but markers.
pub const PLACEHOLDER_TEXT: &str = "expressed emotion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub cleaned_text: String,
    pub markers: Vec<String>,
}

/// Split a reply into display text and its emotion markers.
///
/// Spans never nest: if another `[` shows up before the closing `]`, the
/// earlier `[` is kept as literal text. An unmatched `[` is literal too.
/// Empty spans are removed from the text but yield no marker. When a span
/// sat between two runs of spaces, the run after it is dropped so that
/// `"Hello [happy] world"` reads `"Hello world"`.
pub fn extract(reply: &str) -> Extraction {
    let mut cleaned = String::with_capacity(reply.len());
    let mut markers = Vec::new();
    let mut rest = reply;

    while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find(']') else {
            break;
        };

        if let Some(inner_open) = after_open[..close].find('[') {
            // Keep everything up to the inner bracket and rescan from there.
            let literal_end = open + 1 + inner_open;
            cleaned.push_str(&rest[..literal_end]);
            rest = &rest[literal_end..];
            continue;
        }

        cleaned.push_str(&rest[..open]);
        let marker = after_open[..close].trim();
        if !marker.is_empty() {
            markers.push(marker.to_string());
        }

        rest = &after_open[close + 1..];
        if cleaned.ends_with(is_inline_space) {
            rest = rest.trim_start_matches(is_inline_space);
        }
    }
    cleaned.push_str(rest);

    let trimmed = cleaned.trim();
    let cleaned_text = if trimmed.is_empty() {
        PLACEHOLDER_TEXT.to_string()
    } else {
        trimmed.to_string()
    };

    Extraction {
        cleaned_text,
        markers,
    }
}

fn is_inline_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_marker_in_middle_collapses_spacing() {
        let out = extract("Hello [happy] world");
        assert_eq!(out.cleaned_text, "Hello world");
        assert_eq!(out.markers, vec!["happy"]);
    }

    #[test]
    fn test_marker_only_reply_uses_placeholder() {
        let out = extract("[F05]");
        assert_eq!(out.cleaned_text, PLACEHOLDER_TEXT);
        assert_eq!(out.markers, vec!["F05"]);
    }

    #[test]
    fn test_no_markers_returns_trimmed_text() {
        let out = extract("  no markers here \n");
        assert_eq!(out.cleaned_text, "no markers here");
        assert!(out.markers.is_empty());
    }

    #[test]
    fn test_multiple_markers_in_order_and_trimmed() {
        let out = extract("[ F03 ]Hmph.[angry] Fine [  shy ]");
        assert_eq!(out.cleaned_text, "Hmph. Fine");
        assert_eq!(out.markers, vec!["F03", "angry", "shy"]);
    }

    #[test]
    fn test_leading_marker_is_stripped() {
        let out = extract("[F05] 今天很开心!");
        assert_eq!(out.cleaned_text, "今天很开心!");
        assert_eq!(out.markers, vec!["F05"]);
    }

    #[test]
    fn test_unmatched_bracket_is_literal() {
        let out = extract("look [here and there");
        assert_eq!(out.cleaned_text, "look [here and there");
        assert!(out.markers.is_empty());
    }

    #[test]
    fn test_brackets_do_not_nest() {
        let out = extract("a [b [F02] c] d");
        assert_eq!(out.cleaned_text, "a [b c] d");
        assert_eq!(out.markers, vec!["F02"]);
    }

    #[test]
    fn test_empty_marker_is_removed_without_marker() {
        let out = extract("hi [] there [   ]");
        assert_eq!(out.cleaned_text, "hi there");
        assert!(out.markers.is_empty());
    }

    #[test]
    fn test_newlines_are_kept() {
        let out = extract("line one [sad]\nline two");
        assert_eq!(out.cleaned_text, "line one \nline two");
        assert_eq!(out.markers, vec!["sad"]);
    }
}
