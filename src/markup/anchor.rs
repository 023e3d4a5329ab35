//! Link handling for chat messages.
//!
//! Chat links use the `<href|text>` token.  Anchors without a usable target
//! degrade to their text, and anchors without any text (an icon or an SVG,
//! typically) borrow their `title` or `aria-label`.

use htmd::Element;

use super::{attr, Delimiters, Rule, LINK_END, LINK_START};

/// Converts `<a>` elements into `<href "title"|text>` tokens.
///
/// The token is emitted between link markers; the converter turns those into
/// a single space wherever the link would otherwise touch a neighbouring word.
pub struct AnchorRule;

impl Rule for AnchorRule {
    fn tags(&self) -> &[&'static str] {
        &["a"]
    }

    fn replace(&self, element: &Element<'_>, _: &Delimiters) -> Option<String> {
        // No target: not a link, keep whatever is inside.
        let href = match attr(element, "href").map(str::trim) {
            Some(href) if !href.is_empty() && href != "#" => href,
            _ => return Some(element.content.to_string()),
        };

        let title_attr = non_blank(attr(element, "title"));

        let mut text = escape_multiline(element.content);

        let title = title_attr
            .map(|t| format!(" \"{}\"", t.replace('\n', " ").replace('"', "\\\"")))
            .unwrap_or_default();

        if text.is_empty() {
            text = title_attr
                .or_else(|| non_blank(attr(element, "aria-label")))
                .unwrap_or_default()
                .to_string();
        }

        // Nothing a reader could click on.
        if text.is_empty() {
            return None;
        }

        Some(format!("{LINK_START}<{href}{title}|{text}>{LINK_END}"))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Trim, then turn every run of newlines into a backslash and one newline.
fn escape_multiline(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_break = false;
    for c in content.trim().chars() {
        if c == '\n' {
            if !in_break {
                out.push_str("\\\n");
            }
            in_break = true;
        } else {
            out.push(c);
            in_break = false;
        }
    }
    out
}
