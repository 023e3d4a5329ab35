//! HTML to chat markup conversion.
//!
//! [`htmd`] does the general HTML to Markdown work.  On top of it the
//! [`Converter`] registers a handful of [`Rule`]s for the places where chat
//! markup differs from Markdown: single-character emphasis delimiters,
//! headings rendered as bold lines, images and links as `<url|text>` tokens.
//!
//! [`chat_converter`] builds the converter used for webhook messages: the
//! chat rules plus the [`AnchorRule`] link policy.
//!
//! ## For contributors: adding a rule
//!
//! Implement [`Rule`] and register it with [`Converter::with_rule`].  The
//! `element.content` a rule receives is the already-converted markup of the
//! element's children.  A rule registered later wins over an earlier one for
//! the same tag.

mod anchor;

pub use anchor::AnchorRule;

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use htmd::options::{BulletListMarker, Options};
use htmd::{Element, HtmlToMarkdown};
use scraper::Html;

use crate::error::TransformError;

/// Maximum element nesting accepted before conversion.
pub const MAX_DEPTH: usize = 512;

/// Elements whose content never reaches the message.
const DROPPED_TAGS: &[&str] = &["script", "style", "head", "noscript", "template"];

// Private-use markers.  Links are emitted between LINK_START and LINK_END so
// spacing can be decided once the surrounding text is known; NBSP stands in
// for non-breaking spaces while htmd normalizes whitespace.
const LINK_START: char = '\u{E000}';
const LINK_END: char = '\u{E001}';
const NBSP: char = '\u{E002}';

/// Inline delimiters used by the chat rules.
#[derive(Debug, Clone)]
pub struct Delimiters {
    pub strong: &'static str,
    pub em: &'static str,
    pub strike: &'static str,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            strong: "*",
            em: "_",
            strike: "~",
        }
    }
}

/// Converts one element given its already-converted content.
///
/// Returning `None` drops the element from the output entirely.
pub trait Rule: Send + Sync {
    /// Tags (lower-case local names) this rule handles.
    fn tags(&self) -> &[&'static str];

    fn replace(&self, element: &Element<'_>, delimiters: &Delimiters) -> Option<String>;
}

/// HTML to chat markup converter.
///
/// Holds only the rule set; the underlying `htmd` converter is built per
/// call, so a `Converter` can be shared between tasks.
pub struct Converter {
    delimiters: Delimiters,
    rules: Vec<Arc<dyn Rule>>,
}

impl Converter {
    /// A converter with the chat rules for emphasis, headings and images.
    pub fn new(delimiters: Delimiters) -> Self {
        Self {
            delimiters,
            rules: vec![Arc::new(Emphasis), Arc::new(Heading), Arc::new(Image)],
        }
    }

    /// Register a rule.  Later rules win over earlier ones for the same tag.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn convert(&self, html: &str) -> Result<String, TransformError> {
        check_depth(html)?;

        // Feed HTML is untrusted; a panic inside htmd fails this item only.
        let input = protect(html);
        let raw = panic::catch_unwind(AssertUnwindSafe(|| self.build().convert(&input)))
            .map_err(|_| TransformError::Panicked)??;
        let spaced = place_link_spacing(&raw);
        Ok(normalize(&spaced).replace(NBSP, "\u{a0}"))
    }

    fn build(&self) -> HtmlToMarkdown {
        let mut by_tag: HashMap<&'static str, Arc<dyn Rule>> = HashMap::new();
        for rule in &self.rules {
            for tag in rule.tags() {
                by_tag.insert(*tag, Arc::clone(rule));
            }
        }

        let mut builder = HtmlToMarkdown::builder()
            .options(Options {
                bullet_list_marker: BulletListMarker::Dash,
                ..Default::default()
            })
            .skip_tags(DROPPED_TAGS.to_vec());

        for (tag, rule) in by_tag {
            let delimiters = self.delimiters.clone();
            builder = builder.add_handler(vec![tag], move |element: Element| {
                rule.replace(&element, &delimiters)
            });
        }

        builder.build()
    }
}

/// The converter used for chat messages.
pub fn chat_converter() -> Converter {
    Converter::new(Delimiters::default()).with_rule(AnchorRule)
}

/// Convert an HTML body to chat markup with [`chat_converter`].
pub fn html_to_markdown(html: &str) -> Result<String, TransformError> {
    chat_converter().convert(html)
}

/// `*bold*`, `_italic_` and `~struck~`, keeping the whitespace around the
/// content outside the delimiters.
struct Emphasis;

impl Rule for Emphasis {
    fn tags(&self) -> &[&'static str] {
        &["strong", "b", "em", "i", "s", "del", "strike"]
    }

    fn replace(&self, element: &Element<'_>, delimiters: &Delimiters) -> Option<String> {
        let delimiter = match element.tag {
            "strong" | "b" => delimiters.strong,
            "em" | "i" => delimiters.em,
            _ => delimiters.strike,
        };
        Some(wrap(element.content, delimiter))
    }
}

/// Chat has no headings; they become bold lines of their own.
struct Heading;

impl Rule for Heading {
    fn tags(&self) -> &[&'static str] {
        &["h1", "h2", "h3", "h4", "h5", "h6"]
    }

    fn replace(&self, element: &Element<'_>, delimiters: &Delimiters) -> Option<String> {
        let text = element.content.trim();
        if text.is_empty() {
            return None;
        }
        Some(format!("\n\n{0}{text}{0}\n\n", delimiters.strong))
    }
}

/// `<src|alt>`, or just the alt text when there is no source.
struct Image;

impl Rule for Image {
    fn tags(&self) -> &[&'static str] {
        &["img"]
    }

    fn replace(&self, element: &Element<'_>, _: &Delimiters) -> Option<String> {
        let alt = attr(element, "alt").map(str::trim).unwrap_or_default();
        match attr(element, "src").map(str::trim) {
            Some(src) if !src.is_empty() && alt.is_empty() => Some(format!("<{src}>")),
            Some(src) if !src.is_empty() => Some(format!("<{src}|{alt}>")),
            _ if !alt.is_empty() => Some(alt.to_string()),
            _ => None,
        }
    }
}

/// Value of the attribute `name`, if present.
fn attr<'a>(element: &'a Element<'_>, name: &str) -> Option<&'a str> {
    element
        .attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| &*a.value)
}

fn wrap(content: &str, delimiter: &str) -> String {
    let inner = content.trim();
    if inner.is_empty() {
        return content.to_string();
    }
    let lead = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{lead}{delimiter}{inner}{delimiter}{trail}")
}

/// Reject documents nested deeper than [`MAX_DEPTH`].
fn check_depth(html: &str) -> Result<(), TransformError> {
    let fragment = Html::parse_fragment(html);
    let too_deep = fragment
        .root_element()
        .descendants()
        .any(|node| node.ancestors().count() > MAX_DEPTH);

    if too_deep {
        return Err(TransformError::TooDeep { limit: MAX_DEPTH });
    }
    Ok(())
}

/// Drop stray markers from the input and shield non-breaking spaces.
fn protect(html: &str) -> String {
    let nbsp = NBSP.to_string();
    html.replace(|c: char| matches!(c, LINK_START | LINK_END | NBSP), "")
        .replace('\u{a0}', &nbsp)
        .replace("&nbsp;", &nbsp)
        .replace("&#160;", &nbsp)
        .replace("&#xa0;", &nbsp)
        .replace("&#xA0;", &nbsp)
}

/// Resolve link markers: a link gets a space on either side only where it
/// would otherwise touch a word.
fn place_link_spacing(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        match c {
            LINK_START => {
                if out.chars().next_back().is_some_and(touches_word) {
                    out.push(' ');
                }
            }
            LINK_END => {
                let next = chars[i + 1..]
                    .iter()
                    .copied()
                    .find(|c| !matches!(*c, LINK_START | LINK_END));
                if next.is_some_and(touches_word) {
                    out.push(' ');
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn touches_word(c: char) -> bool {
    !c.is_whitespace() && !c.is_ascii_punctuation() && c != NBSP
}

/// Trim trailing whitespace on every line, collapse blank-line runs to a
/// single blank line and trim the whole document.
fn normalize(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = false;

    for line in raw.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !blank_run && !lines.is_empty() {
                lines.push("");
            }
            blank_run = true;
        } else {
            lines.push(line);
            blank_run = false;
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n").trim_start().to_string()
}
