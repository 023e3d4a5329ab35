//! Atom (and anything else `feed-rs` understands) parsing.

use chrono::SecondsFormat;
use feed_rs::model::Entry;
use feed_rs::parser;

use super::{FeedEntry, ParsedFeed};

/// Parse raw bytes with [`feed_rs`].
pub fn parse(body: &[u8]) -> Result<ParsedFeed, parser::ParseFeedError> {
    let feed = parser::parse(body)?;

    let title = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty());

    let entries = feed.entries.into_iter().map(convert_entry).collect();

    Ok(ParsedFeed { title, entries })
}

fn convert_entry(entry: Entry) -> FeedEntry {
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();

    let id = Some(entry.id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| link.clone());

    let content = entry
        .content
        .and_then(|c| c.body)
        .or_else(|| entry.summary.map(|s| s.content))
        .unwrap_or_default();

    let updated = entry
        .updated
        .or(entry.published)
        .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default();

    FeedEntry {
        id,
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        link,
        content,
        updated,
    }
}
