//! RSS 2.0 parsing.
//!
//! Uses the [`rss`] crate.  Documents that are not RSS 2.0 fail here and are
//! handed to [`super::atom`] instead.

use super::{FeedEntry, ParsedFeed};

/// Parse raw bytes as an RSS 2.0 channel.
pub fn parse(body: &[u8]) -> Result<ParsedFeed, rss::Error> {
    let channel = rss::Channel::read_from(body)?;
    Ok(parse_channel(&channel))
}

/// Convert an already-parsed [`rss::Channel`] into a [`ParsedFeed`].
///
/// Pure function (no I/O) so tests can exercise the mapping directly.
pub fn parse_channel(channel: &rss::Channel) -> ParsedFeed {
    let entries = channel
        .items()
        .iter()
        .map(|item| {
            // Prefer <guid>, fall back to <link>, then empty string.
            let id = item
                .guid()
                .map(|g| g.value().trim().to_string())
                .filter(|g| !g.is_empty())
                .or_else(|| item.link().map(|l| l.trim().to_string()))
                .unwrap_or_default();

            // content:encoded carries the full body when present.
            let content = item
                .content()
                .or_else(|| item.description())
                .unwrap_or_default()
                .to_string();

            FeedEntry {
                id,
                title: item.title().unwrap_or_default().to_string(),
                link: item.link().unwrap_or_default().to_string(),
                content,
                updated: item.pub_date().unwrap_or_default().to_string(),
            }
        })
        .collect();

    let title = Some(channel.title().trim().to_string()).filter(|t| !t.is_empty());

    ParsedFeed { title, entries }
}
