//! The entry type shared by every feed format.
//!
//! `FeedEntry` is what the channel processor deduplicates and fans out.
//! Each format module ([`super::rss`], [`super::atom`]) converts its native
//! items into `FeedEntry`s so the pipeline never needs to know which format
//! a feed was published in.

/// A single feed entry, normalised from any feed format.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FeedEntry {
    /// Stable identifier, used as the dedup and record key.
    ///
    /// For RSS this is the `<guid>` element (falling back to `<link>`); for
    /// Atom the entry `<id>`.  Empty when the feed supplied neither.
    pub id: String,

    /// Human-readable headline.
    pub title: String,

    /// URL to the full content.
    pub link: String,

    /// Raw HTML body.  May be empty.
    pub content: String,

    /// Last-updated timestamp exactly as the feed supplied it.
    pub updated: String,
}

impl FeedEntry {
    /// Whether this entry can take part in dedup at all.
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// The result of parsing one feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Feed-level title, when the document has one.
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_identifier_is_not_usable() {
        let entry = FeedEntry {
            id: "  ".into(),
            ..Default::default()
        };
        assert!(!entry.has_id());

        let entry = FeedEntry {
            id: "guid-1".into(),
            ..Default::default()
        };
        assert!(entry.has_id());
    }
}
