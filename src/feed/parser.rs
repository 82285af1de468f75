use chrono::{DateTime, Utc};
use feed_rs::parser::{Builder, ParseFeedError};

/// A feed document reduced to the fields the pipeline needs.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone)]
pub struct ParsedItem {
    pub guid: Option<String>,
    /// Empty when the item has no title; validation drops such items later
    pub title: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub summary: Option<String>,
}

/// Parses RSS or Atom bytes. Item order is preserved.
///
/// Items without an id in the document keep `guid: None`, so the store keys
/// them by link instead of by a synthesized hash.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseFeedError> {
    let parser = Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build();
    let feed = parser.parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .iter()
                .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
                .or_else(|| entry.links.first())
                .map(|l| l.href.clone());
            let published = entry.published.or(entry.updated);
            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default();
            let content = entry.content.and_then(|c| c.body);
            let summary = entry.summary.map(|s| s.content);
            let guid = Some(entry.id.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string);

            ParsedItem {
                guid,
                title,
                link,
                published,
                content,
                summary,
            }
        })
        .collect();

    Ok(ParsedFeed {
        title: feed.title.map(|t| t.content.trim().to_string()).filter(|t| !t.is_empty()),
        items,
    })
}
