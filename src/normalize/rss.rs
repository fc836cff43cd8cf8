use rss::Channel;

use super::{RawEntry, trimmed};

// Covers both RSS 2.0 documents and RSS 1.0 (rdf:RDF) documents; the parser
// reads either into the same channel model.
pub(super) fn raw_entries(channel: &Channel) -> Vec<RawEntry> {
    channel
        .items()
        .iter()
        .map(|item| {
            let author = item
                .author()
                .and_then(trimmed)
                .or_else(|| dublin_core_creator(item));

            let pub_date_raw = item
                .pub_date()
                .and_then(trimmed)
                .or_else(|| dublin_core_date(item));

            RawEntry {
                guid: item.guid().and_then(|g| trimmed(g.value())),
                link: item.link().and_then(trimmed),
                title: item.title().and_then(trimmed),
                description: item.description().and_then(trimmed),
                content: item.content().and_then(trimmed),
                author,
                pub_date: None,
                pub_date_raw,
            }
        })
        .collect()
}

fn dublin_core_creator(item: &rss::Item) -> Option<String> {
    item.dublin_core_ext()
        .and_then(|dc| dc.creators().first())
        .and_then(|creator| trimmed(creator))
}

fn dublin_core_date(item: &rss::Item) -> Option<String> {
    item.dublin_core_ext()
        .and_then(|dc| dc.dates().first())
        .and_then(|date| trimmed(date))
}

#[cfg(test)]
mod tests {
    use crate::normalize::candidates;
    use crate::parse::{ParserInput, parse_feed};
    use std::fs;

    #[test]
    fn it_normalizes_rss_items() {
        let xml = fs::read_to_string("./tests/support/rss_feed_example.xml").unwrap();
        let parsed = parse_feed(ParserInput::Text(&xml)).unwrap();

        let items = candidates(&parsed, "https://news.example.org/rss.xml");

        assert_eq!(items.len(), 3);

        let first = &items[0];
        assert_eq!(first.guid.as_deref(), Some("https://news.example.org/articles/solar-sail"));
        assert_eq!(first.link, "https://news.example.org/articles/solar-sail");
        assert_eq!(first.title, "Solar Sail Probe Clears Lunar Orbit");
        assert_eq!(first.author.as_deref(), Some("editor@news.example.org (M. Okafor)"));
        assert!(first.description.is_some());
        assert!(first.pub_date.is_some());
        // guid present, so no fingerprint
        assert!(first.content_hash.is_none());
    }

    #[test]
    fn content_encoded_is_picked_up() {
        let xml = fs::read_to_string("./tests/support/rss_feed_example.xml").unwrap();
        let parsed = parse_feed(ParserInput::Text(&xml)).unwrap();

        let items = candidates(&parsed, "https://news.example.org/rss.xml");

        assert!(items[0].content.as_deref().unwrap().contains("<p>"));
    }

    #[test]
    fn guidless_items_get_a_fingerprint_and_dc_fallbacks_apply() {
        let xml = fs::read_to_string("./tests/support/rss_feed_example.xml").unwrap();
        let parsed = parse_feed(ParserInput::Text(&xml)).unwrap();

        let items = candidates(&parsed, "https://news.example.org/rss.xml");

        // third item has no guid, no author, no pubDate; dc:creator and
        // dc:date stand in, and a fingerprint is computed
        let third = &items[2];
        assert!(third.guid.is_none());
        assert_eq!(third.author.as_deref(), Some("R. Devi"));
        assert!(third.pub_date.is_some());
        assert_eq!(third.content_hash.as_deref().map(str::len), Some(16));
    }

    #[test]
    fn relative_item_links_resolve_against_the_feed_url() {
        let xml = fs::read_to_string("./tests/support/rss_feed_example.xml").unwrap();
        let parsed = parse_feed(ParserInput::Text(&xml)).unwrap();

        let items = candidates(&parsed, "https://news.example.org/rss.xml");

        // second item uses a relative link in the document
        assert_eq!(items[1].link, "https://news.example.org/articles/tidal-battery");
    }
}
