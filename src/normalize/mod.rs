use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::fingerprint;
use crate::parse::{FeedDocument, ParsedFeed};

mod atom;
mod json;
mod rss;

pub(crate) use json::scalar as json_scalar;

/// A normalized, not-yet-deduplicated feed entry. The link is always present;
/// entries that cannot derive one are discarded during normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    pub guid: Option<String>,
    pub link: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    pub pub_date_raw: Option<String>,
    pub content_hash: Option<String>,
}

// Fields pulled out of one raw entry before the shared resolution rules run.
#[derive(Debug, Default)]
struct RawEntry {
    guid: Option<String>,
    link: Option<String>,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    author: Option<String>,
    pub_date: Option<DateTime<Utc>>,
    pub_date_raw: Option<String>,
}

/// Convert a parsed feed document into candidate items, in document order.
///
/// Shared rules across formats: links resolve against the feed URL, a missing
/// link falls back to a guid-derived pseudo-link, entries with neither are
/// dropped, titles fall back to the link, and guid-less entries get a content
/// fingerprint.
pub fn candidates(parsed: &ParsedFeed, feed_url: &str) -> Vec<CandidateItem> {
    let raw_entries = match &parsed.document {
        FeedDocument::Rss(channel) => rss::raw_entries(channel),
        FeedDocument::Atom(feed) => atom::raw_entries(feed),
        FeedDocument::Json(value) => json::raw_entries(value),
    };

    let mut items = Vec::with_capacity(raw_entries.len());

    for raw in raw_entries {
        let Some(link) = resolve_link(raw.link.as_deref(), feed_url, raw.guid.as_deref()) else {
            // no link and no guid: nothing to dedup on or display
            continue;
        };

        let title = raw.title.unwrap_or_else(|| link.clone());
        let pub_date = raw
            .pub_date
            .or_else(|| raw.pub_date_raw.as_deref().and_then(parse_date));

        // A guid is the stronger identity; fingerprints only back up its absence.
        let content_hash = match raw.guid {
            Some(_) => None,
            None => Some(fingerprint::content_hash(
                &title,
                raw.description.as_deref(),
                raw.pub_date_raw.as_deref(),
            )),
        };

        items.push(CandidateItem {
            guid: raw.guid,
            link,
            title,
            description: raw.description,
            content: raw.content,
            author: raw.author,
            pub_date,
            pub_date_raw: raw.pub_date_raw,
            content_hash,
        });
    }

    items
}

/// Resolve a raw link against the feed URL. Unresolvable links are kept
/// verbatim; a missing link synthesizes a stable pseudo-link from the guid.
fn resolve_link(link: Option<&str>, feed_url: &str, guid: Option<&str>) -> Option<String> {
    if let Some(raw) = link {
        let raw = raw.trim();
        if !raw.is_empty() {
            let base = Url::parse(feed_url).ok();
            return Some(match Url::options().base_url(base.as_ref()).parse(raw) {
                Ok(resolved) => resolved.to_string(),
                Err(_) => raw.to_string(),
            });
        }
    }

    let guid = guid?;
    let base = feed_url.split('#').next().unwrap_or(feed_url);
    Some(format!(
        "{}#guid={}",
        base,
        utf8_percent_encode(guid, NON_ALPHANUMERIC)
    ))
}

// Publishers spell dates every which way; an unparseable one is simply absent.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(ndt, Utc));
    }
    if let Ok(nd) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return nd
            .and_hms_opt(0, 0, 0)
            .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc));
    }
    None
}

// Every scalar pulled from a feed goes through here: trim, and treat an
// empty result as absent.
fn trimmed(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::{candidates, parse_date, resolve_link};
    use crate::parse::{ParserInput, parse_feed};
    use serde_json::json;

    #[test]
    fn absolute_links_pass_through() {
        let link = resolve_link(Some("https://example.org/post/1"), "https://example.org/feed.xml", None);
        assert_eq!(link.as_deref(), Some("https://example.org/post/1"));
    }

    #[test]
    fn relative_links_resolve_against_the_feed_url() {
        let link = resolve_link(Some("/post/1"), "https://example.org/feed.xml", None);
        assert_eq!(link.as_deref(), Some("https://example.org/post/1"));
    }

    #[test]
    fn unresolvable_links_are_kept_verbatim() {
        // relative link with an unparseable base: nothing to resolve against
        let link = resolve_link(Some("post/1"), "not a url", None);
        assert_eq!(link.as_deref(), Some("post/1"));
    }

    #[test]
    fn missing_link_with_guid_synthesizes_a_pseudo_link() {
        let link = resolve_link(None, "https://x/feed#old", Some("g1"));
        assert_eq!(link.as_deref(), Some("https://x/feed#guid=g1"));
    }

    #[test]
    fn pseudo_link_guid_is_percent_encoded() {
        let link = resolve_link(None, "https://x/feed", Some("a b/c"));
        assert_eq!(link.as_deref(), Some("https://x/feed#guid=a%20b%2Fc"));
    }

    #[test]
    fn whitespace_only_link_counts_as_missing() {
        let link = resolve_link(Some("   "), "https://x/feed", Some("g1"));
        assert_eq!(link.as_deref(), Some("https://x/feed#guid=g1"));
    }

    #[test]
    fn no_link_and_no_guid_yields_nothing() {
        assert_eq!(resolve_link(None, "https://x/feed", None), None);
        assert_eq!(resolve_link(Some(""), "https://x/feed", None), None);
    }

    #[test]
    fn entries_without_identity_are_dropped() {
        let parsed = parse_feed(ParserInput::Json(json!({
            "version": "https://jsonfeed.org/version/1.1",
            "items": [
                {"title": "no identity at all"},
                {"id": "kept", "url": "https://example.org/kept"}
            ]
        })))
        .unwrap();

        let items = candidates(&parsed, "https://example.org/feed.json");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid.as_deref(), Some("kept"));
    }

    #[test]
    fn title_falls_back_to_the_resolved_link() {
        let parsed = parse_feed(ParserInput::Json(json!({
            "items": [{"url": "https://example.org/untitled"}]
        })))
        .unwrap();

        let items = candidates(&parsed, "https://example.org/feed.json");

        assert_eq!(items[0].title, "https://example.org/untitled");
    }

    #[test]
    fn fingerprint_is_computed_only_without_a_guid() {
        let parsed = parse_feed(ParserInput::Json(json!({
            "items": [
                {"id": "g1", "url": "https://example.org/a", "title": "A"},
                {"url": "https://example.org/b", "title": "B"}
            ]
        })))
        .unwrap();

        let items = candidates(&parsed, "https://example.org/feed.json");

        assert!(items[0].content_hash.is_none());
        let hash = items[1].content_hash.as_deref().unwrap();
        assert_eq!(hash.len(), 16);
    }

    #[test]
    fn it_parses_rfc2822_and_rfc3339_dates() {
        assert!(parse_date("Tue, 12 May 2020 16:08:48 GMT").is_some());
        assert!(parse_date("2020-05-29T23:30:03Z").is_some());
        assert!(parse_date("2020-05-29 23:30:03").is_some());
        assert!(parse_date("2020-05-29").is_some());
        assert!(parse_date("next Tuesday-ish").is_none());
    }
}
