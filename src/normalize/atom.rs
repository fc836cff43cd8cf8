use atom_syndication::{Entry, Feed as AtomFeed, Text};
use chrono::Utc;

use super::{RawEntry, trimmed};

pub(super) fn raw_entries(feed: &AtomFeed) -> Vec<RawEntry> {
    feed.entries()
        .iter()
        .map(|entry| {
            // published is optional in Atom; updated is mandatory
            let date = entry.published().copied().or_else(|| Some(*entry.updated()));

            RawEntry {
                guid: trimmed(entry.id()),
                link: entry_link(entry),
                title: text_value(entry.title()),
                description: entry.summary().and_then(text_value),
                content: entry.content().and_then(|c| c.value()).and_then(trimmed),
                author: entry.authors().iter().find_map(|person| trimmed(&person.name)),
                pub_date: date.map(|d| d.with_timezone(&Utc)),
                pub_date_raw: date.map(|d| d.to_rfc3339()),
            }
        })
        .collect()
}

// The alternate link is the article; self/enclosure/etc. point elsewhere.
// A link element with no rel attribute counts as an alternate, and the
// parser already fills in that default.
fn entry_link(entry: &Entry) -> Option<String> {
    entry
        .links()
        .iter()
        .find(|link| link.rel() == "alternate")
        .or_else(|| entry.links().iter().find(|link| !link.href().trim().is_empty()))
        .and_then(|link| trimmed(link.href()))
}

fn text_value(text: &Text) -> Option<String> {
    trimmed(&text.to_string())
}
