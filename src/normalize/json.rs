use serde_json::Value;

use super::{RawEntry, trimmed};

// JSON Feed documents are publisher-controlled blobs: every field access
// checks the shape before use, and anything non-string becomes absent.
pub(super) fn raw_entries(value: &Value) -> Vec<RawEntry> {
    let Some(items) = value.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| RawEntry {
            guid: scalar(item, "guid").or_else(|| scalar(item, "id")),
            link: scalar(item, "url").or_else(|| scalar(item, "external_url")),
            title: scalar(item, "title"),
            description: scalar(item, "summary").or_else(|| scalar(item, "content_text")),
            content: scalar(item, "content_html").or_else(|| scalar(item, "content_text")),
            author: author(item),
            pub_date: None,
            pub_date_raw: scalar(item, "date_published")
                .or_else(|| scalar(item, "published"))
                .or_else(|| scalar(item, "updated"))
                .or_else(|| scalar(item, "created")),
        })
        .collect()
}

pub(crate) fn scalar(item: &Value, key: &str) -> Option<String> {
    string_value(item.get(key)?)
}

// A scalar may arrive as a bare string or wrapped as {"value": "..."}.
fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => trimmed(s),
        Value::Object(map) => map.get("value").and_then(string_value),
        _ => None,
    }
}

fn author(item: &Value) -> Option<String> {
    if let Some(author) = item.get("author") {
        if let Some(direct) = string_value(author) {
            return Some(direct);
        }
        if let Some(name) = author.get("name").and_then(string_value) {
            return Some(name);
        }
    }

    if let Some(authors) = item.get("authors").and_then(Value::as_array) {
        if let Some(name) = authors.iter().find_map(|a| a.get("name").and_then(string_value)) {
            return Some(name);
        }
    }

    item.get("dc")
        .and_then(|dc| dc.get("creator"))
        .and_then(string_value)
}
