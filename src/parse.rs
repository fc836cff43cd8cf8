use std::str::FromStr;

use anyhow::{Result, anyhow};
use atom_syndication::Feed as AtomFeed;
use rss::Channel;
use serde_json::Value;

/// Wire formats this reader understands. RSS 1.0 documents (rdf:RDF root)
/// keep their own tag even though they share the RSS item model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
    Rdf,
    Json,
}

impl FeedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Atom => "atom",
            FeedFormat::Rdf => "rdf",
            FeedFormat::Json => "json",
        }
    }
}

#[derive(Debug)]
pub enum FeedDocument {
    Rss(Box<Channel>),
    Atom(Box<AtomFeed>),
    Json(Value),
}

#[derive(Debug)]
pub struct ParsedFeed {
    pub format: FeedFormat,
    pub document: FeedDocument,
}

pub enum ParserInput<'a> {
    Text(&'a str),
    Json(Value),
}

/// Detect the document format and parse it. JSON bodies arrive already
/// structurally parsed; XML bodies are dispatched on their root element.
pub fn parse_feed(input: ParserInput) -> Result<ParsedFeed> {
    match input {
        ParserInput::Json(value) => Ok(ParsedFeed {
            format: FeedFormat::Json,
            document: FeedDocument::Json(value),
        }),
        ParserInput::Text(text) => parse_xml(text),
    }
}

fn parse_xml(text: &str) -> Result<ParsedFeed> {
    let root = root_element(text).ok_or_else(|| anyhow!("no recognizable feed root element"))?;

    match root.as_str() {
        "feed" => {
            let feed = AtomFeed::from_str(text)?;
            Ok(ParsedFeed {
                format: FeedFormat::Atom,
                document: FeedDocument::Atom(Box::new(feed)),
            })
        }
        "rdf:RDF" | "RDF" => {
            let channel = Channel::from_str(text)?;
            Ok(ParsedFeed {
                format: FeedFormat::Rdf,
                document: FeedDocument::Rss(Box::new(channel)),
            })
        }
        "rss" => {
            let channel = Channel::from_str(text)?;
            Ok(ParsedFeed {
                format: FeedFormat::Rss,
                document: FeedDocument::Rss(Box::new(channel)),
            })
        }
        other => Err(anyhow!("unsupported feed root element <{}>", other)),
    }
}

// First element name after any prolog, comments, and doctype.
fn root_element(text: &str) -> Option<String> {
    let mut rest = text;
    loop {
        let start = rest.find('<')?;
        let after = &rest[start + 1..];
        if after.starts_with('?') {
            let end = after.find("?>")?;
            rest = &after[end + 2..];
        } else if after.starts_with("!--") {
            let end = after.find("-->")?;
            rest = &after[end + 3..];
        } else if after.starts_with('!') {
            let end = after.find('>')?;
            rest = &after[end + 1..];
        } else {
            let name: String = after
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
                .collect();
            return if name.is_empty() { None } else { Some(name) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FeedDocument, FeedFormat, ParserInput, parse_feed, root_element};
    use serde_json::json;
    use std::fs;

    #[test]
    fn it_detects_rss_documents() {
        let xml = fs::read_to_string("./tests/support/rss_feed_example.xml").unwrap();
        let parsed = parse_feed(ParserInput::Text(&xml)).unwrap();

        assert_eq!(parsed.format, FeedFormat::Rss);
        assert!(matches!(parsed.document, FeedDocument::Rss(_)));
    }

    #[test]
    fn it_detects_atom_documents() {
        let xml = fs::read_to_string("./tests/support/atom_feed_example.xml").unwrap();
        let parsed = parse_feed(ParserInput::Text(&xml)).unwrap();

        assert_eq!(parsed.format, FeedFormat::Atom);
        assert!(matches!(parsed.document, FeedDocument::Atom(_)));
    }

    #[test]
    fn it_detects_rdf_documents_and_reads_them_as_rss() {
        let xml = fs::read_to_string("./tests/support/rdf_feed_example.xml").unwrap();
        let parsed = parse_feed(ParserInput::Text(&xml)).unwrap();

        assert_eq!(parsed.format, FeedFormat::Rdf);
        assert!(matches!(parsed.document, FeedDocument::Rss(_)));
    }

    #[test]
    fn json_input_is_tagged_json() {
        let parsed = parse_feed(ParserInput::Json(json!({"items": []}))).unwrap();

        assert_eq!(parsed.format, FeedFormat::Json);
        assert_eq!(parsed.format.as_str(), "json");
    }

    #[test]
    fn it_skips_prolog_comments_and_doctype() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- a comment -->\n<!DOCTYPE weird>\n<rss version=\"2.0\"><channel><title>t</title><link>l</link><description>d</description></channel></rss>";
        assert_eq!(root_element(xml).as_deref(), Some("rss"));

        let parsed = parse_feed(ParserInput::Text(xml)).unwrap();
        assert_eq!(parsed.format, FeedFormat::Rss);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(parse_feed(ParserInput::Text("not a feed at all")).is_err());
        assert!(parse_feed(ParserInput::Text("<html><body>nope</body></html>")).is_err());
    }
}
