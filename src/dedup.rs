use std::collections::HashSet;

use sqlx::{PgPool, Row};

use crate::normalize::CandidateItem;

/// Identities already claimed by persisted articles, plus anything accepted
/// earlier in the current batch. GUIDs and links are collected across every
/// feed; fingerprints only within the owning feed, since they are not unique
/// by construction beyond it.
#[derive(Debug, Default)]
pub struct SeenIdentities {
    guids: HashSet<String>,
    links: HashSet<String>,
    hashes: HashSet<String>,
}

/// One batched lookup per identity tier for the whole candidate set.
pub async fn load_seen(
    pool: &PgPool,
    feed_id: i64,
    items: &[CandidateItem],
) -> Result<SeenIdentities, sqlx::Error> {
    let guid_values = collect(items.iter().filter_map(|item| item.guid.clone()));
    let link_values = collect(items.iter().map(|item| item.link.clone()));
    let hash_values = collect(items.iter().filter_map(|item| item.content_hash.clone()));

    let mut seen = SeenIdentities::default();

    if !guid_values.is_empty() {
        let rows = sqlx::query("SELECT guid FROM articles WHERE guid = ANY($1)")
            .bind(&guid_values)
            .fetch_all(pool)
            .await?;
        for row in rows {
            seen.guids.insert(row.get::<String, _>("guid"));
        }
    }

    if !link_values.is_empty() {
        let rows = sqlx::query("SELECT link FROM articles WHERE link = ANY($1)")
            .bind(&link_values)
            .fetch_all(pool)
            .await?;
        for row in rows {
            seen.links.insert(row.get::<String, _>("link"));
        }
    }

    if !hash_values.is_empty() {
        let rows = sqlx::query(
            "SELECT content_hash FROM articles WHERE feed_id = $1 AND content_hash = ANY($2)",
        )
        .bind(feed_id)
        .bind(&hash_values)
        .fetch_all(pool)
        .await?;
        for row in rows {
            seen.hashes.insert(row.get::<String, _>("content_hash"));
        }
    }

    Ok(seen)
}

/// Keep the candidates that are genuinely new, in their original order.
///
/// Precedence per candidate: a known GUID wins, then a known link, then (for
/// guid-less candidates only) a known fingerprint. Accepted identities are
/// registered immediately so a document that repeats an item keeps only the
/// first occurrence.
pub fn filter_new(items: Vec<CandidateItem>, seen: &mut SeenIdentities) -> Vec<CandidateItem> {
    let mut accepted = Vec::new();

    for item in items {
        if let Some(guid) = &item.guid {
            if seen.guids.contains(guid) {
                continue;
            }
        }

        if seen.links.contains(&item.link) {
            continue;
        }

        if item.guid.is_none() {
            if let Some(hash) = &item.content_hash {
                if seen.hashes.contains(hash) {
                    continue;
                }
            }
        }

        if let Some(guid) = &item.guid {
            seen.guids.insert(guid.clone());
        }
        seen.links.insert(item.link.clone());
        if item.guid.is_none() {
            if let Some(hash) = &item.content_hash {
                seen.hashes.insert(hash.clone());
            }
        }

        accepted.push(item);
    }

    accepted
}

fn collect<I: IntoIterator<Item = String>>(values: I) -> Vec<String> {
    let unique: HashSet<String> = values.into_iter().collect();
    unique.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{SeenIdentities, filter_new};
    use crate::normalize::CandidateItem;

    fn item(guid: Option<&str>, link: &str, hash: Option<&str>) -> CandidateItem {
        CandidateItem {
            guid: guid.map(String::from),
            link: link.to_string(),
            title: link.to_string(),
            description: None,
            content: None,
            author: None,
            pub_date: None,
            pub_date_raw: None,
            content_hash: hash.map(String::from),
        }
    }

    fn seen(guids: &[&str], links: &[&str], hashes: &[&str]) -> SeenIdentities {
        SeenIdentities {
            guids: guids.iter().map(|s| s.to_string()).collect(),
            links: links.iter().map(|s| s.to_string()).collect(),
            hashes: hashes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn known_guids_are_skipped_even_with_a_fresh_link() {
        // guid collisions apply across feeds, so a cross-posted article with a
        // new link is still a duplicate
        let mut seen = seen(&["g1"], &[], &[]);
        let accepted = filter_new(vec![item(Some("g1"), "https://elsewhere/a", None)], &mut seen);
        assert!(accepted.is_empty());
    }

    #[test]
    fn known_links_are_skipped() {
        let mut seen = seen(&[], &["https://x/a"], &[]);
        let accepted = filter_new(vec![item(Some("new"), "https://x/a", None)], &mut seen);
        assert!(accepted.is_empty());
    }

    #[test]
    fn known_fingerprints_skip_guidless_candidates_only() {
        let mut seen = seen(&[], &[], &["abc123"]);

        let guidless = filter_new(vec![item(None, "https://x/a", Some("abc123"))], &mut seen);
        assert!(guidless.is_empty());

        // same fingerprint value, but a guid-bearing candidate never consults it
        let with_guid = filter_new(vec![item(Some("g9"), "https://x/b", Some("abc123"))], &mut seen);
        assert_eq!(with_guid.len(), 1);
    }

    #[test]
    fn second_cycle_with_identical_guidless_items_accepts_nothing() {
        let mut first_cycle = SeenIdentities::default();
        let accepted = filter_new(vec![item(None, "https://x/a", Some("h1"))], &mut first_cycle);
        assert_eq!(accepted.len(), 1);

        // next cycle: the store now knows the link and the fingerprint
        let mut second_cycle = seen(&[], &["https://x/a"], &["h1"]);
        let accepted = filter_new(vec![item(None, "https://x/a", Some("h1"))], &mut second_cycle);
        assert!(accepted.is_empty());
    }

    #[test]
    fn duplicates_within_one_batch_keep_the_first_occurrence() {
        let mut seen = SeenIdentities::default();
        let accepted = filter_new(
            vec![
                item(Some("g1"), "https://x/a", None),
                item(Some("g1"), "https://x/a-repost", None),
                item(None, "https://x/b", Some("h1")),
                item(None, "https://x/b-copy", Some("h1")),
            ],
            &mut seen,
        );

        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].link, "https://x/a");
        assert_eq!(accepted[1].link, "https://x/b");
    }

    #[test]
    fn accepted_items_preserve_document_order() {
        let mut seen = seen(&[], &["https://x/b"], &[]);
        let accepted = filter_new(
            vec![
                item(Some("g1"), "https://x/a", None),
                item(Some("g2"), "https://x/b", None),
                item(Some("g3"), "https://x/c", None),
            ],
            &mut seen,
        );

        let links: Vec<&str> = accepted.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, vec!["https://x/a", "https://x/c"]);
    }
}
