use sha2::{Digest, Sha256};

/// Short enough to index cheaply; collisions across unrelated articles in one
/// feed stay negligible at this length.
pub const FINGERPRINT_LEN: usize = 16;

/// Fallback identity for items that carry no GUID: a truncated SHA-256 over
/// the title, description, and the publish date exactly as the feed spelled it.
pub fn content_hash(title: &str, description: Option<&str>, pub_date_raw: Option<&str>) -> String {
    let input = format!(
        "{}|{}|{}",
        title,
        description.unwrap_or(""),
        pub_date_raw.unwrap_or("")
    );
    let mut hex = format!("{:x}", Sha256::digest(input.as_bytes()));
    hex.truncate(FINGERPRINT_LEN);
    hex
}
