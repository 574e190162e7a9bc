//! Content hashing: dataset identity and embedding cache keys.
//!
//! The dataset hash covers only the ordered `(a_item_id, b_item_id, label)`
//! triples. Metric values are deliberately excluded so that re-running
//! feature extraction does not invalidate a trained model's applicability.

use ring::digest::{Context, SHA256, digest};

/// SHA-256 over ordered pair-identity triples, lowercase hex.
pub fn dataset_hash<'a, I>(triples: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str, i8)>,
{
    let mut ctx = Context::new(&SHA256);
    for (a, b, label) in triples {
        ctx.update(a.as_bytes());
        ctx.update(b"|");
        ctx.update(b.as_bytes());
        ctx.update(b"|");
        ctx.update(label.to_string().as_bytes());
        ctx.update(b"\n");
    }
    hex(ctx.finish().as_ref())
}

/// SHA-256 of a text snippet, lowercase hex. Cache key for embeddings.
pub fn text_hash(text: &str) -> String {
    hex(digest(&SHA256, text.as_bytes()).as_ref())
}

/// First eight digest bytes of a text snippet as a u64 seed.
pub fn seed64(text: &str) -> u64 {
    let d = digest(&SHA256, text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&d.as_ref()[..8]);
    u64::from_be_bytes(bytes)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_hash_is_stable() {
        let triples = [("a", "b", 1i8), ("b", "c", -1), ("c", "a", 0)];
        let h1 = dataset_hash(triples.iter().copied());
        let h2 = dataset_hash(triples.iter().copied());
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn label_change_changes_hash() {
        let base = dataset_hash([("a", "b", 1i8)]);
        let flipped = dataset_hash([("a", "b", -1i8)]);
        assert_ne!(base, flipped);
    }

    #[test]
    fn order_matters() {
        let ab = dataset_hash([("a", "b", 1i8), ("c", "d", 1)]);
        let ba = dataset_hash([("c", "d", 1i8), ("a", "b", 1)]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn identity_change_changes_hash() {
        assert_ne!(dataset_hash([("a", "b", 1i8)]), dataset_hash([("a", "c", 1i8)]));
    }

    #[test]
    fn empty_set_hashes() {
        let empty: [(&str, &str, i8); 0] = [];
        assert_eq!(dataset_hash(empty).len(), 64);
    }

    #[test]
    fn text_hash_deterministic_and_distinct() {
        assert_eq!(text_hash("hello"), text_hash("hello"));
        assert_ne!(text_hash("hello"), text_hash("world"));
    }

    #[test]
    fn seed64_deterministic() {
        assert_eq!(seed64("abc"), seed64("abc"));
        assert_ne!(seed64("abc"), seed64("abd"));
    }
}
