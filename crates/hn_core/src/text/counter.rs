use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tokens containing any of these are left out of the tally.
const IGNORED_CHARS: &[char] = &['.', ',', ':', ';', '\'', '"', '`'];

/// Word frequencies ordered by descending count. Words with equal counts keep
/// the order in which they first appeared.
///
/// Serializes as a JSON object whose keys follow that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordCounts(Vec<(String, u32)>);

impl WordCounts {
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(word, count)| (word.as_str(), *count))
    }

    pub fn get(&self, word: &str) -> Option<u32> {
        self.0.iter().find(|(w, _)| w == word).map(|(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<(String, u32)> {
        self.0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// Counts whitespace-separated tokens, case-sensitively.
///
/// Coarser than [`super::Generalizer`]: there is no
/// lowercasing and any token carrying punctuation from `IGNORED_CHARS` is
/// skipped outright, so `"cat,"` never counts towards `"cat"`.
pub fn count_words(text: &str) -> WordCounts {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, u32)> = Vec::new();

    for word in text.split_whitespace() {
        if word.contains(IGNORED_CHARS) {
            continue;
        }
        match positions.get(word) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(word, counts.len());
                counts.push((word, 1));
            }
        }
    }

    // sort_by is stable, so ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    WordCounts(
        counts
            .into_iter()
            .map(|(word, count)| (word.to_string(), count))
            .collect(),
    )
}

impl Serialize for WordCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(word, count)| (word, count)))
    }
}

impl<'de> Deserialize<'de> for WordCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = WordCounts;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of words to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((word, count)) = map.next_entry::<String, u32>()? {
                    entries.push((word, count));
                }
                Ok(WordCounts(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_by_count() {
        let counts = count_words("cat dog cat bird cat dog");
        assert_eq!(
            counts.into_vec(),
            vec![
                ("cat".to_string(), 3),
                ("dog".to_string(), 2),
                ("bird".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let counts = count_words("zeta alpha mid alpha zeta");
        let words: Vec<_> = counts.iter().map(|(w, _)| w).collect();
        assert_eq!(words, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_punctuated_tokens_are_skipped() {
        let counts = count_words("cat, cat dog. it's `code` \"quoted\" key:value semi;colon");
        assert_eq!(counts.get("cat"), Some(1));
        assert_eq!(counts.get("cat,"), None);
        assert_eq!(counts.get("dog"), None);
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn test_case_sensitive() {
        let counts = count_words("Rust rust RUST rust");
        assert_eq!(counts.get("rust"), Some(2));
        assert_eq!(counts.get("Rust"), Some(1));
        assert_eq!(counts.get("RUST"), Some(1));
    }

    #[test]
    fn test_empty_input() {
        assert!(count_words("").is_empty());
        assert!(count_words(" . , ").is_empty());
    }

    #[test]
    fn test_json_keeps_order() {
        let counts = count_words("b a b c c c");
        let json = counts.to_json().unwrap();
        assert_eq!(json, r#"{"c":3,"b":2,"a":1}"#);
        assert_eq!(WordCounts::from_json(&json).unwrap(), counts);
    }
}
