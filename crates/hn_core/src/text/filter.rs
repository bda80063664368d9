use unicode_segmentation::UnicodeSegmentation;

use super::StopWords;

/// Produces the generalized form of a description: the same text with stop
/// words removed.
#[derive(Debug, Clone, Default)]
pub struct Generalizer {
    stop_words: StopWords,
}

impl Generalizer {
    pub fn new(stop_words: StopWords) -> Self {
        Self { stop_words }
    }

    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }

    /// Tokenizes the text, drops stop words and joins what is left with
    /// single spaces.
    ///
    /// Punctuation is kept as standalone tokens, so `"fox, dog"` becomes
    /// `"fox , dog"`.
    pub fn generalize(&self, text: &str) -> String {
        tokenize(text)
            .into_iter()
            .filter(|token| !self.stop_words.contains(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Suffixes split off a word into their own token, `Google's` becoming
/// `Google` and `'s`.
const CLITICS: &[&str] = &[
    "n't", "'s", "'re", "'ve", "'ll", "'d", "'m",
    "n\u{2019}t", "\u{2019}s", "\u{2019}re", "\u{2019}ve", "\u{2019}ll", "\u{2019}d", "\u{2019}m",
];

fn is_word(segment: &str) -> bool {
    segment.chars().any(char::is_alphanumeric)
}

fn is_apostrophe(segment: &str) -> bool {
    segment == "'" || segment == "\u{2019}"
}

/// Splits on Unicode word boundaries (UAX #29), then regroups the segments
/// into tokens: hyphenated compounds stay whole and trailing clitics become
/// tokens of their own. Clitic tokens always use an ASCII apostrophe.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    let segments: Vec<&str> = text.split_word_bounds().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < segments.len() {
        let segment = segments[i];
        if segment.trim().is_empty() {
            i += 1;
            continue;
        }

        if is_word(segment) {
            let mut word = segment.to_string();
            while i + 2 < segments.len() && segments[i + 1] == "-" && is_word(segments[i + 2]) {
                word.push('-');
                word.push_str(segments[i + 2]);
                i += 2;
            }
            push_splitting_clitic(&mut tokens, word);
        } else if is_apostrophe(segment)
            && segments
                .get(i + 1)
                .is_some_and(|next| is_clitic(&format!("'{}", next)))
        {
            // An already separated clitic, as in generalized output
            tokens.push(format!("'{}", segments[i + 1]));
            i += 1;
        } else {
            tokens.push(segment.to_string());
        }
        i += 1;
    }

    tokens
}

fn is_clitic(token: &str) -> bool {
    CLITICS.iter().any(|clitic| token.eq_ignore_ascii_case(clitic))
}

fn push_splitting_clitic(tokens: &mut Vec<String>, word: String) {
    for clitic in CLITICS {
        if word.len() <= clitic.len() {
            continue;
        }
        let split = word.len() - clitic.len();
        if word.is_char_boundary(split) && word[split..].eq_ignore_ascii_case(clitic) {
            tokens.push(word[..split].to_string());
            tokens.push(word[split..].replace('\u{2019}', "'"));
            return;
        }
    }
    tokens.push(word);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_the() -> Generalizer {
        Generalizer::new(StopWords::new(["the"]))
    }

    #[test]
    fn test_removes_stop_words() {
        assert_eq!(only_the().generalize("the quick brown fox"), "quick brown fox");
    }

    #[test]
    fn test_empty_and_all_stop_words() {
        let generalizer = Generalizer::default();
        assert_eq!(generalizer.generalize(""), "");
        assert_eq!(generalizer.generalize("   "), "");
        assert_eq!(generalizer.generalize("The and of it"), "");
    }

    #[test]
    fn test_idempotent() {
        let generalizer = Generalizer::default();
        let once = generalizer.generalize(
            "Researchers have discovered a new botnet that is targeting the routers, again.",
        );
        assert_eq!(generalizer.generalize(&once), once);
    }

    #[test]
    fn test_punctuation_is_split_from_words() {
        let generalizer = Generalizer::default();
        assert_eq!(
            generalizer.generalize("The patch, released today, fixes it."),
            "patch , released today , fixes ."
        );
    }

    #[test]
    fn test_splits_negation_clitic() {
        let generalizer = Generalizer::default();
        assert_eq!(generalizer.generalize("Attackers don't wait"), "Attackers n't wait");
    }

    #[test]
    fn test_splits_possessives() {
        let generalizer = Generalizer::default();
        assert_eq!(
            generalizer.generalize("Google's patch and Apple\u{2019}s fix"),
            "Google 's patch Apple 's fix"
        );
        assert_eq!(tokenize("they're here, we'll see"), ["they", "'re", "here", ",", "we", "'ll", "see"]);
        assert_eq!(tokenize("O'Brien"), ["O'Brien"]);
    }

    #[test]
    fn test_keeps_hyphenated_words() {
        let generalizer = Generalizer::default();
        assert_eq!(
            generalizer.generalize("Google patches Chrome zero-day in the wild"),
            "Google patches Chrome zero-day wild"
        );
        assert_eq!(tokenize("state-of-the-art"), ["state-of-the-art"]);
        assert_eq!(tokenize("2024 - a year"), ["2024", "-", "a", "year"]);
    }

    #[test]
    fn test_clitic_output_is_stable() {
        let generalizer = Generalizer::default();
        let once = generalizer.generalize("Microsoft's zero-day wasn't patched");
        assert_eq!(once, "Microsoft 's zero-day n't patched");
        assert_eq!(generalizer.generalize(&once), once);
    }

    #[test]
    fn test_possessive_subject_is_counted() {
        let generalizer = Generalizer::default();
        let text = generalizer.generalize("Google's new patch fixes Google's zero-day bug");
        let counts = crate::count_words(&text);
        assert_eq!(counts.get("Google"), Some(2));
        assert_eq!(counts.get("zero-day"), Some(1));
        assert_eq!(counts.get("-"), None);
        assert_eq!(counts.get("'s"), None);
    }
}
