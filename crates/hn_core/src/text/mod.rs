//! Text processing applied to scraped descriptions.

mod counter;
mod filter;
mod search;
mod stopwords;

pub use counter::{count_words, WordCounts};
pub use filter::Generalizer;
pub use search::contains_keyword;
pub use stopwords::StopWords;
