/// Whether `text` contains `keyword`, comparing with Unicode lowercase on
/// both sides.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    text.to_lowercase().contains(&keyword.to_lowercase())
}
