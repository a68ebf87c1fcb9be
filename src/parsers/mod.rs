pub mod normalize;
pub mod price;

pub use normalize::*;
pub use price::*;

use html_escape::decode_html_entities;

/// Clean scraped text by decoding HTML entities and collapsing whitespace
pub fn clean_text(text: &str) -> String {
    let decoded = decode_html_entities(text);
    decoded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clean_text_collapses_whitespace_and_entities() {
        assert_eq!(
            clean_text("  Imprimante&nbsp;CANON \n PIXMA  "),
            "Imprimante CANON PIXMA"
        );
    }
}
