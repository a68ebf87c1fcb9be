use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9 ]+").expect("Invalid normalize regex"));

/// Canonicalize a free-text name into a comparable key: ASCII transliteration,
/// lowercase, every run outside `[a-z0-9 ]` becomes a single space, whitespace
/// collapsed. Empty input stays empty. Idempotent.
pub fn normalize(text: &str) -> String {
    let ascii = deunicode(text).to_lowercase();
    let spaced = NON_ALNUM_RUN.replace_all(&ascii, " ");
    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stricter variant for SKU-style references: uppercase ASCII letters and
/// digits only, all whitespace and punctuation removed.
pub fn normalize_reference(text: &str) -> String {
    deunicode(text)
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_strips_accents_and_punctuation() {
        assert_eq!(
            normalize("Vidéoprojecteur ÉPSON — EB-X49 !"),
            "videoprojecteur epson eb x49"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        for s in [
            "Téléphone Fixe",
            "  PC   Portable (Gamer) ",
            "",
            "déjà-vu 2000",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn normalize_empty_yields_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  --- "), "");
    }

    #[test]
    fn reference_form_drops_all_separators() {
        assert_eq!(normalize_reference("MG-2541-S"), "MG2541S");
        assert_eq!(normalize_reference("mg 2541/s"), "MG2541S");
        assert_eq!(normalize_reference("Réf. 00123"), "REF00123");
    }
}
