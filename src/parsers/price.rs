use once_cell::sync::Lazy;
use regex::Regex;

static NON_PRICE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\d,.]").expect("Invalid price regex"));

/// Parse heterogeneous marketplace price text into a numeric value.
///
/// Currency labels, symbols and every whitespace variant (including
/// non-breaking spaces) are stripped; commas are decimal marks. Prices are
/// quoted as whole currency units with a ",000" millime suffix, so
/// "1 244,000 DT" parses to 1244.0. When several dots remain after
/// unification, all but the last are thousands grouping. Returns `None`
/// instead of raising on anything that does not survive cleaning.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = NON_PRICE_CHARS.replace_all(text, "");
    if cleaned.is_empty() {
        return None;
    }

    let unified = cleaned.replace(',', ".");
    let dots = unified.matches('.').count();
    let numeric = if dots > 1 {
        // Keep only the last separator as the decimal mark
        let last = unified.rfind('.').unwrap_or(0);
        let mut s = String::with_capacity(unified.len());
        for (i, c) in unified.char_indices() {
            if c != '.' || i == last {
                s.push(c);
            }
        }
        s
    } else {
        unified
    };

    numeric.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_millime_suffix_as_whole_units() {
        assert_eq!(parse_price("1 244,000"), Some(1244.0));
        assert_eq!(parse_price("120,000"), Some(120.0));
        assert_eq!(parse_price("339"), Some(339.0));
    }

    #[test]
    fn strips_currency_labels_and_nbsp() {
        assert_eq!(parse_price("1\u{a0}244,000 DT"), Some(1244.0));
        assert_eq!(parse_price("249,900\u{202f}TND"), Some(249.9));
        assert_eq!(parse_price("€ 89,000"), Some(89.0));
    }

    #[test]
    fn grouped_dots_are_thousands() {
        assert_eq!(parse_price("1.244,000"), Some(1244.0));
    }

    #[test]
    fn unparseable_inputs_yield_none() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("Sur commande"), None);
        assert_eq!(parse_price("DT"), None);
    }
}
