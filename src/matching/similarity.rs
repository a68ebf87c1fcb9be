use strsim::normalized_levenshtein;

/// Edit similarity of two whole strings on a 0-100 scale.
pub fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b) * 100.0
}

/// Best-aligning substring edit similarity, 0-100: the shorter string is slid
/// over every same-length window of the longer one and the best window score
/// wins. Mirrors the partial-ratio measure the matching thresholds were tuned
/// against.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if short.len() == long.len() {
        return ratio(a, b);
    }

    let needle: String = short.iter().collect();
    let mut best = 0.0_f64;
    for window in long.windows(short.len()) {
        let haystack: String = window.iter().collect();
        let score = ratio(&needle, &haystack);
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(ratio("mg2541s", "mg2541s"), 100.0);
        assert_eq!(partial_ratio("mg2541s", "mg2541s"), 100.0);
    }

    #[test]
    fn contained_substring_scores_100() {
        assert_eq!(partial_ratio("pixma", "canon pixma ts3340"), 100.0);
    }

    #[test]
    fn near_miss_scores_high_but_not_100() {
        let score = partial_ratio("MG2541S", "MG2540S");
        assert!(score >= 85.0 && score < 100.0, "score = {score}");
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(partial_ratio("onduleur", "scanner") < 50.0);
    }

    #[test]
    fn empty_operand_scores_zero() {
        assert_eq!(partial_ratio("", "abc"), 0.0);
        assert_eq!(partial_ratio("abc", ""), 0.0);
    }
}
