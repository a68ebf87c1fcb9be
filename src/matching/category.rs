use tracing::warn;

use crate::matching::similarity::partial_ratio;
use crate::models::Category;
use crate::parsers::normalize;

/// Assigns a category id to a free-text product name, searching only the
/// categories of one parent scope. Exact containment of a category name
/// inside the product name wins first; otherwise the best fuzzy score at or
/// above the threshold; otherwise the unassigned sentinel. Ties keep the
/// first-encountered category.
pub struct CategoryAssigner {
    fuzzy_threshold: f64,
    unassigned_sentinel: i64,
}

impl CategoryAssigner {
    pub fn new(fuzzy_threshold: f64, unassigned_sentinel: i64) -> Self {
        Self {
            fuzzy_threshold,
            unassigned_sentinel,
        }
    }

    pub fn assign(&self, candidate_name: &str, scope: &[&Category]) -> i64 {
        let name_key = normalize(candidate_name);
        if name_key.is_empty() || scope.is_empty() {
            return self.unassigned_sentinel;
        }

        // Containment first: the category name appears inside the product name.
        for category in scope {
            let cat_key = normalize(&category.name);
            if !cat_key.is_empty() && name_key.contains(cat_key.as_str()) {
                return category.id;
            }
        }

        // Fuzzy fallback, best score wins, first-encountered on ties.
        let mut best_id = self.unassigned_sentinel;
        let mut best_score = 0.0_f64;
        for category in scope {
            let cat_key = normalize(&category.name);
            if cat_key.is_empty() {
                continue;
            }
            let score = partial_ratio(&name_key, &cat_key);
            if score > best_score {
                best_id = category.id;
                best_score = score;
            }
        }

        if best_score >= self.fuzzy_threshold {
            best_id
        } else {
            warn!(
                name = %candidate_name,
                best_score,
                "no category resolved, falling back to sentinel"
            );
            self.unassigned_sentinel
        }
    }
}
