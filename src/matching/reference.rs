use tracing::debug;

use crate::matching::similarity::partial_ratio;
use crate::models::{Catalog, CatalogEntry, Marketplace};
use crate::parsers::normalize_reference;

/// Numeric price-closeness gate used to corroborate non-exact reference
/// matches. False whenever either side is unknown; otherwise relative
/// difference against the larger operand. Symmetric.
pub fn prices_close(p1: Option<f64>, p2: Option<f64>, tolerance: f64) -> bool {
    match (p1, p2) {
        (Some(a), Some(b)) => {
            let max = a.max(b);
            max > 0.0 && (a - b).abs() / max <= tolerance
        }
        _ => false,
    }
}

/// Matches a candidate reference against a scope-restricted catalog subset.
///
/// Policy, first match in catalog order wins:
/// 1. exact equality of normalized references (authoritative, no price check);
/// 2. substring containment either direction, price-gated;
/// 3. fuzzy partial similarity at or above the threshold, price-gated.
///
/// Rules 2 and 3 are evaluated together in a single ordered scan after the
/// exact scan, so the earliest entry satisfying either wins over a later,
/// better-scoring one. That first-match behavior is load-bearing for merge
/// outcomes on ambiguous inputs and must not be replaced by best-match.
pub struct ReferenceMatcher {
    fuzzy_threshold: f64,
    price_tolerance: f64,
}

impl ReferenceMatcher {
    pub fn new(fuzzy_threshold: f64, price_tolerance: f64) -> Self {
        Self {
            fuzzy_threshold,
            price_tolerance,
        }
    }

    /// Returns the catalog index of the best entry per the policy above, or
    /// `None`. `subset` restricts the search to the candidate's category
    /// scope; `role` is the marketplace side the candidate would fill.
    pub fn find_match(
        &self,
        candidate_ref: &str,
        candidate_price: Option<f64>,
        role: Marketplace,
        catalog: &Catalog,
        subset: &[usize],
    ) -> Option<usize> {
        let needle = normalize_reference(candidate_ref);
        if needle.is_empty() {
            return None;
        }

        // Rule 1: exact normalized equality, no corroboration required.
        for &idx in subset {
            let entry = &catalog.entries[idx];
            if self.entry_keys(entry).any(|key| key == needle) {
                debug!(entry_id = entry.id, reference = %candidate_ref, "exact reference match");
                return Some(idx);
            }
        }

        // Rules 2 and 3: containment or fuzzy, both price-gated.
        for &idx in subset {
            let entry = &catalog.entries[idx];
            let hit = self.entry_keys(entry).any(|key| {
                key.contains(needle.as_str())
                    || needle.contains(key.as_str())
                    || partial_ratio(&needle, &key) >= self.fuzzy_threshold
            });
            if hit && prices_close(candidate_price, entry.known_price(role), self.price_tolerance)
            {
                debug!(entry_id = entry.id, reference = %candidate_ref, "approximate reference match");
                return Some(idx);
            }
        }

        None
    }

    fn entry_keys<'a>(&self, entry: &'a CatalogEntry) -> impl Iterator<Item = String> + 'a {
        [entry.reference_primary.as_deref(), entry.reference_secondary.as_deref()]
            .into_iter()
            .flatten()
            .map(normalize_reference)
            .filter(|key| !key.is_empty())
    }
}
