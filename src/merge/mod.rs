pub mod eav;

pub use eav::AttributeIngestor;

use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::MergeSettings;
use crate::matching::{CategoryAssigner, ReferenceMatcher};
use crate::models::{
    CandidateRecord, Catalog, CatalogEntry, CategoryTable, Marketplace,
};
use crate::parsers::{normalize, parse_price};
use crate::scrapers::ScrapeError;

/// Why a candidate was neither matched nor inserted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("candidate has no parsable name")]
    MissingName,
    #[error("listing url already known: {0}")]
    DuplicateUrl(String),
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

/// Terminal state of one candidate within a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Updated(i64),
    Inserted(i64),
    Skipped(SkipReason),
}

/// Caller-visible result of a pass. Nothing in the engine is fatal: the worst
/// a bad input can do is bump one of the skip counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub updated: usize,
    pub inserted: usize,
    pub skipped_duplicate: usize,
    pub skipped_missing_name: usize,
    pub skipped_collaborator_error: usize,
}

impl MergeSummary {
    fn record(&mut self, outcome: &MergeOutcome) {
        match outcome {
            MergeOutcome::Updated(_) => self.updated += 1,
            MergeOutcome::Inserted(_) => self.inserted += 1,
            MergeOutcome::Skipped(SkipReason::DuplicateUrl(_)) => self.skipped_duplicate += 1,
            MergeOutcome::Skipped(SkipReason::MissingName) => self.skipped_missing_name += 1,
            MergeOutcome::Skipped(SkipReason::Collaborator(_)) => {
                self.skipped_collaborator_error += 1
            }
        }
    }
}

/// One merge pass: consumes a batch of scraped candidates for a single
/// category scope and revises the catalog in place. Single-threaded and
/// synchronous; concurrent passes over the same catalog are not supported.
pub struct MergeEngine {
    matcher: ReferenceMatcher,
    assigner: CategoryAssigner,
}

impl MergeEngine {
    pub fn new(settings: &MergeSettings) -> Self {
        Self {
            matcher: ReferenceMatcher::new(
                settings.fuzzy_reference_threshold,
                settings.price_tolerance,
            ),
            assigner: CategoryAssigner::new(
                settings.fuzzy_category_threshold,
                settings.unassigned_category_sentinel,
            ),
        }
    }

    /// Runs one pass over `candidates`, scoped to `scope_id`. Collaborator
    /// failures arrive as `Err` items and are skipped per-candidate, never
    /// aborting the rest of the batch.
    pub fn run_pass<I>(
        &self,
        catalog: &mut Catalog,
        categories: &CategoryTable,
        scope_id: i64,
        candidates: I,
    ) -> MergeSummary
    where
        I: IntoIterator<Item = Result<CandidateRecord, ScrapeError>>,
    {
        let mut summary = MergeSummary::default();
        // Ids are allocated monotonically from the pre-pass maximum and are
        // never reused, even if the pass aborts partway.
        let mut next_id = catalog.max_id() + 1;
        // Each catalog row accepts at most one update per pass.
        let mut updated_ids: HashSet<i64> = HashSet::new();

        for item in candidates {
            let outcome = match item {
                Ok(candidate) => self.process_candidate(
                    catalog,
                    categories,
                    scope_id,
                    &mut next_id,
                    &mut updated_ids,
                    candidate,
                ),
                Err(e) => {
                    warn!(error = %e, "skipping candidate after collaborator failure");
                    MergeOutcome::Skipped(SkipReason::Collaborator(e.to_string()))
                }
            };
            summary.record(&outcome);
        }

        info!(
            updated = summary.updated,
            inserted = summary.inserted,
            skipped_duplicate = summary.skipped_duplicate,
            skipped_missing_name = summary.skipped_missing_name,
            skipped_collaborator_error = summary.skipped_collaborator_error,
            scope_id,
            "merge pass completed"
        );
        summary
    }

    fn process_candidate(
        &self,
        catalog: &mut Catalog,
        categories: &CategoryTable,
        scope_id: i64,
        next_id: &mut i64,
        updated_ids: &mut HashSet<i64>,
        candidate: CandidateRecord,
    ) -> MergeOutcome {
        if normalize(&candidate.name).is_empty() {
            warn!(url = %candidate.source_url, "dropping candidate without a parsable name");
            return MergeOutcome::Skipped(SkipReason::MissingName);
        }

        // Exact duplicate URL means the listing is already known; decide
        // before any reference matching so paginated re-scrapes are no-ops.
        if catalog.contains_url(&candidate.source_url) {
            debug!(url = %candidate.source_url, "duplicate listing url, skipping");
            return MergeOutcome::Skipped(SkipReason::DuplicateUrl(candidate.source_url));
        }

        let role = candidate.source_marketplace;
        let price = candidate
            .raw_price_text
            .as_deref()
            .and_then(parse_price);
        let reference = candidate.raw_reference.as_deref().unwrap_or("");

        let subset: Vec<usize> = catalog
            .indices_in_scope(categories, scope_id)
            .into_iter()
            .filter(|&i| !updated_ids.contains(&catalog.entries[i].id))
            .collect();

        if let Some(idx) = self
            .matcher
            .find_match(reference, price, role, catalog, &subset)
        {
            let entry = &mut catalog.entries[idx];
            apply_update(entry, &candidate, price);
            updated_ids.insert(entry.id);
            debug!(entry_id = entry.id, name = %candidate.name, "updated existing entry");
            return MergeOutcome::Updated(entry.id);
        }

        let id = *next_id;
        *next_id += 1;
        let category_id = self
            .assigner
            .assign(&candidate.name, &categories.children_of(scope_id));
        let mut entry = CatalogEntry::new(id, candidate.name.clone(), category_id);
        apply_update(&mut entry, &candidate, price);
        debug!(entry_id = id, category_id, name = %candidate.name, "inserted new entry");
        catalog.push(entry);
        MergeOutcome::Inserted(id)
    }
}

/// Writes the candidate's fields into the entry's role-specific slots. Only
/// non-missing values overwrite; absent candidate fields never erase data.
fn apply_update(entry: &mut CatalogEntry, candidate: &CandidateRecord, price: Option<f64>) {
    let role = candidate.source_marketplace;
    match role {
        Marketplace::Primary => {
            if let Some(r) = non_blank(candidate.raw_reference.as_deref()) {
                entry.reference_primary = Some(r);
            }
            if price.is_some() {
                entry.price_primary = price;
            }
            if let Some(a) = non_blank(candidate.availability.as_deref()) {
                entry.availability_primary = Some(a);
            }
            if !candidate.source_url.is_empty() {
                entry.source_url_primary = Some(candidate.source_url.clone());
            }
        }
        Marketplace::Secondary => {
            if let Some(r) = non_blank(candidate.raw_reference.as_deref()) {
                entry.reference_secondary = Some(r);
            }
            if price.is_some() {
                entry.price_secondary = price;
            }
            if let Some(a) = non_blank(candidate.availability.as_deref()) {
                entry.availability_secondary = Some(a);
            }
            if !candidate.source_url.is_empty() {
                entry.source_url_secondary = Some(candidate.source_url.clone());
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
