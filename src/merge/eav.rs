use std::collections::HashMap;
use tracing::debug;

use crate::models::{AttributeDefinition, AttributeValue};
use crate::parsers::normalize;

/// Ingests scraped specification tables into the attribute tables.
///
/// Definitions are keyed by (category_id, normalized name): the first sighting
/// of a pair creates a definition with a fresh monotonic id, later sightings
/// reuse it unchanged. Values are upserted so a product carries at most one
/// value per attribute and a re-run replaces instead of appending.
pub struct AttributeIngestor {
    lookup: HashMap<(i64, String), i64>,
    next_attribute_id: i64,
}

impl AttributeIngestor {
    pub fn new(definitions: &[AttributeDefinition]) -> Self {
        let lookup = definitions
            .iter()
            .map(|d| ((d.category_id, normalize(&d.name)), d.id))
            .collect();
        let next_attribute_id = definitions.iter().map(|d| d.id).max().unwrap_or(0) + 1;
        Self {
            lookup,
            next_attribute_id,
        }
    }

    /// Records one product's (attribute, value) pairs, creating definitions
    /// lazily. Blank keys and blank values are ignored. Returns the number of
    /// values written.
    pub fn ingest<I>(
        &mut self,
        definitions: &mut Vec<AttributeDefinition>,
        values: &mut Vec<AttributeValue>,
        product_id: i64,
        category_id: i64,
        pairs: I,
    ) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut written = 0;
        for (key_raw, value) in pairs {
            let key = normalize(&key_raw);
            if key.is_empty() || value.trim().is_empty() {
                continue;
            }

            let attribute_id = match self.lookup.get(&(category_id, key.clone())) {
                Some(&id) => id,
                None => {
                    let id = self.next_attribute_id;
                    self.next_attribute_id += 1;
                    self.lookup.insert((category_id, key), id);
                    definitions.push(AttributeDefinition {
                        id,
                        name: key_raw.trim().to_string(),
                        category_id,
                    });
                    debug!(attribute_id = id, category_id, "new attribute definition");
                    id
                }
            };

            let value = value.trim().to_string();
            match values
                .iter_mut()
                .find(|v| v.product_id == product_id && v.attribute_id == attribute_id)
            {
                Some(existing) => existing.value = value,
                None => values.push(AttributeValue {
                    product_id,
                    attribute_id,
                    value,
                }),
            }
            written += 1;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn definitions_are_created_lazily_and_reused() {
        let mut defs = Vec::new();
        let mut values = Vec::new();
        let mut ingestor = AttributeIngestor::new(&defs);

        ingestor.ingest(
            &mut defs,
            &mut values,
            1,
            10,
            pairs(&[("Puissance", "650 VA"), ("Garantie", "1 an")]),
        );
        ingestor.ingest(
            &mut defs,
            &mut values,
            2,
            10,
            pairs(&[("Puissance", "1000 VA")]),
        );

        assert_eq!(defs.len(), 2);
        assert_eq!(values.len(), 3);
        // Both products share the same "Puissance" definition.
        let puissance_ids: Vec<i64> = values
            .iter()
            .filter(|v| v.value.contains("VA"))
            .map(|v| v.attribute_id)
            .collect();
        assert_eq!(puissance_ids[0], puissance_ids[1]);
    }

    #[test]
    fn same_name_in_other_category_gets_its_own_definition() {
        let mut defs = Vec::new();
        let mut values = Vec::new();
        let mut ingestor = AttributeIngestor::new(&defs);

        ingestor.ingest(&mut defs, &mut values, 1, 10, pairs(&[("Garantie", "1 an")]));
        ingestor.ingest(&mut defs, &mut values, 2, 20, pairs(&[("Garantie", "2 ans")]));

        assert_eq!(defs.len(), 2);
        assert_ne!(defs[0].id, defs[1].id);
    }

    #[test]
    fn reingesting_replaces_instead_of_appending() {
        let mut defs = Vec::new();
        let mut values = Vec::new();
        let mut ingestor = AttributeIngestor::new(&defs);

        ingestor.ingest(&mut defs, &mut values, 1, 10, pairs(&[("Puissance", "650 VA")]));
        ingestor.ingest(&mut defs, &mut values, 1, 10, pairs(&[("Puissance", "700 VA")]));

        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, "700 VA");
    }

    #[test]
    fn resumes_ids_from_existing_definitions() {
        let defs_seed = vec![AttributeDefinition {
            id: 41,
            name: "Puissance".to_string(),
            category_id: 10,
        }];
        let mut defs = defs_seed.clone();
        let mut values = Vec::new();
        let mut ingestor = AttributeIngestor::new(&defs_seed);

        ingestor.ingest(
            &mut defs,
            &mut values,
            1,
            10,
            pairs(&[("puissance", "650 VA"), ("Autonomie", "10 min")]),
        );

        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1].id, 42);
        assert_eq!(values[0].attribute_id, 41);
    }

    #[test]
    fn blank_keys_and_values_are_ignored() {
        let mut defs = Vec::new();
        let mut values = Vec::new();
        let mut ingestor = AttributeIngestor::new(&defs);

        let written = ingestor.ingest(
            &mut defs,
            &mut values,
            1,
            10,
            pairs(&[("", "x"), ("Poids", "  "), ("Poids", "5 kg")]),
        );

        assert_eq!(written, 1);
        assert_eq!(defs.len(), 1);
        assert_eq!(values.len(), 1);
    }
}
