// Copyright 2025 Guidemap Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Annotated concepts of one evidence record, grouped by role

use guidemap_core::{AnnotatedConcept, EvidenceQuery};
use std::collections::HashSet;
use std::sync::Arc;

/// Population and intervention concepts of one record
///
/// Each list is deduplicated by CUI; the first concept pushed wins.
#[derive(Debug, Clone, Default)]
pub struct EvidenceConcepts {
    population: Vec<Arc<AnnotatedConcept>>,
    intervention: Vec<Arc<AnnotatedConcept>>,
    seen_population: HashSet<String>,
    seen_intervention: HashSet<String>,
}

impl EvidenceConcepts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a concept with the same CUI is already present
    pub fn push_population(&mut self, concept: Arc<AnnotatedConcept>) -> bool {
        if !self.seen_population.insert(concept.cui.clone()) {
            return false;
        }
        self.population.push(concept);
        true
    }

    /// Returns false if a concept with the same CUI is already present
    pub fn push_intervention(&mut self, concept: Arc<AnnotatedConcept>) -> bool {
        if !self.seen_intervention.insert(concept.cui.clone()) {
            return false;
        }
        self.intervention.push(concept);
        true
    }

    pub fn population(&self) -> &[Arc<AnnotatedConcept>] {
        &self.population
    }

    pub fn intervention(&self) -> &[Arc<AnnotatedConcept>] {
        &self.intervention
    }

    pub fn population_filtered(&self) -> impl Iterator<Item = &Arc<AnnotatedConcept>> {
        self.population.iter().filter(|c| !c.is_hidden_by_filter)
    }

    pub fn intervention_filtered(&self) -> impl Iterator<Item = &Arc<AnnotatedConcept>> {
        self.intervention.iter().filter(|c| !c.is_hidden_by_filter)
    }

    fn classified<'a>(
        &'a self,
        stns: Option<&'a [String]>,
        flag: impl Fn(&AnnotatedConcept) -> Option<bool> + 'a,
        expected: bool,
    ) -> impl Iterator<Item = &'a Arc<AnnotatedConcept>> + 'a {
        self.intervention_filtered().filter(move |c| {
            let concept: &AnnotatedConcept = c;
            concept.has_matching_semantic_type(stns) && flag(concept) == Some(expected)
        })
    }

    /// Visible interventions of the queried guideline in its "known" categories
    pub fn intervention_known<'a>(
        &'a self,
        query: &'a EvidenceQuery,
    ) -> impl Iterator<Item = &'a Arc<AnnotatedConcept>> + 'a {
        self.classified(
            query.filter_stns_interventions_known.as_deref(),
            |c| c.is_known,
            true,
        )
    }

    pub fn intervention_recommended<'a>(
        &'a self,
        query: &'a EvidenceQuery,
    ) -> impl Iterator<Item = &'a Arc<AnnotatedConcept>> + 'a {
        self.classified(
            query.filter_stns_interventions_known.as_deref(),
            |c| c.is_recommended,
            true,
        )
    }

    /// Visible interventions absent from the queried guideline
    pub fn intervention_unknown<'a>(
        &'a self,
        query: &'a EvidenceQuery,
    ) -> impl Iterator<Item = &'a Arc<AnnotatedConcept>> + 'a {
        self.classified(
            query.filter_stns_interventions_unknown.as_deref(),
            |c| c.is_known,
            false,
        )
    }

    pub fn intervention_not_recommended<'a>(
        &'a self,
        query: &'a EvidenceQuery,
    ) -> impl Iterator<Item = &'a Arc<AnnotatedConcept>> + 'a {
        self.classified(
            query.filter_stns_interventions_unknown.as_deref(),
            |c| c.is_recommended,
            false,
        )
    }

    pub fn has_known_intervention(&self, query: &EvidenceQuery) -> bool {
        self.intervention_known(query).next().is_some()
    }

    pub fn has_recommended_intervention(&self, query: &EvidenceQuery) -> bool {
        self.intervention_recommended(query).next().is_some()
    }

    pub fn has_unknown_intervention(&self, query: &EvidenceQuery) -> bool {
        self.intervention_unknown(query).next().is_some()
    }

    pub fn has_not_recommended_intervention(&self, query: &EvidenceQuery) -> bool {
        self.intervention_not_recommended(query).next().is_some()
    }

    /// Any population concept is on the query's pediatric list
    pub fn has_pediatric_population(&self, query: &EvidenceQuery) -> bool {
        match &query.filter_cuis_pediatric_population {
            Some(pediatric) => self
                .population
                .iter()
                .any(|c| pediatric.iter().any(|p| *p == c.cui)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guidemap_core::SemanticType;

    fn intervention(cui: &str, stn: &str, known: Option<bool>, recommended: Option<bool>) -> Arc<AnnotatedConcept> {
        let mut concept = AnnotatedConcept::new(cui);
        concept.semantic_types = vec![SemanticType::new("T000", stn, "type")];
        concept.is_known = known;
        concept.is_recommended = recommended;
        Arc::new(concept)
    }

    fn cuis<'a>(iter: impl Iterator<Item = &'a Arc<AnnotatedConcept>>) -> Vec<&'a str> {
        iter.map(|c| c.cui.as_str()).collect()
    }

    #[test]
    fn test_first_pushed_wins() {
        let mut group = EvidenceConcepts::new();
        assert!(group.push_intervention(intervention("D", "A1", Some(true), None)));
        assert!(!group.push_intervention(intervention("D", "A1", Some(false), None)));
        assert_eq!(group.intervention().len(), 1);
        assert_eq!(group.intervention()[0].is_known, Some(true));
    }

    #[test]
    fn test_known_and_unknown_views() {
        let mut group = EvidenceConcepts::new();
        group.push_intervention(intervention("KNOWN", "A1.4", Some(true), Some(false)));
        group.push_intervention(intervention("UNKNOWN", "A1.4", Some(false), Some(false)));
        group.push_intervention(intervention("OTHER", "B1", Some(false), Some(false)));
        let mut hidden = AnnotatedConcept::new("HIDDEN");
        hidden.is_known = Some(true);
        hidden.is_hidden_by_filter = true;
        group.push_intervention(Arc::new(hidden));

        let mut query = EvidenceQuery::for_guideline("G1");
        query.filter_stns_interventions_unknown = Some(vec!["A1".to_string()]);

        assert_eq!(cuis(group.intervention_filtered()), vec!["KNOWN", "UNKNOWN", "OTHER"]);
        assert_eq!(cuis(group.intervention_known(&query)), vec!["KNOWN"]);
        assert_eq!(cuis(group.intervention_unknown(&query)), vec!["UNKNOWN"]);
        assert_eq!(
            cuis(group.intervention_not_recommended(&query)),
            vec!["KNOWN", "UNKNOWN"]
        );
        assert!(!group.has_recommended_intervention(&query));
    }

    #[test]
    fn test_pediatric_population() {
        let mut group = EvidenceConcepts::new();
        group.push_population(Arc::new(AnnotatedConcept::new("CHILD")));

        let mut query = EvidenceQuery::default();
        assert!(!group.has_pediatric_population(&query));
        query.filter_cuis_pediatric_population = Some(vec!["CHILD".to_string()]);
        assert!(group.has_pediatric_population(&query));
    }
}
