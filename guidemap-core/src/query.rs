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

//! Evidence query context.

use crate::config::QueryDefaults;
use serde::{Deserialize, Serialize};

/// Query context that concept flags are computed against.
///
/// Every list is nullable. `None` means "no filter" for semantic type lists
/// and "nothing ignored" for the ignore-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceQuery {
    /// Guideline the evidence is requested for.
    #[serde(default)]
    pub guideline_id: Option<String>,
    /// Tree prefixes population concepts must match.
    #[serde(default)]
    pub filter_stns_population: Option<Vec<String>>,
    /// Tree prefixes intervention concepts must match.
    #[serde(default)]
    pub filter_stns_interventions: Option<Vec<String>>,
    /// Intervention CUIs that are always hidden.
    #[serde(default)]
    pub ignore_cuis_interventions: Option<Vec<String>>,
    /// Tree prefixes for interventions counted as known/recommended.
    #[serde(default)]
    pub filter_stns_interventions_known: Option<Vec<String>>,
    /// Tree prefixes for interventions counted as unknown/not recommended.
    #[serde(default)]
    pub filter_stns_interventions_unknown: Option<Vec<String>>,
    /// Population CUIs marking pediatric evidence.
    #[serde(default)]
    pub filter_cuis_pediatric_population: Option<Vec<String>>,
}

impl EvidenceQuery {
    /// Create a query scoped to one guideline.
    pub fn for_guideline(guideline_id: impl Into<String>) -> Self {
        Self {
            guideline_id: Some(guideline_id.into()),
            ..Default::default()
        }
    }

    /// Set population semantic type filter.
    pub fn population_stns(mut self, stns: Vec<String>) -> Self {
        self.filter_stns_population = Some(stns);
        self
    }

    /// Set intervention semantic type filter.
    pub fn intervention_stns(mut self, stns: Vec<String>) -> Self {
        self.filter_stns_interventions = Some(stns);
        self
    }

    /// Set intervention ignore-list.
    pub fn ignore_interventions(mut self, cuis: Vec<String>) -> Self {
        self.ignore_cuis_interventions = Some(cuis);
        self
    }

    /// Fill every unset list from configured defaults.
    pub fn with_defaults(mut self, defaults: &QueryDefaults) -> Self {
        fn fill(slot: &mut Option<Vec<String>>, default: &[String]) {
            if slot.is_none() {
                *slot = Some(default.to_vec());
            }
        }

        fill(&mut self.filter_stns_population, &defaults.filter_stns_population);
        fill(&mut self.filter_stns_interventions, &defaults.filter_stns_interventions);
        fill(&mut self.ignore_cuis_interventions, &defaults.ignore_cuis_interventions);
        fill(
            &mut self.filter_stns_interventions_known,
            &defaults.filter_stns_interventions_known,
        );
        fill(
            &mut self.filter_stns_interventions_unknown,
            &defaults.filter_stns_interventions_unknown,
        );
        fill(
            &mut self.filter_cuis_pediatric_population,
            &defaults.filter_cuis_pediatric_population,
        );
        self
    }

    /// True if `cui` is on the intervention ignore-list.
    pub fn is_ignored_intervention(&self, cui: &str) -> bool {
        self.ignore_cuis_interventions
            .as_ref()
            .map_or(false, |cuis| cuis.iter().any(|c| c == cui))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_only_fill_unset_lists() {
        let defaults = QueryDefaults {
            filter_stns_population: vec!["B2".to_string()],
            filter_stns_interventions: vec!["A1.4".to_string()],
            ignore_cuis_interventions: vec!["C0000001".to_string()],
            ..Default::default()
        };

        let query = EvidenceQuery::for_guideline("G1")
            .intervention_stns(vec![])
            .with_defaults(&defaults);

        assert_eq!(query.filter_stns_population, Some(vec!["B2".to_string()]));
        // Explicit empty list is kept, not overwritten
        assert_eq!(query.filter_stns_interventions, Some(vec![]));
        assert!(query.is_ignored_intervention("C0000001"));
        assert!(!query.is_ignored_intervention("C0000002"));
        assert_eq!(query.filter_cuis_pediatric_population, Some(vec![]));
    }

    #[test]
    fn test_no_ignore_list_ignores_nothing() {
        let query = EvidenceQuery::default();
        assert!(!query.is_ignored_intervention("C0000001"));
    }
}
