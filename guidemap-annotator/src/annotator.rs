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

//! Concept annotator
//!
//! Wraps a `(cui, text)` mention found in an evidence record into a cached
//! [`AnnotatedConcept`] carrying preferred text, semantic types, guideline
//! sets and the query-scoped flags:
//!
//! - `is_hidden_by_filter`: fails the role's semantic type filter (when set)
//!   or, for interventions, is on the ignore-list
//! - `is_known` / `is_recommended`: interventions only, and only when the
//!   query names a guideline
//!
//! Role differences live in one [`RoleBehavior`] record per role.

use crate::cache::{ConceptCache, ConceptCacheKey};
use crate::membership::GuidelineMembership;
use guidemap_core::{AnnotatedConcept, ConceptRole, EvidenceQuery, Result};
use guidemap_thesaurus::Thesaurus;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

type GuidelineLookup = fn(&GuidelineMembership, &str) -> BTreeSet<String>;
type QueryList = fn(&EvidenceQuery) -> Option<&[String]>;

/// Per-role lookups and flag rules
struct RoleBehavior {
    guidelines: GuidelineLookup,
    guidelines_recommended: GuidelineLookup,
    semantic_type_filter: QueryList,
    ignore_list: QueryList,
    sets_guideline_flags: bool,
}

fn population_stns(query: &EvidenceQuery) -> Option<&[String]> {
    query.filter_stns_population.as_deref()
}

fn intervention_stns(query: &EvidenceQuery) -> Option<&[String]> {
    query.filter_stns_interventions.as_deref()
}

fn intervention_ignore_list(query: &EvidenceQuery) -> Option<&[String]> {
    query.ignore_cuis_interventions.as_deref()
}

fn no_list(_: &EvidenceQuery) -> Option<&[String]> {
    None
}

// Population has no recommendation-scoped map; both sets come from the
// population map.
static POPULATION: RoleBehavior = RoleBehavior {
    guidelines: GuidelineMembership::population_guidelines,
    guidelines_recommended: GuidelineMembership::population_guidelines,
    semantic_type_filter: population_stns,
    ignore_list: no_list,
    sets_guideline_flags: false,
};

static INTERVENTION: RoleBehavior = RoleBehavior {
    guidelines: GuidelineMembership::intervention_guidelines,
    guidelines_recommended: GuidelineMembership::intervention_recommended_guidelines,
    semantic_type_filter: intervention_stns,
    ignore_list: intervention_ignore_list,
    sets_guideline_flags: true,
};

fn behavior(role: ConceptRole) -> &'static RoleBehavior {
    match role {
        ConceptRole::Population => &POPULATION,
        ConceptRole::Intervention => &INTERVENTION,
    }
}

/// Turns concept mentions into cached annotated concepts
pub struct ConceptAnnotator {
    thesaurus: Arc<Thesaurus>,
    membership: Arc<GuidelineMembership>,
    cache: ConceptCache,
}

impl ConceptAnnotator {
    pub fn new(
        thesaurus: Arc<Thesaurus>,
        membership: Arc<GuidelineMembership>,
        cache: ConceptCache,
    ) -> Self {
        Self {
            thesaurus,
            membership,
            cache,
        }
    }

    pub fn parse_population(
        &self,
        cui: &str,
        text: Option<&str>,
        query: &EvidenceQuery,
    ) -> Arc<AnnotatedConcept> {
        self.parse(ConceptRole::Population, cui, text, query)
    }

    pub fn parse_intervention(
        &self,
        cui: &str,
        text: Option<&str>,
        query: &EvidenceQuery,
    ) -> Arc<AnnotatedConcept> {
        self.parse(ConceptRole::Intervention, cui, text, query)
    }

    /// Cached concept for `(cui, role, query.guideline_id)`
    ///
    /// A cached entry is returned unchanged, even if `text` or the query's
    /// filter lists differ from the call that created it.
    pub fn parse(
        &self,
        role: ConceptRole,
        cui: &str,
        text: Option<&str>,
        query: &EvidenceQuery,
    ) -> Arc<AnnotatedConcept> {
        let key = ConceptCacheKey::new(cui, role, query.guideline_id.as_deref());
        self.cache
            .get_or_insert_with(key, || self.annotate(role, cui, text, query))
    }

    fn annotate(
        &self,
        role: ConceptRole,
        cui: &str,
        text: Option<&str>,
        query: &EvidenceQuery,
    ) -> AnnotatedConcept {
        let rules = behavior(role);

        let mut concept = AnnotatedConcept::new(cui);
        concept.text = text.map(String::from);
        concept.text_preferred = self.thesaurus.get_preferred_text(cui);
        concept.guidelines = (rules.guidelines)(&self.membership, cui);
        concept.guidelines_recommended = (rules.guidelines_recommended)(&self.membership, cui);
        concept.semantic_types = self.thesaurus.get_semantic_types(cui).to_vec();

        let ignored = (rules.ignore_list)(query)
            .map_or(false, |cuis| cuis.iter().any(|c| c == cui));
        concept.is_hidden_by_filter =
            !concept.has_matching_semantic_type((rules.semantic_type_filter)(query)) || ignored;

        if rules.sets_guideline_flags {
            let guideline = query.guideline_id.as_deref();
            concept.is_known = concept.occurs_in_guideline(guideline, false);
            concept.is_recommended = concept.occurs_in_guideline(guideline, true);
        }

        debug!(
            "Annotated {} as {} (hidden: {})",
            cui, role, concept.is_hidden_by_filter
        );
        concept
    }

    pub fn thesaurus(&self) -> &Arc<Thesaurus> {
        &self.thesaurus
    }

    pub fn cache(&self) -> &ConceptCache {
        &self.cache
    }

    /// Flush and release the concept cache
    pub fn close(self) -> Result<()> {
        self.cache.close()
    }
}
