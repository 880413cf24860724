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

//! Guideline membership of concepts
//!
//! Precomputed once at startup from guideline authoring data. A population
//! CUI belongs to a guideline if the guideline names it or one of its broader
//! population concepts. An intervention CUI belongs to a guideline if the
//! guideline names it or one of its narrower entities.

use guidemap_core::{GuidemapError, Result};
use guidemap_index::{Direction, RelationshipMapper};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

/// CUI -> guideline ids
pub type GuidelineMap = HashMap<String, BTreeSet<String>>;

/// Guideline sets per concept role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineMembership {
    #[serde(default)]
    pub population: GuidelineMap,
    #[serde(default)]
    pub intervention: GuidelineMap,
    /// Interventions named inside recommendation text
    #[serde(default)]
    pub intervention_recommended: GuidelineMap,
}

impl GuidelineMembership {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GuidemapError::Config(format!("cannot read membership {}: {e}", path.display()))
        })?;
        let membership: Self = serde_json::from_str(&content)?;
        info!(
            "Loaded guideline membership: {} population, {} intervention, {} recommended CUIs",
            membership.population.len(),
            membership.intervention.len(),
            membership.intervention_recommended.len()
        );
        Ok(membership)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn lookup(map: &GuidelineMap, cui: &str) -> BTreeSet<String> {
    map.get(cui).cloned().unwrap_or_default()
}

impl GuidelineMembership {
    pub fn population_guidelines(&self, cui: &str) -> BTreeSet<String> {
        lookup(&self.population, cui)
    }

    pub fn intervention_guidelines(&self, cui: &str) -> BTreeSet<String> {
        lookup(&self.intervention, cui)
    }

    pub fn intervention_recommended_guidelines(&self, cui: &str) -> BTreeSet<String> {
        lookup(&self.intervention_recommended, cui)
    }
}

/// Accumulates [`GuidelineMembership`] from guideline topics and entities
#[derive(Debug, Default)]
pub struct MembershipBuilder {
    membership: GuidelineMembership,
}

fn add(map: &mut GuidelineMap, guideline: &str, cui: &str) {
    map.entry(cui.to_string())
        .or_default()
        .insert(guideline.to_string());
}

impl MembershipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Population `cui` and its narrower concepts belong to `guideline`
    pub fn add_population(&mut self, guideline: &str, cui: &str, sub_population_cuis: &[String]) {
        add(&mut self.membership.population, guideline, cui);
        for sub in sub_population_cuis {
            add(&mut self.membership.population, guideline, sub);
        }
    }

    /// Intervention `cui` and its broader concepts belong to `guideline`
    pub fn add_intervention(
        &mut self,
        guideline: &str,
        cui: &str,
        super_concept_cuis: &[String],
        in_recommendation: bool,
    ) {
        let m = &mut self.membership;
        for target in std::iter::once(cui).chain(super_concept_cuis.iter().map(String::as_str)) {
            add(&mut m.intervention, guideline, target);
            if in_recommendation {
                add(&mut m.intervention_recommended, guideline, target);
            }
        }
    }

    /// Expand a guideline's population topic broad -> narrow
    ///
    /// Excluded CUIs act as the stop-set, so neither they nor anything only
    /// reachable through them is added.
    pub fn map_population_topic(
        &mut self,
        mapper: &RelationshipMapper,
        guideline: &str,
        include: &[String],
        exclude: &[String],
        max_depth: Option<usize>,
    ) {
        for cui in include {
            let subs = mapper.get_related_concepts(cui, Direction::BroadToNarrow, max_depth, exclude);
            self.add_population(guideline, cui, &subs);
        }
    }

    /// Expand an intervention entity narrow -> broad
    pub fn map_intervention_entity(
        &mut self,
        mapper: &RelationshipMapper,
        guideline: &str,
        cui: &str,
        in_recommendation: bool,
        max_depth: Option<usize>,
    ) {
        let supers = mapper.get_related_concepts(cui, Direction::NarrowToBroad, max_depth, &[]);
        self.add_intervention(guideline, cui, &supers, in_recommendation);
    }

    pub fn build(self) -> GuidelineMembership {
        self.membership
    }
}
