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

//! Direction-filtered adjacency lists
//!
//! Maintains one list of target CUIs per source CUI for O(1) expansion.
//! Uses SmallVec for inline storage: most concepts have a handful of
//! children or parents in any single vocabulary.

use guidemap_thesaurus::RelationRow;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Maximum inline targets before spilling to the heap
const MAX_INLINE_TARGETS: usize = 4;

type TargetList = SmallVec<[String; MAX_INLINE_TARGETS]>;

/// Which relation rows take part in one direction
pub struct EdgeFilter<'a> {
    /// Allowed relation types (REL)
    pub relations: &'a [String],
    /// Allowed provenance vocabularies (SAB)
    pub sources: &'a [String],
    /// Both endpoints must be members, when set
    pub restrict_to: Option<&'a HashSet<String>>,
}

impl EdgeFilter<'_> {
    fn accepts(&self, row: &RelationRow) -> bool {
        if row.suppressed
            || !self.relations.contains(&row.relation)
            || !self.sources.contains(&row.source)
        {
            return false;
        }
        match self.restrict_to {
            Some(allowed) => allowed.contains(&row.source_cui) && allowed.contains(&row.target_cui),
            None => true,
        }
    }
}

/// Adjacency index for one traversal direction
#[derive(Debug, Default)]
pub struct RelationIndex {
    targets: HashMap<String, TargetList>,
    edge_count: usize,
}

impl RelationIndex {
    /// Keep every non-suppressed row accepted by `filter`
    pub fn build(rows: &[RelationRow], filter: &EdgeFilter<'_>) -> Self {
        let mut index = Self::default();
        for row in rows.iter().filter(|row| filter.accepts(row)) {
            index.add_edge(&row.source_cui, &row.target_cui);
        }
        index
    }

    fn add_edge(&mut self, source: &str, target: &str) {
        let list = self.targets.entry(source.to_string()).or_default();
        if !list.iter().any(|existing| existing == target) {
            list.push(target.to_string());
            self.edge_count += 1;
        }
    }

    /// Targets of `cui`; empty for unknown or zero-degree concepts
    pub fn targets(&self, cui: &str) -> &[String] {
        self.targets.get(cui).map(|list| list.as_slice()).unwrap_or(&[])
    }

    /// Distinct edges kept
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Concepts with at least one outgoing edge
    pub fn source_count(&self) -> usize {
        self.targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(source: &str, relation: &str, target: &str, sab: &str, suppressed: bool) -> RelationRow {
        RelationRow {
            source_cui: source.to_string(),
            relation: relation.to_string(),
            target_cui: target.to_string(),
            source: sab.to_string(),
            suppressed,
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filters_relation_source_and_suppression() {
        let rows = vec![
            rel("A", "RN", "B", "MSH", false),
            rel("A", "RN", "B", "MSH", false),
            rel("A", "RB", "C", "MSH", false),
            rel("A", "RN", "D", "OTHER", false),
            rel("A", "RN", "E", "MSH", true),
        ];
        let relations = strings(&["RN"]);
        let sources = strings(&["MSH"]);
        let index = RelationIndex::build(
            &rows,
            &EdgeFilter {
                relations: &relations,
                sources: &sources,
                restrict_to: None,
            },
        );

        assert_eq!(index.targets("A"), &["B".to_string()]);
        assert_eq!(index.edge_count(), 1);
        assert!(index.targets("B").is_empty());
    }

    #[test]
    fn test_restriction_needs_both_endpoints() {
        let rows = vec![
            rel("A", "RB", "B", "MSH", false),
            rel("A", "RB", "C", "MSH", false),
            rel("D", "RB", "A", "MSH", false),
        ];
        let relations = strings(&["RB"]);
        let sources = strings(&["MSH"]);
        let allowed: HashSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        let index = RelationIndex::build(
            &rows,
            &EdgeFilter {
                relations: &relations,
                sources: &sources,
                restrict_to: Some(&allowed),
            },
        );

        assert_eq!(index.targets("A"), &["B".to_string()]);
        assert!(index.targets("D").is_empty());
        assert_eq!(index.source_count(), 1);
    }
}
