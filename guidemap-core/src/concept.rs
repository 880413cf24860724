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

//! Concept value types
//!
//! A [`SemanticType`] is one row of the semantic type table attached to a CUI.
//! An [`AnnotatedConcept`] is the query-scoped view of a concept that the
//! annotator hands to evidence aggregation.
//!
//! # Identity
//!
//! Two annotated concepts are equal, and hash identically, when their CUIs
//! match. Flags and guideline sets do not take part in equality, so a
//! `HashSet<AnnotatedConcept>` keeps whichever instance was inserted first.

use crate::error::{GuidemapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Semantic type attached to a concept
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SemanticType {
    /// Type code (TUI), e.g. `T047`
    pub type_code: String,
    /// Hierarchical tree position (STN), e.g. `B2.2.1.2.1`
    pub tree_position: String,
    /// Human readable name, e.g. `Disease or Syndrome`
    pub name: String,
}

impl SemanticType {
    pub fn new(
        type_code: impl Into<String>,
        tree_position: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            type_code: type_code.into(),
            tree_position: tree_position.into(),
            name: name.into(),
        }
    }

    /// True if the tree position starts with at least one of `prefixes`
    pub fn has_matching_tree_position<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        prefixes
            .iter()
            .any(|prefix| self.tree_position.starts_with(prefix.as_ref()))
    }
}

/// Check that a semantic type tree prefix looks like `A1.4.1` or `B2`
///
/// A tree position is a category letter (`A` entities, `B` events) followed
/// by dot separated numeric path segments. A bare letter is allowed and
/// selects the whole branch.
pub fn validate_tree_prefix(prefix: &str) -> Result<()> {
    let invalid = || GuidemapError::InvalidSemanticTypePrefix(prefix.to_string());

    let mut chars = prefix.chars();
    match chars.next() {
        Some('A') | Some('B') => {}
        _ => return Err(invalid()),
    }

    let rest = chars.as_str();
    if rest.is_empty() {
        return Ok(());
    }

    for segment in rest.split('.') {
        if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
    }
    Ok(())
}

/// Concept enriched with query-scoped flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedConcept {
    /// Concept unique identifier
    pub cui: String,
    /// Surface text as it appeared in the source record
    pub text: Option<String>,
    /// Preferred vocabulary text, if any English term exists
    pub text_preferred: Option<String>,
    /// Semantic types attached to the concept
    pub semantic_types: Vec<SemanticType>,
    /// Guidelines referencing this concept
    pub guidelines: BTreeSet<String>,
    /// Guidelines referencing this concept inside recommendations
    pub guidelines_recommended: BTreeSet<String>,
    /// Fails the semantic type filter or is on the ignore-list
    pub is_hidden_by_filter: bool,
    /// Interventions only: occurs in the queried guideline
    pub is_known: Option<bool>,
    /// Interventions only: occurs in recommendations of the queried guideline
    pub is_recommended: Option<bool>,
}

impl AnnotatedConcept {
    /// Create a concept with empty guideline sets and unset flags
    pub fn new(cui: impl Into<String>) -> Self {
        Self {
            cui: cui.into(),
            text: None,
            text_preferred: None,
            semantic_types: Vec::new(),
            guidelines: BTreeSet::new(),
            guidelines_recommended: BTreeSet::new(),
            is_hidden_by_filter: false,
            is_known: None,
            is_recommended: None,
        }
    }

    /// True if the concept passes the tree prefix filter
    ///
    /// `None` or an empty list means no filter, which always passes.
    pub fn has_matching_semantic_type<S: AsRef<str>>(&self, stns: Option<&[S]>) -> bool {
        match stns {
            None => true,
            Some(stns) if stns.is_empty() => true,
            Some(stns) => self
                .semantic_types
                .iter()
                .any(|st| st.has_matching_tree_position(stns)),
        }
    }

    /// Membership of the concept in a guideline
    ///
    /// Returns `None` when no guideline was asked for.
    pub fn occurs_in_guideline(
        &self,
        guideline_id: Option<&str>,
        in_recommendations: bool,
    ) -> Option<bool> {
        let guideline_id = guideline_id?;
        let guidelines = if in_recommendations {
            &self.guidelines_recommended
        } else {
            &self.guidelines
        };
        Some(guidelines.contains(guideline_id))
    }
}

impl PartialEq for AnnotatedConcept {
    fn eq(&self, other: &Self) -> bool {
        self.cui == other.cui
    }
}

impl Eq for AnnotatedConcept {}

impl Hash for AnnotatedConcept {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cui.hash(state);
    }
}
