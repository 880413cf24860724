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

//! Guidemap Core
//!
//! Value types, query context, configuration and the error taxonomy shared by
//! the thesaurus, relationship mapper and concept annotator crates.

pub mod concept;
pub mod config;
pub mod error;
pub mod query;
pub mod role;

pub use concept::{validate_tree_prefix, AnnotatedConcept, SemanticType};
pub use config::{
    parse_config_list, AnnotatorConfig, GuidemapConfig, QueryDefaults, RelationshipMapperConfig,
    ThesaurusConfig,
};
pub use error::{GuidemapError, Result};
pub use query::EvidenceQuery;
pub use role::ConceptRole;
