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

//! Guidemap Thesaurus
//!
//! Loads the term (`MRCONSO`), relation (`MRREL`) and semantic type (`MRSTY`)
//! tables of a vocabulary release, answers preferred text and semantic type
//! lookups, and maps external identifiers to CUIs.

pub mod normalize;
pub mod rrf;
pub mod snapshot;
pub mod store;

pub use normalize::Normalizer;
pub use rrf::{RelationRow, SemanticTypeRow, TermRow};
pub use snapshot::{read_snapshot, write_snapshot};
pub use store::Thesaurus;
