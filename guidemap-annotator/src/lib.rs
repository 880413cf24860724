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

//! Guidemap Annotator
//!
//! Query-scoped concept annotation backed by a durable concept cache, plus
//! guideline membership precomputation and per-record concept grouping.

pub mod annotator;
pub mod cache;
pub mod grouping;
pub mod membership;

pub use annotator::ConceptAnnotator;
pub use cache::{CacheStats, ConceptCache, ConceptCacheKey};
pub use grouping::EvidenceConcepts;
pub use membership::{GuidelineMap, GuidelineMembership, MembershipBuilder};
