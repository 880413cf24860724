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

use guidemap_core::GuidemapError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Traversal direction over the relation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards more specific concepts, e.g. cancer -> breast cancer
    #[serde(rename = "broad2narrow")]
    BroadToNarrow,
    /// Towards more general concepts
    #[serde(rename = "narrow2broad")]
    NarrowToBroad,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::BroadToNarrow => "broad2narrow",
            Direction::NarrowToBroad => "narrow2broad",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = GuidemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "broad2narrow" => Ok(Direction::BroadToNarrow),
            "narrow2broad" => Ok(Direction::NarrowToBroad),
            other => Err(GuidemapError::UnsupportedDirection(other.to_string())),
        }
    }
}
