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

use crate::error::GuidemapError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a concept mention plays in an evidence record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptRole {
    Population,
    Intervention,
}

impl ConceptRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConceptRole::Population => "population",
            ConceptRole::Intervention => "intervention",
        }
    }
}

impl fmt::Display for ConceptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConceptRole {
    type Err = GuidemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "population" => Ok(ConceptRole::Population),
            "intervention" => Ok(ConceptRole::Intervention),
            other => Err(GuidemapError::Config(format!("unknown concept role: {other}"))),
        }
    }
}
