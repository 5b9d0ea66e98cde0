//! Project permission levels and per-user permission metadata.
//!
//! A permission level is a rank in the TRiDaS hierarchy down to which a
//! viewer may see a project. The rank table below is the single source of
//! truth for every redaction decision in this crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// How deep into the TRiDaS hierarchy a viewer may look.
///
/// Ordered coarsest to finest: `Minimal` exposes only the open-access
/// subset, `Values` exposes everything including the numeric readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectPermissionLevel {
    Minimal,
    Project,
    Object,
    Element,
    Sample,
    Radius,
    Series,
    Values,
}

impl ProjectPermissionLevel {
    /// All levels, coarsest first. The declaration order IS the rank order.
    pub const ALL: [ProjectPermissionLevel; 8] = [
        ProjectPermissionLevel::Minimal,
        ProjectPermissionLevel::Project,
        ProjectPermissionLevel::Object,
        ProjectPermissionLevel::Element,
        ProjectPermissionLevel::Sample,
        ProjectPermissionLevel::Radius,
        ProjectPermissionLevel::Series,
        ProjectPermissionLevel::Values,
    ];

    /// Rank in the fixed granularity order (0 = coarsest).
    fn rank(self) -> u8 {
        match self {
            ProjectPermissionLevel::Minimal => 0,
            ProjectPermissionLevel::Project => 1,
            ProjectPermissionLevel::Object => 2,
            ProjectPermissionLevel::Element => 3,
            ProjectPermissionLevel::Sample => 4,
            ProjectPermissionLevel::Radius => 5,
            ProjectPermissionLevel::Series => 6,
            ProjectPermissionLevel::Values => 7,
        }
    }

    /// `true` when `granted` is deep enough to expose this level.
    ///
    /// A level A is permitted by a granted level B iff A is at or above
    /// B's granularity: `Object.is_permitted_by(Series)` holds,
    /// `Values.is_permitted_by(Series)` does not.
    pub fn is_permitted_by(self, granted: ProjectPermissionLevel) -> bool {
        self.rank() <= granted.rank()
    }
}

impl fmt::Display for ProjectPermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectPermissionLevel::Minimal => "minimal",
            ProjectPermissionLevel::Project => "project",
            ProjectPermissionLevel::Object => "object",
            ProjectPermissionLevel::Element => "element",
            ProjectPermissionLevel::Sample => "sample",
            ProjectPermissionLevel::Radius => "radius",
            ProjectPermissionLevel::Series => "series",
            ProjectPermissionLevel::Values => "values",
        };
        f.write_str(name)
    }
}

impl FromStr for ProjectPermissionLevel {
    type Err = DomainError;

    /// Parses the entity-level names used in request paths. Anything
    /// outside the fixed enumeration is a contract violation and is
    /// rejected here, at the boundary, rather than falling through.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(ProjectPermissionLevel::Minimal),
            "project" => Ok(ProjectPermissionLevel::Project),
            "object" => Ok(ProjectPermissionLevel::Object),
            "element" => Ok(ProjectPermissionLevel::Element),
            "sample" => Ok(ProjectPermissionLevel::Sample),
            "radius" => Ok(ProjectPermissionLevel::Radius),
            "series" => Ok(ProjectPermissionLevel::Series),
            "values" => Ok(ProjectPermissionLevel::Values),
            other => Err(DomainError::UnknownPermissionLevel {
                value: other.to_string(),
            }),
        }
    }
}

/// A per-user permission override on one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermission {
    pub user_id: String,
    pub level: ProjectPermissionLevel,
}

/// Permission metadata carried by every archived project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPermissionMetadata {
    /// Level granted to everyone without an explicit override.
    pub default_level: ProjectPermissionLevel,
    /// Per-user overrides, ordered as entered.
    pub user_permissions: Vec<UserPermission>,
}

impl ProjectPermissionMetadata {
    pub fn new(default_level: ProjectPermissionLevel) -> Self {
        Self {
            default_level,
            user_permissions: Vec::new(),
        }
    }

    /// Grants `user_id` an explicit level, replacing any earlier grant.
    pub fn grant(&mut self, user_id: impl Into<String>, level: ProjectPermissionLevel) {
        let user_id = user_id.into();
        if let Some(existing) = self
            .user_permissions
            .iter_mut()
            .find(|p| p.user_id == user_id)
        {
            existing.level = level;
        } else {
            self.user_permissions.push(UserPermission { user_id, level });
        }
    }

    /// The level effectively granted to `user_id`: their explicit override
    /// if present, the project default otherwise.
    pub fn effective_level(&self, user_id: &str) -> ProjectPermissionLevel {
        self.user_permissions
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| p.level)
            .unwrap_or(self.default_level)
    }
}

impl Default for ProjectPermissionMetadata {
    fn default() -> Self {
        Self::new(ProjectPermissionLevel::Minimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order_matches_declaration_order() {
        for window in ProjectPermissionLevel::ALL.windows(2) {
            assert!(window[0] < window[1], "{} !< {}", window[0], window[1]);
        }
    }

    #[test]
    fn test_is_permitted_by_exhaustive_pairwise() {
        // is_permitted_by must agree with position in the fixed order for
        // every pair of levels.
        for (i, a) in ProjectPermissionLevel::ALL.iter().enumerate() {
            for (j, b) in ProjectPermissionLevel::ALL.iter().enumerate() {
                assert_eq!(
                    a.is_permitted_by(*b),
                    i <= j,
                    "is_permitted_by({a}, {b}) disagrees with rank order"
                );
            }
        }
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for level in ProjectPermissionLevel::ALL {
            let parsed: ProjectPermissionLevel = level.to_string().parse().unwrap();
            assert_eq!(parsed, level);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown_level() {
        assert!("everything".parse::<ProjectPermissionLevel>().is_err());
        assert!("VALUES".parse::<ProjectPermissionLevel>().is_err());
        assert!("".parse::<ProjectPermissionLevel>().is_err());
    }

    #[test]
    fn test_effective_level_prefers_user_override() {
        let mut meta = ProjectPermissionMetadata::new(ProjectPermissionLevel::Project);
        meta.grant("alice", ProjectPermissionLevel::Values);

        assert_eq!(meta.effective_level("alice"), ProjectPermissionLevel::Values);
        assert_eq!(meta.effective_level("bob"), ProjectPermissionLevel::Project);
    }

    #[test]
    fn test_grant_replaces_existing_override() {
        let mut meta = ProjectPermissionMetadata::new(ProjectPermissionLevel::Minimal);
        meta.grant("alice", ProjectPermissionLevel::Series);
        meta.grant("alice", ProjectPermissionLevel::Object);

        assert_eq!(meta.user_permissions.len(), 1);
        assert_eq!(meta.effective_level("alice"), ProjectPermissionLevel::Object);
    }
}
