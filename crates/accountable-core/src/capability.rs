//! Capability descriptor for record types that opt into actor stamping.
//!
//! A record type declares up front which stamp roles it supports. The
//! declaration is checked against the type's column list when the type is
//! registered, so lifecycle hooks never have to probe the table at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::StampRole;

/// Set of stamp roles a record type supports.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<StampRole>", into = "Vec<StampRole>")]
pub struct StampSet(u8);

impl StampSet {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b111);
    /// `created_by` and `updated_by`, for tables without soft deletes.
    pub const CREATE_UPDATE: Self = Self(0b011);

    #[must_use]
    pub const fn only(role: StampRole) -> Self {
        Self(role.bit())
    }

    #[must_use]
    pub const fn with(self, role: StampRole) -> Self {
        Self(self.0 | role.bit())
    }

    #[must_use]
    pub const fn without(self, role: StampRole) -> Self {
        Self(self.0 & !role.bit())
    }

    #[must_use]
    pub const fn contains(self, role: StampRole) -> bool {
        self.0 & role.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the supported roles in `created_by`, `updated_by`, `deleted_by` order.
    pub fn iter(self) -> impl Iterator<Item = StampRole> {
        StampRole::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

impl FromIterator<StampRole> for StampSet {
    fn from_iter<I: IntoIterator<Item = StampRole>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

impl From<Vec<StampRole>> for StampSet {
    fn from(roles: Vec<StampRole>) -> Self {
        roles.into_iter().collect()
    }
}

impl From<StampSet> for Vec<StampRole> {
    fn from(set: StampSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Debug for StampSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
