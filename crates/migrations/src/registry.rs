use std::collections::HashSet;

use crate::definitions::MigrationUnit;
use crate::error::{MigrationError, MigrationResult};

/// Explicit list of migration units, built once at startup.
///
/// Registration order does not matter; [`MigrationSet::into_sorted`] orders by version.
#[derive(Debug, Default)]
pub struct MigrationSet {
    units: Vec<MigrationUnit>,
}

impl MigrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, unit: MigrationUnit) -> &mut Self {
        self.units.push(unit);
        self
    }

    /// Builder form of [`MigrationSet::register`]
    pub fn with(mut self, unit: MigrationUnit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units sorted by ascending version; two units with one version are rejected
    pub fn into_sorted(self) -> MigrationResult<Vec<MigrationUnit>> {
        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.version) {
                return Err(MigrationError::DuplicateVersion(unit.version));
            }
        }

        let mut units = self.units;
        units.sort_by_key(|unit| unit.version);
        Ok(units)
    }
}

impl Extend<MigrationUnit> for MigrationSet {
    fn extend<T: IntoIterator<Item = MigrationUnit>>(&mut self, iter: T) {
        self.units.extend(iter);
    }
}

impl FromIterator<MigrationUnit> for MigrationSet {
    fn from_iter<T: IntoIterator<Item = MigrationUnit>>(iter: T) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}
