use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    content::ContentEntry,
    error::{Error, Result},
};

/// Inclusive numeric range used by the age and duration filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

impl Bounds {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    /// True when `[lo, hi]` shares at least one value with these bounds.
    /// Inverted bounds overlap nothing.
    pub fn overlaps(&self, lo: u32, hi: u32) -> bool {
        self.is_ordered() && lo <= self.max && hi >= self.min
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

/// Conjunctive search constraints. Empty sets and `None` mean
/// "unconstrained".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub age_range: Option<Bounds>,
    #[serde(default)]
    pub difficulty: BTreeSet<u8>,
    #[serde(default)]
    pub duration_range: Option<Bounds>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl SearchFilter {
    /// Reject ranges with `min > max` and difficulties outside 1..=5.
    ///
    /// [`passes`](Self::passes) accepts malformed filters and simply
    /// matches nothing; callers at the boundary should validate first.
    pub fn validate(&self) -> Result<()> {
        if let Some(age) = self.age_range
            && !age.is_ordered()
        {
            return Err(Error::InvalidFilter(format!(
                "age range min {} exceeds max {}",
                age.min, age.max
            )));
        }
        if let Some(duration) = self.duration_range
            && !duration.is_ordered()
        {
            return Err(Error::InvalidFilter(format!(
                "duration range min {} exceeds max {}",
                duration.min, duration.max
            )));
        }
        if let Some(bad) =
            self.difficulty.iter().find(|d| !(1..=5).contains(*d))
        {
            return Err(Error::InvalidFilter(format!(
                "difficulty {bad} is outside 1-5"
            )));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether `entry` satisfies every supplied constraint.
    ///
    /// Age, difficulty and duration constraints only apply to activities;
    /// other kinds pass them unconditionally.
    pub fn passes(&self, entry: &ContentEntry) -> bool {
        if !self.categories.is_empty()
            && !self.categories.contains(&entry.category)
        {
            return false;
        }

        if let Some(activity) = entry.activity() {
            if let Some(age) = self.age_range
                && !age.overlaps(
                    u32::from(activity.min_age),
                    u32::from(activity.max_age),
                )
            {
                return false;
            }
            if !self.difficulty.is_empty()
                && !self.difficulty.contains(&activity.difficulty)
            {
                return false;
            }
            if let Some(duration) = self.duration_range
                && !duration.contains(activity.duration_minutes)
            {
                return false;
            }
        }

        if !self.tags.is_empty() && self.tags.is_disjoint(&entry.tags) {
            return false;
        }

        if !matches_attribute(self.status.as_deref(), entry.status.as_deref())
        {
            return false;
        }
        matches_attribute(self.language.as_deref(), entry.language.as_deref())
    }
}

fn matches_attribute(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match (wanted, actual) {
        (None, _) => true,
        (Some(w), Some(a)) => w.eq_ignore_ascii_case(a),
        (Some(_), None) => false,
    }
}
