//! Resource types, resource pools, and cost maps.
//!
//! All amounts are `f64`. Maps are `BTreeMap`s keyed by [`ResourceType`] so
//! iteration order is fixed and ticks are reproducible.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{GameError, Result};

/// A typed resource.
///
/// Serialized as its snake_case name (`"ancient_knowledge"`), which keeps
/// save files and config tables readable and lets the type act as a JSON
/// map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum ResourceType {
    /// Primary currency. Drives player level and prestige.
    Gold,
    /// Wood.
    Wood,
    /// Stone.
    Stone,
    /// Food.
    Food,
    /// Mana.
    Mana,
    /// Crystal.
    Crystal,
    /// Ancient knowledge, the research currency.
    AncientKnowledge,
    /// Prestige points. Never produced by ordinary time-based generation.
    PrestigePoints,
}

impl ResourceType {
    /// Every resource type, in canonical order.
    pub const ALL: [Self; 8] = [
        Self::Gold,
        Self::Wood,
        Self::Stone,
        Self::Food,
        Self::Mana,
        Self::Crystal,
        Self::AncientKnowledge,
        Self::PrestigePoints,
    ];

    /// Resources produced by time-based generation (everything but prestige points).
    pub const PRODUCIBLE: [Self; 7] = [
        Self::Gold,
        Self::Wood,
        Self::Stone,
        Self::Food,
        Self::Mana,
        Self::Crystal,
        Self::AncientKnowledge,
    ];

    /// Stable snake_case key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Food => "food",
            Self::Mana => "mana",
            Self::Crystal => "crystal",
            Self::AncientKnowledge => "ancient_knowledge",
            Self::PrestigePoints => "prestige_points",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Gold => "Gold",
            Self::Wood => "Wood",
            Self::Stone => "Stone",
            Self::Food => "Food",
            Self::Mana => "Mana",
            Self::Crystal => "Crystal",
            Self::AncientKnowledge => "Ancient Knowledge",
            Self::PrestigePoints => "Prestige Points",
        }
    }

    /// Whether ordinary time-based generation produces this resource.
    #[must_use]
    pub const fn is_producible(self) -> bool {
        !matches!(self, Self::PrestigePoints)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ResourceType> for &'static str {
    fn from(resource: ResourceType) -> Self {
        resource.as_str()
    }
}

/// Returned when parsing an unknown resource key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource type '{0}'")]
pub struct UnknownResource(pub String);

impl FromStr for ResourceType {
    type Err = UnknownResource;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}

impl TryFrom<String> for ResourceType {
    type Error = UnknownResource;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// What a multiplier applies to: one resource or every producible resource.
///
/// Serialized as `"all"` or as the resource key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum MultiplierTarget {
    /// Every producible resource.
    All,
    /// A single resource.
    Resource(ResourceType),
}

impl MultiplierTarget {
    /// Whether this target covers `resource`.
    #[must_use]
    pub fn applies_to(self, resource: ResourceType) -> bool {
        match self {
            Self::All => resource.is_producible(),
            Self::Resource(r) => r == resource,
        }
    }
}

impl From<MultiplierTarget> for &'static str {
    fn from(target: MultiplierTarget) -> Self {
        match target {
            MultiplierTarget::All => "all",
            MultiplierTarget::Resource(r) => r.as_str(),
        }
    }
}

impl fmt::Display for MultiplierTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).into())
    }
}

impl FromStr for MultiplierTarget {
    type Err = UnknownResource;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "all" {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Resource)
        }
    }
}

impl TryFrom<String> for MultiplierTarget {
    type Error = UnknownResource;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// A price: amounts of one or more resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(BTreeMap<ResourceType, f64>);

impl Cost {
    /// An empty cost.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// A cost in a single resource.
    #[must_use]
    pub fn single(resource: ResourceType, amount: f64) -> Self {
        Self(BTreeMap::from([(resource, amount)]))
    }

    /// Amount of `resource` in this cost (zero if absent).
    #[must_use]
    pub fn get(&self, resource: ResourceType) -> f64 {
        self.0.get(&resource).copied().unwrap_or(0.0)
    }

    /// Set the amount for a resource.
    pub fn insert(&mut self, resource: ResourceType, amount: f64) {
        self.0.insert(resource, amount);
    }

    /// Iterate over `(resource, amount)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, f64)> + '_ {
        self.0.iter().map(|(r, a)| (*r, *a))
    }

    /// Whether this cost lists no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every amount multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        self.iter().map(|(r, a)| (r, a * factor)).collect()
    }

    /// Add another cost into this one, resource by resource.
    pub fn accumulate(&mut self, other: &Self) {
        for (resource, amount) in other.iter() {
            *self.0.entry(resource).or_insert(0.0) += amount;
        }
    }
}

impl FromIterator<(ResourceType, f64)> for Cost {
    fn from_iter<I: IntoIterator<Item = (ResourceType, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(ResourceType, f64); N]> for Cost {
    fn from(pairs: [(ResourceType, f64); N]) -> Self {
        Self(BTreeMap::from(pairs))
    }
}

/// The player's resource balances.
///
/// Always holds an entry for every [`ResourceType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePool(BTreeMap<ResourceType, f64>);

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcePool {
    /// A pool with every resource at zero.
    #[must_use]
    pub fn new() -> Self {
        Self(ResourceType::ALL.into_iter().map(|r| (r, 0.0)).collect())
    }

    /// Current balance of `resource`.
    #[must_use]
    pub fn get(&self, resource: ResourceType) -> f64 {
        self.0.get(&resource).copied().unwrap_or(0.0)
    }

    /// Overwrite the balance of `resource`.
    pub fn set(&mut self, resource: ResourceType, amount: f64) {
        self.0.insert(resource, amount);
    }

    /// Add `amount` to `resource`.
    pub fn add(&mut self, resource: ResourceType, amount: f64) {
        *self.0.entry(resource).or_insert(0.0) += amount;
    }

    /// Iterate over balances in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, f64)> + '_ {
        self.0.iter().map(|(r, a)| (*r, *a))
    }

    /// Fill in any resource missing from the map with zero.
    pub fn backfill(&mut self) {
        for resource in ResourceType::ALL {
            self.0.entry(resource).or_insert(0.0);
        }
    }

    /// Side-effect-free affordability check.
    #[must_use]
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.shortfall(cost).is_none()
    }

    /// The first resource the pool cannot cover, as an error.
    ///
    /// Negative or non-finite cost entries are rejected as
    /// [`GameError::InvalidCost`].
    #[must_use]
    pub fn shortfall(&self, cost: &Cost) -> Option<GameError> {
        let invalid = cost
            .iter()
            .find(|(_, amount)| !amount.is_finite() || *amount < 0.0);
        if let Some((resource, amount)) = invalid {
            return Some(GameError::InvalidCost { resource, amount });
        }
        cost.iter().find_map(|(resource, required)| {
            let available = self.get(resource);
            (available < required).then_some(GameError::InsufficientResources {
                resource,
                required,
                available,
            })
        })
    }

    /// Check affordability, then deduct every entry of `cost`.
    ///
    /// Nothing is deducted when any single resource falls short.
    pub fn spend(&mut self, cost: &Cost) -> Result<()> {
        if let Some(err) = self.shortfall(cost) {
            return Err(err);
        }
        for (resource, amount) in cost.iter() {
            self.add(resource, -amount);
        }
        Ok(())
    }
}
