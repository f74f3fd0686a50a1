use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// Highest roll in `[1, 100]` that maps to [`Rarity::Legendary`].
pub const LEGENDARY_MAX_ROLL: u64 = 5;
/// Highest roll in `[1, 100]` that maps to [`Rarity::Rare`].
pub const RARE_MAX_ROLL: u64 = 25;
pub const ROLL_MIN: u64 = 1;
pub const ROLL_MAX: u64 = 100;

const COMMON_POOL: &[&str] = &[
    "Explorer's Compass",
    "Trail Map Fragment",
    "Basic Hiking Badge",
    "Nature's Whisper Token",
    "Wanderer's Coin",
];
const RARE_POOL: &[&str] = &[
    "Mystic Crystal",
    "Ancient Rune Stone",
    "Enchanted Leaf",
    "Starlight Shard",
    "Phoenix Feather",
];
const LEGENDARY_POOL: &[&str] = &[
    "Dragon Scale Fragment",
    "Celestial Orb",
    "Time Rift Key",
    "Void Walker's Essence",
    "Genesis Stone",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
}

impl Rarity {
    /// Maps an integer roll in `[1, 100]`. Boundaries are inclusive and checked
    /// legendary first.
    pub fn from_roll(roll: u64) -> Self {
        if roll <= LEGENDARY_MAX_ROLL {
            Rarity::Legendary
        } else if roll <= RARE_MAX_ROLL {
            Rarity::Rare
        } else {
            Rarity::Common
        }
    }

    /// Maps a uniform sample in `[0, 100)` with the same thresholds as
    /// [`Rarity::from_roll`].
    pub fn from_sample(sample: f64) -> Self {
        if sample <= LEGENDARY_MAX_ROLL as f64 {
            Rarity::Legendary
        } else if sample <= RARE_MAX_ROLL as f64 {
            Rarity::Rare
        } else {
            Rarity::Common
        }
    }

    /// Display order, rarest first.
    pub fn all_rarest_first() -> [Rarity; 3] {
        [Rarity::Legendary, Rarity::Rare, Rarity::Common]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Legendary => "legendary",
        }
    }

    pub fn is_celebrated(&self) -> bool {
        !matches!(self, Rarity::Common)
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Static rarity tier → item names table.
#[derive(Clone, Copy, Debug)]
pub struct RewardPool {
    common: &'static [&'static str],
    rare: &'static [&'static str],
    legendary: &'static [&'static str],
}

impl Default for RewardPool {
    fn default() -> Self {
        Self {
            common: COMMON_POOL,
            rare: RARE_POOL,
            legendary: LEGENDARY_POOL,
        }
    }
}

impl RewardPool {
    pub fn items(&self, rarity: Rarity) -> &'static [&'static str] {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Rare => self.rare,
            Rarity::Legendary => self.legendary,
        }
    }

    pub fn contains(&self, rarity: Rarity, name: &str) -> bool {
        self.items(rarity).contains(&name)
    }

    /// Local pseudo-random draw. Cannot fail: every tier is non-empty.
    pub fn draw_local<R: Rng>(&self, rng: &mut R) -> Reward {
        let rarity = Rarity::from_sample(rng.random_range(0.0..ROLL_MAX as f64));
        let items = self.items(rarity);
        let name = items[rng.random_range(0..items.len())];
        Reward::new(name, rarity, false)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub name: String,
    pub rarity: Rarity,
    pub is_new: bool,
    pub sourced_on_chain: bool,
}

impl Reward {
    pub fn new(name: impl Into<String>, rarity: Rarity, sourced_on_chain: bool) -> Self {
        Self {
            name: name.into(),
            rarity,
            is_new: true,
            sourced_on_chain,
        }
    }
}
