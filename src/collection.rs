use crate::rewards::{
    Rarity,
    Reward,
};
use chrono::{
    DateTime,
    Utc,
};
use itertools::Itertools;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CollectionItem {
    pub id: u32,
    pub name: String,
    pub rarity: Rarity,
    pub description: String,
    pub sourced_on_chain: bool,
    pub obtained_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default)]
pub struct Collection {
    items: Vec<CollectionItem>,
}

impl Collection {
    /// Starting collection every explorer has.
    pub fn starter() -> Self {
        let seed = [
            (
                "Trailblazer Badge",
                Rarity::Common,
                "Awarded for your first successful check-in",
            ),
            (
                "Hidden Grove NFT",
                Rarity::Rare,
                "A mystical forest scene captured in digital form",
            ),
            (
                "Glitched Token Fragment",
                Rarity::Legendary,
                "A corrupted piece of the blockchain itself",
            ),
        ];
        let items = seed
            .into_iter()
            .zip(1..)
            .map(|((name, rarity, description), id)| CollectionItem {
                id,
                name: name.to_string(),
                rarity,
                description: description.to_string(),
                sourced_on_chain: false,
                obtained_at: None,
            })
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }

    pub fn record(&mut self, reward: &Reward, point_name: &str) -> &CollectionItem {
        let id = self.items.iter().map(|item| item.id).max().unwrap_or(0) + 1;
        let origin = if reward.sourced_on_chain {
            "on-chain draw"
        } else {
            "local draw"
        };
        self.items.push(CollectionItem {
            id,
            name: reward.name.clone(),
            rarity: reward.rarity,
            description: format!("Found at {point_name} ({origin})"),
            sourced_on_chain: reward.sourced_on_chain,
            obtained_at: Some(Utc::now()),
        });
        &self.items[self.items.len() - 1]
    }

    pub fn count(&self, rarity: Rarity) -> usize {
        self.items.iter().filter(|item| item.rarity == rarity).count()
    }

    /// Items grouped legendary → rare → common, newest first within a tier.
    /// Tiers with no items are kept so the view can show an empty section.
    pub fn grouped(&self) -> Vec<(Rarity, Vec<&CollectionItem>)> {
        Rarity::all_rarest_first()
            .into_iter()
            .map(|rarity| {
                let items = self
                    .items
                    .iter()
                    .filter(|item| item.rarity == rarity)
                    .sorted_by(|a, b| b.id.cmp(&a.id))
                    .collect();
                (rarity, items)
            })
            .collect()
    }
}
