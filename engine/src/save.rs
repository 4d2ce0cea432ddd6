//! Thin JSON save models for the persistence boundary.
//!
//! These mirror the runtime types without image handles or controllers so
//! an external save system can dump and restore them as plain data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSave {
    pub level: u32,
    pub exp: u32,
    pub strength: i32,
    pub intellect: i32,
    pub agility: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSave {
    pub id: String,
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSave {
    pub name: String,
    pub tile_x: i32,
    pub tile_y: i32,
    pub stats: StatsSave,
    pub hp: i32,
    pub mana: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inventory: Vec<ItemSave>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub equipment: BTreeMap<String, ItemSave>,
}

impl PlayerSave {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .expect("player save is always serializable")
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
