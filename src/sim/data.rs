/// Data store: item and character records loaded from JSON files.
///
/// ## Files (inside the configured data directory)
///
///   `item.json`      — list of items
///   ```json
///   [{ "name": "Sword", "damage": 7 }, { "id": 9, "name": "Bow" }]
///   ```
///   `mainchar.json`  — list with the main character first
///   ```json
///   [{ "name": "Hero", "hp": 12, "items": [1, 9], "current_item": 9 }]
///   ```
///
/// Items without an explicit `id` are numbered from 1 in file order.
/// Missing stats fall back to the record defaults (item damage 5,
/// character damage 2, hp 10).
///
/// ## Resolution
///
/// The character stores item ids on disk. `resolve_character` swaps them
/// for the loaded item records; an unknown id fails the whole load. A
/// character without items and without `current_item` holds bare hands.
///
/// Everything is loaded once before the frame loop starts; any error is
/// fatal and reported to the caller.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::stats::{
    Character, Item, DEFAULT_CHARACTER_DAMAGE, DEFAULT_CHARACTER_HP, DEFAULT_ITEM_DAMAGE,
};

pub const ITEMS_FILE: &str = "item.json";
pub const CHARACTER_FILE: &str = "mainchar.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} contains no records", path.display())]
    Empty { path: PathBuf },
    #[error("item id {0} is used more than once")]
    DuplicateItem(u32),
    #[error("character [{character}] refers to unknown item id {id}")]
    UnknownItem { character: String, id: u32 },
}

// ── JSON schema (with serde defaults) ──

#[derive(Deserialize, Debug)]
struct RawItem {
    #[serde(default)]
    id: Option<u32>,
    name: String,
    #[serde(default = "default_item_damage")]
    damage: i32,
}

#[derive(Deserialize, Debug)]
struct RawCharacter {
    #[serde(default)]
    id: Option<u32>,
    name: String,
    #[serde(default = "default_character_damage")]
    damage: i32,
    #[serde(default = "default_character_hp")]
    hp: i32,
    #[serde(default)]
    items: Vec<u32>,
    #[serde(default)]
    current_item: Option<u32>,
}

fn default_item_damage() -> i32 { DEFAULT_ITEM_DAMAGE }
fn default_character_damage() -> i32 { DEFAULT_CHARACTER_DAMAGE }
fn default_character_hp() -> i32 { DEFAULT_CHARACTER_HP }

// ── Public API ──

/// Everything the data files provide, fully resolved.
#[derive(Debug)]
pub struct DataStore {
    pub items: Vec<Item>,
    pub character: Rc<Character>,
}

impl DataStore {
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let items = load_items(&dir.join(ITEMS_FILE))?;
        let character = load_character(&dir.join(CHARACTER_FILE), &items)?;
        log::info!(
            "loaded {} item(s) and character [{}] from {}",
            items.len(), character.name, dir.display()
        );
        Ok(DataStore { items, character: Rc::new(character) })
    }
}

pub fn load_items(path: &Path) -> Result<Vec<Item>, LoadError> {
    let raw: Vec<RawItem> = read_records(path)?;
    number_items(raw)
}

/// Load the main character (first record) and resolve its item ids.
pub fn load_character(path: &Path, items: &[Item]) -> Result<Character, LoadError> {
    let raw: Vec<RawCharacter> = read_records(path)?;
    if raw.len() > 1 {
        log::warn!("{} has {} characters, using the first", path.display(), raw.len());
    }
    let first = raw
        .into_iter()
        .next()
        .ok_or_else(|| LoadError::Empty { path: path.to_path_buf() })?;
    resolve_character(first, items)
}

// ── Internal ──

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Parse { path: path.to_path_buf(), source })
}

fn number_items(raw: Vec<RawItem>) -> Result<Vec<Item>, LoadError> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut items = Vec::with_capacity(raw.len());
    for (i, r) in raw.into_iter().enumerate() {
        let id = r.id.unwrap_or(i as u32 + 1);
        if !seen.insert(id) {
            return Err(LoadError::DuplicateItem(id));
        }
        items.push(Item { id, name: r.name, damage: r.damage });
    }
    Ok(items)
}

fn resolve_character(raw: RawCharacter, items: &[Item]) -> Result<Character, LoadError> {
    let lookup = |id: u32| {
        items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| LoadError::UnknownItem { character: raw.name.clone(), id })
    };

    let owned = raw.items.iter().map(|&id| lookup(id)).collect::<Result<Vec<_>, _>>()?;
    let current_item = match raw.current_item {
        Some(id) => lookup(id)?,
        None => owned.first().cloned().unwrap_or_else(Item::bare_hands),
    };

    Ok(Character {
        id: raw.id.unwrap_or(1),
        name: raw.name,
        damage: raw.damage,
        hp: raw.hp,
        items: owned,
        current_item,
    })
}
