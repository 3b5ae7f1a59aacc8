/// Item and character records, as the rest of the game sees them
/// (ids already resolved to records by the data store).

pub const DEFAULT_ITEM_DAMAGE: i32 = 5;
pub const DEFAULT_CHARACTER_DAMAGE: i32 = 2;
pub const DEFAULT_CHARACTER_HP: i32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub id: u32,
    pub name: String,
    pub damage: i32,
}

impl Item {
    /// Fallback held item for a character that carries nothing.
    pub fn bare_hands() -> Self {
        Item { id: 0, name: "Hand".into(), damage: DEFAULT_ITEM_DAMAGE }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Character {
    pub id: u32,
    pub name: String,
    pub damage: i32,
    pub hp: i32,
    pub items: Vec<Item>,
    pub current_item: Item,
}

impl Character {
    /// One-line stat block for the debug overlay.
    pub fn summary(&self) -> String {
        format!(
            "{} (#{}) hp:{} dmg:{} holding:{} items:{}",
            self.name, self.id, self.hp, self.damage, self.current_item.name, self.items.len()
        )
    }
}
