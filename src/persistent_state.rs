use crate::log_internal;
use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

const STATE_DIR_REL_HOME: &str = ".config/invbot";
const INVENTORY_FILE: &str = "inventory.json";
const HISTORY_FILE: &str = "history.json";

/// A tracked item.  The set is closed; anything else is not an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Item {
    Pipa,
    Sns,
    Micro,
    Subfusil,
    Minisubfusil,
}

/// Direction of an inventory change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
}

/// State which persists across sessions
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersistentState {
    pub inventory: Inventory,
    pub history: HistoryLog,
}

/// Item quantities.  Quantities may go negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory(BTreeMap<Item, i64>);

/// Human readable record of every committed change, oldest first
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLog(Vec<String>);

impl Item {
    pub const ALL: [Item; 5] = [
        Item::Pipa,
        Item::Sns,
        Item::Micro,
        Item::Subfusil,
        Item::Minisubfusil,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Item::Pipa => "pipa",
            Item::Sns => "sns",
            Item::Micro => "micro",
            Item::Subfusil => "subfusil",
            Item::Minisubfusil => "minisubfusil",
        }
    }

    fn default_quantity(self) -> i64 {
        match self {
            Item::Pipa => 7,
            Item::Sns => 9,
            Item::Micro => 17,
            Item::Subfusil => 3,
            Item::Minisubfusil => 0,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Item {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Item::ALL
            .into_iter()
            .find(|item| item.name() == s)
            .ok_or(anyhow!("Unknown item `{}`", s))
    }
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Remove => "remove",
        }
    }

    fn delta(self) -> i64 {
        match self {
            Action::Add => 1,
            Action::Remove => -1,
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Action::Add => "ha añadido",
            Action::Remove => "ha quitado",
        }
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self(
            Item::ALL
                .into_iter()
                .map(|item| (item, item.default_quantity()))
                .collect(),
        )
    }
}

impl Inventory {
    /// Apply one unit of `action` to `item`, returning the new quantity.
    pub fn apply(&mut self, action: Action, item: Item) -> i64 {
        let quantity = self.0.entry(item).or_default();
        *quantity += action.delta();
        *quantity
    }

    pub fn iter(&self) -> impl Iterator<Item = (Item, i64)> + '_ {
        self.0.iter().map(|(item, quantity)| (*item, *quantity))
    }

    /// One `item: quantity` line per item
    pub fn listing(&self) -> String {
        self.iter()
            .map(|(item, quantity)| format!("{}: {}", item, quantity))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn fill_missing(mut self) -> Self {
        for item in Item::ALL {
            self.0.entry(item).or_insert(item.default_quantity());
        }
        self
    }
}

impl HistoryLog {
    pub fn push(&mut self, line: String) {
        self.0.push(line);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whole log, or a placeholder when nothing has happened yet
    pub fn listing(&self) -> String {
        if self.is_empty() {
            "El historial está vacío.".to_owned()
        } else {
            self.0.join("\n")
        }
    }
}

/// History line for a committed change, e.g. `<@1> ha añadido 1 pipa. Total: 8`
fn history_line(actor: &str, action: Action, item: Item, total: i64) -> String {
    format!("{} {} 1 {}. Total: {}", actor, action.past_tense(), item, total)
}

impl PersistentState {
    /// Apply one unit of `action` to `item` on behalf of `actor` and log it.  Returns the new
    /// history line.
    pub fn record(&mut self, actor: &str, action: Action, item: Item) -> String {
        let total = self.inventory.apply(action, item);
        let line = history_line(actor, action, item, total);
        self.history.push(line.clone());
        line
    }

    fn state_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(STATE_DIR_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        Ok(Self::load_from(&Self::state_dir()?).await)
    }

    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::state_dir()?).await
    }

    /// Never fails; absent or corrupt documents are replaced with defaults.
    async fn load_from(dir: &Path) -> Self {
        let inventory = load_or_default::<Inventory>(&dir.join(INVENTORY_FILE))
            .await
            .fill_missing();
        let history = load_or_default::<HistoryLog>(&dir.join(HISTORY_FILE)).await;

        Self { inventory, history }
    }

    /// Inventory is written before history.  Each file is replaced atomically, but the pair is
    /// not.
    async fn save_to(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            anyhow!(
                "Could not create directory `{}`: {}",
                dir.to_string_lossy(),
                e
            )
        })?;

        write_json(&dir.join(INVENTORY_FILE), &self.inventory).await?;
        write_json(&dir.join(HISTORY_FILE), &self.history).await
    }
}

async fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log_internal!("No state at `{}`, using defaults", path.to_string_lossy());
            return T::default();
        }
        Err(e) => {
            log_internal!(
                "Could not read `{}`, using defaults: {}",
                path.to_string_lossy(),
                e
            );
            return T::default();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(value) => value,
        Err(e) => {
            log_internal!(
                "Could not parse `{}`, using defaults: {}",
                path.to_string_lossy(),
                e
            );
            T::default()
        }
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)
        .map_err(|e| anyhow!("Could not serialize `{}`: {}", path.to_string_lossy(), e))?;

    // Create a temporary file in the same directory.
    let tmp_path = path.with_extension("json.new");

    tokio::fs::write(&tmp_path, serialized).await.map_err(|e| {
        anyhow!(
            "Could not write state to temporary file `{}`: {}",
            tmp_path.to_string_lossy(),
            e
        )
    })?;

    // Atomically rename the temporary file over the target file.
    tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
        anyhow!(
            "Could not rename temporary file `{}` to `{}`: {}",
            tmp_path.to_string_lossy(),
            path.to_string_lossy(),
            e
        )
    })
}
