use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};
use stowaway_core::{ItemKey, ItemType, ItemTypeRegistry};
use stowaway_world::{TransferConfig, INVENTORY_SLOT_COUNT};
use tracing::warn;

pub const DEFAULT_RUNTIME_PATH: &str = "config/runtime.toml";
pub const DEFAULT_ITEMS_PATH: &str = "config/items.json";

/// Pickup reach around the player, in world units.
pub const DEFAULT_PICKUP_RADIUS: f32 = 1.5;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Slot count of the player inventory.
    pub inventory_slots: usize,
    /// Where drops land when a command gives no position.
    pub player_position: [f32; 3],
    pub pickup_radius: f32,
    pub transfer: TransferConfig,
    pub chests: Vec<ChestConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChestConfig {
    pub name: String,
    pub slots: usize,
    #[serde(default)]
    pub position: [f32; 3],
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inventory_slots: INVENTORY_SLOT_COUNT,
            player_position: [0.0, 0.0, 0.0],
            pickup_radius: DEFAULT_PICKUP_RADIUS,
            transfer: TransferConfig::default(),
            chests: vec![ChestConfig {
                name: "chest".to_string(),
                slots: 27,
                position: [2.0, 0.0, 0.0],
            }],
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        let config = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<RuntimeConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    RuntimeConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!(
                        "Runtime config not found at {}. Using defaults",
                        path.display()
                    );
                }
                RuntimeConfig::default()
            }
        };
        config.sanitized()
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if self.inventory_slots == 0 {
            warn!("inventory_slots must be positive, using {INVENTORY_SLOT_COUNT}");
            self.inventory_slots = INVENTORY_SLOT_COUNT;
        }
        if self.pickup_radius.is_nan() || self.pickup_radius < 0.0 {
            warn!("pickup_radius must be non-negative, using {DEFAULT_PICKUP_RADIUS}");
            self.pickup_radius = DEFAULT_PICKUP_RADIUS;
        }
        if self.transfer.cluster_radius.is_nan() || self.transfer.cluster_radius < 0.0 {
            warn!("cluster_radius must be non-negative, using default");
            self.transfer.cluster_radius = TransferConfig::default().cluster_radius;
        }
        if self.transfer.scatter_weight.is_nan() || self.transfer.scatter_weight < 0.0 {
            warn!("scatter_weight must be non-negative, disabling scatter");
            self.transfer.scatter_weight = 0.0;
        }
        if self.player_position.iter().any(|c| !c.is_finite()) {
            warn!("player_position must be finite, using the origin");
            self.player_position = [0.0; 3];
        }
        let mut seen = HashSet::new();
        self.chests.retain(|chest| {
            if chest.slots == 0 || chest.name.is_empty() {
                warn!("Skipping chest {:?}: needs a name and at least one slot", chest.name);
                return false;
            }
            if is_inventory_alias(&chest.name) {
                warn!("Skipping chest {:?}: name is reserved for the inventory", chest.name);
                return false;
            }
            if chest.position.iter().any(|c| !c.is_finite()) {
                warn!("Skipping chest {:?}: position must be finite", chest.name);
                return false;
            }
            if !seen.insert(chest.name.clone()) {
                warn!("Skipping chest {:?}: duplicate name", chest.name);
                return false;
            }
            true
        });
        self
    }
}

/// Names that address the player inventory in commands.
pub fn is_inventory_alias(name: &str) -> bool {
    name.eq_ignore_ascii_case("inv") || name.eq_ignore_ascii_case("inventory")
}

/// Load the item registry from JSON, falling back to the built-in types.
pub fn load_item_registry(path: &Path) -> ItemTypeRegistry {
    match ItemTypeRegistry::from_json_file(path) {
        Ok(registry) if !registry.is_empty() => registry,
        Ok(_) => {
            warn!("{} defines no item types. Using defaults", path.display());
            default_item_registry()
        }
        Err(err) => {
            warn!("Failed to load {}: {err}. Using defaults", path.display());
            default_item_registry()
        }
    }
}

fn default_item_registry() -> ItemTypeRegistry {
    let mut registry = ItemTypeRegistry::new();
    let stackable = [("wood", "Wood", 64), ("stone", "Stone", 64), ("apple", "Apple", 16)];
    for (key, name, max_stack) in stackable {
        if let Ok(key) = ItemKey::parse(key) {
            registry.register(ItemType::new(key, name, max_stack));
        }
    }
    if let Ok(key) = ItemKey::parse("sword") {
        registry.register(ItemType::unstackable(key, "Sword"));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "stowaway-{name}-{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let config = RuntimeConfig::load_from_path(&temp_path("missing.toml"));
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.inventory_slots, 40);
        assert_eq!(config.transfer.cluster_radius, 5.0);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let path = temp_path("runtime.toml");
        let mut config = RuntimeConfig::default();
        config.inventory_slots = 12;
        config.transfer.seed = 99;
        config.save_to_path(&path).unwrap();

        assert_eq!(RuntimeConfig::load_from_path(&path), config);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let path = temp_path("partial.toml");
        fs::write(
            &path,
            "inventory_slots = 0\n[transfer]\ncluster_radius = 8.0\ncluster_gc = \"remove_empty\"\n",
        )
        .unwrap();

        let config = RuntimeConfig::load_from_path(&path);
        assert_eq!(config.inventory_slots, 40);
        assert_eq!(config.transfer.cluster_radius, 8.0);
        assert_eq!(config.transfer.scatter_weight, 0.5);
        assert_eq!(config.chests.len(), 1);
    }

    #[test]
    fn test_reserved_and_duplicate_chest_names_are_skipped() {
        let path = temp_path("chests.toml");
        fs::write(
            &path,
            r#"player_position = [0.0, nan, 0.0]

[[chests]]
name = "Inventory"
slots = 9

[[chests]]
name = "INV"
slots = 9

[[chests]]
name = "chest"
slots = 9

[[chests]]
name = "chest"
slots = 27

[[chests]]
name = "barrel"
slots = 9
position = [inf, 0.0, 0.0]
"#,
        )
        .unwrap();

        let config = RuntimeConfig::load_from_path(&path);
        let names: Vec<&str> = config.chests.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["chest"]);
        assert_eq!(config.chests[0].slots, 9);
        assert_eq!(config.player_position, [0.0; 3]);
    }

    #[test]
    fn test_inventory_alias_ignores_case() {
        assert!(is_inventory_alias("inv"));
        assert!(is_inventory_alias("InVeNtOrY"));
        assert!(!is_inventory_alias("invent"));
    }

    #[test]
    fn test_bad_items_file_uses_builtin_types() {
        let path = temp_path("items.json");
        fs::write(&path, "not json").unwrap();
        let registry = load_item_registry(&path);
        assert!(registry.lookup(&ItemKey::parse("wood").unwrap()).is_some());
        assert_eq!(
            registry
                .lookup(&ItemKey::parse("sword").unwrap())
                .unwrap()
                .max_stack(),
            1
        );
    }
}
