use std::time::Duration;

use crate::ship::ShipType;

pub const GRID_SIZE: usize = 10;
pub const NUM_SHIPS: usize = 5;
pub const FLEET: [ShipType; NUM_SHIPS] = [
    ShipType::new(2, "Carrier", 5),
    ShipType::new(3, "Battleship", 4),
    ShipType::new(4, "Cruiser", 3),
    ShipType::new(5, "Submarine", 3),
    ShipType::new(6, "Destroyer", 2),
];

/// Maximum length of a frame payload, in bytes.
pub const PAYLOAD_MAX: usize = 100;

/// Player names are 1 to 10 characters.
pub const NAME_MAX: usize = 10;

pub const MAX_CLIENTS: usize = 64;
pub const MAX_PLAYERS: usize = 10;
pub const MAX_HOSTS_PER_PAGE: usize = 10;

pub const DEFAULT_REGISTRY_PORT: u16 = 50000;
pub const DEFAULT_GAME_PORT: u16 = 50001;

/// Look up a fleet entry by its ship id.
pub fn ship_type(id: u8) -> Option<ShipType> {
    FLEET.iter().copied().find(|def| def.id() == id)
}

/// Settings for a registration server.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_CLIENTS,
        }
    }
}

/// Settings for one hosted match.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_players: usize,
    /// Minimum number of seated players before the host may start.
    pub min_players: usize,
    /// Pause between the last placement and the first battle turn, so
    /// clients finish handling the placement traffic first.
    pub settle_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS,
            min_players: 2,
            settle_delay: Duration::from_secs(2),
        }
    }
}
