//! Common grid types: placement errors and shot results.

/// Outcome of firing at one cell.
///
/// `ship_id` is the id of the ship that was hit, or 0 on a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShotResult {
    pub row: usize,
    pub col: usize,
    pub hit: bool,
    pub sunk: bool,
    pub ship_id: u8,
}

impl ShotResult {
    /// A result with no effect: out of bounds, repeated or missed target.
    pub fn wasted(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            ..Self::default()
        }
    }
}

/// Reasons a placement is refused by a `Grid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// Some covered cell falls outside the grid.
    OutOfBounds,
    /// Some covered cell is already occupied.
    Overlaps,
    /// All five ships are already placed.
    FleetComplete,
    /// The length is zero.
    EmptyShip,
    /// No free position was found for a random placement.
    NoRoom,
    /// The id is not a ship cell code, or that ship is already placed.
    InvalidId(u8),
}

impl core::fmt::Display for GridError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GridError::OutOfBounds => write!(f, "Ship placement is out of bounds"),
            GridError::Overlaps => write!(f, "Ship placement overlaps with another ship"),
            GridError::FleetComplete => write!(f, "All ships are already placed"),
            GridError::EmptyShip => write!(f, "Ship length must be positive"),
            GridError::NoRoom => write!(f, "Unable to find room for the ship"),
            GridError::InvalidId(id) => write!(f, "Ship id {} is invalid or already placed", id),
        }
    }
}

impl std::error::Error for GridError {}
