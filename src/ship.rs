//! Ship definitions and the per-ship hit record kept by a `Grid`.

use core::fmt;

/// Orientation of a ship on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Wire value: 0 for horizontal, 1 for vertical.
    pub fn code(self) -> u8 {
        match self {
            Orientation::Horizontal => 0,
            Orientation::Vertical => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Orientation::Horizontal),
            1 => Some(Orientation::Vertical),
            _ => None,
        }
    }

    /// Cell covered by segment `i` of a ship anchored at (`row`, `col`).
    pub fn step(self, row: usize, col: usize, i: usize) -> (usize, usize) {
        match self {
            Orientation::Horizontal => (row, col.saturating_add(i)),
            Orientation::Vertical => (row.saturating_add(i), col),
        }
    }
}

/// Entry of the fleet roster: grid id, name and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipType {
    id: u8,
    name: &'static str,
    length: usize,
}

impl ShipType {
    pub const fn new(id: u8, name: &'static str, length: usize) -> Self {
        Self { id, name, length }
    }

    /// Value written into grid cells occupied by this ship.
    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

/// A ship placed on a grid.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ship {
    id: u8,
    length: usize,
    row: usize,
    col: usize,
    orientation: Orientation,
    hits: usize,
    sunk: bool,
}

impl Ship {
    pub(crate) fn new(id: u8, length: usize, row: usize, col: usize, orientation: Orientation) -> Self {
        Ship {
            id,
            length,
            row,
            col,
            orientation,
            hits: 0,
            sunk: false,
        }
    }

    /// Record one more hit. Returns `true` when this hit sank the ship.
    pub(crate) fn register_hit(&mut self) -> bool {
        self.hits += 1;
        if !self.sunk && self.hits >= self.length {
            self.sunk = true;
            return true;
        }
        false
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Origin of the ship (row, col).
    pub fn origin(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn is_sunk(&self) -> bool {
        self.sunk
    }

    /// Cells covered by the ship, from the origin outward.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.length).map(move |i| self.orientation.step(self.row, self.col, i))
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ id: {}, origin: ({}, {}), orientation: {:?}, hits: {}/{}, sunk: {} }}",
            self.id, self.row, self.col, self.orientation, self.hits, self.length, self.sunk,
        )
    }
}
