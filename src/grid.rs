//! Grid state: ship placement, shot resolution and victory detection.
//!
//! Cell encoding: `0` empty, `1` missed shot, `2..=6` a live ship segment
//! carrying the ship id, `12..=16` a hit segment (`id + 10`).

use core::fmt;
use rand::Rng;

use crate::common::{GridError, ShotResult};
use crate::config::{GRID_SIZE, NUM_SHIPS};
use crate::ship::{Orientation, Ship};

pub const EMPTY: u8 = 0;
pub const MISS: u8 = 1;
pub const HIT_OFFSET: u8 = 10;

/// `true` for a cell holding a live ship segment.
pub fn is_ship(cell: u8) -> bool {
    (2..=6).contains(&cell)
}

/// `true` for a cell holding a hit ship segment.
pub fn is_hit(cell: u8) -> bool {
    (12..=16).contains(&cell)
}

fn in_bounds(row: usize, col: usize) -> bool {
    row < GRID_SIZE && col < GRID_SIZE
}

/// A team's own grid: ships and the shots taken against them.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [[u8; GRID_SIZE]; GRID_SIZE],
    ships: [Option<Ship>; NUM_SHIPS],
    placed: usize,
    sunk: usize,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    /// Create an empty grid (no ships placed).
    pub fn new() -> Self {
        Grid {
            cells: [[EMPTY; GRID_SIZE]; GRID_SIZE],
            ships: [None; NUM_SHIPS],
            placed: 0,
            sunk: 0,
        }
    }

    /// Raw cell value, `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<u8> {
        in_bounds(row, col).then(|| self.cells[row][col])
    }

    pub fn cells(&self) -> &[[u8; GRID_SIZE]; GRID_SIZE] {
        &self.cells
    }

    pub fn placed_count(&self) -> usize {
        self.placed
    }

    pub fn sunk_count(&self) -> usize {
        self.sunk
    }

    /// Placed ships, in placement order.
    pub fn ships(&self) -> impl Iterator<Item = &Ship> {
        self.ships.iter().flatten()
    }

    /// The ship carrying `id`, if placed.
    pub fn ship(&self, id: u8) -> Option<&Ship> {
        self.ships().find(|s| s.id() == id)
    }

    /// Check that a ship of `length` anchored at (`row`, `col`) stays inside
    /// the grid and covers only empty cells.
    pub fn is_placement_valid(&self, row: usize, col: usize, length: usize, orient: Orientation) -> bool {
        self.check_placement(row, col, length, orient).is_ok()
    }

    fn check_placement(&self, row: usize, col: usize, length: usize, orient: Orientation) -> Result<(), GridError> {
        if length == 0 {
            return Err(GridError::EmptyShip);
        }
        for i in 0..length {
            let (r, c) = orient.step(row, col, i);
            if !in_bounds(r, c) {
                return Err(GridError::OutOfBounds);
            }
            if self.cells[r][c] != EMPTY {
                return Err(GridError::Overlaps);
            }
        }
        Ok(())
    }

    /// Place ship `id` of `length` at (`row`, `col`). Each id in `2..=6`
    /// may be placed once. Nothing changes when the placement is refused.
    pub fn place_ship(
        &mut self,
        id: u8,
        length: usize,
        row: usize,
        col: usize,
        orient: Orientation,
    ) -> Result<(), GridError> {
        self.check_placement(row, col, length, orient)?;
        if self.placed >= NUM_SHIPS {
            return Err(GridError::FleetComplete);
        }
        if !is_ship(id) || self.ship(id).is_some() {
            return Err(GridError::InvalidId(id));
        }
        let ship = Ship::new(id, length, row, col, orient);
        for (r, c) in ship.cells() {
            self.cells[r][c] = id;
        }
        self.ships[self.placed] = Some(ship);
        self.placed += 1;
        Ok(())
    }

    /// Returns a random free (row, col, Orientation) for a ship of `length`.
    pub fn random_placement<R: Rng>(
        &self,
        rng: &mut R,
        length: usize,
    ) -> Result<(usize, usize, Orientation), GridError> {
        if length == 0 {
            return Err(GridError::EmptyShip);
        }
        if length > GRID_SIZE {
            return Err(GridError::OutOfBounds);
        }
        for _ in 0..100 {
            let orient = if rng.random() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let (max_r, max_c) = match orient {
                Orientation::Vertical => (GRID_SIZE - length, GRID_SIZE - 1),
                Orientation::Horizontal => (GRID_SIZE - 1, GRID_SIZE - length),
            };
            let r = rng.random_range(0..=max_r);
            let c = rng.random_range(0..=max_c);
            if self.is_placement_valid(r, c, length, orient) {
                return Ok((r, c, orient));
            }
        }
        Err(GridError::NoRoom)
    }

    /// Fire at (`row`, `col`), recording the outcome here and in the
    /// attacker's `view`. Out-of-bounds and already-shot cells are a wasted
    /// turn: `hit == false` and nothing changes.
    pub fn resolve_shot(&mut self, view: &mut OpponentView, row: usize, col: usize) -> ShotResult {
        if !in_bounds(row, col) {
            return ShotResult::wasted(row, col);
        }
        let cell = self.cells[row][col];
        if cell == MISS || is_hit(cell) {
            return ShotResult::wasted(row, col);
        }
        if !is_ship(cell) {
            self.cells[row][col] = MISS;
            view.cells[row][col] = MISS;
            return ShotResult::wasted(row, col);
        }

        self.cells[row][col] = cell + HIT_OFFSET;
        view.cells[row][col] = cell + HIT_OFFSET;
        let ship = self
            .ships
            .iter_mut()
            .flatten()
            .find(|s| s.id() == cell)
            .unwrap_or_else(|| panic!("cell ({row}, {col}) holds ship {cell} with no ship record"));
        let sunk = ship.register_hit();
        if sunk {
            self.sunk += 1;
        }
        ShotResult {
            row,
            col,
            hit: true,
            sunk,
            ship_id: cell,
        }
    }

    /// Apply a shot resolved elsewhere to this copy of the grid. Used by
    /// clients mirroring their own team's grid.
    pub fn mark_incoming(&mut self, result: &ShotResult) {
        if !in_bounds(result.row, result.col) {
            return;
        }
        let cell = &mut self.cells[result.row][result.col];
        if result.hit {
            if is_ship(result.ship_id) {
                *cell = result.ship_id + HIT_OFFSET;
            }
        } else if *cell == EMPTY {
            *cell = MISS;
        }
    }

    /// Every ship placed and sunk. A grid with fewer than five ships never
    /// reports victory.
    pub fn is_victory(&self) -> bool {
        self.placed == NUM_SHIPS && self.sunk == self.placed
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {{ placed: {}, sunk: {}", self.placed, self.sunk)?;
        for row in &self.cells {
            writeln!(f, "  {:?}", row)?;
        }
        write!(f, "}}")
    }
}

/// What a team knows of the opponent's grid: its own shots. Ship identity
/// shows only on hit cells.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OpponentView {
    cells: [[u8; GRID_SIZE]; GRID_SIZE],
}

impl Default for OpponentView {
    fn default() -> Self {
        Self::new()
    }
}

impl OpponentView {
    pub fn new() -> Self {
        Self {
            cells: [[EMPTY; GRID_SIZE]; GRID_SIZE],
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<u8> {
        in_bounds(row, col).then(|| self.cells[row][col])
    }

    /// `true` once a shot landed on (`row`, `col`).
    pub fn is_shot(&self, row: usize, col: usize) -> bool {
        matches!(self.cell(row, col), Some(v) if v != EMPTY)
    }

    /// Record the outcome of one of our own shots.
    pub fn record(&mut self, result: &ShotResult) {
        if !in_bounds(result.row, result.col) {
            return;
        }
        let cell = &mut self.cells[result.row][result.col];
        if result.hit {
            if is_ship(result.ship_id) {
                *cell = result.ship_id + HIT_OFFSET;
            }
        } else if *cell == EMPTY {
            *cell = MISS;
        }
    }

    pub fn cells(&self) -> &[[u8; GRID_SIZE]; GRID_SIZE] {
        &self.cells
    }
}

impl fmt::Debug for OpponentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OpponentView {{")?;
        for row in &self.cells {
            writeln!(f, "  {:?}", row)?;
        }
        write!(f, "}}")
    }
}
