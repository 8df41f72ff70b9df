//! Probability-based targeting over what a team has seen of the opposing grid.

use rand::rngs::SmallRng;
use rand::Rng;

use crate::common::{GridError, ShotResult};
use crate::config::{FLEET, GRID_SIZE};
use crate::grid::{is_hit, Grid, OpponentView, HIT_OFFSET, MISS};
use crate::protocol::Placement;
use crate::ship::Orientation;

use super::Player;

type Matrix = [[f64; GRID_SIZE]; GRID_SIZE];
type Mask = [[bool; GRID_SIZE]; GRID_SIZE];

/// Placements covering more observed hits get this much more weight per hit,
/// so squares next to confirmed hits stand out.
const HIT_BIAS: f64 = 10.0;

/// Lower temperature biases sampling towards high-probability cells.
const TEMPERATURE: f64 = 0.5;

/// Compute a probability density over all unshot cells given the live hits,
/// the cells no ship can occupy and the lengths of ships still afloat.
pub fn calc_pdf(hits: &Mask, blocked: &Mask, remaining_lengths: &[usize]) -> Matrix {
    let mut matrix = [[0.0f64; GRID_SIZE]; GRID_SIZE];

    for &len in remaining_lengths {
        if len == 0 || len > GRID_SIZE {
            continue;
        }
        for orient in [Orientation::Horizontal, Orientation::Vertical] {
            let (max_row, max_col) = match orient {
                Orientation::Vertical => (GRID_SIZE - len + 1, GRID_SIZE),
                Orientation::Horizontal => (GRID_SIZE, GRID_SIZE - len + 1),
            };
            for r in 0..max_row {
                for c in 0..max_col {
                    let cells = (0..len).map(|k| orient.step(r, c, k));
                    if cells.clone().any(|(rr, cc)| blocked[rr][cc]) {
                        continue;
                    }
                    let n_hits = cells.clone().filter(|&(rr, cc)| hits[rr][cc]).count();
                    let weight = HIT_BIAS.powi(n_hits as i32);
                    for (rr, cc) in cells {
                        if !hits[rr][cc] {
                            matrix[rr][cc] += weight;
                        }
                    }
                }
            }
        }
    }

    normalize(matrix)
}

fn normalize(mut matrix: Matrix) -> Matrix {
    let total: f64 = matrix.iter().flatten().sum();
    if total == 0.0 {
        return matrix;
    }
    for v in matrix.iter_mut().flatten() {
        *v /= total;
    }
    matrix
}

/// Sample a coordinate from a probability matrix. Returns `None` when the
/// matrix holds no weight.
pub fn sample_pdf<R: Rng + ?Sized>(pdf: &Matrix, temperature: f64, rng: &mut R) -> Option<(usize, usize)> {
    let mut adjusted = [[0.0f64; GRID_SIZE]; GRID_SIZE];
    let mut total = 0.0;
    for r in 0..GRID_SIZE {
        for c in 0..GRID_SIZE {
            let v = pdf[r][c].powf(1.0 / temperature);
            adjusted[r][c] = v;
            total += v;
        }
    }
    if total <= 0.0 {
        return None;
    }
    let threshold: f64 = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for r in 0..GRID_SIZE {
        for c in 0..GRID_SIZE {
            cumulative += adjusted[r][c];
            if adjusted[r][c] > 0.0 && threshold < cumulative {
                return Some((r, c));
            }
        }
    }
    None
}

/// Automated player: random fleet layout, probability-guided shots.
#[derive(Debug, Default)]
pub struct AiPlayer {
    /// Opposing ship ids known to be sunk.
    sunk: Vec<u8>,
}

impl AiPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn masks(&self, view: &OpponentView) -> (Mask, Mask) {
        let mut hits = [[false; GRID_SIZE]; GRID_SIZE];
        let mut blocked = [[false; GRID_SIZE]; GRID_SIZE];
        for (r, row) in view.cells().iter().enumerate() {
            for (c, &cell) in row.iter().enumerate() {
                if cell == MISS {
                    blocked[r][c] = true;
                } else if is_hit(cell) {
                    if self.sunk.contains(&(cell - HIT_OFFSET)) {
                        blocked[r][c] = true;
                    } else {
                        hits[r][c] = true;
                    }
                }
            }
        }
        (hits, blocked)
    }
}

impl Player for AiPlayer {
    fn next_placement(&mut self, rng: &mut SmallRng, grid: &Grid) -> Result<Option<Placement>, GridError> {
        let Some(def) = FLEET.iter().find(|def| grid.ship(def.id()).is_none()) else {
            return Ok(None);
        };
        let (row, col, orientation) = grid.random_placement(rng, def.length())?;
        Ok(Some(Placement {
            id: def.id(),
            length: def.length(),
            row,
            col,
            orientation,
        }))
    }

    fn select_target(&mut self, rng: &mut SmallRng, view: &OpponentView) -> (usize, usize) {
        let (hits, blocked) = self.masks(view);
        let remaining: Vec<usize> = FLEET
            .iter()
            .filter(|def| !self.sunk.contains(&def.id()))
            .map(|def| def.length())
            .collect();
        let pdf = calc_pdf(&hits, &blocked, &remaining);
        if let Some(target) = sample_pdf(&pdf, TEMPERATURE, rng) {
            return target;
        }
        let unshot: Vec<(usize, usize)> = (0..GRID_SIZE)
            .flat_map(|r| (0..GRID_SIZE).map(move |c| (r, c)))
            .filter(|&(r, c)| !view.is_shot(r, c))
            .collect();
        if unshot.is_empty() {
            return (0, 0);
        }
        unshot[rng.random_range(0..unshot.len())]
    }

    fn handle_shot_result(&mut self, result: &ShotResult) {
        if result.sunk && !self.sunk.contains(&result.ship_id) {
            self.sunk.push(result.ship_id);
        }
    }
}
