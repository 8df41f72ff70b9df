use armada::grid::{HIT_OFFSET, MISS};
use armada::{Grid, GridError, OpponentView, Orientation, ShotResult, FLEET, GRID_SIZE, NUM_SHIPS};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn full_fleet() -> Grid {
    let mut grid = Grid::new();
    // One ship per row, each starting at column 0.
    for (row, def) in FLEET.iter().enumerate() {
        grid.place_ship(def.id(), def.length(), row * 2, 0, Orientation::Horizontal)
            .unwrap();
    }
    grid
}

#[test]
fn placement_marks_cells_with_ship_id() {
    let mut grid = Grid::new();
    grid.place_ship(4, 3, 2, 5, Orientation::Vertical).unwrap();
    for r in 2..5 {
        assert_eq!(grid.cell(r, 5), Some(4));
    }
    assert_eq!(grid.cell(5, 5), Some(0));
    assert_eq!(grid.placed_count(), 1);
    let ship = grid.ship(4).unwrap();
    assert_eq!(ship.origin(), (2, 5));
    assert_eq!(ship.orientation(), Orientation::Vertical);
}

#[test]
fn refused_placements_leave_grid_unchanged() {
    let mut grid = Grid::new();
    grid.place_ship(2, 5, 0, 0, Orientation::Horizontal).unwrap();
    let before = grid.clone();

    assert_eq!(grid.place_ship(3, 4, 0, 7, Orientation::Horizontal), Err(GridError::OutOfBounds));
    assert_eq!(grid.place_ship(3, 4, 8, 0, Orientation::Vertical), Err(GridError::OutOfBounds));
    assert_eq!(grid.place_ship(3, 4, 0, 4, Orientation::Vertical), Err(GridError::Overlaps));
    assert_eq!(grid.place_ship(3, 0, 5, 5, Orientation::Vertical), Err(GridError::EmptyShip));
    assert_eq!(
        grid.place_ship(3, 4, usize::MAX, 0, Orientation::Vertical),
        Err(GridError::OutOfBounds)
    );
    assert_eq!(grid, before);
}

#[test]
fn ship_ids_are_cell_codes_placed_once() {
    let mut grid = Grid::new();
    grid.place_ship(6, 2, 0, 0, Orientation::Horizontal).unwrap();
    let before = grid.clone();

    assert_eq!(grid.place_ship(6, 2, 5, 5, Orientation::Horizontal), Err(GridError::InvalidId(6)));
    for id in [0, 1, 7, 12, u8::MAX] {
        assert_eq!(grid.place_ship(id, 2, 5, 5, Orientation::Horizontal), Err(GridError::InvalidId(id)));
    }
    assert_eq!(grid, before);

    // Hits on ship 6 land on the one record it has.
    let mut view = OpponentView::new();
    grid.resolve_shot(&mut view, 0, 0);
    let res = grid.resolve_shot(&mut view, 0, 1);
    assert!(res.hit && res.sunk);
    assert_eq!(res.ship_id, 6);
    assert!(grid.ship(6).unwrap().is_sunk());
    assert_eq!(grid.ships().count(), 1);
}

#[test]
fn sixth_ship_is_refused() {
    let mut grid = full_fleet();
    assert_eq!(grid.placed_count(), NUM_SHIPS);
    assert_eq!(
        grid.place_ship(6, 2, 9, 8, Orientation::Horizontal),
        Err(GridError::FleetComplete)
    );
}

#[test]
fn placement_validity_checks_edges() {
    let grid = Grid::new();
    assert!(grid.is_placement_valid(0, GRID_SIZE - 5, 5, Orientation::Horizontal));
    assert!(!grid.is_placement_valid(0, GRID_SIZE - 4, 5, Orientation::Horizontal));
    assert!(grid.is_placement_valid(GRID_SIZE - 2, 9, 2, Orientation::Vertical));
    assert!(!grid.is_placement_valid(GRID_SIZE, 0, 1, Orientation::Vertical));
}

#[test]
fn hit_then_sink_a_destroyer() {
    let mut grid = Grid::new();
    let mut view = OpponentView::new();
    grid.place_ship(6, 2, 3, 3, Orientation::Horizontal).unwrap();

    let first = grid.resolve_shot(&mut view, 3, 3);
    assert_eq!(
        first,
        ShotResult {
            row: 3,
            col: 3,
            hit: true,
            sunk: false,
            ship_id: 6,
        }
    );
    assert_eq!(grid.cell(3, 3), Some(6 + HIT_OFFSET));
    assert_eq!(view.cell(3, 3), Some(6 + HIT_OFFSET));

    let second = grid.resolve_shot(&mut view, 3, 4);
    assert!(second.hit && second.sunk);
    assert_eq!(grid.sunk_count(), 1);
    assert!(grid.ship(6).unwrap().is_sunk());
}

#[test]
fn wasted_shots_change_nothing() {
    let mut grid = Grid::new();
    let mut view = OpponentView::new();
    grid.place_ship(6, 2, 0, 0, Orientation::Horizontal).unwrap();

    grid.resolve_shot(&mut view, 0, 0);
    grid.resolve_shot(&mut view, 5, 5);
    let (grid_before, view_before) = (grid.clone(), view);

    assert_eq!(grid.resolve_shot(&mut view, 0, 0), ShotResult::wasted(0, 0));
    assert_eq!(grid.resolve_shot(&mut view, 5, 5), ShotResult::wasted(5, 5));
    assert_eq!(grid.resolve_shot(&mut view, GRID_SIZE, 0), ShotResult::wasted(GRID_SIZE, 0));
    assert_eq!(grid, grid_before);
    assert_eq!(view, view_before);
    assert_eq!(grid.ship(6).unwrap().hits(), 1);
}

#[test]
fn victory_needs_the_whole_fleet() {
    let mut grid = Grid::new();
    let mut view = OpponentView::new();
    grid.place_ship(6, 2, 0, 0, Orientation::Horizontal).unwrap();
    grid.resolve_shot(&mut view, 0, 0);
    grid.resolve_shot(&mut view, 0, 1);
    assert_eq!(grid.sunk_count(), 1);
    assert!(!grid.is_victory(), "one sunk ship out of one placed is not a win");

    let mut grid = full_fleet();
    assert!(!grid.is_victory());
    let targets: Vec<(usize, usize)> = grid.ships().flat_map(|s| s.cells().collect::<Vec<_>>()).collect();
    for (i, (r, c)) in targets.iter().enumerate() {
        assert!(!grid.is_victory(), "won early at shot {i}");
        grid.resolve_shot(&mut view, *r, *c);
    }
    assert!(grid.is_victory());
}

#[test]
fn mirrored_grid_tracks_incoming_shots() {
    let mut server = Grid::new();
    let mut mirror = Grid::new();
    let mut view = OpponentView::new();
    server.place_ship(5, 3, 7, 0, Orientation::Horizontal).unwrap();
    mirror.place_ship(5, 3, 7, 0, Orientation::Horizontal).unwrap();

    for (r, c) in [(7, 0), (0, 0), (7, 1)] {
        let res = server.resolve_shot(&mut view, r, c);
        mirror.mark_incoming(&res);
    }
    assert_eq!(mirror.cells(), server.cells());
    assert_eq!(mirror.cell(0, 0), Some(MISS));
}

#[test]
fn random_placement_fills_a_fleet() {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut grid = Grid::new();
    for def in FLEET {
        let (r, c, orient) = grid.random_placement(&mut rng, def.length()).unwrap();
        grid.place_ship(def.id(), def.length(), r, c, orient).unwrap();
    }
    let occupied = grid.cells().iter().flatten().filter(|&&v| v != 0).count();
    let expected: usize = FLEET.iter().map(|d| d.length()).sum();
    assert_eq!(occupied, expected, "ships should not overlap");
}

#[test]
fn random_placement_rejects_impossible_lengths() {
    let mut rng = SmallRng::seed_from_u64(7);
    let grid = Grid::new();
    assert_eq!(grid.random_placement(&mut rng, 0), Err(GridError::EmptyShip));
    assert_eq!(grid.random_placement(&mut rng, GRID_SIZE + 1), Err(GridError::OutOfBounds));
}
