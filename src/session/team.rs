use crate::grid::{Grid, OpponentView};

/// One side of a match: a shared grid, what it has learned of the opposing
/// grid, and the players acting for it.
#[derive(Debug, Clone)]
pub struct Team {
    id: u8,
    name: String,
    pub grid: Grid,
    pub view: OpponentView,
    members: Vec<Member>,
    active_seat: usize,
}

/// A seated player acting for a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub seat: usize,
    pub name: String,
}

impl Team {
    pub fn new(id: u8, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            grid: Grid::new(),
            view: OpponentView::new(),
            members: Vec::new(),
            active_seat: usize::from(id),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in join order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Player names in join order.
    pub fn players(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    /// Seat `seat` joined as `name`. A repeated join renames the member.
    pub fn add_player(&mut self, seat: usize, name: impl Into<String>) {
        let name = name.into();
        match self.members.iter_mut().find(|m| m.seat == seat) {
            Some(member) => member.name = name,
            None => self.members.push(Member { seat, name }),
        }
    }

    /// Seat expected to act next.
    pub fn active_seat(&self) -> usize {
        self.active_seat
    }

    /// Name of the member in the active seat.
    pub fn active_player(&self) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.seat == self.active_seat)
            .map(|m| m.name.as_str())
    }

    pub fn set_active_seat(&mut self, seat: usize) {
        self.active_seat = seat;
    }

    pub fn placement_done(&self) -> bool {
        self.grid.placed_count() == crate::config::NUM_SHIPS
    }
}
