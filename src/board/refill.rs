use rand::{rngs::StdRng, Rng, SeedableRng};
use strum::IntoEnumIterator;

use super::grid::{Color, Position};

/// Supplies colors for cells the board needs to fill.
///
/// Returning `None` leaves the cell empty.
pub trait CellSource: Send + Sync {
    fn draw(&mut self, position: Position) -> Option<Color>;
}

/// Uniformly random colors from a seedable generator
pub struct SeededCellSource {
    rng: StdRng,
}

impl SeededCellSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl CellSource for SeededCellSource {
    fn draw(&mut self, _position: Position) -> Option<Color> {
        Some(Color::from_index(self.rng.random_range(0..Color::COUNT)))
    }
}

/// Never fills; cleared cells stay empty after gravity
pub struct EmptyFill;

impl CellSource for EmptyFill {
    fn draw(&mut self, _position: Position) -> Option<Color> {
        None
    }
}

/// Repeats a fixed color sequence
pub struct CyclingCellSource {
    colors: Vec<Color>,
    next: usize,
}

impl CyclingCellSource {
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors, next: 0 }
    }

    /// Cycles through every color in declaration order
    pub fn all_colors() -> Self {
        Self::new(Color::iter().collect())
    }
}

impl CellSource for CyclingCellSource {
    fn draw(&mut self, _position: Position) -> Option<Color> {
        if self.colors.is_empty() {
            return None;
        }
        let color = self.colors[self.next % self.colors.len()];
        self.next += 1;
        Some(color)
    }
}
