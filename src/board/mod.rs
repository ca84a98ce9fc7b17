// Board & scoring engine
//
// Pure functions over the 7 x 8 hex-offset grid: move validation, group
// clearing, gravity, refill and cascades.

// Public API
pub use engine::{apply_move, ClearPass, ClearedGroup, IllegalMove, Move, MoveAction, MoveOutcome};
pub use grid::{Board, BoardParseError, Color, Fall, Position, Refill, COLUMNS, ROWS};
pub use refill::{CellSource, CyclingCellSource, EmptyFill, SeededCellSource};
pub use scoring::{points_for_blast, points_for_group};

// Internal modules
mod engine;
mod grid;
mod refill;
mod scoring;
