use serde::{Deserialize, Serialize};
use tracing::debug;

use super::grid::{Board, Color, Fall, Position, Refill};
use super::refill::CellSource;
use super::scoring::{points_for_blast, points_for_group};
use crate::config::ScoringConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveAction {
    /// Clear the same-color group containing the chosen cell
    #[default]
    Pop,
    /// Clear the chosen cell and every occupied neighbour
    Bomb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub position: Position,
    pub action: MoveAction,
}

impl Move {
    pub fn pop(x: i32, y: i32) -> Self {
        Self {
            position: Position::new(x, y),
            action: MoveAction::Pop,
        }
    }

    pub fn bomb(x: i32, y: i32) -> Self {
        Self {
            position: Position::new(x, y),
            action: MoveAction::Bomb,
        }
    }
}

/// Reasons the board refuses a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum IllegalMove {
    #[error("Position {0} is outside the board")]
    OutOfBounds(Position),
    #[error("No block at {0}")]
    EmptyCell(Position),
    #[error("Group of {size} is too small to clear")]
    GroupTooSmall { size: usize },
    #[error("No bombs available")]
    NoBombs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedGroup {
    /// `None` for a bomb blast, which spans colors
    pub color: Option<Color>,
    pub cells: Vec<Position>,
    pub points: u32,
}

/// One clear-gravity-refill step. Pass 0 is the move itself, later passes are cascades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearPass {
    pub groups: Vec<ClearedGroup>,
    pub falls: Vec<Fall>,
    pub refills: Vec<Refill>,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub board: Board,
    pub passes: Vec<ClearPass>,
    pub points: u32,
    /// Size of the group cleared directly by the move
    pub initial_size: usize,
    pub board_regenerated: bool,
}

impl MoveOutcome {
    pub fn cascade_count(&self) -> usize {
        self.passes.len().saturating_sub(1)
    }
}

/// Validates `mv` against `board` and resolves it, cascades included.
///
/// The input board is untouched. Output depends only on the inputs and the
/// state of `source`.
pub fn apply_move(
    board: &Board,
    mv: &Move,
    config: &ScoringConfig,
    source: &mut dyn CellSource,
) -> Result<MoveOutcome, IllegalMove> {
    let at = mv.position;
    if !at.in_bounds() {
        return Err(IllegalMove::OutOfBounds(at));
    }
    let color = board.get(at).ok_or(IllegalMove::EmptyCell(at))?;

    let initial = match mv.action {
        MoveAction::Pop => {
            let cells = board.group_at(at);
            if cells.len() < 3 {
                return Err(IllegalMove::GroupTooSmall { size: cells.len() });
            }
            ClearedGroup {
                color: Some(color),
                points: points_for_group(cells.len(), config),
                cells,
            }
        }
        MoveAction::Bomb => {
            let mut cells: Vec<Position> = std::iter::once(at)
                .chain(at.neighbors().into_iter().filter(|p| board.get(*p).is_some()))
                .collect();
            cells.sort();
            ClearedGroup {
                color: None,
                points: points_for_blast(cells.len(), config),
                cells,
            }
        }
    };
    let initial_size = initial.cells.len();

    let mut next = board.clone();
    let mut passes = vec![settle(&mut next, vec![initial], source)];

    for _ in 0..config.max_cascade_passes {
        let groups: Vec<ClearedGroup> = next
            .groups(3)
            .into_iter()
            .map(|(color, cells)| ClearedGroup {
                color: Some(color),
                points: points_for_group(cells.len(), config),
                cells,
            })
            .collect();
        if groups.is_empty() {
            break;
        }
        passes.push(settle(&mut next, groups, source));
    }

    let mut board_regenerated = false;
    if !next.has_playable_group() {
        if let Some(fresh) = Board::generate(source) {
            debug!("No playable groups left, board regenerated");
            next = fresh;
            board_regenerated = true;
        }
    }

    Ok(MoveOutcome {
        board: next,
        points: passes.iter().map(|pass| pass.points).sum(),
        passes,
        initial_size,
        board_regenerated,
    })
}

fn settle(board: &mut Board, groups: Vec<ClearedGroup>, source: &mut dyn CellSource) -> ClearPass {
    for group in &groups {
        board.clear(&group.cells);
    }
    let falls = board.apply_gravity();
    let refills = board.refill(source);

    ClearPass {
        points: groups.iter().map(|group| group.points).sum(),
        groups,
        falls,
        refills,
    }
}
