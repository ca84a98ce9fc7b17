use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use strum_macros::EnumIter;

use super::refill::CellSource;

pub const COLUMNS: usize = 7;
pub const ROWS: usize = 8;

/// Colors a block can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Color {
    Purple,
    Green,
    Blue,
    Yellow,
    Red,
    Pink,
}

impl Color {
    pub const COUNT: usize = 6;

    pub fn from_index(index: usize) -> Color {
        match index % Self::COUNT {
            0 => Color::Purple,
            1 => Color::Green,
            2 => Color::Blue,
            3 => Color::Yellow,
            4 => Color::Red,
            _ => Color::Pink,
        }
    }

    /// Single-letter code used by the text board format
    pub fn code(&self) -> char {
        match self {
            Color::Purple => 'P',
            Color::Green => 'G',
            Color::Blue => 'B',
            Color::Yellow => 'Y',
            Color::Red => 'R',
            Color::Pink => 'K',
        }
    }

    pub fn from_code(code: char) -> Option<Color> {
        match code {
            'P' => Some(Color::Purple),
            'G' => Some(Color::Green),
            'B' => Some(Color::Blue),
            'Y' => Some(Color::Yellow),
            'R' => Some(Color::Red),
            'K' => Some(Color::Pink),
            _ => None,
        }
    }
}

/// A cell coordinate. `y = 0` is the bottom row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(&self) -> bool {
        (0..COLUMNS as i32).contains(&self.x) && (0..ROWS as i32).contains(&self.y)
    }

    /// Neighbours on the hex-offset grid, clipped to the board.
    ///
    /// Every cell touches up, down, left and right. Even rows additionally
    /// touch up-left and down-left, odd rows up-right and down-right.
    pub fn neighbors(&self) -> Vec<Position> {
        let diagonal = if self.y % 2 == 0 { -1 } else { 1 };
        [
            (0, 1),
            (0, -1),
            (1, 0),
            (-1, 0),
            (diagonal, 1),
            (diagonal, -1),
        ]
        .into_iter()
        .map(|(dx, dy)| Position::new(self.x + dx, self.y + dy))
        .filter(Position::in_bounds)
        .collect()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A block that moved down during gravity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fall {
    pub from: Position,
    pub to: Position,
}

/// A cell filled in by the refill source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refill {
    pub position: Position,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardParseError {
    #[error("Expected {ROWS} rows, found {0}")]
    RowCount(usize),
    #[error("Row {row} must have {COLUMNS} cells, found {found}")]
    RowWidth { row: usize, found: usize },
    #[error("Unknown color code '{0}'")]
    UnknownColor(char),
}

/// Fixed 7 x 8 grid of colored cells.
///
/// Empty cells only appear through [`Board::clear`]; the public constructors
/// always produce a full board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Indexed `[y][x]`
    cells: [[Option<Color>; COLUMNS]; ROWS],
}

impl Board {
    pub fn from_rows(rows: [[Color; COLUMNS]; ROWS]) -> Self {
        let mut cells = [[None; COLUMNS]; ROWS];
        for (y, row) in rows.iter().enumerate() {
            for (x, color) in row.iter().enumerate() {
                cells[y][x] = Some(*color);
            }
        }
        Self { cells }
    }

    /// Generates a board with at least one playable group.
    ///
    /// Returns `None` when the source does not produce colors.
    pub fn generate(source: &mut dyn CellSource) -> Option<Board> {
        const MAX_ATTEMPTS: usize = 100;

        let mut last = None;
        for _ in 0..MAX_ATTEMPTS {
            let board = Self::fill_from(source)?;
            if board.has_playable_group() {
                return Some(board);
            }
            last = Some(board);
        }

        // Force a three-run on the third row
        let mut board = last?;
        let color = board.get(Position::new(2, 2))?;
        board.cells[2][3] = Some(color);
        board.cells[2][4] = Some(color);
        Some(board)
    }

    fn fill_from(source: &mut dyn CellSource) -> Option<Board> {
        let mut cells = [[None; COLUMNS]; ROWS];
        for (y, row) in cells.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = Some(source.draw(Position::new(x as i32, y as i32))?);
            }
        }
        Some(Board { cells })
    }

    pub fn get(&self, position: Position) -> Option<Color> {
        if !position.in_bounds() {
            return None;
        }
        self.cells[position.y as usize][position.x as usize]
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_some)
    }

    /// Contiguous same-color group containing `start`
    pub fn group_at(&self, start: Position) -> Vec<Position> {
        let Some(color) = self.get(start) else {
            return Vec::new();
        };
        let mut visited = HashSet::from([start]);
        self.flood(start, color, &mut visited)
    }

    fn flood(&self, start: Position, color: Color, visited: &mut HashSet<Position>) -> Vec<Position> {
        let mut group = Vec::new();
        let mut stack = vec![start];
        visited.insert(start);

        while let Some(position) = stack.pop() {
            group.push(position);
            for next in position.neighbors() {
                if self.get(next) == Some(color) && visited.insert(next) {
                    stack.push(next);
                }
            }
        }

        group.sort();
        group
    }

    /// All groups of at least `min_size` cells, scanned bottom-left first
    pub fn groups(&self, min_size: usize) -> Vec<(Color, Vec<Position>)> {
        let mut visited = HashSet::new();
        let mut groups = Vec::new();

        for y in 0..ROWS as i32 {
            for x in 0..COLUMNS as i32 {
                let position = Position::new(x, y);
                if visited.contains(&position) {
                    continue;
                }
                let Some(color) = self.get(position) else {
                    continue;
                };
                let group = self.flood(position, color, &mut visited);
                if group.len() >= min_size {
                    groups.push((color, group));
                }
            }
        }

        groups
    }

    pub fn has_playable_group(&self) -> bool {
        !self.groups(3).is_empty()
    }

    pub(crate) fn clear(&mut self, positions: &[Position]) {
        for position in positions {
            if position.in_bounds() {
                self.cells[position.y as usize][position.x as usize] = None;
            }
        }
    }

    /// Drops blocks toward `y = 0`, returning every block that moved
    pub(crate) fn apply_gravity(&mut self) -> Vec<Fall> {
        let mut falls = Vec::new();

        for x in 0..COLUMNS {
            let mut target = 0;
            for y in 0..ROWS {
                if let Some(color) = self.cells[y][x] {
                    if y != target {
                        self.cells[target][x] = Some(color);
                        self.cells[y][x] = None;
                        falls.push(Fall {
                            from: Position::new(x as i32, y as i32),
                            to: Position::new(x as i32, target as i32),
                        });
                    }
                    target += 1;
                }
            }
        }

        falls
    }

    /// Fills empty cells column by column, bottom to top. Stops at the first
    /// cell the source declines to fill.
    pub(crate) fn refill(&mut self, source: &mut dyn CellSource) -> Vec<Refill> {
        let mut refilled = Vec::new();

        for x in 0..COLUMNS {
            for y in 0..ROWS {
                if self.cells[y][x].is_some() {
                    continue;
                }
                let position = Position::new(x as i32, y as i32);
                match source.draw(position) {
                    Some(color) => {
                        self.cells[y][x] = Some(color);
                        refilled.push(Refill { position, color });
                    }
                    None => return refilled,
                }
            }
        }

        refilled
    }
}

/// Text format: one line per row, top row (`y = 7`) first, one color code per cell
impl FromStr for Board {
    type Err = BoardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<&str> = s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.len() != ROWS {
            return Err(BoardParseError::RowCount(lines.len()));
        }

        let mut cells = [[None; COLUMNS]; ROWS];
        for (line_index, line) in lines.iter().enumerate() {
            let y = ROWS - 1 - line_index;
            let codes: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if codes.len() != COLUMNS {
                return Err(BoardParseError::RowWidth {
                    row: y,
                    found: codes.len(),
                });
            }
            for (x, code) in codes.into_iter().enumerate() {
                cells[y][x] = Some(Color::from_code(code).ok_or(BoardParseError::UnknownColor(code))?);
            }
        }

        Ok(Board { cells })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..ROWS).rev() {
            let line: String = self.cells[y]
                .iter()
                .map(|cell| cell.map(|c| c.code()).unwrap_or('.'))
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
