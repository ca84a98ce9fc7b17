use crate::config::ScoringConfig;

/// Points earned for clearing a single group of `size` cells.
///
/// Groups below three cells are never cleared by a pop and score nothing.
pub fn points_for_group(size: usize, config: &ScoringConfig) -> u32 {
    match size {
        0..=2 => 0,
        3 => config.three_cells,
        4 => config.four_cells,
        5 => config.five_cells,
        _ => config.five_cells + config.bonus_per_extra_cell * (size as u32 - 5),
    }
}

/// Points for a bomb blast of `size` cells
pub fn points_for_blast(size: usize, config: &ScoringConfig) -> u32 {
    points_for_group(size, config) * config.bomb_multiplier
}
