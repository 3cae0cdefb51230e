use serde::{Deserialize, Serialize};

/// Layout of the AprilGrid used as the multi-view marker target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub tag_rows: usize,
    pub tag_cols: usize,
    pub first_id: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            tag_rows: 6,
            tag_cols: 6,
            first_id: 0,
        }
    }
}

pub struct Board {
    num_tags: u32,
    first_id: u32,
}

impl Board {
    pub fn from_config(board_config: &BoardConfig) -> Board {
        Board {
            num_tags: (board_config.tag_rows * board_config.tag_cols) as u32,
            first_id: board_config.first_id,
        }
    }

    /// Each tag contributes its four corners.
    pub fn corners_per_board(&self) -> usize {
        self.num_tags as usize * 4
    }

    /// Board-local corner index of corner `corner` (0..4) of tag `tag_id`,
    /// or `None` for tags that do not belong to this board.
    pub fn corner_index(&self, tag_id: u32, corner: usize) -> Option<usize> {
        let local = tag_id.checked_sub(self.first_id)?;
        if local >= self.num_tags || corner >= 4 {
            return None;
        }
        Some(local as usize * 4 + corner)
    }
}

pub fn create_default_6x6_board() -> Board {
    Board::from_config(&BoardConfig::default())
}
