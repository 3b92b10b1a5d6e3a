use serde::{Deserialize, Serialize};
use std::fmt;

/// 卡牌边长的最小像素值。
pub const MIN_CARD_EDGE: u32 = 50;

/// 棋盘配置（行列数与单张卡牌的像素尺寸）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardConfig {
    pub rows: u32,
    pub cols: u32,
    pub card_width: u32,
    pub card_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ConfigError {
    GridEmpty {
        rows: u32,
        cols: u32,
    },
    CardTooSmall {
        card_width: u32,
        card_height: u32,
        minimum: u32,
    },
    OddCardCount {
        total_cards: u32,
    },
    GridTooLarge {
        rows: u32,
        cols: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::GridEmpty { rows, cols } => write!(
                f,
                "Please enter at least one row and one column (got {rows}x{cols})."
            ),
            ConfigError::CardTooSmall {
                card_width,
                card_height,
                minimum,
            } => write!(
                f,
                "Card dimensions must be at least {minimum}px (got {card_width}x{card_height})."
            ),
            ConfigError::OddCardCount { total_cards } => write!(
                f,
                "Please choose dimensions that result in an even number of total cards (got {total_cards})."
            ),
            ConfigError::GridTooLarge { rows, cols } => {
                write!(f, "The grid is too large to build ({rows}x{cols}).")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl BoardConfig {
    pub fn new(
        rows: u32,
        cols: u32,
        card_width: u32,
        card_height: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            rows,
            cols,
            card_width,
            card_height,
        };
        config.validate()?;
        Ok(config)
    }

    /// 校验配置；任何违例都会在创建对局状态之前被拒绝。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < 1 || self.cols < 1 {
            return Err(ConfigError::GridEmpty {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.card_width < MIN_CARD_EDGE || self.card_height < MIN_CARD_EDGE {
            return Err(ConfigError::CardTooSmall {
                card_width: self.card_width,
                card_height: self.card_height,
                minimum: MIN_CARD_EDGE,
            });
        }
        let total_cards = self
            .rows
            .checked_mul(self.cols)
            .ok_or(ConfigError::GridTooLarge {
                rows: self.rows,
                cols: self.cols,
            })?;
        if total_cards % 2 != 0 {
            return Err(ConfigError::OddCardCount { total_cards });
        }
        Ok(())
    }

    // 饱和乘法：已通过校验的配置不会触及饱和，未校验的也不会在此崩溃。
    pub fn total_cards(&self) -> u32 {
        self.rows.saturating_mul(self.cols)
    }

    pub fn total_pairs(&self) -> u32 {
        self.total_cards() / 2
    }
}
