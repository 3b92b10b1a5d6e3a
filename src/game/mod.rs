//! 记忆翻牌游戏核心模块（配置、发牌、棋盘状态与规则引擎）。

pub mod config;
pub mod deck;
pub mod rules;
pub mod state;

pub use config::{BoardConfig, ConfigError, MIN_CARD_EDGE};
pub use deck::{build_deck, generate_pairs, Color, ParseColorError};
pub use rules::{BoardEngine, RuleError, RuleResolution, LOCK_DELAY_MS};
pub use state::{
    BoardPhase,
    BoardState,
    Card,
    CardId,
    CompletionState,
    GameEvent,
    IntegrityError,
    SessionId,
};
