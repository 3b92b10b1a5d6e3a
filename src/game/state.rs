use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use rand::Rng;

use super::config::{BoardConfig, ConfigError};
use super::deck::{build_deck, Color};

/// 卡牌标识（棋盘内的连续下标）。
pub type CardId = u32;
/// 对局代号，用于作废过期的延时回调。
pub type SessionId = u32;

/// 网格中的一张卡牌：翻开前隐藏自己的颜色。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub color: Color,
    #[serde(default)]
    pub revealed: bool,
    #[serde(default)]
    pub matched: bool,
}

impl Card {
    pub fn face_down(id: CardId, color: Color) -> Self {
        Self {
            id,
            color,
            revealed: false,
            matched: false,
        }
    }

    /// 卡牌是否仍可作为比较的候选。
    pub fn selectable(&self) -> bool {
        !self.revealed && !self.matched
    }
}

/// 交互状态机的阶段，由当前选中数量导出，不使用独立的锁标记。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BoardPhase {
    Idle,
    OneSelected,
    Locked,
}

/// 对局事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    CardRevealed {
        card_id: CardId,
        color: Color,
    },
    StepCounted {
        steps: u32,
    },
    PairMatched {
        first: CardId,
        second: CardId,
        matched_pairs: u32,
    },
    MismatchLocked {
        first: CardId,
        second: CardId,
    },
    CardsHidden {
        first: CardId,
        second: CardId,
    },
    GameCompleted {
        steps: u32,
    },
}

/// 对局完成的结算信息。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionState {
    pub steps: u32,
    pub matched_pairs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    CardCountMismatch { expected: u32, actual: u32 },
    NonContiguousCardId { card_id: CardId },
    SelectionOverflow { len: u32 },
    SelectionNotRevealed { card_id: CardId },
    OddColorMultiplicity { color: Color, count: u32 },
    MatchedPairsMismatch { counted: u32, recorded: u32 },
}

/// 一局记忆翻牌游戏的全部状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardState {
    pub config: BoardConfig,
    pub session: SessionId,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub selection: Vec<CardId>,
    #[serde(default)]
    pub matched_pairs: u32,
    #[serde(default)]
    pub steps: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
}

impl BoardState {
    /// 校验配置、发牌并洗牌，生成一局全新的对局状态。
    pub fn deal<R: Rng + ?Sized>(
        config: BoardConfig,
        session: SessionId,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let deck = build_deck(config.total_pairs(), rng);
        Ok(Self::from_deck(config, session, deck))
    }

    /// 用已就绪的牌堆构建状态；牌堆按顺序消耗，每张卡一个颜色。
    pub fn from_deck(config: BoardConfig, session: SessionId, deck: Vec<Color>) -> Self {
        let cards = deck
            .into_iter()
            .enumerate()
            .map(|(index, color)| Card::face_down(index as CardId, color))
            .collect();
        Self {
            config,
            session,
            cards,
            selection: Vec::new(),
            matched_pairs: 0,
            steps: 0,
            event_log: Vec::new(),
        }
    }

    pub fn total_cards(&self) -> u32 {
        self.config.total_cards()
    }

    pub fn total_pairs(&self) -> u32 {
        self.config.total_pairs()
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(id as usize)
    }

    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.get_mut(id as usize)
    }

    /// 当前阶段由选中数量唯一决定。
    pub fn phase(&self) -> BoardPhase {
        match self.selection.len() {
            0 => BoardPhase::Idle,
            1 => BoardPhase::OneSelected,
            _ => BoardPhase::Locked,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.matched_pairs == self.total_pairs()
    }

    pub fn completion(&self) -> Option<CompletionState> {
        if self.is_complete() {
            Some(CompletionState {
                steps: self.steps,
                matched_pairs: self.matched_pairs,
            })
        } else {
            None
        }
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let expected = self.total_cards();
        if self.cards.len() as u32 != expected {
            return Err(IntegrityError::CardCountMismatch {
                expected,
                actual: self.cards.len() as u32,
            });
        }
        for (index, card) in self.cards.iter().enumerate() {
            if card.id != index as CardId {
                return Err(IntegrityError::NonContiguousCardId { card_id: card.id });
            }
        }
        if self.selection.len() > 2 {
            return Err(IntegrityError::SelectionOverflow {
                len: self.selection.len() as u32,
            });
        }
        for card_id in &self.selection {
            let selected = self.card(*card_id).filter(|card| card.revealed);
            if selected.is_none() {
                return Err(IntegrityError::SelectionNotRevealed { card_id: *card_id });
            }
        }

        let mut counts: HashMap<Color, u32> = HashMap::new();
        for card in &self.cards {
            *counts.entry(card.color).or_insert(0) += 1;
        }
        for (color, count) in counts {
            if count % 2 != 0 {
                return Err(IntegrityError::OddColorMultiplicity { color, count });
            }
        }

        let matched_cards = self.cards.iter().filter(|card| card.matched).count() as u32;
        if matched_cards != self.matched_pairs * 2 {
            return Err(IntegrityError::MatchedPairsMismatch {
                counted: matched_cards / 2,
                recorded: self.matched_pairs,
            });
        }
        Ok(())
    }

    /// 返回一个确定性的 2x2 示例对局，方便前端调试或测试使用。
    pub fn sample() -> Self {
        use rand::rngs::SmallRng;
        use rand::SeedableRng;

        let config = BoardConfig {
            rows: 2,
            cols: 2,
            card_width: 100,
            card_height: 100,
        };
        let mut rng = SmallRng::seed_from_u64(0x5EED);
        Self::deal(config, 0, &mut rng).unwrap_or_else(|_| {
            // 2x2 配置恒为合法，此分支不可达。
            Self::from_deck(config, 0, Vec::new())
        })
    }
}
