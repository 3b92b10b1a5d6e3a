use serde::{Deserialize, Serialize};

use super::state::{
    BoardPhase, BoardState, CardId, CompletionState, GameEvent, IntegrityError,
};

/// 配对失败后卡牌保持翻开的固定时长（毫秒，不可配置）。
pub const LOCK_DELAY_MS: u32 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    CardNotFound { card_id: CardId },
    IntegrityViolation { error: IntegrityError },
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::CardNotFound { card_id } => write!(f, "card {card_id} does not exist"),
            RuleError::IntegrityViolation { error } => {
                write!(f, "board state failed integrity check: {error:?}")
            }
        }
    }
}

impl std::error::Error for RuleError {}

/// 一次操作的统一返回：最新状态、本次产生的事件，以及可能的完局结算。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: BoardState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionState>,
}

impl RuleResolution {
    pub fn new(state: BoardState, events: Vec<GameEvent>) -> Self {
        let completion = state.completion();
        Self {
            state,
            events,
            completion,
        }
    }
}

/// 翻牌状态机的规则引擎。
///
/// 所有被规则忽略的点击（锁定期、已翻开、已配对）都返回空事件而不改动
/// 状态；只有结构性问题（未知的卡牌 id）才作为错误上报。
#[derive(Debug, Default)]
pub struct BoardEngine;

impl BoardEngine {
    pub fn new() -> Self {
        Self
    }

    /// 处理一次对卡牌的点击。
    pub fn reveal(
        &mut self,
        state: &mut BoardState,
        card_id: CardId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let card = *state
            .card(card_id)
            .ok_or(RuleError::CardNotFound { card_id })?;

        // 锁定期间忽略全部输入；判定依据是选中数量而非显式标记。
        if state.phase() == BoardPhase::Locked {
            return Ok(Vec::new());
        }
        // 已翻开或已配对的卡牌点击是幂等的无操作。
        if !card.selectable() {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();

        if let Some(card) = state.card_mut(card_id) {
            card.revealed = true;
        }
        state.steps += 1;
        state.selection.push(card_id);
        events.push(GameEvent::CardRevealed {
            card_id,
            color: card.color,
        });
        events.push(GameEvent::StepCounted { steps: state.steps });

        if state.selection.len() == 2 {
            let first = state.selection[0];
            let second = state.selection[1];
            let matched = state
                .card(first)
                .zip(state.card(second))
                .map(|(a, b)| a.color == b.color)
                .unwrap_or(false);

            if matched {
                for id in [first, second] {
                    if let Some(card) = state.card_mut(id) {
                        card.matched = true;
                    }
                }
                state.selection.clear();
                state.matched_pairs += 1;
                events.push(GameEvent::PairMatched {
                    first,
                    second,
                    matched_pairs: state.matched_pairs,
                });
                if state.is_complete() {
                    events.push(GameEvent::GameCompleted { steps: state.steps });
                }
            } else {
                // 不匹配：两张牌保持翻开，进入 Locked，等待延时回调收起。
                events.push(GameEvent::MismatchLocked { first, second });
            }
        }

        for event in &events {
            state.record_event(event.clone());
        }
        Ok(events)
    }

    /// 延时结束后的收尾：把锁定的两张牌翻回背面。
    ///
    /// 非锁定状态下调用是无操作，因此回调晚到或重复触发都无害。
    pub fn resolve_lock(&mut self, state: &mut BoardState) -> Vec<GameEvent> {
        if state.phase() != BoardPhase::Locked {
            return Vec::new();
        }

        let first = state.selection[0];
        let second = state.selection[1];
        for id in [first, second] {
            if let Some(card) = state.card_mut(id) {
                card.revealed = false;
            }
        }
        state.selection.clear();

        let event = GameEvent::CardsHidden { first, second };
        state.record_event(event.clone());
        vec![event]
    }

    pub fn ensure_integrity(state: &BoardState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::BoardConfig;
    use crate::game::deck::Color;
    use crate::game::state::BoardState;

    const RED: Color = Color { r: 200, g: 0, b: 0 };
    const BLUE: Color = Color { r: 0, g: 0, b: 200 };
    const LIME: Color = Color { r: 0, g: 200, b: 0 };

    /// 2x2 棋盘，固定排列：[红, 蓝, 红, 蓝]。
    fn two_by_two() -> BoardState {
        let config = BoardConfig::new(2, 2, 60, 60).expect("valid config");
        BoardState::from_deck(config, 1, vec![RED, BLUE, RED, BLUE])
    }

    /// 2x3 棋盘，固定排列：[红, 蓝, 绿, 红, 蓝, 绿]。
    fn two_by_three() -> BoardState {
        let config = BoardConfig::new(2, 3, 60, 60).expect("valid config");
        BoardState::from_deck(config, 1, vec![RED, BLUE, LIME, RED, BLUE, LIME])
    }

    #[test]
    fn matching_pair_is_locked_in_and_returns_to_idle() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_two();

        engine.reveal(&mut state, 0).expect("first reveal");
        assert_eq!(state.phase(), BoardPhase::OneSelected);

        let events = engine.reveal(&mut state, 2).expect("second reveal");
        assert_eq!(state.matched_pairs, 1);
        assert_eq!(state.phase(), BoardPhase::Idle);
        assert!(state.card(0).unwrap().matched);
        assert!(state.card(2).unwrap().matched);
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::PairMatched { matched_pairs: 1, .. })));
    }

    #[test]
    fn mismatch_locks_then_resolve_reverts_and_keeps_steps() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_two();

        engine.reveal(&mut state, 0).expect("first reveal");
        let events = engine.reveal(&mut state, 1).expect("second reveal");

        assert_eq!(state.phase(), BoardPhase::Locked);
        assert_eq!(state.steps, 2);
        assert!(state.card(0).unwrap().revealed);
        assert!(state.card(1).unwrap().revealed);
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::MismatchLocked { first: 0, second: 1 })));

        let hidden = engine.resolve_lock(&mut state);
        assert_eq!(
            hidden,
            vec![GameEvent::CardsHidden { first: 0, second: 1 }]
        );
        assert_eq!(state.phase(), BoardPhase::Idle);
        assert!(state.selection.is_empty());
        assert!(!state.card(0).unwrap().revealed);
        assert!(!state.card(1).unwrap().revealed);
        assert_eq!(state.steps, 2, "reverting a mismatch keeps the step count");
    }

    #[test]
    fn clicks_are_ignored_while_locked() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_two();

        engine.reveal(&mut state, 0).expect("first reveal");
        engine.reveal(&mut state, 1).expect("second reveal");
        assert_eq!(state.phase(), BoardPhase::Locked);

        let before = state.clone();
        let events = engine.reveal(&mut state, 2).expect("locked click");
        assert!(events.is_empty());
        assert_eq!(state, before, "locked clicks must not change anything");
    }

    #[test]
    fn revealed_and_matched_cards_are_idempotent_no_ops() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_two();

        engine.reveal(&mut state, 0).expect("first reveal");
        let before = state.clone();
        let events = engine.reveal(&mut state, 0).expect("re-click revealed card");
        assert!(events.is_empty());
        assert_eq!(state, before);

        engine.reveal(&mut state, 2).expect("complete the pair");
        let before = state.clone();
        let events = engine.reveal(&mut state, 0).expect("click matched card");
        assert!(events.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn steps_increase_only_on_reveals_of_face_down_cards() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_two();
        let mut last_steps = 0;

        for card_id in [0, 0, 1, 1, 2] {
            let events = engine.reveal(&mut state, card_id).expect("click");
            assert!(state.steps >= last_steps, "steps must be monotonic");
            let stepped = events
                .iter()
                .any(|event| matches!(event, GameEvent::StepCounted { .. }));
            assert_eq!(stepped, state.steps > last_steps);
            last_steps = state.steps;
            engine.resolve_lock(&mut state);
        }
    }

    #[test]
    fn selection_length_never_exceeds_two() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_three();

        for card_id in 0..state.total_cards() {
            engine.reveal(&mut state, card_id).expect("click");
            assert!(state.selection.len() <= 2);
            BoardEngine::ensure_integrity(&state).expect("state stays sound");
        }
    }

    #[test]
    fn completing_the_board_signals_exactly_one_completion() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_three();
        let mut completions = 0;

        // 完美记忆走法：每对都一次命中。
        for (first, second) in [(0, 3), (1, 4), (2, 5)] {
            engine.reveal(&mut state, first).expect("first of pair");
            let events = engine.reveal(&mut state, second).expect("second of pair");
            completions += events
                .iter()
                .filter(|event| matches!(event, GameEvent::GameCompleted { .. }))
                .count();
        }

        assert!(state.is_complete());
        assert_eq!(completions, 1);
        assert_eq!(state.steps, 2 * state.total_pairs());
        assert_eq!(
            state.completion(),
            Some(CompletionState {
                steps: 6,
                matched_pairs: 3
            })
        );

        // 完局后的点击全部落在已配对的卡上，不再产生任何转移。
        let before = state.clone();
        let events = engine.reveal(&mut state, 0).expect("post-completion click");
        assert!(events.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn imperfect_play_needs_more_steps_than_the_minimum() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_two();

        engine.reveal(&mut state, 0).expect("red");
        engine.reveal(&mut state, 1).expect("blue mismatch");
        engine.resolve_lock(&mut state);
        engine.reveal(&mut state, 0).expect("red again");
        engine.reveal(&mut state, 2).expect("red match");
        engine.reveal(&mut state, 1).expect("blue");
        let events = engine.reveal(&mut state, 3).expect("blue match");

        assert!(state.is_complete());
        assert!(state.steps > 2 * state.total_pairs());
        assert_eq!(state.steps, 6);
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::GameCompleted { steps: 6 })));
    }

    #[test]
    fn resolve_lock_outside_locked_phase_is_a_no_op() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_two();

        assert!(engine.resolve_lock(&mut state).is_empty());

        engine.reveal(&mut state, 0).expect("single reveal");
        let before = state.clone();
        assert!(engine.resolve_lock(&mut state).is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn unknown_card_id_is_a_structural_error() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_two();
        let err = engine.reveal(&mut state, 42).expect_err("out of range");
        assert_eq!(err, RuleError::CardNotFound { card_id: 42 });
        assert_eq!(state.steps, 0);
    }

    #[test]
    fn event_log_mirrors_returned_events() {
        let mut engine = BoardEngine::new();
        let mut state = two_by_two();

        let mut seen = Vec::new();
        seen.extend(engine.reveal(&mut state, 0).expect("click"));
        seen.extend(engine.reveal(&mut state, 1).expect("click"));
        seen.extend(engine.resolve_lock(&mut state));

        assert_eq!(state.event_log, seen);
    }
}
