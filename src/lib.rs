pub mod game;
pub mod render;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;
use web_sys::HtmlCanvasElement;

pub use game::{
    BoardConfig, BoardEngine, BoardPhase, BoardState, Card, CardId, Color, CompletionState,
    ConfigError, GameEvent, IntegrityError, RuleError, RuleResolution, SessionId, LOCK_DELAY_MS,
    MIN_CARD_EDGE,
};
pub use render::{QuadRenderer, RenderError, Transform};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

// 配置错误直接携带面向用户的提示文案，前端可以原样弹出。
fn config_error_to_js(error: ConfigError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn resolution_from_events(state: &BoardState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state.clone(), events)
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// 棋盘控制器：持有对局状态、每张卡的渲染器与会话代号。
///
/// 前端胶水层负责建格子、递画布、转发点击；所有状态转移都发生在这里。
#[wasm_bindgen]
pub struct MatchBoard {
    state: BoardState,
    engine: BoardEngine,
    renderers: Vec<Option<QuadRenderer>>,
    generation: SessionId,
    rng: SmallRng,
}

#[wasm_bindgen]
impl MatchBoard {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, seed: Option<u64>) -> Result<MatchBoard, JsValue> {
        let config: BoardConfig = serde_json::from_str(config_json).map_err(serde_to_js_error)?;
        let mut rng = make_rng(seed);
        let generation: SessionId = 1;
        let state = BoardState::deal(config, generation, &mut rng).map_err(config_error_to_js)?;
        let renderers = (0..state.total_cards()).map(|_| None).collect();
        Ok(MatchBoard {
            state,
            engine: BoardEngine::new(),
            renderers,
            generation,
            rng,
        })
    }

    /// 开始新对局：会话代号递增，使仍在延时中的旧回调全部失效。
    ///
    /// 不传配置时沿用上一局的配置重新发牌。
    pub fn new_game(&mut self, config_json: Option<String>) -> Result<String, JsValue> {
        let config: BoardConfig = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => self.state.config,
        };
        self.generation += 1;
        self.state =
            BoardState::deal(config, self.generation, &mut self.rng).map_err(config_error_to_js)?;
        self.renderers = (0..self.state.total_cards()).map(|_| None).collect();
        make_resolution_json(resolution_from_events(&self.state, Vec::new()))
    }

    /// 为一张卡绑定画布并画出背面。
    ///
    /// 渲染管线创建失败只禁用这一张卡（记入控制台），棋盘其余部分不受影响。
    pub fn bind_canvas(&mut self, card_id: CardId, canvas: HtmlCanvasElement) -> bool {
        let index = card_id as usize;
        if index >= self.renderers.len() {
            utils::log_error(&format!("bind_canvas: card {card_id} does not exist"));
            return false;
        }
        match QuadRenderer::new(&canvas) {
            Ok(renderer) => {
                renderer.draw_idle();
                self.renderers[index] = Some(renderer);
                true
            }
            Err(error) => {
                utils::log_error(&format!("card {card_id} disabled: {error}"));
                self.renderers[index] = None;
                false
            }
        }
    }

    /// 处理一次点击：推进状态机并重绘受影响的卡面。
    pub fn reveal(&mut self, card_id: CardId) -> Result<String, JsValue> {
        // 没有渲染器的卡牌在本局内保持惰性，点击不产生任何效果。
        if self.state.card(card_id).is_some()
            && self.renderers.get(card_id as usize).map_or(true, Option::is_none)
        {
            utils::log_warn(&format!("card {card_id} is inert, click ignored"));
            return make_resolution_json(resolution_from_events(&self.state, Vec::new()));
        }

        let events = self
            .engine
            .reveal(&mut self.state, card_id)
            .map_err(to_js_error)?;
        self.repaint(&events);
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    /// 返回一个在固定延时后兑现的 Promise，值为调度时刻的会话代号。
    ///
    /// 胶水层在 Promise 兑现后调用 [`MatchBoard::resolve_lock`] 并传回该代号。
    pub fn schedule_unlock(&self) -> Promise {
        let generation = self.generation;
        future_to_promise(async move {
            TimeoutFuture::new(LOCK_DELAY_MS).await;
            Ok(JsValue::from_f64(f64::from(generation)))
        })
    }

    /// 延时回调的落点：仅当会话代号仍然是当前对局时才收起卡牌。
    pub fn resolve_lock(&mut self, generation: SessionId) -> Result<String, JsValue> {
        if generation != self.generation {
            utils::log_warn(&format!(
                "stale unlock callback for session {generation} ignored (current {})",
                self.generation
            ));
            return make_resolution_json(resolution_from_events(&self.state, Vec::new()));
        }
        let events = self.engine.resolve_lock(&mut self.state);
        self.repaint(&events);
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn steps(&self) -> u32 {
        self.state.steps
    }

    pub fn matched_pairs(&self) -> u32 {
        self.state.matched_pairs
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn generation(&self) -> SessionId {
        self.generation
    }

    fn repaint(&self, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::CardRevealed { card_id, color } => {
                    if let Some(renderer) = self.renderer(*card_id) {
                        renderer.draw_revealed(color.normalized());
                    }
                }
                GameEvent::CardsHidden { first, second } => {
                    for card_id in [*first, *second] {
                        if let Some(renderer) = self.renderer(card_id) {
                            renderer.draw_idle();
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn renderer(&self, card_id: CardId) -> Option<&QuadRenderer> {
        self.renderers
            .get(card_id as usize)
            .and_then(Option::as_ref)
    }
}

/// 校验棋盘配置；违例时返回面向用户的提示文案。
#[wasm_bindgen(js_name = "validateConfig")]
pub fn validate_config(config: JsValue) -> Result<(), JsValue> {
    let config: BoardConfig = from_value(config).map_err(JsValue::from)?;
    config.validate().map_err(config_error_to_js)
}

/// 用给定配置发一局新牌并返回完整状态。
#[wasm_bindgen(js_name = "createSession")]
pub fn create_session(config: JsValue, seed: Option<u64>) -> Result<JsValue, JsValue> {
    let config: BoardConfig = from_value(config).map_err(JsValue::from)?;
    let mut rng = make_rng(seed);
    let state = BoardState::deal(config, 0, &mut rng).map_err(config_error_to_js)?;
    to_value(&state).map_err(JsValue::from)
}

/// 返回一个确定性的示例对局，方便前端调试或初始化。
#[wasm_bindgen(js_name = "sampleSession")]
pub fn sample_session() -> Result<JsValue, JsValue> {
    to_value(&BoardState::sample()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "revealCard")]
pub fn reveal_card(state: JsValue, card_id: CardId) -> Result<JsValue, JsValue> {
    let mut state: BoardState = from_value(state).map_err(JsValue::from)?;
    let mut engine = BoardEngine::new();
    match engine.reveal(&mut state, card_id) {
        Ok(events) => to_value(&RuleResolution::new(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "resolveLock")]
pub fn resolve_lock(state: JsValue) -> Result<JsValue, JsValue> {
    let mut state: BoardState = from_value(state).map_err(JsValue::from)?;
    let mut engine = BoardEngine::new();
    let events = engine.resolve_lock(&mut state);
    to_value(&RuleResolution::new(state, events)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: BoardState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

/// 配对失败后卡牌保持翻开的固定时长（毫秒）。
#[wasm_bindgen(js_name = "lockDelayMs")]
pub fn lock_delay_ms() -> u32 {
    LOCK_DELAY_MS
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_JSON: &str = r#"{"rows":2,"cols":2,"card_width":60,"card_height":60}"#;

    /// 直接驱动内部引擎把棋盘带入锁定态（测试里没有可绑定的画布）。
    fn locked_board() -> MatchBoard {
        let mut board = MatchBoard::new(CONFIG_JSON, Some(11)).expect("board should build");
        let first: CardId = 0;
        let second = (1..board.state.total_cards())
            .find(|id| {
                board.state.card(*id).map(|card| card.color)
                    != board.state.card(first).map(|card| card.color)
            })
            .expect("a 2x2 deck always holds a second color");

        board
            .engine
            .reveal(&mut board.state, first)
            .expect("first reveal");
        board
            .engine
            .reveal(&mut board.state, second)
            .expect("second reveal");
        assert_eq!(board.state.phase(), BoardPhase::Locked);
        board
    }

    #[test]
    fn stale_generation_unlock_leaves_the_new_board_untouched() {
        let mut board = locked_board();
        let stale = board.generation();

        board.new_game(None).expect("restart should succeed");
        let fresh = board.state.clone();

        board
            .resolve_lock(stale)
            .expect("stale unlock resolves quietly");
        assert_eq!(
            board.state, fresh,
            "superseded callback must not mutate the new board"
        );
        assert_eq!(board.state.phase(), BoardPhase::Idle);
        assert_eq!(board.state.steps, 0);
    }

    #[test]
    fn current_generation_unlock_still_hides_the_pair() {
        let mut board = locked_board();
        let json = board
            .resolve_lock(board.generation())
            .expect("current unlock should succeed");

        assert_eq!(board.state.phase(), BoardPhase::Idle);
        assert!(board.state.cards.iter().all(|card| !card.revealed));
        assert!(json.contains("CardsHidden"));
    }

    #[test]
    fn new_game_bumps_the_generation() {
        let mut board = MatchBoard::new(CONFIG_JSON, Some(3)).expect("board should build");
        let before = board.generation();
        board.new_game(None).expect("restart should succeed");
        assert_eq!(board.generation(), before + 1);
    }
}
