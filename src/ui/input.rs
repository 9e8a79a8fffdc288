/// Input state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement while a key is held
///   - Edge-triggered actions (turn cycle, restart, quit)
///   - Mouse presses, reported once per press in cell coordinates
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
///
/// Sprint is Shift. Terminals that report no modifiers still deliver
/// uppercase letters, so `W`/`A`/`S`/`D` count as sprinting movement.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode, MouseButton,
    MouseEventKind,
};

use crate::config::LayoutConfig;
use crate::domain::entity::MoveInput;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only matters when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Hold window for edge-triggered keys. Must outlast the OS auto-repeat
/// delay, or the first repeat of a held key reads as a second press.
const EDGE_HOLD_TIMEOUT: Duration = Duration::from_millis(600);

// ── Key bindings ──

pub const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
pub const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
pub const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_SPRINT_LETTERS: &[KeyCode] =
    &[KeyCode::Char('W'), KeyCode::Char('A'), KeyCode::Char('S'), KeyCode::Char('D')];
pub const KEYS_SHIFT: &[KeyCode] = &[
    KeyCode::Modifier(ModifierKeyCode::LeftShift),
    KeyCode::Modifier(ModifierKeyCode::RightShift),
];
pub const KEYS_CYCLE: &[KeyCode] = &[KeyCode::Tab, KeyCode::BackTab];
pub const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
pub const KEYS_QUIT_MENU: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
pub const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
pub const KEYS_BACK: &[KeyCode] = &[KeyCode::Backspace];

fn hold_timeout(code: KeyCode) -> Duration {
    let edge = KEYS_CYCLE.contains(&code)
        || KEYS_RESTART.contains(&code)
        || KEYS_CONFIRM.contains(&code)
        || KEYS_BACK.contains(&code);
    if edge {
        EDGE_HOLD_TIMEOUT
    } else {
        HOLD_TIMEOUT
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Last key event carrying the SHIFT modifier.
    shift_seen: Option<Instant>,

    /// Primary-button presses this frame, as (column, row).
    clicks: Vec<(u16, u16)>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            shift_seen: None,
            clicks: Vec::with_capacity(2),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the scene update.
    pub fn drain_events(&mut self) {
        self.begin_frame();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(ev) => self.handle_event(ev, Instant::now()),
                Err(e) => {
                    log::warn!("terminal event read failed: {e}");
                    break;
                }
            }
        }

        self.expire(Instant::now());
    }

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.clicks.clear();
    }

    fn handle_event(&mut self, ev: Event, now: Instant) {
        match ev {
            Event::Key(key) => self.handle_key(key, now),
            Event::Mouse(mouse) => {
                if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                    self.clicks.push((mouse.column, mouse.row));
                }
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
                if KEYS_SHIFT.contains(&key.code) {
                    self.shift_seen = None;
                }
            }
            KeyEventKind::Release => {
                // Rely on timeout-based expiry instead
            }
            _ => {
                let was_held = self
                    .last_active
                    .get(&key.code)
                    .is_some_and(|t| now.duration_since(*t) < hold_timeout(key.code));
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.shift_seen = Some(now);
                }
            }
        }
    }

    /// Expire keys that have timed out (fallback for terminals without Release)
    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|code, t| now.duration_since(*t) < hold_timeout(*code));
        if self.shift_seen.is_some_and(|t| now.duration_since(t) >= HOLD_TIMEOUT) {
            self.shift_seen = None;
        }
    }

    /// Is this key currently held down? Stale keys were dropped by the
    /// last `expire`.
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.contains_key(&code)
    }

    /// Convenience: is any of these keys held?
    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn sprint_held(&self) -> bool {
        self.shift_seen.is_some() || self.any_held(KEYS_SHIFT) || self.any_held(KEYS_SPRINT_LETTERS)
    }

    /// Movement intent from the held keys.
    pub fn movement(&self) -> MoveInput {
        MoveInput {
            up: self.any_held(KEYS_UP),
            down: self.any_held(KEYS_DOWN),
            left: self.any_held(KEYS_LEFT),
            right: self.any_held(KEYS_RIGHT),
            sprint: self.sprint_held(),
        }
    }

    /// First primary-button press this frame, mapped to the logical pixel
    /// at the center of the clicked cell. `origin` is the canvas's top-left
    /// terminal cell.
    pub fn click(&self, layout: &LayoutConfig, origin: (i32, i32)) -> Option<(i32, i32)> {
        self.clicks.first().map(|&(col, row)| cell_to_pixel(col, row, layout, origin))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

pub fn cell_to_pixel(col: u16, row: u16, layout: &LayoutConfig, origin: (i32, i32)) -> (i32, i32) {
    (
        (col as i32 - origin.0) * layout.px_per_col + layout.px_per_col / 2,
        (row as i32 - origin.1) * layout.px_per_row + layout.px_per_row / 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, MouseEvent};

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn release(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        })
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent { kind, column, row, modifiers: KeyModifiers::NONE })
    }

    #[test]
    fn held_key_is_fresh_only_once() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.handle_event(press(KeyCode::Tab, KeyModifiers::NONE), now);
        assert!(input.any_pressed(KEYS_CYCLE));
        assert!(input.any_held(KEYS_CYCLE));

        input.begin_frame();
        input.handle_event(press(KeyCode::Tab, KeyModifiers::NONE), now);
        assert!(!input.any_pressed(KEYS_CYCLE), "repeat is not a fresh press");
        assert!(input.any_held(KEYS_CYCLE));
    }

    #[test]
    fn release_honored_only_with_enhancement() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.handle_event(press(KeyCode::Char('d'), KeyModifiers::NONE), now);
        input.handle_event(release(KeyCode::Char('d')), now);
        assert!(input.movement().right);

        input.honor_release = true;
        input.handle_event(release(KeyCode::Char('d')), now);
        assert!(!input.movement().right);
    }

    #[test]
    fn keys_expire_without_release() {
        let mut input = InputState::new();
        let then = Instant::now();
        input.handle_event(press(KeyCode::Up, KeyModifiers::NONE), then);
        input.expire(then + HOLD_TIMEOUT);
        assert!(!input.movement().up);
    }

    #[test]
    fn auto_repeat_delay_keeps_one_continuous_hold() {
        use crate::domain::entity::{TurnIndicator, TurnState};
        use crate::domain::geometry::Rect;

        let mut input = InputState::new();
        let mut turn = TurnState::new(3);
        let mut hud = TurnIndicator::new(Rect::new(0, 0, 640, 64), turn).unwrap();
        let t0 = Instant::now();
        let ms = |n: u64| t0 + Duration::from_millis(n);

        // Press at 0, OS repeat starts at 500 and then fires every 33 ms.
        let mut next_repeat = 500;
        for frame in 0..64u64 {
            let now = ms(frame * 16);
            input.begin_frame();
            if frame == 0 {
                input.handle_event(press(KeyCode::Tab, KeyModifiers::NONE), now);
            }
            while next_repeat <= frame * 16 {
                input.handle_event(press(KeyCode::Tab, KeyModifiers::NONE), ms(next_repeat));
                next_repeat += 33;
            }
            input.expire(now);
            assert!(input.any_held(KEYS_CYCLE), "released at frame {frame}");
            hud.update(input.any_held(KEYS_CYCLE), &mut turn);
        }
        assert_eq!(turn.active_player_id, 1);

        // Letting go long enough ends the hold.
        input.expire(ms(64 * 16 + 700));
        assert!(!input.any_held(KEYS_CYCLE));
    }

    #[test]
    fn movement_keys_keep_the_short_window() {
        let mut input = InputState::new();
        let then = Instant::now();
        input.handle_event(press(KeyCode::Left, KeyModifiers::NONE), then);
        input.handle_event(press(KeyCode::Char('r'), KeyModifiers::NONE), then);
        input.expire(then + Duration::from_millis(300));
        assert!(!input.movement().left);
        assert!(input.any_held(KEYS_RESTART));
    }

    #[test]
    fn shift_and_uppercase_sprint() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.handle_event(press(KeyCode::Char('w'), KeyModifiers::SHIFT), now);
        let m = input.movement();
        assert!(m.up && m.sprint);

        let mut input = InputState::new();
        input.handle_event(press(KeyCode::Char('D'), KeyModifiers::NONE), now);
        let m = input.movement();
        assert!(m.right && m.sprint);

        let mut input = InputState::new();
        input.handle_event(press(KeyCode::Char('a'), KeyModifiers::NONE), now);
        assert!(!input.movement().sprint);
    }

    #[test]
    fn left_press_maps_to_cell_center() {
        let mut input = InputState::new();
        let now = Instant::now();
        let layout = LayoutConfig::default();
        input.handle_event(mouse(MouseEventKind::Moved, 1, 1), now);
        input.handle_event(mouse(MouseEventKind::Down(MouseButton::Right), 2, 2), now);
        assert_eq!(input.click(&layout, (0, 0)), None);

        input.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 10, 3), now);
        assert_eq!(input.click(&layout, (0, 0)), Some((168, 112)));
        assert_eq!(input.click(&layout, (9, 1)), Some((24, 80)));

        input.begin_frame();
        assert_eq!(input.click(&layout, (0, 0)), None, "a press is reported for one frame");
    }

    #[test]
    fn ctrl_c_detected() {
        let mut input = InputState::new();
        input.handle_event(press(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(input.ctrl_c_pressed());
    }
}
