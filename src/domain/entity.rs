/// Entities: Wall, Gate, Button, Player, WinZone and the HUD widgets.
/// Each owns its bounds and state; cross-entity reads go through the
/// slices the step function hands in, never through shared globals.
///
/// Colors are derived once at construction so an invalid id fails the
/// level load instead of surfacing mid-frame.

use std::time::{Duration, Instant};

use super::color::{button_color, player_color, Rgba};
use super::geometry::{Rect, Vec2};
use super::physics::{self, MoveOutcome};
use super::rules;
use super::tile::{LogicKind, MAX_PLAYERS};
use crate::error::Result;

// ── Render description ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Shape {
    /// Filled rectangle.
    Solid,
    /// Outline only, `width` pixels thick.
    Frame { width: i32 },
    /// Outline with a see-through lattice (open gate).
    Grate { width: i32 },
}

/// What an entity wants shown. Derived purely from entity state;
/// the presenter decides how to draw it.
#[derive(Clone, PartialEq, Debug)]
pub struct Appearance {
    pub rect: Rect,
    pub color: Rgba,
    pub shape: Shape,
    /// Secondary framed square drawn inside `rect` (AND gates).
    pub inner: Option<Rect>,
    /// Text, one entry per line.
    pub label: Vec<String>,
    pub label_color: Rgba,
}

impl Appearance {
    fn plain(rect: Rect, color: Rgba, shape: Shape) -> Self {
        Appearance { rect, color, shape, inner: None, label: vec![], label_color: color }
    }

    fn with_label(mut self, text: impl Into<String>, color: Rgba) -> Self {
        self.label = text.into().lines().map(str::to_string).collect();
        self.label_color = color;
        self
    }
}

// ── Turn state ──

/// Which player takes input, and how many there are to cycle through.
/// Lives on the level scene; reset whenever a level is (re)built.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TurnState {
    pub active_player_id: u8,
    pub number_players: u8,
}

impl TurnState {
    pub fn new(number_players: u8) -> Self {
        TurnState { active_player_id: 0, number_players }
    }

    /// Advance to the next player, wrapping. No-op without players.
    pub fn advance(&mut self) {
        if self.number_players > 0 {
            self.active_player_id = (self.active_player_id + 1) % self.number_players;
        }
    }
}

// ── Wall ──

#[derive(Clone, Debug)]
pub struct Wall {
    pub rect: Rect,
}

impl Wall {
    pub fn new(rect: Rect) -> Self {
        Wall { rect }
    }

    pub fn appearance(&self) -> Appearance {
        Appearance::plain(self.rect, Rgba::WHITE, Shape::Solid)
    }
}

// ── Button ──

#[derive(Clone, Debug)]
pub struct Button {
    pub button_id: u8,
    pub rect: Rect,
    pub active: bool,
    idle_color: Rgba,
    pressed_color: Rgba,
}

impl Button {
    pub fn new(rect: Rect, button_id: u8) -> Result<Self> {
        Ok(Button {
            button_id,
            rect,
            active: false,
            idle_color: button_color(button_id, false)?,
            pressed_color: button_color(button_id, true)?,
        })
    }

    /// Set `active` from overlap with any player. Returns true when the
    /// flag changed this call.
    pub fn collide(&mut self, players: &[Player]) -> bool {
        let was = self.active;
        self.active = players.iter().any(|p| p.rect.intersects(&self.rect));
        self.active != was
    }

    pub fn appearance(&self) -> Appearance {
        let color = if self.active { self.pressed_color } else { self.idle_color };
        Appearance::plain(self.rect, color, Shape::Frame { width: self.rect.w / 4 })
    }
}

// ── Gate ──

#[derive(Clone, Debug)]
pub struct Gate {
    pub gate_id: u8,
    pub kind: LogicKind,
    pub rect: Rect,
    pub active: bool,
    closed_color: Rgba,
    open_color: Rgba,
}

impl Gate {
    /// New gates start closed; the first logic pass opens those whose
    /// condition already holds.
    pub fn new(rect: Rect, gate_id: u8, kind: LogicKind) -> Result<Self> {
        Ok(Gate {
            gate_id,
            kind,
            rect,
            active: false,
            closed_color: button_color(gate_id, true)?,
            open_color: button_color(gate_id, false)?,
        })
    }

    /// Recompute `active` from every button sharing this gate's id.
    /// Returns true when the gate opened or closed.
    pub fn logic_update(&mut self, buttons: &[Button]) -> bool {
        let inputs = buttons
            .iter()
            .filter(|b| b.button_id == self.gate_id)
            .map(|b| b.active);
        let active = rules::gate_output(self.kind, inputs);
        let changed = active != self.active;
        self.active = active;
        changed
    }

    /// A closed gate behaves exactly like a wall.
    pub fn is_blocking(&self) -> bool {
        !self.active
    }

    pub fn appearance(&self) -> Appearance {
        let color = if self.active { self.open_color } else { self.closed_color };
        let width = self.rect.w / 8;
        let shape = if self.active { Shape::Grate { width } } else { Shape::Frame { width } };
        let mut look = Appearance::plain(self.rect, color, shape);
        if self.kind == LogicKind::And {
            look.inner = Some(self.rect.inset(self.rect.w / 4));
        }
        look
    }
}

// ── Player ──

/// Movement intent for one frame, already decoded from keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
}

impl MoveInput {
    /// Unit direction vector; diagonals are normalized so speed is isotropic.
    pub fn direction(&self) -> Vec2 {
        let mut v = Vec2::ZERO;
        if self.up {
            v.y -= 1.0;
        }
        if self.left {
            v.x -= 1.0;
        }
        if self.down {
            v.y += 1.0;
        }
        if self.right {
            v.x += 1.0;
        }
        v.normalized()
    }

    /// Either source holding a direction holds it (keyboard plus gamepad).
    pub fn union(self, other: MoveInput) -> MoveInput {
        MoveInput {
            up: self.up || other.up,
            down: self.down || other.down,
            left: self.left || other.left,
            right: self.right || other.right,
            sprint: self.sprint || other.sprint,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub player_id: u8,
    pub rect: Rect,
    pub base_speed: i32,
    color: Rgba,
}

impl Player {
    pub fn new(rect: Rect, player_id: u8, base_speed: i32) -> Result<Self> {
        Ok(Player { player_id, rect, base_speed, color: player_color(player_id)? })
    }

    /// Speed for this frame before collision: doubled by sprint, halved
    /// when crowded by another player.
    pub fn frame_speed(&self, sprint: bool, crowded: bool) -> f32 {
        let mut speed = self.base_speed as f32;
        if sprint {
            speed *= 2.0;
        }
        if crowded {
            speed *= 0.5;
        }
        speed
    }

    /// Move under input, sliding along blocking rects. `crowded` means
    /// another player overlaps this one at the start of the frame.
    pub fn update(&mut self, input: &MoveInput, crowded: bool, blocking: &[Rect]) -> MoveOutcome {
        let speed = self.frame_speed(input.sprint, crowded);
        let (rect, outcome) = physics::move_and_collide(self.rect, input.direction(), speed, blocking);
        self.rect = rect;
        outcome
    }

    pub fn appearance(&self) -> Appearance {
        Appearance::plain(self.rect, self.color, Shape::Solid)
    }
}

// ── Win zone ──

#[derive(Clone, Debug)]
pub struct WinZone {
    pub kind: LogicKind,
    pub rect: Rect,
    pub players_present: usize,
    satisfied: bool,
    number_players: usize,
}

impl WinZone {
    pub fn new(rect: Rect, kind: LogicKind, number_players: usize) -> Self {
        WinZone { kind, rect, players_present: 0, satisfied: false, number_players }
    }

    /// Count overlapping players. The condition is only re-evaluated when
    /// the count changes, and a win is reported only when it flips from
    /// unsatisfied to satisfied. Returns true on that edge.
    pub fn collide(&mut self, players: &[Player], number_players: usize) -> bool {
        self.number_players = number_players;
        let present = players.iter().filter(|p| p.rect.intersects(&self.rect)).count();
        if present == self.players_present {
            return false;
        }
        self.players_present = present;
        let now = rules::win_condition_met(self.kind, present, number_players);
        let fired = now && !self.satisfied;
        self.satisfied = now;
        fired
    }

    pub fn appearance(&self) -> Appearance {
        let text = format!("{}/{}", self.players_present, self.number_players);
        Appearance::plain(self.rect, Rgba::WIN_ZONE, Shape::Solid).with_label(text, Rgba::WIN_TEXT)
    }
}

// ── HUD: timer ──

#[derive(Clone, Debug)]
pub struct GameTimer {
    pub rect: Rect,
    started: Instant,
    elapsed: Duration,
}

impl GameTimer {
    pub fn new(rect: Rect, started: Instant) -> Self {
        GameTimer { rect, started, elapsed: Duration::ZERO }
    }

    pub fn update(&mut self, now: Instant) {
        self.elapsed = now.saturating_duration_since(self.started);
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn appearance(&self) -> Appearance {
        let text = format!("{:.2} seconds", self.elapsed.as_secs_f64());
        Appearance::plain(self.rect, Rgba::WHITE, Shape::Frame { width: 0 }).with_label(text, Rgba::WHITE)
    }
}

// ── HUD: turn indicator ──

/// Shows whose turn it is and cycles the turn on a key-down edge.
#[derive(Clone, Debug)]
pub struct TurnIndicator {
    pub rect: Rect,
    /// Cycle key state seen last frame, for edge detection.
    cycle_held: bool,
    shown: TurnState,
    palette: Vec<Rgba>,
}

impl TurnIndicator {
    pub fn new(rect: Rect, turn: TurnState) -> Result<Self> {
        let palette = (0..MAX_PLAYERS).map(player_color).collect::<Result<Vec<_>>>()?;
        Ok(TurnIndicator { rect, cycle_held: false, shown: turn, palette })
    }

    /// Advance the turn on a fresh press of the cycle key (held-repeat
    /// never cycles twice). Returns true when the turn changed.
    pub fn update(&mut self, cycle_down: bool, turn: &mut TurnState) -> bool {
        let edge = cycle_down && !self.cycle_held;
        self.cycle_held = cycle_down;
        if edge {
            turn.advance();
        }
        let changed = self.shown != *turn;
        self.shown = *turn;
        changed
    }

    pub fn appearance(&self) -> Appearance {
        let color = self
            .palette
            .get(self.shown.active_player_id as usize)
            .copied()
            .unwrap_or(Rgba::WHITE);
        let text = format!(
            "Player {}/{}   Use TAB to switch",
            self.shown.active_player_id as u32 + 1,
            self.shown.number_players
        );
        Appearance::plain(self.rect, color, Shape::Frame { width: 8 }).with_label(text, color)
    }
}

// ── UI: text button ──

/// Clickable menu button carrying the action it triggers.
#[derive(Clone, Debug)]
pub struct TextButton<A: Copy> {
    pub rect: Rect,
    pub text: String,
    pub action: A,
}

impl<A: Copy> TextButton<A> {
    pub fn new(rect: Rect, text: impl Into<String>, action: A) -> Self {
        TextButton { rect, text: text.into(), action }
    }

    /// Action if a primary click landed inside this button.
    pub fn click(&self, mouse: Option<(i32, i32)>) -> Option<A> {
        match mouse {
            Some((x, y)) if self.rect.contains_point(x, y) => Some(self.action),
            _ => None,
        }
    }

    pub fn appearance(&self) -> Appearance {
        Appearance::plain(self.rect, Rgba::MENU_BUTTON, Shape::Frame { width: 8 })
            .with_label(self.text.clone(), Rgba::MENU_BUTTON)
    }
}

// ── UI: statistics panel ──

#[derive(Clone, Debug)]
pub struct StatisticsPanel {
    pub rect: Rect,
    pub entries: Vec<(String, String)>,
}

impl StatisticsPanel {
    pub fn new(rect: Rect, entries: Vec<(String, String)>) -> Self {
        StatisticsPanel { rect, entries }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["You have won!".to_string(), String::new()];
        lines.extend(self.entries.iter().map(|(k, v)| format!("{k} - {v}")));
        lines
    }

    pub fn appearance(&self) -> Appearance {
        let mut look = Appearance::plain(self.rect, Rgba::WHITE, Shape::Frame { width: 8 });
        look.label = self.lines();
        look.label_color = Rgba::VICTORY;
        look
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_at(id: u8, x: i32, y: i32) -> Player {
        Player::new(Rect::new(x, y, 48, 48), id, 6).unwrap()
    }

    fn button_at(id: u8, x: i32, y: i32) -> Button {
        Button::new(Rect::new(x, y, 32, 32), id).unwrap()
    }

    #[test]
    fn button_toggles_on_overlap_edges() {
        let mut b = button_at(0, 100, 100);
        let mut players = vec![player_at(0, 0, 0)];
        assert!(!b.collide(&players));
        assert!(!b.active);

        players[0].rect = Rect::new(90, 90, 48, 48);
        assert!(b.collide(&players), "press is a change");
        assert!(b.active);
        assert!(!b.collide(&players), "holding is not a change");

        players[0].rect = Rect::new(0, 0, 48, 48);
        assert!(b.collide(&players));
        assert!(!b.active);
    }

    #[test]
    fn button_stays_pressed_while_any_player_overlaps() {
        let mut b = button_at(0, 100, 100);
        let mut players = vec![player_at(0, 90, 90), player_at(1, 100, 100)];
        b.collide(&players);
        assert!(b.active);
        players[0].rect = Rect::new(0, 0, 48, 48);
        assert!(!b.collide(&players));
        assert!(b.active);
    }

    #[test]
    fn gate_or_and_with_matching_buttons() {
        let mut a = button_at(3, 0, 0);
        let b = button_at(3, 100, 0);
        let other = button_at(4, 200, 0);
        a.active = true;

        let mut or_gate = Gate::new(Rect::new(0, 0, 64, 64), 3, LogicKind::Or).unwrap();
        let mut and_gate = Gate::new(Rect::new(0, 0, 64, 64), 3, LogicKind::And).unwrap();
        let buttons = vec![a, b, other];

        assert!(or_gate.logic_update(&buttons));
        assert!(or_gate.active);
        assert!(!or_gate.is_blocking());

        assert!(!and_gate.logic_update(&buttons));
        assert!(!and_gate.active);
        assert!(and_gate.is_blocking());
    }

    #[test]
    fn gate_without_buttons_follows_vacuous_policy() {
        let mut or_gate = Gate::new(Rect::new(0, 0, 64, 64), 9, LogicKind::Or).unwrap();
        let mut and_gate = Gate::new(Rect::new(0, 0, 64, 64), 9, LogicKind::And).unwrap();
        or_gate.logic_update(&[]);
        and_gate.logic_update(&[]);
        assert!(!or_gate.active);
        assert!(and_gate.active);
    }

    #[test]
    fn gate_appearance_tracks_state() {
        let mut gate = Gate::new(Rect::new(0, 0, 64, 64), 1, LogicKind::And).unwrap();
        let closed = gate.appearance();
        assert_eq!(closed.shape, Shape::Frame { width: 8 });
        assert_eq!(closed.inner, Some(Rect::new(16, 16, 32, 32)));

        let mut b = button_at(1, 0, 0);
        b.active = true;
        gate.logic_update(&[b]);
        let open = gate.appearance();
        assert_eq!(open.shape, Shape::Grate { width: 8 });
        assert_ne!(open.color, closed.color);
    }

    #[test]
    fn invalid_ids_fail_construction() {
        assert!(Button::new(Rect::new(0, 0, 1, 1), 16).is_err());
        assert!(Gate::new(Rect::new(0, 0, 1, 1), 16, LogicKind::Or).is_err());
        assert!(Player::new(Rect::new(0, 0, 1, 1), 8, 6).is_err());
    }

    #[test]
    fn and_zone_fires_once_per_full_interval() {
        let mut zone = WinZone::new(Rect::new(0, 0, 80, 80), LogicKind::And, 2);
        let mut players = vec![player_at(0, 10, 10), player_at(1, 500, 500)];

        assert!(!zone.collide(&players, 2)); // 1/2
        players[1].rect = Rect::new(20, 20, 48, 48);
        assert!(zone.collide(&players, 2)); // 2/2 → fire
        assert!(!zone.collide(&players, 2)); // still 2/2
        assert!(!zone.collide(&players, 2));

        players[1].rect = Rect::new(500, 500, 48, 48);
        assert!(!zone.collide(&players, 2)); // back to 1/2
        players[1].rect = Rect::new(20, 20, 48, 48);
        assert!(zone.collide(&players, 2)); // new interval → fire again
    }

    #[test]
    fn or_zone_fires_on_first_entry_only() {
        let mut zone = WinZone::new(Rect::new(0, 0, 80, 80), LogicKind::Or, 2);
        let mut players = vec![player_at(0, 500, 500), player_at(1, 600, 600)];
        assert!(!zone.collide(&players, 2));

        players[0].rect = Rect::new(10, 10, 48, 48);
        assert!(zone.collide(&players, 2)); // 0 → 1
        players[1].rect = Rect::new(20, 20, 48, 48);
        assert!(!zone.collide(&players, 2)); // 1 → 2, already satisfied

        players[0].rect = Rect::new(500, 500, 48, 48);
        players[1].rect = Rect::new(600, 600, 48, 48);
        assert!(!zone.collide(&players, 2)); // → 0
        players[1].rect = Rect::new(20, 20, 48, 48);
        assert!(zone.collide(&players, 2)); // 0 → 1 again
    }

    #[test]
    fn win_zone_label_shows_count() {
        let mut zone = WinZone::new(Rect::new(0, 0, 80, 80), LogicKind::And, 3);
        zone.collide(&[player_at(0, 0, 0)], 3);
        assert_eq!(zone.appearance().label, vec!["1/3".to_string()]);
    }

    #[test]
    fn turn_cycles_once_per_press() {
        let mut turn = TurnState::new(3);
        let mut hud = TurnIndicator::new(Rect::new(0, 0, 640, 64), turn).unwrap();

        assert!(hud.update(true, &mut turn));
        assert_eq!(turn.active_player_id, 1);
        for _ in 0..10 {
            assert!(!hud.update(true, &mut turn)); // held
        }
        assert_eq!(turn.active_player_id, 1);

        hud.update(false, &mut turn);
        hud.update(true, &mut turn);
        assert_eq!(turn.active_player_id, 2);
        hud.update(false, &mut turn);
        hud.update(true, &mut turn);
        assert_eq!(turn.active_player_id, 0, "wraps modulo number_players");
    }

    #[test]
    fn turn_with_single_player_stays_put() {
        let mut turn = TurnState::new(1);
        turn.advance();
        assert_eq!(turn.active_player_id, 0);
        let mut none = TurnState::new(0);
        none.advance();
        assert_eq!(none.active_player_id, 0);
    }

    #[test]
    fn turn_indicator_label() {
        let turn = TurnState { active_player_id: 1, number_players: 2 };
        let hud = TurnIndicator::new(Rect::new(0, 0, 640, 64), turn).unwrap();
        let look = hud.appearance();
        assert!(look.label[0].starts_with("Player 2/2"));
        assert_eq!(look.color, player_color(1).unwrap());
    }

    #[test]
    fn timer_reports_elapsed() {
        let start = Instant::now();
        let mut timer = GameTimer::new(Rect::new(0, 0, 640, 64), start);
        timer.update(start + Duration::from_millis(1500));
        assert_eq!(timer.elapsed(), Duration::from_millis(1500));
        assert_eq!(timer.appearance().label, vec!["1.50 seconds".to_string()]);
    }

    #[test]
    fn text_button_click() {
        let button = TextButton::new(Rect::new(0, 0, 384, 128), "Level 1", 7u8);
        assert_eq!(button.click(Some((10, 10))), Some(7));
        assert_eq!(button.click(Some((400, 10))), None);
        assert_eq!(button.click(None), None);
    }

    #[test]
    fn movement_direction_is_normalized() {
        let input = MoveInput { up: true, right: true, ..Default::default() };
        let d = input.direction();
        assert!((d.length() - 1.0).abs() < 1e-6);
        let opposite = MoveInput { left: true, right: true, ..Default::default() };
        assert!(opposite.direction().is_zero());
    }

    #[test]
    fn speed_modifiers() {
        let p = player_at(0, 0, 0);
        assert_eq!(p.frame_speed(false, false), 6.0);
        assert_eq!(p.frame_speed(true, false), 12.0);
        assert_eq!(p.frame_speed(false, true), 3.0);
        assert_eq!(p.frame_speed(true, true), 6.0);
    }
}
