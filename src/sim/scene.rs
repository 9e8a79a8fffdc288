/// Scene state machine.
///
/// ```text
///   MainMenu ──(level button)──▶ Level ──(LevelWon)──▶ Statistics
///      ▲                                                   │
///      └──────────────(Back to main menu)──────────────────┘
/// ```
///
/// A scene never swaps itself out. It records a pending `Transition`;
/// after each update the `SceneManager` takes it, builds the next scene
/// and drops the old one. There is no terminal scene; quitting is the
/// frame loop's business.

use std::time::Instant;

use crate::config::LayoutConfig;
use crate::domain::entity::{Appearance, StatisticsPanel, TextButton};
use crate::domain::geometry::Rect;
use crate::error::Result;
use super::event::GameEvent;
use super::level::{LevelEntry, LevelGrid};
use super::step::{step, FrameInput};
use super::world::LevelWorld;

#[derive(Clone, Debug)]
pub enum Transition {
    ToMainMenu,
    ToLevel(LevelEntry),
    ToStatistics(Vec<(String, String)>),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SceneKind {
    MainMenu,
    Level,
    Statistics,
}

// ══════════════════════════════════════════════════════════════
// Main menu
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct MainMenu {
    /// Level buttons on the current page; the action is the catalog index.
    pub buttons: Vec<TextButton<usize>>,
    /// Page switch, present only when the catalog spans several pages.
    pub more: Option<TextButton<()>>,
    page: usize,
    catalog: Vec<LevelEntry>,
    layout: LayoutConfig,
    pending: Option<Transition>,
}

impl MainMenu {
    /// Two-column grid of level buttons, three tiles per row. Catalogs
    /// taller than the window are split into pages.
    pub fn new(catalog: Vec<LevelEntry>, layout: &LayoutConfig) -> Self {
        let mut menu = MainMenu {
            buttons: vec![],
            more: None,
            page: 0,
            catalog,
            layout: *layout,
            pending: None,
        };
        let per_page = menu.per_page();
        if menu.catalog.len() > per_page {
            log::info!(
                "{} levels over {} menu pages",
                menu.catalog.len(),
                menu.catalog.len().div_ceil(per_page)
            );
        }
        menu.lay_out();
        menu
    }

    /// Buttons that fit below the top indent: two per row.
    fn per_page(&self) -> usize {
        let dot = self.layout.dot_size;
        let indent_y = (self.layout.window_height - dot * 10) / 2;
        let rows = (self.layout.window_height - indent_y - dot * 2) / (dot * 3) + 1;
        rows.max(1) as usize * 2
    }

    fn lay_out(&mut self) {
        let dot = self.layout.dot_size;
        let indent_x = (self.layout.window_width - dot * 10) / 2;
        let indent_y = (self.layout.window_height - dot * 10) / 2;
        let per_page = self.per_page();
        let pages = self.catalog.len().div_ceil(per_page).max(1);
        let first = self.page * per_page;

        self.buttons = self
            .catalog
            .iter()
            .enumerate()
            .skip(first)
            .take(per_page)
            .map(|(i, entry)| {
                let slot = i - first;
                let col = if slot % 2 == 0 { -2 } else { 6 };
                let row = (slot / 2) as i32;
                let rect = Rect::new(indent_x + dot * col, indent_y + dot * 3 * row, dot * 6, dot * 2);
                TextButton::new(rect, entry.name.clone(), i)
            })
            .collect();

        self.more = (pages > 1).then(|| {
            let rect = Rect::new(self.layout.window_width - dot * 9 / 2, dot / 8, dot * 4, dot);
            TextButton::new(rect, format!("More {}/{}", self.page + 1, pages), ())
        });
    }

    fn update(&mut self, input: &FrameInput) {
        if self.more.as_ref().and_then(|b| b.click(input.click)).is_some() {
            let pages = self.catalog.len().div_ceil(self.per_page());
            self.page = (self.page + 1) % pages;
            self.lay_out();
            return;
        }
        let clicked = self.buttons.iter().find_map(|b| b.click(input.click));
        let first_on_page = self.buttons.first().map(|b| b.action);
        let chosen = clicked.or_else(|| input.confirm.then_some(first_on_page).flatten());
        if let Some(idx) = chosen {
            if let Some(entry) = self.catalog.get(idx) {
                self.pending = Some(Transition::ToLevel(entry.clone()));
            }
        }
    }

    fn appearances(&self) -> Vec<Appearance> {
        self.buttons
            .iter()
            .map(TextButton::appearance)
            .chain(self.more.iter().map(TextButton::appearance))
            .collect()
    }
}

// ══════════════════════════════════════════════════════════════
// Level
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct LevelScene {
    pub entry: LevelEntry,
    pub world: LevelWorld,
    grid: LevelGrid,
    layout: LayoutConfig,
    pending: Option<Transition>,
}

impl LevelScene {
    pub fn load(entry: LevelEntry, layout: &LayoutConfig, now: Instant) -> Result<Self> {
        let grid = entry.load()?;
        LevelScene::from_grid(entry, grid, layout, now)
    }

    pub fn from_grid(entry: LevelEntry, grid: LevelGrid, layout: &LayoutConfig, now: Instant) -> Result<Self> {
        let world = LevelWorld::build(&grid, layout, now)?;
        Ok(LevelScene { entry, world, grid, layout: *layout, pending: None })
    }

    /// Rebuild every entity from the same grid; turn state and timer reset.
    pub fn restart(&mut self, now: Instant) -> Result<()> {
        self.world = LevelWorld::build(&self.grid, &self.layout, now)?;
        self.pending = None;
        Ok(())
    }

    fn update(&mut self, input: &FrameInput) -> Vec<GameEvent> {
        if input.back {
            log::info!("leaving level '{}'", self.entry.name);
            self.pending = Some(Transition::ToMainMenu);
            return vec![];
        }
        let events = step(&mut self.world, input);
        if events.contains(&GameEvent::LevelWon) && self.pending.is_none() {
            let secs = self.world.timer.elapsed().as_secs_f64();
            log::info!("level '{}' won in {secs:.2}s", self.entry.name);
            self.pending = Some(Transition::ToStatistics(vec![
                ("level".to_string(), self.entry.identifier()),
                ("time".to_string(), format!("{secs:.2}s")),
            ]));
        }
        events
    }
}

// ══════════════════════════════════════════════════════════════
// Statistics
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct StatisticsScene {
    pub panel: StatisticsPanel,
    pub back: TextButton<()>,
    pending: Option<Transition>,
}

impl StatisticsScene {
    pub fn new(entries: Vec<(String, String)>, layout: &LayoutConfig) -> Self {
        let dot = layout.dot_size;
        let indent_x = (layout.window_width - dot * 10) / 2;
        let indent_y = (layout.window_height - dot * 10) / 2;
        StatisticsScene {
            panel: StatisticsPanel::new(Rect::new(indent_x, indent_y, dot * 10, dot * 10), entries),
            back: TextButton::new(
                Rect::new(indent_x + dot * 2, indent_y + dot * 7, dot * 6, dot * 2),
                "Back to main menu",
                (),
            ),
            pending: None,
        }
    }

    fn update(&mut self, input: &FrameInput) {
        if self.back.click(input.click).is_some() || input.confirm || input.back {
            self.pending = Some(Transition::ToMainMenu);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Scene + driver
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub enum Scene {
    MainMenu(MainMenu),
    Level(Box<LevelScene>),
    Statistics(StatisticsScene),
}

impl Scene {
    pub fn kind(&self) -> SceneKind {
        match self {
            Scene::MainMenu(_) => SceneKind::MainMenu,
            Scene::Level(_) => SceneKind::Level,
            Scene::Statistics(_) => SceneKind::Statistics,
        }
    }

    fn take_transition(&mut self) -> Option<Transition> {
        match self {
            Scene::MainMenu(s) => s.pending.take(),
            Scene::Level(s) => s.pending.take(),
            Scene::Statistics(s) => s.pending.take(),
        }
    }

    pub fn appearances(&self) -> Vec<Appearance> {
        match self {
            Scene::MainMenu(s) => s.appearances(),
            Scene::Level(s) => s.world.appearances(),
            Scene::Statistics(s) => vec![s.panel.appearance(), s.back.appearance()],
        }
    }
}

/// Owns the active scene and performs transitions between frames.
pub struct SceneManager {
    scene: Scene,
    catalog: Vec<LevelEntry>,
    layout: LayoutConfig,
    /// Last load failure, shown on the main menu until the next transition.
    status: Option<String>,
}

impl SceneManager {
    pub fn new(catalog: Vec<LevelEntry>, layout: LayoutConfig) -> Self {
        let scene = Scene::MainMenu(MainMenu::new(catalog.clone(), &layout));
        SceneManager { scene, catalog, layout, status: None }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Run one frame of the active scene, then apply any pending transition.
    pub fn update(&mut self, input: &FrameInput) -> Vec<GameEvent> {
        if input.restart {
            self.restart(input.now);
            return vec![];
        }

        let events = match &mut self.scene {
            Scene::MainMenu(s) => {
                s.update(input);
                vec![]
            }
            Scene::Level(s) => s.update(input),
            Scene::Statistics(s) => {
                s.update(input);
                vec![]
            }
        };

        if let Some(transition) = self.scene.take_transition() {
            self.apply(transition, input.now);
        }
        events
    }

    /// Jump straight into a level (`--level` on the command line).
    pub fn start_level(&mut self, entry: LevelEntry, now: Instant) {
        self.apply(Transition::ToLevel(entry), now);
    }

    /// Rebuild the active scene's entities.
    pub fn restart(&mut self, now: Instant) {
        match &mut self.scene {
            Scene::Level(s) => {
                log::info!("restarting level '{}'", s.entry.name);
                if let Err(e) = s.restart(now) {
                    // The same grid built before; fall back to the menu anyway.
                    log::error!("restart of '{}' failed: {e}", s.entry.name);
                    self.status = Some(format!("Restart failed: {e}"));
                    self.scene = Scene::MainMenu(MainMenu::new(self.catalog.clone(), &self.layout));
                }
            }
            Scene::MainMenu(_) => {
                self.scene = Scene::MainMenu(MainMenu::new(self.catalog.clone(), &self.layout));
            }
            Scene::Statistics(s) => {
                let entries = s.panel.entries.clone();
                self.scene = Scene::Statistics(StatisticsScene::new(entries, &self.layout));
            }
        }
    }

    fn apply(&mut self, transition: Transition, now: Instant) {
        let from = self.scene.kind();
        self.status = None;
        self.scene = match transition {
            Transition::ToMainMenu => Scene::MainMenu(MainMenu::new(self.catalog.clone(), &self.layout)),
            Transition::ToStatistics(entries) => Scene::Statistics(StatisticsScene::new(entries, &self.layout)),
            Transition::ToLevel(entry) => match LevelScene::load(entry.clone(), &self.layout, now) {
                Ok(level) => {
                    log::info!("loaded level '{}' from {}", entry.name, entry.identifier());
                    Scene::Level(Box::new(level))
                }
                Err(e) => {
                    log::error!("failed to load level '{}': {e}", entry.name);
                    self.status = Some(format!("Could not load {}: {e}", entry.name));
                    Scene::MainMenu(MainMenu::new(self.catalog.clone(), &self.layout))
                }
            },
        };
        log::info!("scene {:?} -> {:?}", from, self.scene.kind());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::embedded_catalog;
    use std::time::Duration;

    fn manager() -> SceneManager {
        SceneManager::new(embedded_catalog(), LayoutConfig::default())
    }

    fn click_at(rect: Rect, now: Instant) -> FrameInput {
        FrameInput { click: Some((rect.x + 1, rect.y + 1)), ..FrameInput::idle(now) }
    }

    fn level(mgr: &mut SceneManager) -> &mut LevelScene {
        match &mut mgr.scene {
            Scene::Level(s) => s,
            other => panic!("expected level scene, got {:?}", other.kind()),
        }
    }

    #[test]
    fn starts_on_main_menu_with_a_button_per_level() {
        let mgr = manager();
        let Scene::MainMenu(menu) = mgr.scene() else { panic!("not on main menu") };
        assert_eq!(menu.buttons.len(), embedded_catalog().len());
        // 1000x800 window: indent (180, 80); second column six tiles right.
        assert_eq!(menu.buttons[0].rect, Rect::new(52, 80, 384, 128));
        assert_eq!(menu.buttons[1].rect, Rect::new(564, 80, 384, 128));
        assert_eq!(menu.buttons[2].rect, Rect::new(52, 272, 384, 128));
    }

    #[test]
    fn long_catalog_pages_within_the_window() {
        let layout = LayoutConfig::default();
        let catalog: Vec<LevelEntry> = (0..11)
            .map(|i| LevelEntry::file(format!("Level {}", i + 1), format!("levels/{i:02}.bin")))
            .collect();
        let mut mgr = SceneManager::new(catalog, layout);
        let now = Instant::now();

        let Scene::MainMenu(menu) = mgr.scene() else { panic!("not on main menu") };
        assert_eq!(menu.buttons.len(), 8);
        assert!(menu.buttons.iter().all(|b| b.rect.bottom() <= layout.window_height));
        let more = menu.more.as_ref().map(|b| b.rect).expect("page switch");
        assert!(menu.buttons.iter().all(|b| !b.rect.intersects(&more)));

        mgr.update(&click_at(more, now));
        let Scene::MainMenu(menu) = mgr.scene() else { panic!("not on main menu") };
        let actions: Vec<usize> = menu.buttons.iter().map(|b| b.action).collect();
        assert_eq!(actions, vec![8, 9, 10]);
        assert_eq!(menu.buttons[0].rect, Rect::new(52, 80, 384, 128));

        // Confirm starts the first level on the shown page.
        mgr.update(&FrameInput { confirm: true, ..FrameInput::idle(now) });
        assert_eq!(mgr.scene().kind(), SceneKind::MainMenu, "missing file falls back");
        assert!(mgr.status().is_some_and(|s| s.contains("Level 9")));
    }

    #[test]
    fn short_catalog_has_no_page_switch() {
        let mgr = manager();
        let Scene::MainMenu(menu) = mgr.scene() else { panic!("not on main menu") };
        assert!(menu.more.is_none());
    }

    #[test]
    fn menu_click_outside_buttons_does_nothing() {
        let mut mgr = manager();
        let now = Instant::now();
        mgr.update(&FrameInput { click: Some((0, 0)), ..FrameInput::idle(now) });
        assert_eq!(mgr.scene().kind(), SceneKind::MainMenu);
    }

    #[test]
    fn full_cycle_menu_level_statistics_menu() {
        let mut mgr = manager();
        let now = Instant::now();

        let Scene::MainMenu(menu) = mgr.scene() else { panic!() };
        let first = menu.buttons[0].rect;
        mgr.update(&click_at(first, now));
        assert_eq!(mgr.scene().kind(), SceneKind::Level);

        // Drop the player onto the win zone and let the step notice.
        let later = now + Duration::from_millis(1234);
        let lvl = level(&mut mgr);
        lvl.world.players[0].rect = lvl.world.win_zones[0].rect.inset(16);
        let events = mgr.update(&FrameInput::idle(later));
        assert!(events.contains(&GameEvent::LevelWon));

        let Scene::Statistics(stats) = mgr.scene() else { panic!("expected statistics") };
        assert_eq!(stats.panel.entries, vec![
            ("level".to_string(), "Level 1".to_string()),
            ("time".to_string(), "1.23s".to_string()),
        ]);
        let back = stats.back.rect;

        mgr.update(&click_at(back, later));
        assert_eq!(mgr.scene().kind(), SceneKind::MainMenu);
    }

    #[test]
    fn confirm_and_back_without_a_pointer() {
        let mut mgr = manager();
        let now = Instant::now();
        mgr.update(&FrameInput { confirm: true, ..FrameInput::idle(now) });
        let lvl = level(&mut mgr);
        assert_eq!(lvl.entry.name, "Level 1");

        mgr.update(&FrameInput { back: true, ..FrameInput::idle(now) });
        assert_eq!(mgr.scene().kind(), SceneKind::MainMenu);
    }

    #[test]
    fn restart_rebuilds_level() {
        let mut mgr = manager();
        let now = Instant::now();
        mgr.start_level(embedded_catalog()[1].clone(), now);

        let lvl = level(&mut mgr);
        let spawn = lvl.world.players[0].rect;
        lvl.world.players[0].rect = spawn.translated(10, 0);
        lvl.world.turn.advance();

        mgr.update(&FrameInput { restart: true, ..FrameInput::idle(now) });
        let lvl = level(&mut mgr);
        assert_eq!(lvl.world.players[0].rect, spawn);
        assert_eq!(lvl.world.turn.active_player_id, 0);
    }

    #[test]
    fn failed_load_stays_on_menu_with_status() {
        let mut mgr = manager();
        mgr.start_level(LevelEntry::file("Broken", "/no/such/level.bin"), Instant::now());
        assert_eq!(mgr.scene().kind(), SceneKind::MainMenu);
        assert!(mgr.status().is_some_and(|s| s.contains("Broken")));
    }

    #[test]
    fn statistics_panel_text() {
        let stats = StatisticsScene::new(
            vec![("level".into(), "levels/1.bin".into()), ("time".into(), "3.10s".into())],
            &LayoutConfig::default(),
        );
        assert_eq!(stats.panel.lines(), vec![
            "You have won!".to_string(),
            String::new(),
            "level - levels/1.bin".to_string(),
            "time - 3.10s".to_string(),
        ]);
        assert_eq!(stats.back.rect, Rect::new(308, 528, 384, 128));
    }
}
