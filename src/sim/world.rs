/// LevelWorld: the complete entity set of a running level.
///
/// ## Collections
///
/// One typed `Vec` per entity kind, filled from the grid in row-major
/// order. The blocking set is never stored; `blocking_rects()` derives it
/// (walls + closed gates) whenever a phase needs it.
///
/// ## Layout
///
/// The grid is centered in the logical window:
///   - `indent_x = (window_width  - grid_width  * dot) / 2`
///   - `indent_y = (window_height - grid_height * dot) / 2`
///
/// Per-kind placement inside a tile:
/// ```text
/// Wall, Gate   offset 0       size dot
/// Button       offset dot/4   size dot/2
/// Player       offset dot/8   size dot*3/4
/// WinZone      offset -dot/8  size dot*5/4
/// ```

use std::time::Instant;

use crate::config::LayoutConfig;
use crate::domain::entity::{
    Appearance, Button, GameTimer, Gate, Player, TurnIndicator, TurnState, Wall, WinZone,
};
use crate::domain::geometry::Rect;
use crate::domain::tile::Tile;
use crate::error::Result;
use super::level::LevelGrid;

#[derive(Clone, Debug)]
pub struct LevelWorld {
    pub walls: Vec<Wall>,
    pub gates: Vec<Gate>,
    pub buttons: Vec<Button>,
    pub players: Vec<Player>,
    pub win_zones: Vec<WinZone>,

    // ── HUD ──
    pub timer: GameTimer,
    pub turn_indicator: TurnIndicator,

    // ── Turn ──
    pub turn: TurnState,

    /// Set once any win zone fires; cleared only by rebuilding.
    pub won: bool,
}

impl LevelWorld {
    /// Spawn every entity the grid describes. Any invalid id aborts the
    /// build, so no partial world ever exists.
    pub fn build(grid: &LevelGrid, layout: &LayoutConfig, now: Instant) -> Result<Self> {
        let dot = layout.dot_size;
        let indent_x = (layout.window_width - grid.width() as i32 * dot) / 2;
        let indent_y = (layout.window_height - grid.height() as i32 * dot) / 2;
        let number_players = grid.number_players();
        let turn = TurnState::new(number_players);

        let mut world = LevelWorld {
            walls: vec![],
            gates: vec![],
            buttons: vec![],
            players: vec![],
            win_zones: vec![],
            timer: GameTimer::new(
                Rect::new(dot / 2, layout.window_height - dot * 3 / 2, dot * 10, dot),
                now,
            ),
            turn_indicator: TurnIndicator::new(Rect::new(dot / 2, dot / 2, dot * 10, dot), turn)?,
            turn,
            won: false,
        };

        for (x, y, tile) in grid.tiles() {
            let cell = Rect::new(indent_x + x as i32 * dot, indent_y + y as i32 * dot, dot, dot);
            match tile {
                Tile::Wall => world.walls.push(Wall::new(cell)),
                Tile::Win(kind) => {
                    let rect = cell.inset(-dot / 8);
                    world.win_zones.push(WinZone::new(rect, kind, number_players as usize));
                }
                Tile::Button(id) => world.buttons.push(Button::new(cell.inset(dot / 4), id)?),
                Tile::Gate(id, kind) => world.gates.push(Gate::new(cell, id, kind)?),
                Tile::Player(id) => {
                    let rect = cell.inset(dot / 8);
                    world.players.push(Player::new(rect, id, (dot / 10).max(1))?);
                }
                Tile::Empty | Tile::Unknown(_) => {}
            }
        }

        // Gates reflect their rule from the first frame on.
        world.refresh_gates();

        log::info!(
            "built level {}x{}: {} walls, {} gates, {} buttons, {} players, {} win zones",
            grid.width(),
            grid.height(),
            world.walls.len(),
            world.gates.len(),
            world.buttons.len(),
            world.players.len(),
            world.win_zones.len()
        );
        Ok(world)
    }

    /// Walls plus every gate that is currently closed.
    pub fn blocking_rects(&self) -> Vec<Rect> {
        self.walls
            .iter()
            .map(|w| w.rect)
            .chain(self.gates.iter().filter(|g| g.is_blocking()).map(|g| g.rect))
            .collect()
    }

    /// Recompute every gate from the buttons. Returns `(gate_id, now_active)`
    /// for each gate that changed.
    pub fn refresh_gates(&mut self) -> Vec<(u8, bool)> {
        let buttons = &self.buttons;
        self.gates
            .iter_mut()
            .filter_map(|g| g.logic_update(buttons).then_some((g.gate_id, g.active)))
            .collect()
    }

    pub fn number_players(&self) -> u8 {
        self.turn.number_players
    }

    /// Draw order: zones under buttons under gates, walls, players, then HUD.
    pub fn appearances(&self) -> Vec<Appearance> {
        let mut out = Vec::new();
        out.extend(self.win_zones.iter().map(WinZone::appearance));
        out.extend(self.buttons.iter().map(Button::appearance));
        out.extend(self.gates.iter().map(Gate::appearance));
        out.extend(self.walls.iter().map(Wall::appearance));
        out.extend(self.players.iter().map(Player::appearance));
        out.push(self.turn_indicator.appearance());
        out.push(self.timer.appearance());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::LogicKind;

    fn layout() -> LayoutConfig {
        LayoutConfig::default()
    }

    fn grid(text: &str) -> LevelGrid {
        LevelGrid::parse_text(text).unwrap()
    }

    #[test]
    fn spawns_typed_collections() {
        let g = grid("01, 01, 01, 01\n01, F0, 10, 20\n01, F1, 03, 32\n");
        let world = LevelWorld::build(&g, &layout(), Instant::now()).unwrap();
        assert_eq!(world.walls.len(), 6);
        assert_eq!(world.players.len(), 2);
        assert_eq!(world.buttons.len(), 1);
        assert_eq!(world.gates.len(), 2);
        assert_eq!(world.win_zones.len(), 1);
        assert_eq!(world.win_zones[0].kind, LogicKind::And);
        assert_eq!(world.number_players(), 2);
        assert_eq!(world.turn.active_player_id, 0);
    }

    #[test]
    fn tiles_are_centered_with_per_kind_offsets() {
        // 1x1 in a 1000x800 window: indent (468, 368).
        let world = LevelWorld::build(&grid("F0\n"), &layout(), Instant::now()).unwrap();
        assert_eq!(world.players[0].rect, Rect::new(476, 376, 48, 48));
        assert_eq!(world.players[0].base_speed, 6);

        let world = LevelWorld::build(&grid("10\n"), &layout(), Instant::now()).unwrap();
        assert_eq!(world.buttons[0].rect, Rect::new(484, 384, 32, 32));

        let world = LevelWorld::build(&grid("03\n"), &layout(), Instant::now()).unwrap();
        assert_eq!(world.win_zones[0].rect, Rect::new(460, 360, 80, 80));
    }

    #[test]
    fn tiny_tiles_still_move() {
        let small = LayoutConfig { dot_size: 5, ..layout() };
        let world = LevelWorld::build(&grid("F0\n"), &small, Instant::now()).unwrap();
        assert_eq!(world.players[0].base_speed, 1);
    }

    #[test]
    fn blocking_set_is_walls_and_closed_gates() {
        // AND gate 1 has no buttons and opens on build; OR gate 0 stays closed.
        let g = grid("01, 20, 31, 10\n");
        let world = LevelWorld::build(&g, &layout(), Instant::now()).unwrap();
        let blocking = world.blocking_rects();
        assert_eq!(blocking.len(), 2);
        assert!(blocking.contains(&world.walls[0].rect));
        let or_gate = world.gates.iter().find(|g| g.kind == LogicKind::Or).unwrap();
        assert!(blocking.contains(&or_gate.rect));
    }

    #[test]
    fn unknown_codes_spawn_nothing() {
        let world = LevelWorld::build(&grid("00, 04, FF, 9C\n"), &layout(), Instant::now()).unwrap();
        assert!(world.appearances().len() == 2); // HUD only
        assert_eq!(world.number_players(), 0);
    }

    #[test]
    fn draw_order_ends_with_hud() {
        let world = LevelWorld::build(&grid("01, F0, 03\n"), &layout(), Instant::now()).unwrap();
        let looks = world.appearances();
        assert_eq!(looks.len(), 5);
        assert_eq!(looks[0].rect, world.win_zones[0].rect);
        assert_eq!(looks[2].rect, world.players[0].rect);
        assert_eq!(looks[4].rect, world.timer.rect);
    }
}
