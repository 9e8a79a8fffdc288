/// The step function: advances a level by one frame.
///
/// Processing order (each phase sees the previous phase's results):
///   1. Player movement (active player only, blocking set taken at phase start)
///   2. Button overlap → gate recompute
///   3. Win zone overlap → win evaluation
///   4. HUD (timer, turn indicator)
///
/// A turn switch in phase 4 therefore takes effect on the next frame's
/// movement. Two players can never press buttons in the same frame,
/// because only one of them moves.

use std::time::Instant;

use crate::domain::entity::MoveInput;
use crate::domain::geometry::Rect;
use crate::domain::physics::{self, MoveOutcome};
use super::event::GameEvent;
use super::world::LevelWorld;

/// Everything a scene needs from the input layer for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    pub movement: MoveInput,
    /// Turn-cycle key is down this frame (edge detection happens downstream).
    pub cycle_held: bool,
    /// Primary-button press this frame, in logical pixels.
    pub click: Option<(i32, i32)>,
    pub restart: bool,
    /// Activates the scene's default button (first level, back to menu).
    pub confirm: bool,
    /// Leaves a running level or the statistics screen.
    pub back: bool,
    pub now: Instant,
}

#[cfg(test)]
impl FrameInput {
    pub fn idle(now: Instant) -> Self {
        FrameInput {
            movement: MoveInput::default(),
            cycle_held: false,
            click: None,
            restart: false,
            confirm: false,
            back: false,
            now,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut LevelWorld, input: &FrameInput) -> Vec<GameEvent> {
    let mut events = Vec::new();

    resolve_player_movement(world, &input.movement, &mut events);
    resolve_buttons(world, &mut events);
    resolve_win_zones(world, &mut events);
    resolve_hud(world, input, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Phase 1: movement
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(world: &mut LevelWorld, movement: &MoveInput, events: &mut Vec<GameEvent>) {
    let blocking = world.blocking_rects();
    let active = world.turn.active_player_id;
    let bounds: Vec<Rect> = world.players.iter().map(|p| p.rect).collect();

    for (i, player) in world.players.iter_mut().enumerate() {
        if player.player_id != active {
            continue;
        }
        let crowded = physics::overlaps_other(&player.rect, &bounds, i);
        if player.update(movement, crowded, &blocking) == MoveOutcome::Rejected
            && !movement.direction().is_zero()
        {
            events.push(GameEvent::PlayerStuck { player: player.player_id });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Phase 2: buttons → gates
// ══════════════════════════════════════════════════════════════

fn resolve_buttons(world: &mut LevelWorld, events: &mut Vec<GameEvent>) {
    let players = &world.players;
    let mut any_changed = false;
    for button in world.buttons.iter_mut() {
        if button.collide(players) {
            any_changed = true;
            let id = button.button_id;
            log::debug!("button {id} {}", if button.active { "pressed" } else { "released" });
            events.push(if button.active {
                GameEvent::ButtonPressed { id }
            } else {
                GameEvent::ButtonReleased { id }
            });
        }
    }

    // Recompute once after every button settled, so a press and a release
    // in the same frame cannot flicker a gate.
    if !any_changed {
        return;
    }
    for (id, active) in world.refresh_gates() {
        log::debug!("gate {id} {}", if active { "opened" } else { "closed" });
        events.push(if active { GameEvent::GateOpened { id } } else { GameEvent::GateClosed { id } });
    }
}

// ══════════════════════════════════════════════════════════════
// Phase 3: win zones
// ══════════════════════════════════════════════════════════════

fn resolve_win_zones(world: &mut LevelWorld, events: &mut Vec<GameEvent>) {
    let number_players = world.number_players() as usize;
    let players = &world.players;
    let mut fired = false;
    for zone in world.win_zones.iter_mut() {
        fired |= zone.collide(players, number_players);
    }
    if fired {
        world.won = true;
        events.push(GameEvent::LevelWon);
    }
}

// ══════════════════════════════════════════════════════════════
// Phase 4: HUD
// ══════════════════════════════════════════════════════════════

fn resolve_hud(world: &mut LevelWorld, input: &FrameInput, events: &mut Vec<GameEvent>) {
    world.timer.update(input.now);
    if world.turn_indicator.update(input.cycle_held, &mut world.turn) {
        events.push(GameEvent::TurnSwitched { player: world.turn.active_player_id });
    }
}
