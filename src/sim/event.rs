/// Events emitted during a simulation step.
/// Scenes react to them (a win schedules the statistics screen);
/// the presentation layer consumes them for sound and logging.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    ButtonPressed { id: u8 },
    ButtonReleased { id: u8 },
    GateOpened { id: u8 },
    GateClosed { id: u8 },
    /// The active player started the frame inside a closed gate.
    PlayerStuck { player: u8 },
    TurnSwitched { player: u8 },
    LevelWon,
}
