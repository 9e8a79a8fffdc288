/// Logic rules, truth-table driven.
///
/// Pure functions: no entity state, no side effects.
///
/// ### Gate output
/// ┌──────────┬──────────────────────────────┬─────────────────────┐
/// │ Kind     │ Active when                  │ No matching buttons │
/// ├──────────┼──────────────────────────────┼─────────────────────┤
/// │ Or       │ any matching button active   │ inactive            │
/// │ And      │ every matching button active │ active (vacuous)    │
/// └──────────┴──────────────────────────────┴─────────────────────┘
///
/// ### Win condition
/// ┌──────────┬──────────────────────────────┐
/// │ Kind     │ Satisfied when               │
/// ├──────────┼──────────────────────────────┤
/// │ Or       │ present > 0                  │
/// │ And      │ present == number_players    │
/// └──────────┴──────────────────────────────┘
///
/// Win zones fire on the unsatisfied → satisfied edge only
/// (see `WinZone::collide`).

use super::tile::LogicKind;

pub fn gate_output<I>(kind: LogicKind, inputs: I) -> bool
where
    I: IntoIterator<Item = bool>,
{
    let mut inputs = inputs.into_iter();
    match kind {
        LogicKind::Or => inputs.any(|on| on),
        LogicKind::And => inputs.all(|on| on),
    }
}

pub fn win_condition_met(kind: LogicKind, present: usize, number_players: usize) -> bool {
    match kind {
        LogicKind::Or => present > 0,
        LogicKind::And => present == number_players,
    }
}
