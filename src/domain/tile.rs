/// Tile codes and their classification.
/// A level stores raw byte codes; `Tile::from_code` is the single place
/// that decides what a code means, so code ranges live here only.
///
/// ```text
/// 0x00        Empty
/// 0x01        Wall
/// 0x02        OR  win zone
/// 0x03        AND win zone
/// 0x10..=0x1F Button   (id = code - 0x10)
/// 0x20..=0x2F OR  gate (id = code - 0x20)
/// 0x30..=0x3F AND gate (id = code - 0x30)
/// 0xF0..=0xF7 Player   (id = code - 0xF0)
/// ```

pub const EMPTY: u8 = 0x00;
pub const WALL: u8 = 0x01;
pub const OR_WIN: u8 = 0x02;
pub const AND_WIN: u8 = 0x03;
pub const BUTTON_BASE: u8 = 0x10;
pub const OR_GATE_BASE: u8 = 0x20;
pub const AND_GATE_BASE: u8 = 0x30;
pub const PLAYER_BASE: u8 = 0xF0;

/// Number of distinct player ids.
pub const MAX_PLAYERS: u8 = 8;

/// Aggregation rule shared by gates and win zones.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LogicKind {
    Or,
    And,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Empty,
    Wall,
    Win(LogicKind),
    Button(u8),
    Gate(u8, LogicKind),
    Player(u8),
    /// Code outside every known range. Produces no entity.
    Unknown(u8),
}

impl Tile {
    pub fn from_code(code: u8) -> Tile {
        match code {
            EMPTY => Tile::Empty,
            WALL => Tile::Wall,
            OR_WIN => Tile::Win(LogicKind::Or),
            AND_WIN => Tile::Win(LogicKind::And),
            0x10..=0x1F => Tile::Button(code - BUTTON_BASE),
            0x20..=0x2F => Tile::Gate(code - OR_GATE_BASE, LogicKind::Or),
            0x30..=0x3F => Tile::Gate(code - AND_GATE_BASE, LogicKind::And),
            0xF0..=0xF7 => Tile::Player(code - PLAYER_BASE),
            other => Tile::Unknown(other),
        }
    }

    pub fn player_id(self) -> Option<u8> {
        match self {
            Tile::Player(id) => Some(id),
            _ => None,
        }
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_fixed_codes() {
        assert_eq!(Tile::from_code(0x00), Tile::Empty);
        assert_eq!(Tile::from_code(0x01), Tile::Wall);
        assert_eq!(Tile::from_code(0x02), Tile::Win(LogicKind::Or));
        assert_eq!(Tile::from_code(0x03), Tile::Win(LogicKind::And));
    }

    #[test]
    fn classify_ranges() {
        assert_eq!(Tile::from_code(0x10), Tile::Button(0));
        assert_eq!(Tile::from_code(0x1F), Tile::Button(15));
        assert_eq!(Tile::from_code(0x2A), Tile::Gate(10, LogicKind::Or));
        assert_eq!(Tile::from_code(0x3F), Tile::Gate(15, LogicKind::And));
        assert_eq!(Tile::from_code(0xF0), Tile::Player(0));
        assert_eq!(Tile::from_code(0xF7), Tile::Player(7));
    }

    #[test]
    fn unknown_codes_spawn_nothing() {
        for code in [0x04u8, 0x0F, 0x40, 0x9C, 0xEF, 0xF8, 0xFF] {
            let t = Tile::from_code(code);
            assert_eq!(t, Tile::Unknown(code));
        }
    }
}
