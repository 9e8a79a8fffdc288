/// Level grids and where they come from.
///
/// ## Sources (priority order):
///   1. `[[levels]]` entries in config.toml
///   2. `levels/` directory (`*.bin` files, sorted by filename)
///   3. Built-in embedded levels
///
/// ## Binary format (`.bin`):
///   ```
///   byte 0      width  W
///   byte 1      height H
///   W*H bytes   tile codes, row-major
///   ```
/// No magic, no version, no checksum. Any disagreement between the
/// declared size and the data fails the load.
///
/// ## Text format (`.txt`, authoring only):
///   One row per line, hex codes separated by commas:
///   ```
///   01, 01, 01
///   01, F0, 03
///   01, 01, 01
///   ```
/// `gatekeeper convert` turns a text level into a binary one.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::config::GameConfig;
use crate::domain::tile::Tile;
use crate::error::{GameError, Result};

/// Immutable 2D grid of raw tile codes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LevelGrid {
    width: usize,
    height: usize,
    codes: Vec<u8>,
}

// ══════════════════════════════════════════════════════════════
// Construction + queries
// ══════════════════════════════════════════════════════════════

impl LevelGrid {
    /// Build from a flat row-major code buffer.
    pub fn new(width: usize, height: usize, codes: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::malformed(format!("zero dimension {width}x{height}")));
        }
        if width > u8::MAX as usize || height > u8::MAX as usize {
            return Err(GameError::malformed(format!("{width}x{height} exceeds 255x255")));
        }
        if codes.len() != width * height {
            return Err(GameError::malformed(format!(
                "{width}x{height} needs {} tiles, got {}",
                width * height,
                codes.len()
            )));
        }
        Ok(LevelGrid { width, height, codes })
    }

    /// Build from rows; every row must have the first row's length.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self> {
        let width = rows.first().map_or(0, |r| r.len());
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(GameError::malformed(format!(
                "row {y} has {} tiles, expected {width}",
                row.len()
            )));
        }
        LevelGrid::new(width, rows.len(), rows.concat())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn code_at(&self, x: usize, y: usize) -> u8 {
        self.codes[y * self.width + x]
    }

    pub fn tile_at(&self, x: usize, y: usize) -> Tile {
        Tile::from_code(self.code_at(x, y))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.codes.chunks(self.width)
    }

    /// Every cell as `(x, y, tile)`, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, Tile)> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y, self.tile_at(x, y))))
    }

    /// Count of distinct player codes in the grid.
    pub fn number_players(&self) -> u8 {
        let ids: BTreeSet<u8> = self.tiles().filter_map(|(_, _, t)| t.player_id()).collect();
        ids.len() as u8
    }
}

// ══════════════════════════════════════════════════════════════
// Binary codec
// ══════════════════════════════════════════════════════════════

impl LevelGrid {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (header, body) = match bytes {
            [w, h, rest @ ..] => ((*w as usize, *h as usize), rest),
            _ => return Err(GameError::malformed(format!("header needs 2 bytes, got {}", bytes.len()))),
        };
        let (width, height) = header;
        if body.len() < width * height {
            return Err(GameError::malformed(format!(
                "truncated: {width}x{height} needs {} tile bytes, file has {}",
                width * height,
                body.len()
            )));
        }
        LevelGrid::new(width, height, body.to_vec())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.codes.len());
        out.push(self.width as u8);
        out.push(self.height as u8);
        out.extend_from_slice(&self.codes);
        out
    }
}

// ══════════════════════════════════════════════════════════════
// Text codec
// ══════════════════════════════════════════════════════════════

impl LevelGrid {
    /// Parse the comma-separated hex text format. Blank lines are skipped.
    pub fn parse_text(text: &str) -> Result<Self> {
        let mut rows = vec![];
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row = line
                .split(',')
                .map(|cell| parse_hex_cell(cell).ok_or_else(|| GameError::InvalidTextLevel {
                    line: i + 1,
                    reason: format!("'{}' is not a hex byte", cell.trim()),
                }))
                .collect::<Result<Vec<u8>>>()?;
            rows.push(row);
        }
        LevelGrid::from_rows(&rows)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for row in self.rows() {
            let cells: Vec<String> = row.iter().map(|c| format!("{c:02X}")).collect();
            let _ = writeln!(out, "{}", cells.join(", "));
        }
        out
    }
}

fn parse_hex_cell(cell: &str) -> Option<u8> {
    let cell = cell.trim();
    let digits = cell
        .strip_prefix("0x")
        .or_else(|| cell.strip_prefix("0X"))
        .unwrap_or(cell);
    if digits.is_empty() {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

// ══════════════════════════════════════════════════════════════
// Files
// ══════════════════════════════════════════════════════════════

pub fn load_file(path: &Path) -> Result<LevelGrid> {
    let bytes = std::fs::read(path).map_err(|source| GameError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    LevelGrid::decode(&bytes)
}

/// Read a text level and write it out in the binary format.
pub fn convert_text_to_binary(input: &Path, output: &Path) -> Result<LevelGrid> {
    let text = std::fs::read_to_string(input).map_err(|source| GameError::Io {
        path: input.to_path_buf(),
        source,
    })?;
    let grid = LevelGrid::parse_text(&text)?;
    std::fs::write(output, grid.encode()).map_err(|source| GameError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(grid)
}

// ══════════════════════════════════════════════════════════════
// Catalog (what the main menu offers)
// ══════════════════════════════════════════════════════════════

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LevelSource {
    File(PathBuf),
    Embedded(usize),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LevelEntry {
    pub name: String,
    pub source: LevelSource,
}

impl LevelEntry {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        LevelEntry { name: name.into(), source: LevelSource::File(path.into()) }
    }

    pub fn load(&self) -> Result<LevelGrid> {
        match &self.source {
            LevelSource::File(path) => load_file(path),
            LevelSource::Embedded(idx) => {
                let (_, rows) = EMBEDDED_LEVELS
                    .get(*idx)
                    .ok_or_else(|| GameError::malformed(format!("no embedded level {idx}")))?;
                LevelGrid::parse_text(&rows.join("\n"))
            }
        }
    }

    /// Identifier shown on the statistics screen.
    pub fn identifier(&self) -> String {
        match &self.source {
            LevelSource::File(path) => path.display().to_string(),
            LevelSource::Embedded(_) => self.name.clone(),
        }
    }
}

/// Levels offered by the main menu, per the source priority above.
pub fn catalog(config: &GameConfig) -> Vec<LevelEntry> {
    if !config.levels.is_empty() {
        return config
            .levels
            .iter()
            .map(|l| LevelEntry::file(l.name.clone(), l.path.clone()))
            .collect();
    }

    let from_dir = scan_directory(&config.levels_dir);
    if !from_dir.is_empty() {
        return from_dir;
    }

    log::info!(
        "no levels found in {}, using {} built-in levels",
        config.levels_dir.display(),
        EMBEDDED_LEVELS.len()
    );
    embedded_catalog()
}

pub fn embedded_catalog() -> Vec<LevelEntry> {
    EMBEDDED_LEVELS
        .iter()
        .enumerate()
        .map(|(i, (name, _))| LevelEntry { name: name.to_string(), source: LevelSource::Embedded(i) })
        .collect()
}

fn scan_directory(dir: &Path) -> Vec<LevelEntry> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("levels directory {}: {e}", dir.display());
            return vec![];
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |x| x == "bin"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| LevelEntry::file(format!("Level {}", i + 1), path))
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

const EMBEDDED_LEVELS: &[(&str, &[&str])] = &[
    ("Level 1", &[
        "01, 01, 01, 01, 01, 01, 01",
        "01, F0, 00, 00, 01, 00, 01",
        "01, 00, 01, 00, 00, 03, 01",
        "01, 01, 01, 01, 01, 01, 01",
    ]),
    ("Level 2", &[
        "01, 01, 01, 01, 01, 01, 01, 01, 01",
        "01, F0, 00, 10, 20, 00, 00, 00, 01",
        "01, 00, 00, 00, 01, 00, 03, 00, 01",
        "01, F1, 00, 00, 21, 00, 11, 00, 01",
        "01, 01, 01, 01, 01, 01, 01, 01, 01",
    ]),
    ("Level 3", &[
        "01, 01, 01, 01, 01, 01, 01",
        "01, F0, 00, 10, 01, 00, 01",
        "01, F1, 00, 00, 30, 02, 01",
        "01, F2, 00, 10, 01, 00, 01",
        "01, 01, 01, 01, 01, 01, 01",
    ]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{LogicKind, Tile};
    use proptest::prelude::*;

    #[test]
    fn decode_minimal_level() {
        let grid = LevelGrid::decode(&[2, 1, 0xF0, 0x03]).unwrap();
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 1);
        assert_eq!(grid.tile_at(0, 0), Tile::Player(0));
        assert_eq!(grid.tile_at(1, 0), Tile::Win(LogicKind::And));
    }

    #[test]
    fn decode_rejects_zero_dimensions() {
        assert!(matches!(LevelGrid::decode(&[0, 3]), Err(GameError::MalformedLevel { .. })));
        assert!(matches!(LevelGrid::decode(&[3, 0]), Err(GameError::MalformedLevel { .. })));
    }

    #[test]
    fn decode_rejects_truncated_data() {
        assert!(matches!(LevelGrid::decode(&[]), Err(GameError::MalformedLevel { .. })));
        assert!(matches!(LevelGrid::decode(&[2]), Err(GameError::MalformedLevel { .. })));
        assert!(matches!(LevelGrid::decode(&[2, 2, 1, 1, 1]), Err(GameError::MalformedLevel { .. })));
    }

    #[test]
    fn decode_rejects_trailing_data() {
        assert!(matches!(LevelGrid::decode(&[1, 1, 1, 1]), Err(GameError::MalformedLevel { .. })));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let rows = vec![vec![1, 1, 1], vec![1, 1]];
        assert!(matches!(LevelGrid::from_rows(&rows), Err(GameError::MalformedLevel { .. })));
    }

    #[test]
    fn parse_text_level() {
        let grid = LevelGrid::parse_text("01, 01, 01\n01, f0, 0x03\n\n01, 01, 01\n").unwrap();
        assert_eq!((grid.width(), grid.height()), (3, 3));
        assert_eq!(grid.code_at(1, 1), 0xF0);
        assert_eq!(grid.code_at(2, 1), 0x03);
    }

    #[test]
    fn parse_text_reports_bad_cell() {
        let err = LevelGrid::parse_text("01, 01\n01, zz\n").unwrap_err();
        assert!(matches!(err, GameError::InvalidTextLevel { line: 2, .. }));
        let err = LevelGrid::parse_text("01, 100\n").unwrap_err();
        assert!(matches!(err, GameError::InvalidTextLevel { line: 1, .. }));
    }

    #[test]
    fn text_round_trip() {
        let grid = LevelGrid::parse_text("01, 10, 2A\n3F, F7, 00\n").unwrap();
        assert_eq!(grid.to_text(), "01, 10, 2A\n3F, F7, 00\n");
        assert_eq!(LevelGrid::parse_text(&grid.to_text()).unwrap(), grid);
    }

    #[test]
    fn number_players_counts_distinct_ids() {
        let grid = LevelGrid::parse_text("F0, F0, F3\n00, F1, 01\n").unwrap();
        assert_eq!(grid.number_players(), 3);
    }

    #[test]
    fn convert_writes_binary() {
        let dir = std::env::temp_dir().join(format!("gatekeeper-convert-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("level.txt");
        let output = dir.join("level.bin");
        std::fs::write(&input, "01, 01\nF0, 03\n").unwrap();

        let grid = convert_text_to_binary(&input, &output).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), vec![2, 2, 1, 1, 0xF0, 3]);
        assert_eq!(load_file(&output).unwrap(), grid);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_file(Path::new("/definitely/not/here.bin")).unwrap_err();
        assert!(matches!(err, GameError::Io { .. }));
    }

    #[test]
    fn embedded_levels_are_playable() {
        for entry in embedded_catalog() {
            let grid = entry.load().unwrap();
            assert!(grid.number_players() >= 1, "{} has no players", entry.name);
            assert!(
                grid.tiles().any(|(_, _, t)| matches!(t, Tile::Win(_))),
                "{} has no win zone",
                entry.name
            );
        }
    }

    proptest! {
        #[test]
        fn binary_round_trip(
            (w, h, codes) in (1usize..=12, 1usize..=12)
                .prop_flat_map(|(w, h)| (Just(w), Just(h), proptest::collection::vec(any::<u8>(), w * h)))
        ) {
            let grid = LevelGrid::new(w, h, codes).unwrap();
            let decoded = LevelGrid::decode(&grid.encode()).unwrap();
            prop_assert_eq!(decoded, grid);
        }
    }
}
