/// Pure game model: geometry, colors, tile codes, entities and the rules
/// that connect them. Nothing here touches the terminal.

pub mod color;
pub mod entity;
pub mod geometry;
pub mod physics;
pub mod rules;
pub mod tile;
