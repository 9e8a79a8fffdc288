/// Terminal-facing adapters: keyboard/mouse, gamepad, audio and drawing.

pub mod gamepad;
pub mod input;
pub mod renderer;
pub mod sound;
