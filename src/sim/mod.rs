/// Level data, the running world and the per-frame step, plus the
/// scene machine that strings levels together.

pub mod event;
pub mod level;
pub mod scene;
pub mod step;
pub mod world;
