/// Sound engine: procedural blips for puzzle events via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing). `Sfx::for_event` is shared by
/// both builds, so which event makes which sound is decided in one place.

use crate::sim::event::GameEvent;

/// One pre-generated effect.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
pub enum Sfx {
    ButtonPress,
    ButtonRelease,
    GateOpen,
    GateClose,
    Stuck,
    TurnSwitch,
    Win,
}

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
impl Sfx {
    pub const ALL: [Sfx; 7] = [
        Sfx::ButtonPress,
        Sfx::ButtonRelease,
        Sfx::GateOpen,
        Sfx::GateClose,
        Sfx::Stuck,
        Sfx::TurnSwitch,
        Sfx::Win,
    ];

    pub fn for_event(event: &GameEvent) -> Sfx {
        match event {
            GameEvent::ButtonPressed { .. } => Sfx::ButtonPress,
            GameEvent::ButtonReleased { .. } => Sfx::ButtonRelease,
            GameEvent::GateOpened { .. } => Sfx::GateOpen,
            GameEvent::GateClosed { .. } => Sfx::GateClose,
            GameEvent::PlayerStuck { .. } => Sfx::Stuck,
            GameEvent::TurnSwitched { .. } => Sfx::TurnSwitch,
            GameEvent::LevelWon => Sfx::Win,
        }
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;
    use crate::sim::event::GameEvent;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<Sfx, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output: {e}");
                    return None;
                }
            };

            let buffers = Sfx::ALL
                .iter()
                .map(|&sfx| (sfx, Arc::new(make_wav(&generate(sfx)))))
                .collect();

            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        fn play(&self, sfx: Sfx) {
            let Some(buf) = self.buffers.get(&sfx) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        /// Play one sound per distinct effect in this frame's events.
        pub fn play_events(&self, events: &[GameEvent]) {
            let mut played: Vec<Sfx> = Vec::with_capacity(events.len());
            for sfx in events.iter().map(Sfx::for_event) {
                if !played.contains(&sfx) {
                    self.play(sfx);
                    played.push(sfx);
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn generate(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::ButtonPress => sweep(520.0, 780.0, 0.06, 0.25),
            Sfx::ButtonRelease => sweep(780.0, 520.0, 0.06, 0.2),
            Sfx::GateOpen => notes(&[(659.0, 0.05), (988.0, 0.09)], 0.25),
            Sfx::GateClose => notes(&[(330.0, 0.05), (220.0, 0.09)], 0.3),
            Sfx::Stuck => buzz(110.0, 0.08, 0.2),
            Sfx::TurnSwitch => sweep(880.0, 880.0, 0.04, 0.2),
            Sfx::Win => {
                // C5→E5→G5→C6, last note held
                let mut s = notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1)], 0.3);
                s.extend(notes(&[(1047.0, 0.35)], 0.3));
                s
            }
        }
    }

    /// Sine glide from `from` to `to` Hz with a linear fade out.
    fn sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - t) * volume
            })
            .collect()
    }

    /// Sequence of (freq, seconds) notes, sine + 2nd harmonic.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5) * 0.7;
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Low square-ish buzz for a refused move.
    fn buzz(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let square = if (t * freq * TAU).sin() >= 0.0 { 1.0 } else { -1.0 };
                square * (1.0 - i as f32 / n as f32) * volume
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_events(&self, _events: &[GameEvent]) {}
}
