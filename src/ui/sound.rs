/// Sound engine: procedural chiptune effects via rodio.
///
/// Three effects, generated once as in-memory WAV buffers:
///   jump  rising chirp
///   hurt  descending minor run (spike hit)
///   win   arpeggio with a held top note (duck reached)
///
/// Build without the "sound" feature to get a silent stub.

use crate::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::warn;

    pub(super) const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_jump: Arc<Vec<u8>>,
        sfx_hurt: Arc<Vec<u8>>,
        sfx_win: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio output; continuing without sound");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_jump: Arc::new(super::make_wav(&super::gen_jump())),
                sfx_hurt: Arc::new(super::make_wav(&super::gen_hurt())),
                sfx_win: Arc::new(super::make_wav(&super::gen_win())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_jump(&self) { self.play(&self.sfx_jump); }
        pub fn play_hurt(&self) { self.play(&self.sfx_hurt); }
        pub fn play_win(&self) { self.play(&self.sfx_win); }
    }
}

#[cfg(not(feature = "sound"))]
const SAMPLE_RATE: u32 = 22050;
#[cfg(feature = "sound")]
use inner::SAMPLE_RATE;

// ════════════════════════════════════════════════════════════
//  Waveform generators: mono f32 samples in [-1, 1]
// ════════════════════════════════════════════════════════════

const TAU: f32 = std::f32::consts::TAU;

/// Square wave, softened to two harmonics.
fn square(t: f32, freq: f32) -> f32 {
    (t * freq * TAU).sin() * 0.8 + (t * freq * 3.0 * TAU).sin() * 0.2
}

/// Jump: quick upward sweep.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn gen_jump() -> Vec<f32> {
    let duration = 0.12;
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    let mut phase = 0.0_f32;
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let freq = 300.0 + t * t * 600.0; // 300Hz → 900Hz
            phase += freq / SAMPLE_RATE as f32;
            let env = (1.0 - t).powf(0.7);
            (phase * TAU).sin() * env * 0.25
        })
        .collect()
}

/// Spike: falling minor notes.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn gen_hurt() -> Vec<f32> {
    let notes = [392.0_f32, 330.0, 262.0]; // G4→E4→C4
    let note_dur = 0.09;
    let mut samples = Vec::new();
    for &freq in &notes {
        let n = (SAMPLE_RATE as f32 * note_dur) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32) * 0.5;
            samples.push(square(t, freq) * env * 0.3);
        }
    }
    samples
}

/// Win: C major arpeggio, last note held and faded.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn gen_win() -> Vec<f32> {
    let notes = [523.0_f32, 659.0, 784.0, 1047.0]; // C5→E5→G5→C6
    let note_dur = 0.08;
    let mut samples = Vec::new();
    for &freq in &notes {
        let n = (SAMPLE_RATE as f32 * note_dur) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32).powf(0.5) * 0.4;
            samples.push(square(t, freq) * env * 0.3);
        }
    }
    let n = (SAMPLE_RATE as f32 * 0.3) as usize;
    for i in 0..n {
        let t = i as f32 / SAMPLE_RATE as f32;
        let env = 1.0 - i as f32 / n as f32;
        samples.push(square(t, 1047.0) * env * 0.3);
    }
    samples
}

// ════════════════════════════════════════════════════════════
//  WAV encoder: 16-bit PCM mono
// ════════════════════════════════════════════════════════════

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn make_wav(samples: &[f32]) -> Vec<u8> {
    let num_channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
    let block_align = num_channels * bits_per_sample / 8;
    let data_size = samples.len() as u32 * 2;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
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

// ════════════════════════════════════════════════════════════
//  Public API
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_jump(&self) {}
    pub fn play_hurt(&self) {}
    pub fn play_win(&self) {}
}

/// Map session events to effects. No-op when audio is unavailable.
pub fn process_sound_events(sound: &Option<SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for ev in events {
        match ev {
            GameEvent::Jumped => sfx.play_jump(),
            GameEvent::SpikeHit { .. } => sfx.play_hurt(),
            GameEvent::DuckReached { .. } => sfx.play_win(),
            GameEvent::SessionReset => {}
        }
    }
}
