/// Frame clocks for animated sprite layers.
/// Each clock accumulates elapsed time and steps a wrapping frame index;
/// the renderer maps the index to a glyph variant.

use super::tile::Layer;

#[derive(Clone, Debug)]
pub struct LayerClock {
    pub layer: Layer,
    frame_time: f32,
    frame_count: u8,
    elapsed: f32,
    frame: u8,
}

impl LayerClock {
    pub fn new(layer: Layer, frame_time: f32, frame_count: u8) -> Self {
        LayerClock {
            layer,
            frame_time,
            frame_count: frame_count.max(1),
            elapsed: 0.0,
            frame: 0,
        }
    }

    /// Advance by `dt` seconds. Large deltas may skip several frames.
    pub fn advance(&mut self, dt: f32) {
        if self.frame_time <= 0.0 { return; }
        self.elapsed += dt.max(0.0);
        while self.elapsed >= self.frame_time {
            self.elapsed -= self.frame_time;
            self.frame = (self.frame + 1) % self.frame_count;
        }
    }

    pub fn frame(&self) -> u8 {
        self.frame
    }
}

/// The default clocks: spikes glint, the duck bobs, the background drifts.
pub fn default_clocks() -> Vec<LayerClock> {
    vec![
        LayerClock::new(Layer::Spike, 0.5, 2),
        LayerClock::new(Layer::Duck, 0.4, 2),
        LayerClock::new(Layer::Background, 1.0, 4),
    ]
}
