/// Entities: the player and the static sprites (spikes, ducks).
/// The player is a single concrete struct; its only state machine is the
/// pose selection in `update_animation`.

use super::physics::Rect;
use super::tile::Layer;

/// Frames in the walk cycle.
pub const WALK_FRAMES: u8 = 8;

/// Player hit box at the reference tile size of 128 px.
const PLAYER_HALF_W: f32 = 32.0;
const PLAYER_HALF_H: f32 = 60.0;
const REFERENCE_TILE: f32 = 128.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Which texture the player shows this frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pose {
    Idle,
    Jump,
    Walk(u8),
}

#[derive(Clone, Debug)]
pub struct PlayerState {
    /// Centre of the hit box, world pixels, y-up.
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub facing: Facing,
    pub walk_frame: u8,
    pub pose: Pose,
    /// Set from the tick a jump fires until the jump key is released.
    pub jump_latched: bool,
    pub half_w: f32,
    pub half_h: f32,
}

impl PlayerState {
    pub fn new(x: f32, y: f32, tile_size: f32) -> Self {
        let scale = tile_size / REFERENCE_TILE;
        PlayerState {
            x, y,
            vx: 0.0,
            vy: 0.0,
            facing: Facing::Right,
            walk_frame: 0,
            pose: Pose::Idle,
            jump_latched: false,
            half_w: PLAYER_HALF_W * scale,
            half_h: PLAYER_HALF_H * scale,
        }
    }

    pub fn hit_box(&self) -> Rect {
        Rect::centered(self.x, self.y, self.half_w, self.half_h)
    }

    /// Move to (x, y) and stop dead.
    pub fn respawn_at(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.vx = 0.0;
        self.vy = 0.0;
    }

    /// Pick facing and pose from the current velocity.
    ///
    /// Facing only flips on a sign change against the current direction,
    /// so it persists while standing still. Any vertical motion shows the
    /// jump pose; otherwise idle when still, or the next walk frame.
    pub fn update_animation(&mut self) {
        if self.vx < 0.0 && self.facing == Facing::Right {
            self.facing = Facing::Left;
        } else if self.vx > 0.0 && self.facing == Facing::Left {
            self.facing = Facing::Right;
        }

        if self.vy != 0.0 {
            self.pose = Pose::Jump;
            return;
        }

        if self.vx == 0.0 {
            self.pose = Pose::Idle;
            return;
        }

        self.walk_frame = (self.walk_frame + 1) % WALK_FRAMES;
        self.pose = Pose::Walk(self.walk_frame);
    }
}

/// A static sprite placed on a tile: a spike or a duck.
#[derive(Clone, Debug)]
pub struct Sprite {
    pub id: usize,
    pub layer: Layer,
    pub col: usize,
    pub row: usize,
}

impl Sprite {
    pub fn new(id: usize, layer: Layer, col: usize, row: usize) -> Self {
        Sprite { id, layer, col, row }
    }

    /// Spikes only hurt in the lower half of their tile.
    pub fn hit_box(&self, tile_size: f32) -> Rect {
        let left = self.col as f32 * tile_size;
        let bottom = self.row as f32 * tile_size;
        let inset = tile_size * 0.1;
        match self.layer {
            Layer::Spike => Rect {
                left: left + inset,
                right: left + tile_size - inset,
                bottom,
                top: bottom + tile_size * 0.5,
            },
            _ => Rect {
                left: left + inset,
                right: left + tile_size - inset,
                bottom: bottom + inset,
                top: bottom + tile_size - inset,
            },
        }
    }
}
