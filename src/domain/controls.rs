/// Logical keys and the held-key flags the session reads each tick.
///
/// Flags are plain booleans set by key-down and cleared by key-up, so a
/// repeated down (or up) is a no-op. Opposite directions cancel rather
/// than "last key wins".

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    Jump,
    Left,
    Right,
    Reset,
}

impl Key {
    pub const ALL: [Key; 4] = [Key::Jump, Key::Left, Key::Right, Key::Reset];
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub reset: bool,
}

impl Controls {
    pub fn set(&mut self, key: Key, held: bool) {
        match key {
            Key::Jump => self.jump = held,
            Key::Left => self.left = held,
            Key::Right => self.right = held,
            Key::Reset => self.reset = held,
        }
    }

    /// Horizontal velocity for the held direction keys.
    pub fn horizontal_velocity(&self, speed: f32) -> f32 {
        match (self.left, self.right) {
            (false, true) => speed,
            (true, false) => -speed,
            _ => 0.0,
        }
    }
}
