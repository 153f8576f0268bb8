/// Gamepad input tracker using gilrs.
///
/// Reports held state per logical key so it can be folded together with
/// the keyboard before edge detection. Mapping comes from `[gamepad]` in
/// config.toml; defaults:
///   D-pad / Left Stick    →  Left / Right (D-pad Up also jumps)
///   A                     →  Jump
///   Start                 →  Reset
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::{debug, info};

use crate::config::GamepadConfig;
use crate::domain::controls::Key;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

const BUTTON_COUNT: usize = 10;

/// Face and shoulder buttons that can be bound by name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.trim().to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Action-to-button mapping.
#[derive(Clone, Debug, PartialEq)]
struct ActionMap {
    jump: Vec<Btn>,
    reset: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump:  vec![Btn::A],
            reset: vec![Btn::Start],
            quit:  vec![Btn::Select],
        }
    }
}

impl ActionMap {
    /// Unknown names are skipped; an action left with no buttons keeps
    /// its default binding.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
            let btns: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if btns.is_empty() { fallback } else { btns }
        }
        let d = ActionMap::default();
        ActionMap {
            jump: parse_list(&cfg.jump, d.jump),
            reset: parse_list(&cfg.reset, d.reset),
            quit: parse_list(&cfg.quit, d.quit),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [bool; BUTTON_COUNT],
    quit_edge: bool,

    dpad_up: bool,
    dpad_left: bool,
    dpad_right: bool,
    stick_x: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    if has_pad { info!("gamepad detected"); }
                    (Some(g), has_pad)
                }
                Err(e) => {
                    debug!(error = %e, "gamepad support unavailable");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [false; BUTTON_COUNT],
            quit_edge: false,
            dpad_up: false,
            dpad_left: false,
            dpad_right: false,
            stick_x: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.action_map = ActionMap::from_config(cfg);
    }

    pub fn update(&mut self) {
        self.quit_edge = false;

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(Axis::LeftStickX, value, _) => {
                    self.connected = true;
                    self.stick_x = value;
                }
                EventType::Connected => {
                    info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        // D-pad is not bindable; it always drives movement
        match gilrs_btn {
            Button::DPadUp    => { self.dpad_up = held; return; }
            Button::DPadLeft  => { self.dpad_left = held; return; }
            Button::DPadRight => { self.dpad_right = held; return; }
            _ => {}
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn as usize] = held;
            if held && self.action_map.quit.contains(&btn) {
                self.quit_edge = true;
            }
        }
    }

    // ── Queries ──

    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize])
    }

    /// Held state of a logical key on the pad.
    pub fn key_held(&self, key: Key) -> bool {
        match key {
            Key::Jump => self.dpad_up || self.any_held(&self.action_map.jump),
            Key::Left => self.dpad_left || self.stick_x < -STICK_DEADZONE,
            Key::Right => self.dpad_right || self.stick_x > STICK_DEADZONE,
            Key::Reset => self.any_held(&self.action_map.reset),
        }
    }

    pub fn quit_pressed(&self) -> bool {
        self.quit_edge
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [false; BUTTON_COUNT];
        self.dpad_up = false;
        self.dpad_left = false;
        self.dpad_right = false;
        self.stick_x = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(jump: &[&str], reset: &[&str], quit: &[&str]) -> GamepadConfig {
        let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        GamepadConfig { jump: own(jump), reset: own(reset), quit: own(quit) }
    }

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("a"), Some(Btn::A));
        assert_eq!(Btn::from_name("South"), Some(Btn::A));
        assert_eq!(Btn::from_name(" rb "), Some(Btn::R1));
        assert_eq!(Btn::from_name("back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn config_overrides_bindings() {
        let map = ActionMap::from_config(&cfg(&["B", "Y"], &["Select"], &["Start"]));
        assert_eq!(map.jump, vec![Btn::B, Btn::Y]);
        assert_eq!(map.reset, vec![Btn::Select]);
        assert_eq!(map.quit, vec![Btn::Start]);
    }

    #[test]
    fn unknown_names_keep_defaults() {
        let map = ActionMap::from_config(&cfg(&["turbo"], &[], &["Select"]));
        assert_eq!(map, ActionMap::default());
    }

    #[test]
    fn held_buttons_map_to_keys() {
        let mut pad = GamepadState::new();
        pad.buttons[Btn::A as usize] = true;
        pad.stick_x = -0.9;
        assert!(pad.key_held(Key::Jump));
        assert!(pad.key_held(Key::Left));
        assert!(!pad.key_held(Key::Right));
        assert!(!pad.key_held(Key::Reset));

        pad.stick_x = 0.1;
        assert!(!pad.key_held(Key::Left));
    }
}
