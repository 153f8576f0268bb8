/// Keyboard state tracker and logical key transitions.
///
/// Terminal input only reports presses (and, with keyboard enhancement,
/// releases). The session wants discrete key-down / key-up events per
/// logical key, so each frame:
///   1. `KeyboardState::drain_events` updates which physical keys are held
///   2. the run loop folds keyboard + gamepad into a held flag per `Key`
///   3. `KeyTransitions::update` diffs that against the previous frame
///
/// Release events are honored when the terminal supports keyboard
/// enhancement. Otherwise a key counts as released after `HOLD_TIMEOUT`
/// without a Press/Repeat event. Jump keys get `JUMP_FIRST_TIMEOUT`
/// until their first repeat arrives: the OS repeat delay is longer than
/// `HOLD_TIMEOUT`, and a synthetic release there would re-arm the jump
/// latch mid-hold.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::controls::Key;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Covers common OS key-repeat delays (250-660 ms).
const JUMP_FIRST_TIMEOUT: Duration = Duration::from_millis(700);

// ── Key bindings ──

const KEYS_JUMP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_RESET: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

pub fn bindings(key: Key) -> &'static [KeyCode] {
    match key {
        Key::Jump => KEYS_JUMP,
        Key::Left => KEYS_LEFT,
        Key::Right => KEYS_RIGHT,
        Key::Reset => KEYS_RESET,
    }
}

pub struct KeyboardState {
    /// Last Press/Repeat event for each key, and whether the key has
    /// repeated since it was first pressed.
    last_active: HashMap<KeyCode, (Instant, bool)>,

    /// Raw key events collected during drain, for meta-key handling.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl KeyboardState {
    pub fn new(honor_release: bool) -> Self {
        KeyboardState {
            last_active: HashMap::with_capacity(16),
            raw_events: Vec::with_capacity(8),
            honor_release,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before applying transitions.
    pub fn drain_events(&mut self) {
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }

        self.expire(Instant::now());
    }

    fn apply(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&normalize(key.code));
            }
            // Without enhancement, releases are unreliable; rely on timeout
            KeyEventKind::Release => {}
            _ => {
                let code = normalize(key.code);
                let repeated = self.last_active.contains_key(&code);
                self.last_active.insert(code, (now, repeated));
            }
        }
    }

    /// Drop keys that timed out (fallback for terminals without Release).
    fn expire(&mut self, now: Instant) {
        if self.honor_release { return; }
        self.last_active.retain(|code, (t, repeated)| {
            now.duration_since(*t) < hold_timeout(*code, *repeated)
        });
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.contains_key(&normalize(code))
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Is a logical key held on the keyboard?
    pub fn key_held(&self, key: Key) -> bool {
        self.any_held(bindings(key))
    }

    /// Esc, Q, or Ctrl+C pressed this frame.
    pub fn quit_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            if k.kind == KeyEventKind::Release { return false; }
            let ctrl_c = k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'));
            ctrl_c || KEYS_QUIT.contains(&k.code)
        })
    }
}

fn hold_timeout(code: KeyCode, repeated: bool) -> Duration {
    if !repeated && KEYS_JUMP.contains(&code) {
        JUMP_FIRST_TIMEOUT
    } else {
        HOLD_TIMEOUT
    }
}

/// Shifted letters report as uppercase; fold them so a Shift release
/// mid-hold does not leave a phantom key.
fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

/// Edge detector over the logical keys.
#[derive(Clone, Debug, Default)]
pub struct KeyTransitions {
    held: [bool; 4],
}

impl KeyTransitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the held set with last frame. Returns `(key, down)` pairs:
    /// releases first, then presses, each in `Key::ALL` order. Releasing
    /// before pressing keeps a same-frame swap of directions from
    /// briefly reading as both held.
    pub fn update(&mut self, now_held: impl Fn(Key) -> bool) -> Vec<(Key, bool)> {
        let mut ups = vec![];
        let mut downs = vec![];
        for (i, key) in Key::ALL.iter().enumerate() {
            let held = now_held(*key);
            if held != self.held[i] {
                if held { downs.push((*key, true)); } else { ups.push((*key, false)); }
                self.held[i] = held;
            }
        }
        ups.extend(downs);
        ups
    }
}
