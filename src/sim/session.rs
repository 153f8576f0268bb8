/// The game session: input flags, player, score and outcome for one run
/// of a level.
///
/// Input handlers and `tick` run on the render-loop thread; each returns
/// the events it produced so the caller can play sounds.
///
/// State machine:
///   Playing ── duck ──▶ Won          (terminal until Reset)
///   Won ── Reset ──▶ Playing         (full setup, score back to start)
///   Playing ── spike ──▶ Playing     (penalty + respawn, score kept)

use tracing::{debug, info};

use crate::config::{PhysicsConfig, RulesConfig};
use crate::domain::controls::{Controls, Key};
use crate::domain::entity::PlayerState;
use crate::domain::physics;
use crate::domain::tile::Layer;
use super::event::GameEvent;
use super::level::{Level, LevelDef};

/// Collision query order. The goal comes first so that a win on the same
/// tick as a spike contact is never cancelled by the spike.
const COLLISION_LAYERS: [Layer; 2] = [Layer::Duck, Layer::Spike];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Playing,
    Won,
}

/// End-of-game text. Empty while playing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Banner {
    pub title: String,
    pub final_score: String,
    pub reset_hint: String,
}

impl Banner {
    fn won(score: i32) -> Self {
        Banner {
            title: String::from("You Win!"),
            final_score: format!("Final Score: {score}"),
            reset_hint: String::from("Press \"r\" to reset"),
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.title.is_empty()
    }
}

pub struct Session {
    pub controls: Controls,
    pub player: PlayerState,
    pub score: i32,
    pub outcome: Outcome,
    pub banner: Banner,
    /// Ground contact as of the last tick (HUD only).
    pub can_jump: bool,
    pub level: Level,
    def: LevelDef,
    physics: PhysicsConfig,
    rules: RulesConfig,
}

impl Session {
    pub fn new(def: LevelDef, physics: PhysicsConfig, rules: RulesConfig) -> Self {
        let level = Level::build(&def, physics.tile_size, rules.spawn);
        let mut session = Session {
            controls: Controls::default(),
            player: PlayerState::new(0.0, 0.0, physics.tile_size),
            score: rules.start_score,
            outcome: Outcome::Playing,
            banner: Banner::default(),
            can_jump: false,
            level,
            def,
            physics,
            rules,
        };
        session.setup();
        session
    }

    /// (Re)build the level and place a fresh player at spawn.
    /// Score is left alone; the reset key path restores it.
    pub fn setup(&mut self) {
        self.level = Level::build(&self.def, self.physics.tile_size, self.rules.spawn);
        let mut player = PlayerState::new(0.0, 0.0, self.physics.tile_size);
        let (x, y) = self.level.spawn_position(player.half_h);
        player.respawn_at(x, y);
        self.player = player;
        self.outcome = Outcome::Playing;
        self.banner = Banner::default();
        self.can_jump = false;
        info!(
            level = %self.level.name,
            spawn_col = self.level.spawn.0,
            spawn_row = self.level.spawn.1,
            score = self.score,
            "session setup"
        );
    }

    pub fn handle_key_down(&mut self, key: Key) -> Vec<GameEvent> {
        let mut events = vec![];
        self.controls.set(key, true);

        if key == Key::Reset {
            self.player.jump_latched = false;
            self.controls.left = false;
            self.controls.right = false;
            self.score = self.rules.start_score;
            self.setup();
            events.push(GameEvent::SessionReset);
        }

        self.recompute_velocity(&mut events);
        events
    }

    pub fn handle_key_up(&mut self, key: Key) -> Vec<GameEvent> {
        let mut events = vec![];
        self.controls.set(key, false);
        if key == Key::Jump {
            self.player.jump_latched = false;
        }
        self.recompute_velocity(&mut events);
        events
    }

    /// Derive velocity from the held keys. Runs on every input change.
    fn recompute_velocity(&mut self, events: &mut Vec<GameEvent>) {
        if self.outcome == Outcome::Won {
            self.player.vx = 0.0;
        } else {
            if self.controls.jump
                && !self.player.jump_latched
                && physics::can_jump(&self.player, &self.level.terrain, self.physics.jump_tolerance)
            {
                self.player.vy = self.physics.jump_speed;
                self.player.jump_latched = true;
                debug!(x = self.player.x, y = self.player.y, "jump");
                events.push(GameEvent::Jumped);
            }
            self.player.vx = self.controls.horizontal_velocity(self.physics.movement_speed);
        }

        if self.controls.reset {
            self.player.vx = 0.0;
            self.player.vy = 0.0;
        }
    }

    /// Advance one frame. `dt` is in seconds and only drives animation.
    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        let mut events = vec![];

        physics::integrate(&mut self.player, self.physics.gravity, &self.level.terrain);
        self.can_jump = physics::can_jump(&self.player, &self.level.terrain, self.physics.ground_tolerance);

        self.level.advance_animations(dt);
        self.player.update_animation();

        if self.outcome == Outcome::Won {
            return events;
        }

        let hits = self.level.colliding(&self.player.hit_box(), &COLLISION_LAYERS);
        for hit in hits {
            match hit.layer {
                Layer::Duck => {
                    self.level.remove_sprite(Layer::Duck, hit.sprite_id);
                    self.outcome = Outcome::Won;
                    self.banner = Banner::won(self.score);
                    self.player.vx = 0.0;
                    info!(score = self.score, "duck reached");
                    events.push(GameEvent::DuckReached { score: self.score });
                    return events;
                }
                _ => {
                    self.level.remove_sprite(hit.layer, hit.sprite_id);
                    self.score -= self.rules.spike_penalty;
                    debug!(layer = hit.layer.name(), col = hit.col, row = hit.row, score = self.score, "hazard hit");
                    events.push(GameEvent::SpikeHit { col: hit.col, row: hit.row, score: self.score });
                    self.restart();
                }
            }
        }

        events
    }

    /// Respawn in place after damage: back to spawn, stopped, movement
    /// keys and jump latch cleared. Score and outcome are untouched.
    fn restart(&mut self) {
        let (x, y) = self.level.spawn_position(self.player.half_h);
        self.player.respawn_at(x, y);
        self.player.jump_latched = false;
        self.controls.left = false;
        self.controls.right = false;
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Pose;

    /// Spawn at col 1; spikes at cols 4 and 6; duck at col 7.
    const ROWS: &[&str] = &[
        "          ",
        " P  ^ ^D  ",
        "==========",
    ];

    fn session() -> Session {
        session_with(ROWS)
    }

    fn session_with(rows: &[&str]) -> Session {
        let def = LevelDef { name: "test".into(), rows: rows.iter().map(|r| r.to_string()).collect() };
        Session::new(def, PhysicsConfig::default(), RulesConfig::default())
    }

    /// Stand the player on the floor with its centre at `x`.
    fn stand_at(s: &mut Session, x: f32) {
        s.player.x = x;
        s.player.y = s.level.tile_size() + s.player.half_h;
    }

    fn stand_on_tile(s: &mut Session, col: usize) {
        let x = (col as f32 + 0.5) * s.level.tile_size();
        stand_at(s, x);
    }

    fn count_jumps(events: &[GameEvent]) -> usize {
        events.iter().filter(|e| **e == GameEvent::Jumped).count()
    }

    fn assert_at_spawn(s: &Session) {
        assert_eq!((s.player.x, s.player.y), s.level.spawn_position(s.player.half_h));
        assert_eq!((s.player.vx, s.player.vy), (0.0, 0.0));
    }

    // ── Setup ──

    #[test]
    fn new_session_starts_playing_at_spawn() {
        let s = session();
        assert_eq!(s.score, 1000);
        assert_eq!(s.outcome, Outcome::Playing);
        assert!(!s.banner.is_visible());
        assert_at_spawn(&s);
    }

    // ── Horizontal input ──

    #[test]
    fn single_direction_sets_speed() {
        let mut s = session();
        s.handle_key_down(Key::Right);
        assert_eq!(s.player.vx, 10.0);
        s.handle_key_up(Key::Right);
        assert_eq!(s.player.vx, 0.0);
        s.handle_key_down(Key::Left);
        assert_eq!(s.player.vx, -10.0);
    }

    #[test]
    fn opposite_directions_cancel_in_any_order() {
        for order in [[Key::Left, Key::Right], [Key::Right, Key::Left]] {
            let mut s = session();
            for key in order {
                s.handle_key_down(key);
            }
            for _ in 0..5 {
                assert_eq!(s.player.vx, 0.0);
                s.tick(1.0 / 60.0);
            }
        }
    }

    #[test]
    fn duplicate_events_are_idempotent() {
        let mut s = session();
        s.handle_key_down(Key::Left);
        s.handle_key_down(Key::Left);
        s.handle_key_up(Key::Left);
        assert!(!s.controls.left);
        s.handle_key_up(Key::Left);
        assert!(!s.controls.left);
        assert_eq!(s.player.vx, 0.0);
    }

    #[test]
    fn walking_on_ground_cycles_walk_pose() {
        let mut s = session();
        s.handle_key_down(Key::Right);
        s.tick(1.0 / 60.0);
        assert_eq!(s.player.pose, Pose::Walk(1));
        assert!(s.can_jump);
    }

    // ── Jump ──

    #[test]
    fn jump_fires_once_per_press() {
        let mut s = session();
        let mut jumps = count_jumps(&s.handle_key_down(Key::Jump));
        assert_eq!(jumps, 1);
        assert_eq!(s.player.vy, 25.0);
        assert!(s.player.jump_latched);

        // Hold through the whole arc and landing; other keys re-run the
        // velocity policy but must not re-trigger the jump.
        for i in 0..120 {
            s.tick(1.0 / 60.0);
            if i % 10 == 0 {
                jumps += count_jumps(&s.handle_key_down(Key::Left));
                jumps += count_jumps(&s.handle_key_up(Key::Left));
            }
        }
        assert!(s.can_jump);
        assert_eq!(jumps, 1);

        // Release re-arms the trigger
        s.handle_key_up(Key::Jump);
        assert!(!s.player.jump_latched);
        assert_eq!(count_jumps(&s.handle_key_down(Key::Jump)), 1);
    }

    #[test]
    fn jump_needs_ground() {
        let mut s = session();
        s.player.y += 200.0;
        let events = s.handle_key_down(Key::Jump);
        assert_eq!(count_jumps(&events), 0);
        assert!(!s.player.jump_latched);
        assert_eq!(s.player.vy, 0.0);
    }

    #[test]
    fn jump_shows_jump_pose() {
        let mut s = session();
        s.handle_key_down(Key::Jump);
        s.tick(1.0 / 60.0);
        assert_eq!(s.player.pose, Pose::Jump);
        assert!(!s.can_jump);
    }

    // ── Reset key ──

    #[test]
    fn held_reset_forces_zero_velocity() {
        let mut s = session();
        s.handle_key_down(Key::Reset);
        s.handle_key_down(Key::Right);
        assert_eq!((s.player.vx, s.player.vy), (0.0, 0.0));
        s.handle_key_up(Key::Reset);
        assert_eq!(s.player.vx, 10.0);
    }

    #[test]
    fn reset_release_does_not_setup_again() {
        let mut s = session();
        s.handle_key_down(Key::Reset);
        stand_on_tile(&mut s, 3);
        let x = s.player.x;
        let events = s.handle_key_up(Key::Reset);
        assert!(events.is_empty());
        assert_eq!(s.player.x, x);
    }

    // ── Collisions ──

    #[test]
    fn spike_penalizes_and_respawns() {
        let mut s = session();
        s.handle_key_down(Key::Right);
        stand_on_tile(&mut s, 4);
        let events = s.tick(1.0 / 60.0);

        assert_eq!(s.score, 950);
        assert_eq!(s.outcome, Outcome::Playing);
        assert_at_spawn(&s);
        assert!(!s.controls.right);
        assert!(!s.player.jump_latched);
        assert_eq!(s.level.spikes.len(), 1);
        assert_eq!(events, vec![GameEvent::SpikeHit { col: 4, row: 1, score: 950 }]);
    }

    #[test]
    fn duck_wins() {
        let mut s = session();
        stand_on_tile(&mut s, 7);
        let events = s.tick(1.0 / 60.0);

        assert_eq!(s.outcome, Outcome::Won);
        assert_eq!(events, vec![GameEvent::DuckReached { score: 1000 }]);
        assert!(s.level.ducks.is_empty());
        assert_eq!(s.banner.title, "You Win!");
        assert_eq!(s.banner.final_score, "Final Score: 1000");
        assert_eq!(s.banner.reset_hint, "Press \"r\" to reset");
    }

    #[test]
    fn win_takes_priority_over_same_tick_spike() {
        let mut s = session();
        // Straddle the spike at col 6 and the duck at col 7
        let x = 7.0 * s.level.tile_size();
        stand_at(&mut s, x);
        let events = s.tick(1.0 / 60.0);

        assert_eq!(s.outcome, Outcome::Won);
        assert_eq!(s.score, 1000);
        assert_eq!(s.level.spikes.len(), 2);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn spike_then_duck_scenario() {
        let mut s = session();
        stand_on_tile(&mut s, 4);
        s.tick(1.0 / 60.0);
        assert_eq!(s.score, 950);
        assert_eq!(s.outcome, Outcome::Playing);
        assert_at_spawn(&s);

        stand_on_tile(&mut s, 7);
        s.tick(1.0 / 60.0);
        assert_eq!(s.outcome, Outcome::Won);
        assert_eq!(s.score, 950);
        assert!(s.banner.is_visible());
        assert_eq!(s.banner.final_score, "Final Score: 950");
    }

    #[test]
    fn gameplay_input_ignored_after_win() {
        let mut s = session();
        stand_on_tile(&mut s, 7);
        s.tick(1.0 / 60.0);

        s.handle_key_down(Key::Right);
        assert_eq!(s.player.vx, 0.0);
        let events = s.handle_key_down(Key::Jump);
        assert_eq!(count_jumps(&events), 0);

        // Spikes no longer hurt once won
        stand_on_tile(&mut s, 6);
        s.tick(1.0 / 60.0);
        assert_eq!(s.score, 1000);
    }

    #[test]
    fn reset_from_won_restores_session() {
        let mut s = session();
        stand_on_tile(&mut s, 4);
        s.tick(1.0 / 60.0);
        stand_on_tile(&mut s, 7);
        s.tick(1.0 / 60.0);
        assert_eq!(s.outcome, Outcome::Won);

        let events = s.handle_key_down(Key::Reset);
        assert!(events.contains(&GameEvent::SessionReset));
        assert_eq!(s.outcome, Outcome::Playing);
        assert_eq!(s.score, 1000);
        assert!(!s.banner.is_visible());
        assert_at_spawn(&s);
        assert_eq!(s.level.spikes.len(), 2);
        assert_eq!(s.level.ducks.len(), 1);
    }

    #[test]
    fn every_spike_touched_in_one_tick_costs_the_penalty() {
        // Adjacent spikes at cols 2 and 3
        let mut s = session_with(&[
            "      ",
            " P^^  ",
            "======",
        ]);
        let x = 3.0 * s.level.tile_size();
        stand_at(&mut s, x);
        let events = s.tick(1.0 / 60.0);

        assert_eq!(s.score, 900);
        assert!(s.level.spikes.is_empty());
        assert_eq!(s.outcome, Outcome::Playing);
        assert_at_spawn(&s);
        assert_eq!(events, vec![
            GameEvent::SpikeHit { col: 2, row: 1, score: 950 },
            GameEvent::SpikeHit { col: 3, row: 1, score: 900 },
        ]);
    }

    #[test]
    fn score_has_no_floor() {
        let mut s = session();
        s.score = 20;
        stand_on_tile(&mut s, 4);
        s.tick(1.0 / 60.0);
        assert_eq!(s.score, -30);
    }
}
