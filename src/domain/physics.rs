/// Platformer physics: gravity, wall resolution and ground probing.
///
/// ## Model
///
/// World units are pixels, y-up. The player is an axis-aligned box that
/// moves against a grid of solid tiles (see `TileMap::solid_at`).
///
/// One `integrate` call per tick:
///   1. Gravity is added to vertical velocity.
///   2. The box moves vertically. If it now overlaps solid tiles it is
///      snapped back to the contact face and vertical velocity is zeroed
///      (landing on a floor or bumping a ceiling).
///   3. The box moves horizontally and is snapped to any wall face it
///      entered. Horizontal velocity is left alone; input owns it.
///
/// Overlap is strict: boxes that only touch do not collide. Every query
/// shrinks the box by `CONTACT_EPSILON` so float drift after a snap never
/// registers as contact on the other axis.

use super::entity::PlayerState;
use super::tile::TileMap;

const CONTACT_EPSILON: f32 = 0.01;

/// Axis-aligned rectangle in world pixels (y-up).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rect {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Rect {
    pub fn centered(x: f32, y: f32, half_w: f32, half_h: f32) -> Self {
        Rect {
            left: x - half_w,
            right: x + half_w,
            bottom: y - half_h,
            top: y + half_h,
        }
    }

    /// Strict overlap test.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.bottom < other.top
            && self.top > other.bottom
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            left: self.left + dx,
            right: self.right + dx,
            bottom: self.bottom + dy,
            top: self.top + dy,
        }
    }

    fn shrink(&self, by: f32) -> Rect {
        Rect {
            left: self.left + by,
            right: self.right - by,
            bottom: self.bottom + by,
            top: self.top - by,
        }
    }
}

/// Extent of the solid tiles a box overlaps.
#[derive(Clone, Copy, Debug)]
struct Contact {
    min_left: f32,
    max_right: f32,
    min_bottom: f32,
    max_top: f32,
}

/// Collect the solid tiles overlapped by `rect`, or None if it is clear.
fn solid_contact(map: &TileMap, rect: &Rect) -> Option<Contact> {
    let ts = map.tile_size;
    let r = rect.shrink(CONTACT_EPSILON);

    let col_lo = (r.left / ts).floor() as i32;
    let col_hi = (r.right / ts).ceil() as i32 - 1;
    let row_lo = (r.bottom / ts).floor() as i32;
    let row_hi = (r.top / ts).ceil() as i32 - 1;

    let mut contact: Option<Contact> = None;
    for row in row_lo..=row_hi {
        for col in col_lo..=col_hi {
            if !map.solid_at(col, row) { continue; }
            let left = col as f32 * ts;
            let bottom = row as f32 * ts;
            let c = contact.get_or_insert(Contact {
                min_left: f32::MAX,
                max_right: f32::MIN,
                min_bottom: f32::MAX,
                max_top: f32::MIN,
            });
            c.min_left = c.min_left.min(left);
            c.max_right = c.max_right.max(left + ts);
            c.min_bottom = c.min_bottom.min(bottom);
            c.max_top = c.max_top.max(bottom + ts);
        }
    }
    contact
}

/// Advance the player one tick under gravity, resolving against walls.
pub fn integrate(player: &mut PlayerState, gravity: f32, map: &TileMap) {
    player.vy -= gravity;

    // Vertical pass
    player.y += player.vy;
    if let Some(c) = solid_contact(map, &player.hit_box()) {
        if player.vy > 0.0 {
            player.y = c.min_bottom - player.half_h;
        } else {
            player.y = c.max_top + player.half_h;
        }
        player.vy = 0.0;
    }

    // Horizontal pass
    if player.vx == 0.0 { return; }
    player.x += player.vx;
    if let Some(c) = solid_contact(map, &player.hit_box()) {
        if player.vx > 0.0 {
            player.x = c.min_left - player.half_w;
        } else {
            player.x = c.max_right + player.half_w;
        }
    }
}

/// Is there solid ground within `tolerance` pixels below the player?
pub fn can_jump(player: &PlayerState, map: &TileMap, tolerance: f32) -> bool {
    let probe = player.hit_box().offset(0.0, -tolerance);
    solid_contact(map, &probe).is_some()
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::Tile;

    const TS: f32 = 128.0;
    const GRAVITY: f32 = 1.4;

    /// Rows are written top-to-bottom; '=' is a platform.
    fn map_from(rows: &[&str]) -> TileMap {
        let h = rows.len();
        let w = rows[0].len();
        let mut map = TileMap::new(w, h, TS);
        for (i, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '=' { map.set(x, h - 1 - i, Tile::Platform); }
            }
        }
        map
    }

    /// Player standing exactly on top of tile row `row - 1`, centred in `col`.
    fn standing_at(col: usize, row: usize) -> PlayerState {
        let mut p = PlayerState::new(0.0, 0.0, TS);
        p.x = (col as f32 + 0.5) * TS;
        p.y = row as f32 * TS + p.half_h;
        p
    }

    // ── Rect ──

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = Rect { left: 0.0, right: 10.0, bottom: 0.0, top: 10.0 };
        let b = a.offset(10.0, 0.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&a.offset(9.0, 9.0)));
    }

    // ── integrate ──

    #[test]
    fn resting_on_floor_stays_put() {
        let map = map_from(&[
            "    ",
            "====",
        ]);
        let mut p = standing_at(1, 1);
        let y0 = p.y;
        for _ in 0..10 {
            integrate(&mut p, GRAVITY, &map);
        }
        assert_eq!(p.y, y0);
        assert_eq!(p.vy, 0.0);
    }

    #[test]
    fn falls_and_lands_on_floor() {
        let map = map_from(&[
            "    ",
            "    ",
            "    ",
            "====",
        ]);
        let mut p = standing_at(1, 3);
        for _ in 0..200 {
            integrate(&mut p, GRAVITY, &map);
        }
        assert_eq!(p.y, TS + p.half_h);
        assert_eq!(p.vy, 0.0);
    }

    #[test]
    fn jump_rises_then_returns_to_ground() {
        let map = map_from(&[
            "    ",
            "    ",
            "    ",
            "====",
        ]);
        let mut p = standing_at(1, 1);
        let ground = p.y;
        p.vy = 25.0;
        integrate(&mut p, GRAVITY, &map);
        assert!(p.y > ground);
        for _ in 0..200 {
            integrate(&mut p, GRAVITY, &map);
        }
        assert_eq!(p.y, ground);
    }

    #[test]
    fn ceiling_stops_upward_motion() {
        let map = map_from(&[
            "====",
            "    ",
            "====",
        ]);
        let mut p = standing_at(1, 1);
        p.vy = 100.0;
        integrate(&mut p, GRAVITY, &map);
        assert_eq!(p.vy, 0.0);
        assert_eq!(p.y + p.half_h, 2.0 * TS);
    }

    #[test]
    fn wall_blocks_horizontal_motion() {
        let map = map_from(&[
            "  = ",
            "====",
        ]);
        let mut p = standing_at(1, 1);
        p.vx = 10.0;
        for _ in 0..20 {
            integrate(&mut p, GRAVITY, &map);
        }
        assert_eq!(p.x + p.half_w, 2.0 * TS);
        // Input owns vx; the wall does not cancel it
        assert_eq!(p.vx, 10.0);
    }

    #[test]
    fn map_edges_are_walls() {
        let map = map_from(&[
            "  ",
            "==",
        ]);
        let mut p = standing_at(0, 1);
        p.vx = -10.0;
        for _ in 0..20 {
            integrate(&mut p, GRAVITY, &map);
        }
        assert_eq!(p.x - p.half_w, 0.0);
    }

    #[test]
    fn walking_along_floor_does_not_snag() {
        let map = map_from(&[
            "      ",
            "======",
        ]);
        let mut p = standing_at(0, 1);
        let y0 = p.y;
        p.vx = 10.0;
        for _ in 0..40 {
            integrate(&mut p, GRAVITY, &map);
        }
        assert_eq!(p.y, y0);
        assert!(p.x > 3.0 * TS);
    }

    // ── can_jump ──

    #[test]
    fn can_jump_on_ground_not_in_air() {
        let map = map_from(&[
            "    ",
            "    ",
            "====",
        ]);
        let p = standing_at(1, 1);
        assert!(can_jump(&p, &map, 10.0));

        let mut airborne = p.clone();
        airborne.y += 50.0;
        assert!(!can_jump(&airborne, &map, 10.0));
    }

    #[test]
    fn can_jump_respects_tolerance() {
        let map = map_from(&[
            "    ",
            "    ",
            "====",
        ]);
        let mut p = standing_at(1, 1);
        p.y += 8.0;
        assert!(can_jump(&p, &map, 10.0));
        assert!(!can_jump(&p, &map, 5.0));
    }
}
