/// Level loading: text definitions → layered `Level`.
///
/// ## Sources (priority order):
///   1. `general.level_file` from config.toml, if set
///   2. The built-in embedded level
///
/// ## Level format (`.txt`):
///   Optional line 1: `# Level Name`
///   Remaining lines: map rows, top row first
///
/// ## Tile legend:
///   '=' = Platform (solid)       '.' = Background decoration
///   '^' = Spike (hazard)         'D' = Duck (goal)
///   'P' = Player spawn           ' ' = Empty
///
/// The file's last row is tile row 0 (the bottom of the world).
/// Short rows are padded with empty tiles.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::domain::animation::{self, LayerClock};
use crate::domain::entity::Sprite;
use crate::domain::physics::Rect;
use crate::domain::tile::{Layer, Tile, TileMap};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read level {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level {} has no map rows", path.display())]
    Empty { path: PathBuf },
}

/// A parsed but not yet built level. Kept by the session so a reset can
/// rebuild the level without touching the filesystem.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

impl LevelDef {
    /// Parse level text. Returns None if there are no map rows.
    pub fn parse(content: &str) -> Option<LevelDef> {
        let mut lines = content.lines().map(|l| l.trim_end_matches('\r')).peekable();

        let mut name = String::from("Untitled");
        if let Some(first) = lines.peek() {
            if let Some(rest) = first.strip_prefix('#') {
                name = rest.trim().to_string();
                lines.next();
            }
        }

        let mut rows: Vec<String> = lines.map(|l| l.to_string()).collect();
        while rows.last().is_some_and(|r| r.trim().is_empty()) {
            rows.pop();
        }
        if rows.is_empty() {
            return None;
        }
        Some(LevelDef { name, rows })
    }

    pub fn from_file(path: &Path) -> Result<LevelDef, LevelError> {
        let content = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        LevelDef::parse(&content).ok_or_else(|| LevelError::Empty { path: path.to_path_buf() })
    }

    pub fn embedded() -> LevelDef {
        LevelDef {
            name: String::from("Duck Pond"),
            rows: EMBEDDED_LEVEL.iter().map(|r| r.to_string()).collect(),
        }
    }
}

const EMBEDDED_LEVEL: &[&str] = &[
    "            .           .               ",
    "        .                    D      .   ",
    "                .     ^   =====         ",
    "                    =====               ",
    "   .          ====                   .  ",
    "          ===                 .         ",
    "  P   ===  ^            ^        ^      ",
    "========================================",
];

/// One result of a collision query, in query order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Collision {
    pub layer: Layer,
    pub sprite_id: usize,
    pub col: usize,
    pub row: usize,
}

/// A live level: terrain, removable sprites, spawn and animation clocks.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    pub terrain: TileMap,
    pub spikes: Vec<Sprite>,
    pub ducks: Vec<Sprite>,
    /// Spawn tile (col, row), row 0 at the bottom.
    pub spawn: (usize, usize),
    clocks: Vec<LayerClock>,
}

impl Level {
    /// Build a level from its definition. `default_spawn` is used when the
    /// map has no 'P' marker.
    pub fn build(def: &LevelDef, tile_size: f32, default_spawn: (usize, usize)) -> Level {
        let height = def.rows.len();
        let width = def.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut terrain = TileMap::new(width, height, tile_size);
        let mut spikes = vec![];
        let mut ducks = vec![];
        let mut spawn = None;

        for (i, line) in def.rows.iter().enumerate() {
            let row = height - 1 - i;
            for (col, ch) in line.chars().enumerate() {
                match ch {
                    '=' => terrain.set(col, row, Tile::Platform),
                    '.' => terrain.set(col, row, Tile::Background),
                    '^' => spikes.push(Sprite::new(spikes.len(), Layer::Spike, col, row)),
                    'D' => ducks.push(Sprite::new(ducks.len(), Layer::Duck, col, row)),
                    'P' => spawn = Some((col, row)),
                    _ => {}
                }
            }
        }

        if ducks.is_empty() {
            warn!(level = %def.name, "level has no duck; it cannot be won");
        }

        let spawn = spawn.unwrap_or_else(|| {
            (
                default_spawn.0.min(width.saturating_sub(1)),
                default_spawn.1.min(height.saturating_sub(1)),
            )
        });

        Level {
            name: def.name.clone(),
            terrain,
            spikes,
            ducks,
            spawn,
            clocks: animation::default_clocks(),
        }
    }

    pub fn width(&self) -> usize {
        self.terrain.width
    }

    pub fn height(&self) -> usize {
        self.terrain.height
    }

    pub fn tile_size(&self) -> f32 {
        self.terrain.tile_size
    }

    pub fn sprites(&self, layer: Layer) -> &[Sprite] {
        match layer {
            Layer::Spike => &self.spikes,
            Layer::Duck => &self.ducks,
            _ => &[],
        }
    }

    /// Remove a sprite from its layer. Returns false if it was already gone.
    pub fn remove_sprite(&mut self, layer: Layer, id: usize) -> bool {
        let list = match layer {
            Layer::Spike => &mut self.spikes,
            Layer::Duck => &mut self.ducks,
            _ => return false,
        };
        match list.iter().position(|s| s.id == id) {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Sprites overlapping `rect`, layer by layer in the order given.
    pub fn colliding(&self, rect: &Rect, layers: &[Layer]) -> Vec<Collision> {
        let ts = self.tile_size();
        let mut hits = vec![];
        for &layer in layers {
            for s in self.sprites(layer) {
                if s.hit_box(ts).overlaps(rect) {
                    hits.push(Collision { layer, sprite_id: s.id, col: s.col, row: s.row });
                }
            }
        }
        hits
    }

    /// The sprite drawn at a tile, if any. Ducks win over spikes.
    pub fn sprite_at(&self, col: usize, row: usize) -> Option<&Sprite> {
        self.ducks.iter()
            .chain(self.spikes.iter())
            .find(|s| s.col == col && s.row == row)
    }

    pub fn advance_animations(&mut self, dt: f32) {
        for clock in &mut self.clocks {
            clock.advance(dt);
        }
    }

    /// Current animation frame of a layer (0 for unanimated layers).
    pub fn frame(&self, layer: Layer) -> u8 {
        self.clocks.iter()
            .find(|c| c.layer == layer)
            .map(|c| c.frame())
            .unwrap_or(0)
    }

    /// World position for an actor of half-height `half_h` standing on
    /// the spawn tile's floor, centred in the tile.
    pub fn spawn_position(&self, half_h: f32) -> (f32, f32) {
        let ts = self.tile_size();
        let (col, row) = self.spawn;
        ((col as f32 + 0.5) * ts, row as f32 * ts + half_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(rows: &[&str]) -> LevelDef {
        LevelDef { name: "test".into(), rows: rows.iter().map(|r| r.to_string()).collect() }
    }

    #[test]
    fn parse_reads_name_and_trims_trailing_blank_rows() {
        let d = LevelDef::parse("# Tiny\r\n  D\r\nP^=\r\n\r\n   \n").unwrap();
        assert_eq!(d.name, "Tiny");
        assert_eq!(d.rows, vec!["  D", "P^="]);
    }

    #[test]
    fn parse_without_header_is_untitled() {
        let d = LevelDef::parse("===").unwrap();
        assert_eq!(d.name, "Untitled");
        assert_eq!(d.rows.len(), 1);
    }

    #[test]
    fn parse_empty_is_none() {
        assert!(LevelDef::parse("").is_none());
        assert!(LevelDef::parse("# Only a name\n\n").is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LevelDef::from_file(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, LevelError::Io { .. }));
    }

    #[test]
    fn build_flips_rows_and_places_layers() {
        let level = Level::build(&def(&[
            "   D",
            ".  =",
            "P^ ",
            "====",
        ]), 128.0, (0, 0));
        assert_eq!(level.width(), 4);
        assert_eq!(level.height(), 4);
        assert_eq!(level.terrain.get(0, 0), Tile::Platform);
        assert_eq!(level.terrain.get(0, 2), Tile::Background);
        assert_eq!(level.terrain.get(3, 2), Tile::Platform);
        // Short row padded
        assert_eq!(level.terrain.get(3, 1), Tile::Empty);
        assert_eq!(level.spawn, (0, 1));
        assert_eq!(level.spikes.len(), 1);
        assert_eq!((level.spikes[0].col, level.spikes[0].row), (1, 1));
        assert_eq!((level.ducks[0].col, level.ducks[0].row), (3, 3));
    }

    #[test]
    fn default_spawn_used_and_clamped() {
        let level = Level::build(&def(&["   ", "==="]), 128.0, (2, 1));
        assert_eq!(level.spawn, (2, 1));
        let level = Level::build(&def(&["==="]), 128.0, (9, 9));
        assert_eq!(level.spawn, (2, 0));
    }

    #[test]
    fn spawn_position_stands_on_tile_floor() {
        let level = Level::build(&def(&["    ", "  P ", "===="]), 128.0, (0, 0));
        assert_eq!(level.spawn_position(60.0), (2.5 * 128.0, 128.0 + 60.0));
    }

    #[test]
    fn colliding_follows_layer_order() {
        let level = Level::build(&def(&["^D", "=="]), 100.0, (0, 0));
        let everything = Rect { left: 0.0, right: 200.0, bottom: 100.0, top: 200.0 };

        let hits = level.colliding(&everything, &[Layer::Duck, Layer::Spike]);
        let layers: Vec<_> = hits.iter().map(|h| h.layer).collect();
        assert_eq!(layers, vec![Layer::Duck, Layer::Spike]);

        let hits = level.colliding(&everything, &[Layer::Spike, Layer::Duck]);
        assert_eq!(hits[0].layer, Layer::Spike);
    }

    #[test]
    fn spike_upper_half_is_safe() {
        let level = Level::build(&def(&["^", "="]), 100.0, (0, 0));
        let above = Rect { left: 20.0, right: 80.0, bottom: 160.0, top: 260.0 };
        assert!(level.colliding(&above, &[Layer::Spike]).is_empty());
        let inside = above.offset(0.0, -20.0);
        assert_eq!(level.colliding(&inside, &[Layer::Spike]).len(), 1);
    }

    #[test]
    fn removed_sprite_no_longer_collides() {
        let mut level = Level::build(&def(&["^^", "=="]), 100.0, (0, 0));
        let all = Rect { left: 0.0, right: 200.0, bottom: 100.0, top: 200.0 };
        assert_eq!(level.colliding(&all, &[Layer::Spike]).len(), 2);
        assert!(level.remove_sprite(Layer::Spike, 0));
        assert!(!level.remove_sprite(Layer::Spike, 0));
        let hits = level.colliding(&all, &[Layer::Spike]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sprite_id, 1);
    }

    #[test]
    fn animations_advance_per_layer() {
        let mut level = Level::build(&def(&["D", "="]), 128.0, (0, 0));
        assert_eq!(level.frame(Layer::Duck), 0);
        level.advance_animations(0.5);
        assert_eq!(level.frame(Layer::Duck), 1);
        assert_eq!(level.frame(Layer::Spike), 1);
        assert_eq!(level.frame(Layer::Platforms), 0);
    }

    #[test]
    fn embedded_level_is_playable() {
        let level = Level::build(&LevelDef::embedded(), 128.0, (2, 1));
        assert_eq!(level.spawn, (2, 1));
        assert_eq!(level.ducks.len(), 1);
        assert!(!level.spikes.is_empty());
        assert!((0..level.width()).all(|c| level.terrain.get(c, 0).is_solid()));
    }

    #[test]
    fn bundled_level_file_parses() {
        let d = LevelDef::parse(include_str!("../../levels/staircase.txt")).unwrap();
        assert_eq!(d.name, "Staircase");
        let level = Level::build(&d, 128.0, (0, 0));
        assert_eq!(level.spawn, (2, 1));
        assert_eq!(level.ducks.len(), 1);
    }
}
