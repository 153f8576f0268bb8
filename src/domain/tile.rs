/// Terrain tiles and the named sprite layers of a level.
/// Tile properties are queried via methods, so terrain semantics
/// stay in one place.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Platform,   // Solid wall / floor
    Background, // Decoration only, never collides
}

impl Tile {
    /// Does this tile block the player?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Platform)
    }
}

/// Layers of a level, in the order they are drawn.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Layer {
    // Drawn from the terrain grid, never queried as sprites
    #[allow(dead_code)]
    Platforms,
    Background,
    // Drawn from PlayerState, never queried as sprites
    #[allow(dead_code)]
    Player,
    Spike,
    Duck,
}

impl Layer {
    pub fn name(self) -> &'static str {
        match self {
            Layer::Platforms => "Platforms",
            Layer::Background => "Background",
            Layer::Player => "Player",
            Layer::Spike => "Spike",
            Layer::Duck => "Duck",
        }
    }
}

/// Terrain grid in tile space. Row 0 is the bottom of the world.
#[derive(Clone, Debug)]
pub struct TileMap {
    pub width: usize,
    pub height: usize,
    /// Edge length of one tile in world pixels.
    pub tile_size: f32,
    tiles: Vec<Vec<Tile>>,
}

impl TileMap {
    pub fn new(width: usize, height: usize, tile_size: f32) -> Self {
        TileMap {
            width,
            height,
            tile_size,
            tiles: vec![vec![Tile::Empty; width]; height],
        }
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Tile {
        if col < self.width && row < self.height {
            self.tiles[row][col]
        } else {
            Tile::Empty
        }
    }

    #[inline]
    pub fn set(&mut self, col: usize, row: usize, tile: Tile) {
        if col < self.width && row < self.height {
            self.tiles[row][col] = tile;
        }
    }

    /// Solidity in signed tile space.
    /// Left, right and below the map are walls; above is open sky.
    #[inline]
    pub fn solid_at(&self, col: i32, row: i32) -> bool {
        if col < 0 || row < 0 || col >= self.width as i32 {
            return true;
        }
        if row >= self.height as i32 {
            return false;
        }
        self.tiles[row as usize][col as usize].is_solid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_platforms_are_solid() {
        assert!(Tile::Platform.is_solid());
        assert!(!Tile::Background.is_solid());
        assert!(!Tile::Empty.is_solid());
    }

    #[test]
    fn out_of_bounds_walls_and_open_sky() {
        let mut map = TileMap::new(3, 2, 128.0);
        map.set(1, 0, Tile::Platform);
        assert!(map.solid_at(1, 0));
        assert!(!map.solid_at(0, 0));
        assert!(map.solid_at(-1, 1));
        assert!(map.solid_at(3, 1));
        assert!(map.solid_at(1, -1));
        assert!(!map.solid_at(1, 5));
    }

    #[test]
    fn layer_names_match_level_groups() {
        let names: Vec<_> = [Layer::Platforms, Layer::Background, Layer::Player, Layer::Spike, Layer::Duck]
            .iter()
            .map(|l| l.name())
            .collect();
        assert_eq!(names, ["Platforms", "Background", "Player", "Spike", "Duck"]);
    }
}
