pub mod animation;
pub mod controls;
pub mod entity;
pub mod physics;
pub mod tile;
