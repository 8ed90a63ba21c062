//! **hexview-core** — geometry and data model for the hexview board renderer.
//!
//! This crate provides the foundational types used across the *hexview*
//! workspace: pixel geometry primitives, offset hex coordinates, the single
//! [`BoardGeometry`] every pixel computation routes through, the board and
//! entity snapshots consumed from the game-state layer, lighting, and the
//! immutable visual-settings snapshot.

pub mod board;
pub mod color;
pub mod ecm;
pub mod entity;
pub mod geom;
pub mod hex;
pub mod layout;
pub mod lighting;
pub mod settings;

pub use board::{Board, Bridge, Hex, TerrainKind};
pub use color::Color;
pub use ecm::{EcmColors, EcmField, process_affected_coords};
pub use entity::{EntityId, EntityKind, EntitySnapshot, StatusFlags, Visibility};
pub use geom::{Point, Rect, Vec2};
pub use hex::{Direction, HexCoord};
pub use layout::{BASE_ZOOM_INDEX, BoardGeometry, ZOOM_FACTORS};
pub use lighting::{Light, Phase};
pub use settings::{Invalidation, VisualSettings};
