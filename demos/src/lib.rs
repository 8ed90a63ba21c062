//! Shared demo scenario: a random skirmish map with two small lances.
//!
//! Demonstrates: terrain edits with elevation, woods, buildings and a
//! bridge, unit rosters with C3 networks and a fly-over, attack lines, a
//! movement envelope, and offline rendering to a pixmap.

use std::collections::HashMap;
use std::sync::Arc;

use hexview::{AttackAction, AttackKind, AttackTarget, BoardView, MovementMode, PathStep, ViewConfig, ViewError};
use hexview_core::{
    Board, Color, Direction, EntityId, EntityKind, EntitySnapshot, Hex, HexCoord, Phase, Point, TerrainKind,
};
use hexview_render::SolidTileSource;
use rand::rngs::SmallRng;
use rand::{Rng, RngExt, SeedableRng};

pub const BOARD_WIDTH: i32 = 16;
pub const BOARD_HEIGHT: i32 = 17;

const BLUE: Color = Color::from_rgb(60, 110, 220);
const RED: Color = Color::from_rgb(210, 50, 40);

// ---------------------------------------------------------------------------
// Map generation
// ---------------------------------------------------------------------------

/// A mapsheet-sized board with rolling hills, woods, a town block and a
/// river crossed by one bridge.
pub fn random_board(rng: &mut impl Rng) -> Board {
    let mut board = Board::new(BOARD_WIDTH, BOARD_HEIGHT);
    let hills: Vec<(HexCoord, i32)> = (0..3)
        .map(|_| {
            let c = HexCoord::new(rng.random_range(0..BOARD_WIDTH), rng.random_range(0..BOARD_HEIGHT));
            (c, rng.random_range(2..5))
        })
        .collect();
    let river_col = BOARD_WIDTH / 2;
    let bridge_row = rng.random_range(3..BOARD_HEIGHT - 3);

    let coords: Vec<HexCoord> = board.coords().collect();
    for c in coords {
        let elevation = hills
            .iter()
            .map(|&(top, height)| (height - top.distance(c)).max(0))
            .max()
            .unwrap_or(0);
        let mut hex = Hex::at_elevation(elevation);
        if c.col == river_col {
            hex = Hex::at_elevation(-1).with_terrain(TerrainKind::Water);
            if c.row == bridge_row {
                hex = hex.with_bridge(1);
            }
        } else if (10..14).contains(&c.col) && (2..5).contains(&c.row) {
            hex = hex
                .with_terrain(TerrainKind::Pavement)
                .with_building(rng.random_range(1..4));
        } else {
            match rng.random_range(0..100) {
                0..15 => hex = hex.with_foliage(1),
                15..22 => hex = hex.with_foliage(2),
                22..30 => hex = hex.with_terrain(TerrainKind::Rough),
                _ => {}
            }
        }
        board.set(c, hex);
    }
    board
}

fn unit(id: u32, name: &str, kind: EntityKind, at: HexCoord, facing: Direction, color: Color) -> EntitySnapshot {
    let mut e = EntitySnapshot::new(EntityId(id), name);
    e.kind = kind;
    e.position = Some(at);
    e.facing = Some(facing);
    e.color = color;
    e
}

/// Two lances deployed on opposite board edges. The blue lance runs a C3
/// network under its commander; red brings a fighter overflying the river.
pub fn roster(rng: &mut impl Rng) -> Vec<Arc<EntitySnapshot>> {
    let mut out = Vec::new();
    let blue = [
        ("Atlas", EntityKind::Mek),
        ("Hunchback", EntityKind::Mek),
        ("Demolisher", EntityKind::Vehicle),
        ("Foot Platoon", EntityKind::Infantry),
    ];
    for (i, (name, kind)) in blue.into_iter().enumerate() {
        let at = HexCoord::new(rng.random_range(1..4), 3 + 3 * i as i32);
        let mut e = unit(i as u32 + 1, name, kind, at, Direction::SE, BLUE);
        if i == 0 {
            e.c3_network = Some(1);
        } else if kind == EntityKind::Mek {
            e.c3_master = Some(EntityId(1));
        }
        out.push(Arc::new(e));
    }

    let red = [
        ("Marauder", EntityKind::Mek),
        ("Jenner", EntityKind::Mek),
        ("Schrek PPC", EntityKind::Vehicle),
    ];
    for (i, (name, kind)) in red.into_iter().enumerate() {
        let at = HexCoord::new(BOARD_WIDTH - rng.random_range(2..5), 4 + 4 * i as i32);
        out.push(Arc::new(unit(i as u32 + 10, name, kind, at, Direction::NW, RED)));
    }

    let mut fighter = unit(20, "Shilone", EntityKind::Aero, HexCoord::new(BOARD_WIDTH / 2, 1), Direction::S, RED);
    fighter.altitude = Some(4);
    fighter.fly_over_path = (0..5).map(|r| HexCoord::new(BOARD_WIDTH / 2, 1 + 3 * r)).collect();
    out.push(Arc::new(fighter));
    out
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// A fully populated view of a seeded skirmish in the given phase, scrolled
/// to the top-left corner.
pub fn skirmish(seed: u64, phase: Phase, config: ViewConfig) -> Result<BoardView, ViewError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let board = Arc::new(random_board(&mut rng));
    let units = roster(&mut rng);
    let mut view = BoardView::new(config, board, Box::new(SolidTileSource::new()?))?;
    view.redraw_all_entities(units.clone());

    // The first blue and red meks trade fire and close to punching range.
    let (blue, red) = (units[0].id, units[4].id);
    view.add_attack(&AttackAction::new(
        blue,
        AttackTarget::Entity(red),
        AttackKind::Weapon {
            name: "AC/20".into(),
            to_hit: "7+".into(),
        },
    ));
    view.add_attack(&AttackAction::new(red, AttackTarget::Entity(blue), AttackKind::Punch));

    if let Some(start) = units[1].position {
        let envelope: HashMap<HexCoord, MovementMode> = view
            .board()
            .coords()
            .filter_map(|c| match c.distance(start) {
                0..=3 => Some((c, MovementMode::Walk)),
                4..=5 => Some((c, MovementMode::Run)),
                _ => None,
            })
            .collect();
        view.set_movement_envelope(&envelope);
        let path: Vec<PathStep> = (1..=3)
            .map(|n| PathStep {
                coord: start.translated_by(Direction::SE, n),
                mp_used: n as i32,
                mode: MovementMode::Walk,
                legal: true,
            })
            .collect();
        view.set_movement_path(&path);
    }
    view.set_minefields(&[(HexCoord::new(BOARD_WIDTH / 2 + 2, BOARD_HEIGHT / 2), 20)]);
    view.set_phase(phase);
    view.scroll_to(Point::ZERO);
    Ok(view)
}
