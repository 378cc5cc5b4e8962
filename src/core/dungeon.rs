/// Dungeon generator: places rooms on a grid, links them into a connected
/// graph, tags them and hands the result to the renderer.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::f64::consts::TAU;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::random::{RandomError, RandomSource};
use crate::core::render;
use crate::schema::dungeon::{
    hop_distances, Connection, CorridorStyle, DoorKind, Dungeon, DungeonSize, DungeonType, Point,
    Rect, Room, RoomShape, RoomTag, TaggingRules,
};
use crate::schema::settings::DungeonSettings;

/// Placement attempts per room that keep a one-cell gap to every other room.
pub const STRICT_ATTEMPTS: u32 = 60;
/// Further attempts that let rooms touch, still without overlapping.
pub const RELAXED_ATTEMPTS: u32 = 30;
/// Most features a single room receives.
pub const MAX_FEATURES: i32 = 2;
const CAVERN_POINTS: usize = 12;

#[derive(Debug, Error)]
pub enum DungeonError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("placed only {placed} rooms, need at least {floor}")]
    GenerationFailed { placed: usize, floor: usize },
    #[error(transparent)]
    Random(#[from] RandomError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DungeonOptions {
    /// Dungeon type id or display name; the settings' default when absent.
    pub dungeon_type: Option<String>,
    pub size: DungeonSize,
}

/// Generate a dungeon, its SVG map and its guide.
pub fn generate<R: RandomSource>(
    options: &DungeonOptions,
    settings: &DungeonSettings,
    rng: &mut R,
) -> Result<Dungeon, DungeonError> {
    let type_name = options
        .dungeon_type
        .as_deref()
        .unwrap_or(&settings.default_dungeon_type);
    let profile = settings
        .find_type(type_name)
        .ok_or_else(|| DungeonError::InvalidInput(format!("unknown dungeon type '{type_name}'")))?;
    if profile.room_shapes.iter().all(|s| s.weight == 0) {
        return Err(DungeonError::InvalidInput(format!(
            "dungeon type '{}' has no room shapes",
            profile.name
        )));
    }

    let (lo, hi) = profile.room_counts.range(options.size);
    let floor = lo.min(hi).max(1) as usize;
    let ceiling = (lo.max(hi) as usize).max(floor);
    let target = rng.uniform_int(floor as i32, ceiling as i32) as usize;
    let (width, height) = options.size.grid_dimensions();

    debug!(dungeon_type = %profile.name, size = %options.size, target, "generating dungeon");

    let mut rooms = place_rooms(profile, target, (width, height), rng)?;
    if rooms.len() < floor {
        return Err(DungeonError::GenerationFailed {
            placed: rooms.len(),
            floor,
        });
    }
    if rooms.len() < target {
        warn!(
            placed = rooms.len(),
            target, "room placement fell short of the target"
        );
    }

    let connections = connect_rooms(&rooms, &profile.corridor, (width, height), rng);
    assign_tags(&mut rooms, &connections, &profile.tagging, rng)?;
    furnish(&mut rooms, profile, rng);

    let mut dungeon = Dungeon {
        dungeon_type: profile.name.clone(),
        size: options.size,
        width,
        height,
        rooms,
        connections,
        svg: String::new(),
        guide: String::new(),
    };
    if !dungeon.is_connected() {
        return Err(DungeonError::GenerationFailed {
            placed: dungeon.rooms.len(),
            floor,
        });
    }

    dungeon.svg = render::render_svg(
        &dungeon,
        &profile.theme,
        &profile.corridor,
        &settings.map_style,
    );
    dungeon.guide = render::render_guide(&dungeon);

    info!(
        dungeon_type = %dungeon.dungeon_type,
        rooms = dungeon.rooms.len(),
        corridors = dungeon.connections.len(),
        "dungeon generated"
    );
    Ok(dungeon)
}

fn place_rooms<R: RandomSource>(
    profile: &DungeonType,
    target: usize,
    grid: (i32, i32),
    rng: &mut R,
) -> Result<Vec<Room>, DungeonError> {
    let shapes: Vec<RoomShape> = profile.room_shapes.iter().map(|s| s.shape).collect();
    let weights: Vec<u32> = profile.room_shapes.iter().map(|s| s.weight).collect();

    let mut rooms: Vec<Room> = Vec::with_capacity(target);
    for attempt in 0..target {
        let shape = *rng.weighted_choice(&shapes, &weights)?;
        let extent = room_extent(shape, profile.room_dimensions, grid, rng);
        let placed: Vec<Rect> = rooms.iter().map(|r| r.bounds).collect();

        let Some(bounds) = find_spot(&placed, extent, grid, rng) else {
            warn!(room = attempt + 1, ?shape, "no space left for room, skipping");
            continue;
        };
        let outline = match shape {
            RoomShape::Cavern => cavern_outline(&bounds, rng),
            _ => Vec::new(),
        };
        rooms.push(Room {
            id: rooms.len() as u32 + 1,
            bounds,
            shape,
            outline,
            tag: RoomTag::Empty,
            description: String::new(),
            features: Vec::new(),
        });
    }
    Ok(rooms)
}

/// Width and height in cells. Squares and circles get equal sides.
fn room_extent<R: RandomSource>(
    shape: RoomShape,
    dimensions: (u32, u32),
    (width, height): (i32, i32),
    rng: &mut R,
) -> (i32, i32) {
    let max_side = (width.min(height) / 4).max(3);
    let lo = (dimensions.0 as i32).clamp(2, max_side);
    let hi = (dimensions.1 as i32).clamp(lo, max_side);
    let w = rng.uniform_int(lo, hi);
    match shape {
        RoomShape::Square | RoomShape::Circle => (w, w),
        RoomShape::Rectangle | RoomShape::Cavern => (w, rng.uniform_int(lo, hi)),
    }
}

/// Strict attempts first, then relaxed ones. The grid's outer ring stays empty.
fn find_spot<R: RandomSource>(
    placed: &[Rect],
    (w, h): (i32, i32),
    (width, height): (i32, i32),
    rng: &mut R,
) -> Option<Rect> {
    for (gap, attempts) in [(1, STRICT_ATTEMPTS), (0, RELAXED_ATTEMPTS)] {
        for _ in 0..attempts {
            let candidate = Rect {
                x: rng.uniform_int(1, width - w - 1),
                y: rng.uniform_int(1, height - h - 1),
                w,
                h,
            };
            if placed.iter().all(|r| !r.intersects(&candidate, gap)) {
                return Some(candidate);
            }
        }
    }
    None
}

fn cavern_outline<R: RandomSource>(bounds: &Rect, rng: &mut R) -> Vec<(f64, f64)> {
    let (rx, ry) = (bounds.w as f64 / 2.0, bounds.h as f64 / 2.0);
    let (cx, cy) = (bounds.x as f64 + rx, bounds.y as f64 + ry);
    (0..CAVERN_POINTS)
        .map(|i| {
            let angle = TAU * i as f64 / CAVERN_POINTS as f64;
            let jitter = 0.7 + 0.3 * rng.uniform_float();
            (cx + rx * jitter * angle.cos(), cy + ry * jitter * angle.sin())
        })
        .collect()
}

/// A spanning tree from each room to its nearest earlier room, plus loops.
fn connect_rooms<R: RandomSource>(
    rooms: &[Room],
    style: &CorridorStyle,
    (width, height): (i32, i32),
    rng: &mut R,
) -> Vec<Connection> {
    let mut connections = Vec::with_capacity(rooms.len() * 3 / 2);
    let mut linked: FxHashSet<(u32, u32)> = FxHashSet::default();

    for (i, room) in rooms.iter().enumerate().skip(1) {
        let nearest = rooms[..i]
            .iter()
            .min_by_key(|other| other.bounds.distance_sq(&room.bounds));
        if let Some(nearest) = nearest {
            linked.insert((nearest.id, room.id));
            connections.push(corridor(nearest, room, style, rng));
        }
    }

    let reach = (width.max(height) / 3) as i64;
    let cap = rooms.len() / 2;
    let mut loops = 0;
    'pairs: for (i, a) in rooms.iter().enumerate() {
        for b in &rooms[i + 1..] {
            if loops >= cap {
                break 'pairs;
            }
            if linked.contains(&(a.id, b.id)) || a.bounds.distance_sq(&b.bounds) > reach * reach {
                continue;
            }
            if rng.chance(style.loop_chance) {
                linked.insert((a.id, b.id));
                connections.push(corridor(a, b, style, rng));
                loops += 1;
            }
        }
    }
    debug!(
        tree = rooms.len().saturating_sub(1),
        loops, "rooms connected"
    );
    connections
}

/// L-shaped corridor between room centres.
fn corridor<R: RandomSource>(
    from: &Room,
    to: &Room,
    style: &CorridorStyle,
    rng: &mut R,
) -> Connection {
    let (a, b) = (from.bounds.center(), to.bounds.center());
    let corner = if rng.chance(0.5) {
        Point { x: b.x, y: a.y }
    } else {
        Point { x: a.x, y: b.y }
    };
    let mut path = vec![a];
    if corner != a && corner != b {
        path.push(corner);
    }
    if b != a {
        path.push(b);
    }

    let door = if rng.chance(style.secret_door_chance) {
        DoorKind::Secret
    } else if rng.chance(style.door_chance) {
        DoorKind::Door
    } else {
        DoorKind::Open
    };
    Connection {
        from: from.id,
        to: to.id,
        path,
        door,
    }
}

/// Room 1 is the entrance. The room farthest from it may hold the boss.
fn assign_tags<R: RandomSource>(
    rooms: &mut [Room],
    connections: &[Connection],
    rules: &TaggingRules,
    rng: &mut R,
) -> Result<(), DungeonError> {
    let hops = hop_distances(connections, 1);
    let farthest = rooms
        .iter()
        .skip(1)
        .max_by_key(|r| (hops.get(&r.id).copied().unwrap_or(0), Reverse(r.id)))
        .map(|r| r.id);
    let boss = farthest.filter(|_| rng.chance(rules.boss_chance));

    let tags: Vec<RoomTag> = rules.room_weights.iter().map(|t| t.tag).collect();
    let weights: Vec<u32> = rules.room_weights.iter().map(|t| t.weight).collect();

    for room in rooms.iter_mut() {
        room.tag = if room.id == 1 {
            RoomTag::Entrance
        } else if Some(room.id) == boss {
            RoomTag::Boss
        } else if rng.chance(rules.treasure_chance) {
            RoomTag::Treasure
        } else if tags.is_empty() {
            RoomTag::Empty
        } else {
            *rng.weighted_choice(&tags, &weights)?
        };
    }
    Ok(())
}

fn default_description(tag: RoomTag) -> &'static str {
    match tag {
        RoomTag::Entrance => "The way in. Daylight does not reach far past the threshold.",
        RoomTag::Boss => "Something powerful has made this chamber its own.",
        RoomTag::Treasure => "Valuables lie here, guarded or forgotten.",
        RoomTag::Monster => "Creatures lair here and do not welcome visitors.",
        RoomTag::Trap => "A hidden hazard waits for the careless.",
        RoomTag::Empty => "A quiet room. Dust lies undisturbed.",
    }
}

fn furnish<R: RandomSource>(rooms: &mut [Room], profile: &DungeonType, rng: &mut R) {
    for room in rooms.iter_mut() {
        let descriptions = profile
            .descriptions
            .get(&room.tag)
            .map(Vec::as_slice)
            .unwrap_or_default();
        room.description = rng
            .choose(descriptions)
            .cloned()
            .unwrap_or_else(|| default_description(room.tag).to_string());

        let count = rng.uniform_int(0, MAX_FEATURES) as usize;
        room.features = rng
            .pick_distinct(&profile.features, count)
            .into_iter()
            .cloned()
            .collect();
    }
}
