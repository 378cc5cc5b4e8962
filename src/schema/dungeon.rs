use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Requested dungeon size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DungeonSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl DungeonSize {
    pub const ALL: [DungeonSize; 3] = [DungeonSize::Small, DungeonSize::Medium, DungeonSize::Large];

    /// Grid width and height in cells.
    pub fn grid_dimensions(&self) -> (i32, i32) {
        match self {
            Self::Small => (40, 30),
            Self::Medium => (60, 45),
            Self::Large => (80, 60),
        }
    }
}

impl fmt::Display for DungeonSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomShape {
    Rectangle,
    Square,
    Circle,
    /// Irregular outline inside the room bounds.
    Cavern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoomTag {
    Entrance,
    Boss,
    Treasure,
    Monster,
    Trap,
    Empty,
}

impl fmt::Display for RoomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Entrance => "Entrance",
            Self::Boss => "Guardian's Lair",
            Self::Treasure => "Treasure Room",
            Self::Monster => "Monster Den",
            Self::Trap => "Trapped Room",
            Self::Empty => "Empty Room",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorKind {
    Open,
    Door,
    Secret,
}

/// A grid cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Axis-aligned bounds in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.w / 2,
            y: self.y + self.h / 2,
        }
    }

    /// True when the rects overlap once each is grown by `gap` cells.
    /// A gap of zero lets rooms share an edge without overlapping.
    pub fn intersects(&self, other: &Rect, gap: i32) -> bool {
        self.x - gap < other.right()
            && other.x - gap < self.right()
            && self.y - gap < other.bottom()
            && other.y - gap < self.bottom()
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    pub fn distance_sq(&self, other: &Rect) -> i64 {
        let (a, b) = (self.center(), other.center());
        let dx = (a.x - b.x) as i64;
        let dy = (a.y - b.y) as i64;
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// 1-based; doubles as the label drawn on the map and the guide heading.
    pub id: u32,
    pub bounds: Rect,
    pub shape: RoomShape,
    /// Polygon vertices in grid units, only for caverns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outline: Vec<(f64, f64)>,
    pub tag: RoomTag,
    /// Flavor text for the guide.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: u32,
    pub to: u32,
    /// Grid cells the corridor bends through, from `from`'s centre to `to`'s.
    pub path: Vec<Point>,
    pub door: DoorKind,
}

impl Connection {
    /// Every grid cell the corridor passes through, bends included, in order.
    ///
    /// A segment that is not axis-aligned is walked horizontally first, then
    /// vertically.
    pub fn cells(&self) -> Vec<Point> {
        let mut cells = Vec::new();
        for pair in self.path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (dx, dy) = ((b.x - a.x).signum(), (b.y - a.y).signum());
            let mut p = a;
            while p.x != b.x {
                cells.push(p);
                p.x += dx;
            }
            while p.y != b.y {
                cells.push(p);
                p.y += dy;
            }
        }
        if let Some(last) = self.path.last() {
            cells.push(*last);
        }
        cells
    }

    pub fn other_end(&self, room: u32) -> Option<u32> {
        if self.from == room {
            Some(self.to)
        } else if self.to == room {
            Some(self.from)
        } else {
            None
        }
    }
}

/// Corridor hop counts from `start` to every room reachable from it.
pub fn hop_distances(connections: &[Connection], start: u32) -> FxHashMap<u32, usize> {
    let mut adjacency: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
    for c in connections {
        adjacency.entry(c.from).or_default().push(c.to);
        adjacency.entry(c.to).or_default().push(c.from);
    }

    let mut distances = FxHashMap::default();
    let mut queue = VecDeque::from([start]);
    distances.insert(start, 0);
    while let Some(room) = queue.pop_front() {
        let hops = distances[&room];
        for next in adjacency.get(&room).into_iter().flatten() {
            if !distances.contains_key(next) {
                distances.insert(*next, hops + 1);
                queue.push_back(*next);
            }
        }
    }
    distances
}

/// A generated dungeon with its rendered map and guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dungeon {
    pub dungeon_type: String,
    pub size: DungeonSize,
    pub width: i32,
    pub height: i32,
    pub rooms: Vec<Room>,
    pub connections: Vec<Connection>,
    pub svg: String,
    pub guide: String,
}

impl Dungeon {
    pub fn room(&self, id: u32) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn entrance(&self) -> Option<&Room> {
        self.rooms.iter().find(|r| r.tag == RoomTag::Entrance)
    }

    /// Every room can be reached from the entrance.
    pub fn is_connected(&self) -> bool {
        let Some(entrance) = self.entrance() else {
            return false;
        };
        let reached = hop_distances(&self.connections, entrance.id);
        let ids: FxHashSet<u32> = self.rooms.iter().map(|r| r.id).collect();
        ids.iter().all(|id| reached.contains_key(id))
    }
}

// Profile types: the configuration a dungeon type contributes.

/// Inclusive room-count range per size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCounts {
    pub small: (u32, u32),
    pub medium: (u32, u32),
    pub large: (u32, u32),
}

impl Default for RoomCounts {
    fn default() -> Self {
        Self {
            small: (5, 8),
            medium: (8, 12),
            large: (12, 20),
        }
    }
}

impl RoomCounts {
    pub fn range(&self, size: DungeonSize) -> (u32, u32) {
        match size {
            DungeonSize::Small => self.small,
            DungeonSize::Medium => self.medium,
            DungeonSize::Large => self.large,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeWeight {
    pub shape: RoomShape,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWeight {
    pub tag: RoomTag,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorridorStyle {
    /// Corridor width in cells.
    pub width: u32,
    /// Chance that a nearby, not yet linked pair of rooms gets an extra corridor.
    pub loop_chance: f64,
    pub door_chance: f64,
    pub secret_door_chance: f64,
}

impl Default for CorridorStyle {
    fn default() -> Self {
        Self {
            width: 1,
            loop_chance: 0.2,
            door_chance: 0.5,
            secret_door_chance: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaggingRules {
    pub treasure_chance: f64,
    pub boss_chance: f64,
    /// Weighted tags for rooms that are neither entrance, boss nor treasure.
    pub room_weights: Vec<TagWeight>,
}

impl Default for TaggingRules {
    fn default() -> Self {
        Self {
            treasure_chance: 0.2,
            boss_chance: 0.8,
            room_weights: vec![
                TagWeight {
                    tag: RoomTag::Monster,
                    weight: 3,
                },
                TagWeight {
                    tag: RoomTag::Trap,
                    weight: 1,
                },
                TagWeight {
                    tag: RoomTag::Empty,
                    weight: 2,
                },
            ],
        }
    }
}

/// Colors and strokes for the rendered map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub background: String,
    pub room_fill: String,
    pub room_stroke: String,
    pub corridor_color: String,
    pub stroke_width: f64,
    pub dashed_walls: bool,
    /// Fill overrides per room tag.
    pub tag_fills: BTreeMap<RoomTag, String>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: "#f4ecd8".to_string(),
            room_fill: "#ffffff".to_string(),
            room_stroke: "#3b2f2f".to_string(),
            corridor_color: "#b8ab94".to_string(),
            stroke_width: 2.0,
            dashed_walls: false,
            tag_fills: BTreeMap::new(),
        }
    }
}

impl Theme {
    pub fn fill_for(&self, tag: RoomTag) -> &str {
        self.tag_fills
            .get(&tag)
            .map(String::as_str)
            .unwrap_or(&self.room_fill)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonType {
    pub name: String,
    #[serde(default)]
    pub room_counts: RoomCounts,
    pub room_shapes: Vec<ShapeWeight>,
    /// Inclusive min/max room side length in cells.
    #[serde(default = "default_room_dimensions")]
    pub room_dimensions: (u32, u32),
    #[serde(default)]
    pub corridor: CorridorStyle,
    #[serde(default)]
    pub tagging: TaggingRules,
    #[serde(default)]
    pub theme: Theme,
    /// Flavor text per room tag, one picked per room for the guide.
    #[serde(default)]
    pub descriptions: BTreeMap<RoomTag, Vec<String>>,
    /// Furnishings and oddities scattered through rooms.
    #[serde(default)]
    pub features: Vec<String>,
}

fn default_room_dimensions() -> (u32, u32) {
    (4, 9)
}

/// Rendering parameters shared by every dungeon type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapStyle {
    /// Pixels per grid cell.
    pub cell_size: u32,
    pub show_grid: bool,
    pub label_size: u32,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            cell_size: 12,
            show_grid: true,
            label_size: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect { x, y, w, h }
    }

    fn link(from: u32, to: u32) -> Connection {
        Connection {
            from,
            to,
            path: Vec::new(),
            door: DoorKind::Open,
        }
    }

    #[test]
    fn touching_rects_only_intersect_with_gap() {
        let a = rect(0, 0, 4, 4);
        let b = rect(4, 0, 4, 4);
        assert!(!a.intersects(&b, 0));
        assert!(a.intersects(&b, 1));
        assert!(a.intersects(&rect(2, 2, 4, 4), 0));
    }

    #[test]
    fn hop_distances_follow_corridors_both_ways() {
        let connections = vec![link(1, 2), link(3, 2), link(3, 4)];
        let hops = hop_distances(&connections, 1);
        assert_eq!(hops[&1], 0);
        assert_eq!(hops[&2], 1);
        assert_eq!(hops[&3], 2);
        assert_eq!(hops[&4], 3);
    }

    #[test]
    fn corridor_cells_walk_the_bend() {
        let mut c = link(1, 2);
        c.path = vec![
            Point { x: 0, y: 0 },
            Point { x: 2, y: 0 },
            Point { x: 2, y: 2 },
        ];
        let cells = c.cells();
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[2], Point { x: 2, y: 0 });
        assert_eq!(cells[4], Point { x: 2, y: 2 });
        assert!(link(1, 2).cells().is_empty());
    }

    #[test]
    fn corridor_cells_step_around_a_diagonal() {
        let mut c = link(1, 2);
        c.path = vec![Point { x: 0, y: 0 }, Point { x: 3, y: 1 }];
        let cells = c.cells();
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[3], Point { x: 3, y: 0 });
        assert_eq!(cells.last(), Some(&Point { x: 3, y: 1 }));

        c.path = vec![Point { x: 5, y: 5 }, Point { x: 2, y: 9 }];
        let cells = c.cells();
        assert_eq!(cells.len(), 8);
        assert_eq!(cells[0], Point { x: 5, y: 5 });
        assert_eq!(cells[3], Point { x: 2, y: 5 });
        assert_eq!(cells[7], Point { x: 2, y: 9 });
    }

    #[test]
    fn room_count_defaults() {
        let counts = RoomCounts::default();
        assert_eq!(counts.range(DungeonSize::Small), (5, 8));
        assert_eq!(counts.range(DungeonSize::Medium), (8, 12));
        assert_eq!(counts.range(DungeonSize::Large), (12, 20));
    }

    #[test]
    fn theme_tag_fill_falls_back() {
        let mut theme = Theme::default();
        theme
            .tag_fills
            .insert(RoomTag::Boss, "#aa0000".to_string());
        assert_eq!(theme.fill_for(RoomTag::Boss), "#aa0000");
        assert_eq!(theme.fill_for(RoomTag::Empty), theme.room_fill);
    }
}
