/// Dungeon rendering: SVG map and markdown guide.
///
/// Both outputs number rooms by [`Room::id`], so the labels on the map and
/// the `### Room N` headings in the guide line up.

use crate::schema::dungeon::{
    Connection, CorridorStyle, DoorKind, Dungeon, MapStyle, Point, Room, RoomShape, Theme,
};

/// Feet per grid cell.
pub const CELL_FEET: i32 = 5;

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Where a corridor leaves its `from` room; the door marker goes here.
fn door_cell(connection: &Connection, from: &Room) -> Option<Point> {
    connection
        .cells()
        .into_iter()
        .find(|p| !from.bounds.contains(*p))
}

/// Self-contained SVG, one grid cell per `style.cell_size` pixels.
pub fn render_svg(
    dungeon: &Dungeon,
    theme: &Theme,
    corridor: &CorridorStyle,
    style: &MapStyle,
) -> String {
    let cell = style.cell_size.max(1) as f64;
    let (w, h) = (dungeon.width as f64 * cell, dungeon.height as f64 * cell);
    let stroke = escape_xml(&theme.room_stroke);
    let dash = if theme.dashed_walls {
        format!(r#" stroke-dasharray="{} {}""#, cell / 2.0, cell / 4.0)
    } else {
        String::new()
    };

    let mut lines = Vec::new();
    lines.push(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    ));
    lines.push(format!(
        r#"<rect width="100%" height="100%" fill="{}"/>"#,
        escape_xml(&theme.background)
    ));

    if style.show_grid {
        lines.push(format!(r#"<g class="grid" stroke="{stroke}" stroke-opacity="0.12" stroke-width="0.5">"#));
        for x in 0..=dungeon.width {
            let px = x as f64 * cell;
            lines.push(format!(r#"<line x1="{px}" y1="0" x2="{px}" y2="{h}"/>"#));
        }
        for y in 0..=dungeon.height {
            let py = y as f64 * cell;
            lines.push(format!(r#"<line x1="0" y1="{py}" x2="{w}" y2="{py}"/>"#));
        }
        lines.push("</g>".to_string());
    }

    // Corridors run between centres, so rooms drawn on top hide the ends.
    let corridor_width = corridor.width.max(1) as f64 * cell;
    lines.push(format!(
        r#"<g class="corridors" fill="none" stroke="{}" stroke-width="{corridor_width}" stroke-linecap="square" stroke-linejoin="miter">"#,
        escape_xml(&theme.corridor_color)
    ));
    for connection in &dungeon.connections {
        let points: Vec<String> = connection
            .path
            .iter()
            .map(|p| format!("{},{}", (p.x as f64 + 0.5) * cell, (p.y as f64 + 0.5) * cell))
            .collect();
        lines.push(format!(
            r#"<polyline data-from="{}" data-to="{}" points="{}"/>"#,
            connection.from,
            connection.to,
            points.join(" ")
        ));
    }
    lines.push("</g>".to_string());

    lines.push(format!(r#"<g class="rooms" stroke="{stroke}" stroke-width="{}">"#, theme.stroke_width));
    for room in &dungeon.rooms {
        let fill = escape_xml(theme.fill_for(room.tag));
        let b = &room.bounds;
        let (x, y) = (b.x as f64 * cell, b.y as f64 * cell);
        let (rw, rh) = (b.w as f64 * cell, b.h as f64 * cell);
        match room.shape {
            RoomShape::Rectangle | RoomShape::Square => lines.push(format!(
                r#"<rect data-room="{}" x="{x}" y="{y}" width="{rw}" height="{rh}" fill="{fill}"{dash}/>"#,
                room.id
            )),
            RoomShape::Circle => lines.push(format!(
                r#"<ellipse data-room="{}" cx="{}" cy="{}" rx="{}" ry="{}" fill="{fill}"{dash}/>"#,
                room.id,
                x + rw / 2.0,
                y + rh / 2.0,
                rw / 2.0,
                rh / 2.0
            )),
            RoomShape::Cavern => {
                let points: Vec<String> = room
                    .outline
                    .iter()
                    .map(|(px, py)| format!("{:.1},{:.1}", px * cell, py * cell))
                    .collect();
                lines.push(format!(
                    r#"<polygon data-room="{}" points="{}" fill="{fill}"{dash}/>"#,
                    room.id,
                    points.join(" ")
                ))
            }
        }
    }
    lines.push("</g>".to_string());

    lines.push(r#"<g class="doors">"#.to_string());
    for connection in &dungeon.connections {
        if connection.door == DoorKind::Open {
            continue;
        }
        let Some(from) = dungeon.room(connection.from) else {
            continue;
        };
        let Some(p) = door_cell(connection, from) else {
            continue;
        };
        let (px, py) = (p.x as f64 * cell, p.y as f64 * cell);
        match connection.door {
            DoorKind::Door => lines.push(format!(
                r#"<rect class="door" x="{}" y="{}" width="{}" height="{}" fill="{stroke}"/>"#,
                px + cell * 0.2,
                py + cell * 0.2,
                cell * 0.6,
                cell * 0.6
            )),
            DoorKind::Secret => lines.push(format!(
                r#"<text class="secret" x="{}" y="{}" font-size="{}" text-anchor="middle" dominant-baseline="central" fill="{stroke}">S</text>"#,
                px + cell / 2.0,
                py + cell / 2.0,
                cell
            )),
            DoorKind::Open => {}
        }
    }
    lines.push("</g>".to_string());

    lines.push(format!(
        r#"<g class="labels" font-family="serif" font-size="{}" font-weight="bold" fill="{stroke}" text-anchor="middle" dominant-baseline="central">"#,
        style.label_size
    ));
    for room in &dungeon.rooms {
        let c = room.bounds.center();
        lines.push(format!(
            r#"<text x="{}" y="{}">{}</text>"#,
            (c.x as f64 + 0.5) * cell,
            (c.y as f64 + 0.5) * cell,
            room.id
        ));
    }
    lines.push("</g>".to_string());
    lines.push("</svg>".to_string());
    lines.join("\n")
}

fn door_label(door: DoorKind) -> &'static str {
    match door {
        DoorKind::Open => "open passage",
        DoorKind::Door => "door",
        DoorKind::Secret => "secret door",
    }
}

/// Markdown guide with one entry per room.
pub fn render_guide(dungeon: &Dungeon) -> String {
    let mut lines = Vec::new();
    lines.push(format!("## {} ({})", dungeon.dungeon_type, dungeon.size));
    lines.push(format!(
        "\n{} rooms joined by {} corridors.",
        dungeon.rooms.len(),
        dungeon.connections.len()
    ));

    for room in &dungeon.rooms {
        lines.push(format!("\n### Room {}", room.id));
        lines.push(format!(
            "**{}** ({} x {} ft.)\n",
            room.tag,
            room.bounds.w * CELL_FEET,
            room.bounds.h * CELL_FEET
        ));
        lines.push(room.description.clone());

        let exits: Vec<String> = dungeon
            .connections
            .iter()
            .filter_map(|c| {
                c.other_end(room.id)
                    .map(|other| format!("Room {other} ({})", door_label(c.door)))
            })
            .collect();
        if !exits.is_empty() {
            lines.push(format!("\n*Exits:* {}", exits.join(", ")));
        }
        if !room.features.is_empty() {
            lines.push(String::new());
            for feature in &room.features {
                lines.push(format!("- {feature}"));
            }
        }
    }
    lines.push(String::new());
    lines.join("\n")
}
