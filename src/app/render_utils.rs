use eframe::egui::{Color32, Mesh, Painter, Pos2, Rect, Shape, Stroke, Vec2};

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, column_guides: &[f32]) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    for &x in column_guides {
        if x < rect.left() || x > rect.right() {
            continue;
        }
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
    }
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Pos2) -> Pos2 {
    rect.min + pan + world.to_vec2() * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Pos2 {
    ((screen - rect.min - pan) / zoom).to_pos2()
}

/// Filled band between two edges sampled at the same steps.
pub(super) fn ribbon_shape(top: &[Pos2], bottom: &[Pos2], color: Color32) -> Shape {
    let mut mesh = Mesh::default();
    for (upper, lower) in top.iter().zip(bottom) {
        mesh.colored_vertex(*upper, color);
        mesh.colored_vertex(*lower, color);
    }

    let quads = top.len().min(bottom.len()).saturating_sub(1) as u32;
    for quad in 0..quads {
        let i = quad * 2;
        mesh.add_triangle(i, i + 1, i + 2);
        mesh.add_triangle(i + 1, i + 3, i + 2);
    }
    Shape::mesh(mesh)
}

/// Whether `point` lies between the two sampled edges of a ribbon.
pub(super) fn ribbon_contains(top: &[Pos2], bottom: &[Pos2], point: Pos2) -> bool {
    top.windows(2).zip(bottom.windows(2)).any(|(upper, lower)| {
        let (left, right) = (upper[0].x.min(upper[1].x), upper[0].x.max(upper[1].x));
        if point.x < left || point.x > right {
            return false;
        }

        let t = if (right - left).abs() <= f32::EPSILON {
            0.0
        } else {
            (point.x - upper[0].x) / (upper[1].x - upper[0].x)
        };
        let y_top = upper[0].y + (upper[1].y - upper[0].y) * t;
        let y_bottom = lower[0].y + (lower[1].y - lower[0].y) * t;
        point.y >= y_top.min(y_bottom) && point.y <= y_top.max(y_bottom)
    })
}
