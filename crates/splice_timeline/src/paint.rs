// SPDX-License-Identifier: MIT OR Apache-2.0
//! egui painter for timeline draw lists.

use crate::layout::{DrawCmd, DrawList, Rect};
use egui::{Align2, Color32, FontId, Painter, Pos2, Stroke, Vec2};

fn color(rgba: [u8; 4]) -> Color32 {
    Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn to_rect(origin: Pos2, rect: &Rect) -> egui::Rect {
    egui::Rect::from_min_max(
        origin + Vec2::new(rect.min_x as f32, rect.min_y as f32),
        origin + Vec2::new(rect.max_x as f32, rect.max_y as f32),
    )
}

fn to_pos(origin: Pos2, point: (f64, f64)) -> Pos2 {
    origin + Vec2::new(point.0 as f32, point.1 as f32)
}

/// Paint a draw list with its origin at `origin`
pub fn paint(painter: &Painter, origin: Pos2, list: &DrawList) {
    for command in &list.commands {
        match command {
            DrawCmd::Rect { rect, fill, stroke } => {
                let rect = to_rect(origin, rect);
                painter.rect_filled(rect, 2.0, color(*fill));
                if let Some((stroke_color, width)) = stroke {
                    painter.rect_stroke(rect, 2.0, Stroke::new(*width, color(*stroke_color)));
                }
            }
            DrawCmd::Line {
                from,
                to,
                color: line_color,
                width,
            } => {
                painter.line_segment(
                    [to_pos(origin, *from), to_pos(origin, *to)],
                    Stroke::new(*width, color(*line_color)),
                );
            }
            DrawCmd::Text {
                pos,
                text,
                color: text_color,
                size,
            } => {
                painter.text(
                    to_pos(origin, *pos),
                    Align2::LEFT_CENTER,
                    text,
                    FontId::proportional(*size),
                    color(*text_color),
                );
            }
        }
    }
}
