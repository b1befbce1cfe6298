//! Drawing primitives: rectangle, circle, and text annotation.
//!
//! Drawing is the one destructive operation family; callers hand over an
//! exclusively owned clone and the shapes are rendered in place. Output is
//! always three channels so the fixed annotation colors survive. Shapes
//! extending beyond the canvas are clipped.
//!
//! Text rendering uses a built-in 5x7 bitmap face rather than a vector
//! font; the crate ships no font assets and label output is
//! deterministic.

use crate::buffer::RasterBuffer;
use crate::core::{ProcessError, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::Deserialize;

/// Shape selector for the `draw` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawShape {
    Rectangle,
    Circle,
    Text,
}

/// Stroke width for rectangle and circle outlines.
const STROKE: u32 = 3;
const RECT_ORIGIN: (i32, i32) = (50, 50);
const RECT_SPAN: u32 = 150;
const CIRCLE_CENTER: (i32, i32) = (150, 150);
const CIRCLE_RADIUS: i32 = 75;
const TEXT_ORIGIN: (i32, i32) = (50, 50);

const COLOR_RECT: Rgb<u8> = Rgb([0, 255, 0]);
const COLOR_CIRCLE: Rgb<u8> = Rgb([0, 0, 255]);
const COLOR_TEXT: Rgb<u8> = Rgb([255, 0, 0]);

/// Renders the requested shape onto a three-channel copy of the buffer.
pub fn draw(buffer: &RasterBuffer, shape: DrawShape, text: Option<&str>) -> Result<RasterBuffer> {
    let mut canvas = buffer.to_rgb();
    match shape {
        DrawShape::Rectangle => {
            for i in 0..STROKE {
                let rect = Rect::at(RECT_ORIGIN.0 + i as i32, RECT_ORIGIN.1 + i as i32)
                    .of_size(RECT_SPAN - 2 * i, RECT_SPAN - 2 * i);
                draw_hollow_rect_mut(&mut canvas, rect, COLOR_RECT);
            }
        }
        DrawShape::Circle => {
            for i in 0..STROKE as i32 {
                draw_hollow_circle_mut(&mut canvas, CIRCLE_CENTER, CIRCLE_RADIUS - 1 + i, COLOR_CIRCLE);
            }
        }
        DrawShape::Text => {
            let text = text.ok_or_else(|| {
                ProcessError::missing_field("text", "draw operation with shape 'text'")
            })?;
            draw_label(&mut canvas, text, TEXT_ORIGIN.0, TEXT_ORIGIN.1, 2, COLOR_TEXT);
        }
    }
    RasterBuffer::from_rgb(canvas)
}

/// Renders `text` at `(x, y)` with the built-in 5x7 face, scaled by an
/// integer factor. Out-of-canvas pixels are clipped. Characters outside
/// the printable ASCII range render as spaces.
pub fn draw_label(canvas: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1) as i32;
    let advance = 6 * scale;
    let mut pen_x = x;
    for ch in text.chars() {
        let glyph = glyph_columns(ch);
        for (col, bits) in glyph.iter().enumerate() {
            for row in 0..7i32 {
                if (bits >> row) & 1 == 0 {
                    continue;
                }
                for dx in 0..scale {
                    for dy in 0..scale {
                        let px = pen_x + col as i32 * scale + dx;
                        let py = y + row * scale + dy;
                        if px >= 0
                            && py >= 0
                            && (px as u32) < canvas.width()
                            && (py as u32) < canvas.height()
                        {
                            canvas.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
        pen_x += advance;
    }
}

/// Column bitmap (bit 0 = top row) for one printable ASCII character.
fn glyph_columns(ch: char) -> [u8; 5] {
    let index = ch as usize;
    if !(0x20..=0x7E).contains(&index) {
        return FONT_5X7[0];
    }
    FONT_5X7[index - 0x20]
}

/// Classic 5x7 bitmap face covering printable ASCII (0x20..=0x7E).
#[rustfmt::skip]
const FONT_5X7: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // '!'
    [0x00, 0x07, 0x00, 0x07, 0x00], // '"'
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // '#'
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // '$'
    [0x23, 0x13, 0x08, 0x64, 0x62], // '%'
    [0x36, 0x49, 0x55, 0x22, 0x50], // '&'
    [0x00, 0x05, 0x03, 0x00, 0x00], // '\''
    [0x00, 0x1C, 0x22, 0x41, 0x00], // '('
    [0x00, 0x41, 0x22, 0x1C, 0x00], // ')'
    [0x14, 0x08, 0x3E, 0x08, 0x14], // '*'
    [0x08, 0x08, 0x3E, 0x08, 0x08], // '+'
    [0x00, 0x50, 0x30, 0x00, 0x00], // ','
    [0x08, 0x08, 0x08, 0x08, 0x08], // '-'
    [0x00, 0x60, 0x60, 0x00, 0x00], // '.'
    [0x20, 0x10, 0x08, 0x04, 0x02], // '/'
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // '0'
    [0x00, 0x42, 0x7F, 0x40, 0x00], // '1'
    [0x42, 0x61, 0x51, 0x49, 0x46], // '2'
    [0x21, 0x41, 0x45, 0x4B, 0x31], // '3'
    [0x18, 0x14, 0x12, 0x7F, 0x10], // '4'
    [0x27, 0x45, 0x45, 0x45, 0x39], // '5'
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // '6'
    [0x01, 0x71, 0x09, 0x05, 0x03], // '7'
    [0x36, 0x49, 0x49, 0x49, 0x36], // '8'
    [0x06, 0x49, 0x49, 0x29, 0x1E], // '9'
    [0x00, 0x36, 0x36, 0x00, 0x00], // ':'
    [0x00, 0x56, 0x36, 0x00, 0x00], // ';'
    [0x08, 0x14, 0x22, 0x41, 0x00], // '<'
    [0x14, 0x14, 0x14, 0x14, 0x14], // '='
    [0x00, 0x41, 0x22, 0x14, 0x08], // '>'
    [0x02, 0x01, 0x51, 0x09, 0x06], // '?'
    [0x32, 0x49, 0x79, 0x41, 0x3E], // '@'
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // 'A'
    [0x7F, 0x49, 0x49, 0x49, 0x36], // 'B'
    [0x3E, 0x41, 0x41, 0x41, 0x22], // 'C'
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // 'D'
    [0x7F, 0x49, 0x49, 0x49, 0x41], // 'E'
    [0x7F, 0x09, 0x09, 0x09, 0x01], // 'F'
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // 'G'
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // 'H'
    [0x00, 0x41, 0x7F, 0x41, 0x00], // 'I'
    [0x20, 0x40, 0x41, 0x3F, 0x01], // 'J'
    [0x7F, 0x08, 0x14, 0x22, 0x41], // 'K'
    [0x7F, 0x40, 0x40, 0x40, 0x40], // 'L'
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // 'M'
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // 'N'
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // 'O'
    [0x7F, 0x09, 0x09, 0x09, 0x06], // 'P'
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // 'Q'
    [0x7F, 0x09, 0x19, 0x29, 0x46], // 'R'
    [0x46, 0x49, 0x49, 0x49, 0x31], // 'S'
    [0x01, 0x01, 0x7F, 0x01, 0x01], // 'T'
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // 'U'
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // 'V'
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // 'W'
    [0x63, 0x14, 0x08, 0x14, 0x63], // 'X'
    [0x07, 0x08, 0x70, 0x08, 0x07], // 'Y'
    [0x61, 0x51, 0x49, 0x45, 0x43], // 'Z'
    [0x00, 0x7F, 0x41, 0x41, 0x00], // '['
    [0x02, 0x04, 0x08, 0x10, 0x20], // '\\'
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ']'
    [0x04, 0x02, 0x01, 0x02, 0x04], // '^'
    [0x40, 0x40, 0x40, 0x40, 0x40], // '_'
    [0x00, 0x01, 0x02, 0x04, 0x00], // '`'
    [0x20, 0x54, 0x54, 0x54, 0x78], // 'a'
    [0x7F, 0x48, 0x44, 0x44, 0x38], // 'b'
    [0x38, 0x44, 0x44, 0x44, 0x20], // 'c'
    [0x38, 0x44, 0x44, 0x48, 0x7F], // 'd'
    [0x38, 0x54, 0x54, 0x54, 0x18], // 'e'
    [0x08, 0x7E, 0x09, 0x01, 0x02], // 'f'
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // 'g'
    [0x7F, 0x08, 0x04, 0x04, 0x78], // 'h'
    [0x00, 0x44, 0x7D, 0x40, 0x00], // 'i'
    [0x20, 0x40, 0x44, 0x3D, 0x00], // 'j'
    [0x7F, 0x10, 0x28, 0x44, 0x00], // 'k'
    [0x00, 0x41, 0x7F, 0x40, 0x00], // 'l'
    [0x7C, 0x04, 0x18, 0x04, 0x78], // 'm'
    [0x7C, 0x08, 0x04, 0x04, 0x78], // 'n'
    [0x38, 0x44, 0x44, 0x44, 0x38], // 'o'
    [0x7C, 0x14, 0x14, 0x14, 0x08], // 'p'
    [0x08, 0x14, 0x14, 0x18, 0x7C], // 'q'
    [0x7C, 0x08, 0x04, 0x04, 0x08], // 'r'
    [0x48, 0x54, 0x54, 0x54, 0x20], // 's'
    [0x04, 0x3F, 0x44, 0x40, 0x20], // 't'
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // 'u'
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // 'v'
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // 'w'
    [0x44, 0x28, 0x10, 0x28, 0x44], // 'x'
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // 'y'
    [0x44, 0x64, 0x54, 0x4C, 0x44], // 'z'
    [0x00, 0x08, 0x36, 0x41, 0x00], // '{'
    [0x00, 0x00, 0x7F, 0x00, 0x00], // '|'
    [0x00, 0x41, 0x36, 0x08, 0x00], // '}'
    [0x08, 0x08, 0x2A, 0x1C, 0x08], // '~'
];
