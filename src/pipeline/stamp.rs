//! Text stamping over a decoded raster frame.
//!
//! Pure function over pixels: the stamp text is tiled across the whole
//! frame so the modification time stays visible regardless of how the
//! image is cropped or scaled by the viewer. Glyphs come from a small
//! embedded 5x7 pixel font covering the characters a timestamp needs, so
//! the repo ships no font binary.

use image::{Rgba, RgbaImage};

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// One blank column between glyphs.
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;
/// Pixel scale applied to the 5x7 glyphs.
const SCALE: u32 = 2;

const STAMP_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 160]);

/// Tile `text` across `image`, mutating it in place.
///
/// Rows repeat every glyph height, columns every rendered text width,
/// mirroring the original tutorial's tiled `drawString` loop. Text that
/// would not fit (empty text, or a frame narrower than one glyph) leaves
/// the image untouched.
pub fn place_text(image: &mut RgbaImage, text: &str) {
    let text_width = text.chars().count() as u32 * GLYPH_ADVANCE * SCALE;
    let line_height = (GLYPH_HEIGHT + 3) * SCALE;
    if text_width == 0 {
        return;
    }

    let mut y = line_height / 2;
    while y < image.height() {
        let mut x = SCALE;
        while x < image.width() {
            draw_line(image, x, y, text);
            x += text_width;
        }
        y += line_height * 2;
    }
}

fn draw_line(image: &mut RgbaImage, origin_x: u32, origin_y: u32, text: &str) {
    let mut x = origin_x;
    for ch in text.chars() {
        draw_glyph(image, x, origin_y, glyph_rows(ch));
        x += GLYPH_ADVANCE * SCALE;
    }
}

fn draw_glyph(image: &mut RgbaImage, origin_x: u32, origin_y: u32, rows: [u8; 7]) {
    for (row_idx, row) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if row & (0b10000 >> col) == 0 {
                continue;
            }
            for dy in 0..SCALE {
                for dx in 0..SCALE {
                    let x = origin_x + col * SCALE + dx;
                    let y = origin_y + row_idx as u32 * SCALE + dy;
                    if x + 1 < image.width() && y + 1 < image.height() {
                        // Offset shadow first so the glyph stays legible
                        // on light and dark backgrounds alike.
                        image.put_pixel(x + 1, y + 1, SHADOW_COLOR);
                        image.put_pixel(x, y, STAMP_COLOR);
                    }
                }
            }
        }
    }
}

/// 5x7 bitmap rows for the characters a timestamp stamp uses.
/// Unknown characters render as blank space.
fn glyph_rows(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        _ => [0; 7],
    }
}
