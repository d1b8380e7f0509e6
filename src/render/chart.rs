//! Bar chart rendering to PNG.
//!
//! Layout follows a 10x6 inch figure at 100 dpi: title on top, a y axis with
//! light grid lines, one bar per entry in the given order, and x labels
//! rotated 45 degrees so they end at their tick.

use std::io::Cursor;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Rgb, RgbImage};

use super::font::{self, ADVANCE, GLYPH_HEIGHT};

pub const WIDTH: u32 = 1000;
pub const HEIGHT: u32 = 600;

const PLOT_LEFT: u32 = 70;
const PLOT_RIGHT: u32 = WIDTH - 20;
const PLOT_TOP: u32 = 60;
const PLOT_BOTTOM: u32 = HEIGHT - 150;

const TITLE_SCALE: u32 = 3;
const LABEL_SCALE: u32 = 2;
const TICK_SCALE: u32 = 2;
const MAX_LABEL_CHARS: usize = 16;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([33, 33, 33]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const BAR: Rgb<u8> = Rgb([31, 119, 180]);

/// Render `bars` as a PNG bar chart titled `title`
pub fn render_bar_chart(title: &str, bars: &[(String, u64)]) -> Result<Vec<u8>> {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    let title_x = (WIDTH.saturating_sub(font::text_width(title, TITLE_SCALE)) / 2) as i64;
    draw_text(&mut img, title_x, 18, title, TITLE_SCALE, INK);

    let max_count = bars.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);
    let step = tick_step(max_count);
    let y_max = max_count.div_ceil(step) * step;
    let plot_height = (PLOT_BOTTOM - PLOT_TOP) as f64;
    let y_for = |value: u64| PLOT_BOTTOM as f64 - value as f64 / y_max as f64 * plot_height;

    // Grid lines and y tick labels
    let mut tick = 0;
    while tick <= y_max {
        let y = y_for(tick).round() as u32;
        if tick > 0 {
            fill_rect(&mut img, PLOT_LEFT + 1, y, PLOT_RIGHT, y + 1, GRID);
        }
        fill_rect(&mut img, PLOT_LEFT - 5, y, PLOT_LEFT, y + 1, INK);

        let label = tick.to_string();
        let x = PLOT_LEFT as i64 - 10 - font::text_width(&label, TICK_SCALE) as i64;
        let label_y = y as i64 - (GLYPH_HEIGHT * TICK_SCALE / 2) as i64;
        draw_text(&mut img, x, label_y, &label, TICK_SCALE, INK);

        tick += step;
    }

    // Bars and rotated x labels
    if !bars.is_empty() {
        let slot = (PLOT_RIGHT - PLOT_LEFT) as f64 / bars.len() as f64;
        let bar_width = slot * 0.8;

        for (i, (label, count)) in bars.iter().enumerate() {
            let center = PLOT_LEFT as f64 + slot * (i as f64 + 0.5);
            let left = (center - bar_width / 2.0).round() as u32;
            let right = (center + bar_width / 2.0).round() as u32;
            let top = y_for(*count).round() as u32;
            fill_rect(&mut img, left, top, right, PLOT_BOTTOM, BAR);

            let tick_x = center.round() as u32;
            fill_rect(&mut img, tick_x, PLOT_BOTTOM, tick_x + 1, PLOT_BOTTOM + 5, INK);

            let text = truncate_label(label);
            draw_text_rotated(
                &mut img,
                center,
                (PLOT_BOTTOM + 8) as f64,
                &text,
                LABEL_SCALE,
                INK,
            );
        }
    }

    // Axes
    fill_rect(&mut img, PLOT_LEFT, PLOT_TOP, PLOT_LEFT + 1, PLOT_BOTTOM + 1, INK);
    fill_rect(&mut img, PLOT_LEFT, PLOT_BOTTOM, PLOT_RIGHT, PLOT_BOTTOM + 1, INK);

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .context("Failed to encode chart as PNG")?;

    Ok(buffer.into_inner())
}

/// Wrap PNG bytes as a Markdown image with an inline data URI
pub fn markdown_image(png: &[u8]) -> String {
    format!("![img](data:image/png;base64,{})", STANDARD.encode(png))
}

/// Tick spacing giving at most about six ticks: 1, 2 or 5 times a power of ten
fn tick_step(max: u64) -> u64 {
    let mut magnitude = 1;
    loop {
        for factor in [1, 2, 5] {
            let step = factor * magnitude;
            if max.div_ceil(step) <= 6 {
                return step;
            }
        }
        magnitude *= 10;
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut text: String = label.chars().take(MAX_LABEL_CHARS - 2).collect();
    text.push_str("..");
    text
}

/// Fill the half-open rectangle [x0, x1) x [y0, y1), clipped to the image
fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(img.width());
    let y1 = y1.min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}

fn put_clipped(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Draw horizontal text with its top-left corner at (`x`, `y`)
fn draw_text(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
    for (i, c) in text.chars().enumerate() {
        let origin_x = x + (i as u32 * ADVANCE * scale) as i64;
        for gy in 0..GLYPH_HEIGHT {
            for gx in 0..font::GLYPH_WIDTH {
                if !font::is_set(c, gx, gy) {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        put_clipped(
                            img,
                            origin_x + (gx * scale + dx) as i64,
                            y + (gy * scale + dy) as i64,
                            color,
                        );
                    }
                }
            }
        }
    }
}

/// Draw text rising at 45 degrees whose top-right end sits at (`anchor_x`, `anchor_y`)
fn draw_text_rotated(
    img: &mut RgbImage,
    anchor_x: f64,
    anchor_y: f64,
    text: &str,
    scale: u32,
    color: Rgb<u8>,
) {
    let c = std::f64::consts::FRAC_1_SQRT_2;
    let length = font::text_width(text, scale) as f64;
    // Half-pixel sampling keeps rotated strokes free of holes
    let samples = scale * 2;

    for (i, ch) in text.chars().enumerate() {
        let origin_u = (i as u32 * ADVANCE * scale) as f64;
        for gy in 0..GLYPH_HEIGHT {
            for gx in 0..font::GLYPH_WIDTH {
                if !font::is_set(ch, gx, gy) {
                    continue;
                }
                for sv in 0..samples {
                    for su in 0..samples {
                        let u = origin_u + (gx * scale) as f64 + su as f64 * 0.5 - length;
                        let v = (gy * scale) as f64 + sv as f64 * 0.5;
                        let x = anchor_x + u * c + v * c;
                        let y = anchor_y - u * c + v * c;
                        put_clipped(img, x.round() as i64, y.round() as i64, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_renders_png() {
        let bars = vec![("rust".to_string(), 5), ("show".to_string(), 3)];
        let png = render_bar_chart("Top Words", &bars).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), WIDTH);
        assert_eq!(decoded.height(), HEIGHT);
    }

    #[test]
    fn test_empty_chart_renders() {
        let png = render_bar_chart("Nothing", &[]).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_bar_is_drawn_in_bar_color() {
        let bars = vec![("only".to_string(), 4)];
        let png = render_bar_chart("One", &bars).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();

        let center_x = (PLOT_LEFT + PLOT_RIGHT) / 2;
        assert_eq!(*img.get_pixel(center_x, PLOT_BOTTOM - 10), BAR);
        assert_eq!(*img.get_pixel(5, HEIGHT - 5), BACKGROUND);
    }

    #[test]
    fn test_tick_step() {
        assert_eq!(tick_step(1), 1);
        assert_eq!(tick_step(6), 1);
        assert_eq!(tick_step(7), 2);
        assert_eq!(tick_step(25), 5);
        assert_eq!(tick_step(400), 100);
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short"), "short");
        let long = "a".repeat(30);
        assert_eq!(truncate_label(&long).chars().count(), MAX_LABEL_CHARS);
    }

    #[test]
    fn test_markdown_image() {
        let md = markdown_image(&[1, 2, 3]);
        assert_eq!(md, "![img](data:image/png;base64,AQID)");
    }
}
