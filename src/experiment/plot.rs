//! Confusion matrix heatmap rendered straight to PNG
//!
//! Rows are true labels, columns predicted labels. Cell color scales with
//! the count (dark purple → yellow). Text uses a 3x5 pixel font: a title,
//! the `predicted` / `true` axis titles, class labels along both axes and
//! the count in every cell.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::{Error, Result};

const CELL: usize = 96;
const MARGIN: usize = 16;
const GAP: usize = 8;
const COUNT_SCALE: usize = 4;
const LABEL_SCALE: usize = 2;
const GLYPH_W: usize = 3;
const GLYPH_H: usize = 5;

const TITLE: &str = "confusion matrix";
const X_AXIS: &str = "predicted";
const Y_AXIS: &str = "true";

type Rgb = [u8; 3];

const BACKGROUND: Rgb = [255, 255, 255];
const INK: Rgb = [0, 0, 0];
const LOW: Rgb = [68, 1, 84];
const HIGH: Rgb = [253, 231, 37];

// Each row is a 3-bit mask, MSB = leftmost pixel.
type Glyph = [u8; GLYPH_H];

const DIGITS: [Glyph; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

const LETTERS: [Glyph; 26] = [
    [0b010, 0b101, 0b111, 0b101, 0b101], // a
    [0b110, 0b101, 0b110, 0b101, 0b110], // b
    [0b011, 0b100, 0b100, 0b100, 0b011], // c
    [0b110, 0b101, 0b101, 0b101, 0b110], // d
    [0b111, 0b100, 0b110, 0b100, 0b111], // e
    [0b111, 0b100, 0b110, 0b100, 0b100], // f
    [0b011, 0b100, 0b101, 0b101, 0b011], // g
    [0b101, 0b101, 0b111, 0b101, 0b101], // h
    [0b111, 0b010, 0b010, 0b010, 0b111], // i
    [0b001, 0b001, 0b001, 0b101, 0b010], // j
    [0b101, 0b101, 0b110, 0b101, 0b101], // k
    [0b100, 0b100, 0b100, 0b100, 0b111], // l
    [0b101, 0b111, 0b111, 0b101, 0b101], // m
    [0b110, 0b101, 0b101, 0b101, 0b101], // n
    [0b010, 0b101, 0b101, 0b101, 0b010], // o
    [0b110, 0b101, 0b110, 0b100, 0b100], // p
    [0b010, 0b101, 0b101, 0b110, 0b011], // q
    [0b110, 0b101, 0b110, 0b101, 0b101], // r
    [0b011, 0b100, 0b010, 0b001, 0b110], // s
    [0b111, 0b010, 0b010, 0b010, 0b010], // t
    [0b101, 0b101, 0b101, 0b101, 0b111], // u
    [0b101, 0b101, 0b101, 0b101, 0b010], // v
    [0b101, 0b101, 0b111, 0b111, 0b101], // w
    [0b101, 0b101, 0b010, 0b101, 0b101], // x
    [0b101, 0b101, 0b010, 0b010, 0b010], // y
    [0b111, 0b001, 0b010, 0b100, 0b111], // z
];

/// Glyph for `c`; `None` renders as blank space.
fn glyph(c: char) -> Option<&'static Glyph> {
    let c = c.to_ascii_lowercase();
    match c {
        '0'..='9' => DIGITS.get(usize::from(c as u8 - b'0')),
        'a'..='z' => LETTERS.get(usize::from(c as u8 - b'a')),
        _ => None,
    }
}

const fn advance(scale: usize) -> usize {
    (GLYPH_W + 1) * scale
}

/// Pixel width of `text` drawn at `scale`.
fn text_width(text: &str, scale: usize) -> usize {
    match text.chars().count() {
        0 => 0,
        n => n * advance(scale) - scale,
    }
}

struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: usize, height: usize, fill: Rgb) -> Self {
        let pixels = fill.iter().copied().cycle().take(width * height * 3).collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 3;
            Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
        } else {
            None
        }
    }

    fn set(&mut self, x: usize, y: usize, color: Rgb) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 3;
            self.pixels[i..i + 3].copy_from_slice(&color);
        }
    }

    fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize, color: Rgb) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                self.set(x, y, color);
            }
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    fn draw_text(&mut self, text: &str, x: usize, y: usize, scale: usize, color: Rgb) {
        for (n, c) in text.chars().enumerate() {
            let Some(rows) = glyph(c) else { continue };
            let gx = x + n * advance(scale);
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_W {
                    if bits & (0b100 >> col) != 0 {
                        self.fill_rect(gx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
        }
    }

    /// Draw `text` centered on (`cx`, `cy`).
    fn draw_text_centered(&mut self, text: &str, cx: usize, cy: usize, scale: usize, color: Rgb) {
        let x = cx.saturating_sub(text_width(text, scale) / 2);
        let y = cy.saturating_sub(GLYPH_H * scale / 2);
        self.draw_text(text, x, y, scale, color);
    }

    fn write_png(&self, path: &Path) -> Result<()> {
        let png_err = |e: png::EncodingError| Error::Other(format!("PNG encoding failed: {e}"));
        let dim = |v: usize| {
            u32::try_from(v).map_err(|_| Error::Other(format!("image dimension too large: {v}")))
        };

        let file = File::create(path)?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), dim(self.width)?, dim(self.height)?);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header().map_err(png_err)?;
        writer.write_image_data(&self.pixels).map_err(png_err)?;
        writer.finish().map_err(png_err)
    }
}

/// Pixel positions of the plot's regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    n: usize,
    /// Left edge of the grid; row labels are right-aligned against it.
    left: usize,
    /// Top edge of the grid.
    top: usize,
    title_y: usize,
    axis_y: usize,
    col_label_y: usize,
    width: usize,
    height: usize,
}

impl Layout {
    fn new(n: usize, labels: &[&str]) -> Self {
        let line = GLYPH_H * LABEL_SCALE;
        let label_w = labels
            .iter()
            .map(|l| text_width(l, LABEL_SCALE))
            .chain(std::iter::once(text_width(Y_AXIS, LABEL_SCALE)))
            .max()
            .unwrap_or(0);

        let left = MARGIN + label_w + GAP;
        let title_y = MARGIN;
        let axis_y = title_y + line + 2 * GAP;
        let col_label_y = axis_y + line + GAP;
        let top = col_label_y + line + GAP;
        let width = (left + n * CELL + MARGIN).max(2 * MARGIN + text_width(TITLE, LABEL_SCALE));

        Self {
            n,
            left,
            top,
            title_y,
            axis_y,
            col_label_y,
            width,
            height: top + n * CELL + MARGIN,
        }
    }

    const fn grid_center_x(&self) -> usize {
        self.left + self.n * CELL / 2
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn heat(t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 3];
    for (c, (lo, hi)) in out.iter_mut().zip(LOW.iter().zip(HIGH.iter())) {
        *c = (f64::from(*hi) - f64::from(*lo)).mul_add(t, f64::from(*lo)).round() as u8;
    }
    out
}

fn text_color(bg: Rgb) -> Rgb {
    let luma = 299 * u32::from(bg[0]) + 587 * u32::from(bg[1]) + 114 * u32::from(bg[2]);
    if luma < 128_000 {
        [255, 255, 255]
    } else {
        INK
    }
}

#[allow(clippy::cast_precision_loss)]
fn render(cm: &[Vec<u64>], labels: &[&str]) -> (Canvas, Layout) {
    let layout = Layout::new(cm.len(), labels);
    let mut canvas = Canvas::new(layout.width, layout.height, BACKGROUND);
    let line = GLYPH_H * LABEL_SCALE;

    canvas.draw_text_centered(TITLE, layout.grid_center_x(), layout.title_y + line / 2, LABEL_SCALE, INK);
    canvas.draw_text_centered(X_AXIS, layout.grid_center_x(), layout.axis_y + line / 2, LABEL_SCALE, INK);
    canvas.draw_text(Y_AXIS, MARGIN, layout.col_label_y, LABEL_SCALE, INK);

    for (k, label) in labels.iter().enumerate() {
        let center = k * CELL + CELL / 2;
        canvas.draw_text_centered(
            label,
            layout.left + center,
            layout.col_label_y + line / 2,
            LABEL_SCALE,
            INK,
        );
        let row_x = layout.left - GAP - text_width(label, LABEL_SCALE);
        canvas.draw_text(label, row_x, layout.top + center - line / 2, LABEL_SCALE, INK);
    }

    let max = cm.iter().flatten().copied().max().unwrap_or(0).max(1);
    for (i, row) in cm.iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            let color = heat(count as f64 / max as f64);
            let x0 = layout.left + j * CELL;
            let y0 = layout.top + i * CELL;
            canvas.fill_rect(x0 + 1, y0 + 1, CELL - 2, CELL - 2, color);
            canvas.draw_text_centered(
                &count.to_string(),
                x0 + CELL / 2,
                y0 + CELL / 2,
                COUNT_SCALE,
                text_color(color),
            );
        }
    }

    (canvas, layout)
}

/// Render `cm` (square, `cm[true][pred]`) as a labelled PNG heatmap at
/// `out_path`. `labels[k]` names class `k` on both axes.
///
/// # Errors
///
/// Returns an error if `labels` does not match the matrix size, or if the
/// file cannot be created or encoded.
pub fn save_confusion_matrix(cm: &[Vec<u64>], labels: &[&str], out_path: &Path) -> Result<()> {
    if labels.len() != cm.len() {
        return Err(Error::InvalidExperiment(format!(
            "confusion matrix has {} classes but {} labels",
            cm.len(),
            labels.len()
        )));
    }
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let (canvas, _) = render(cm, labels);
    canvas.write_png(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::IRIS_CLASSES;
    use tempfile::tempdir;

    fn sample() -> Vec<Vec<u64>> {
        vec![vec![10, 0, 0], vec![0, 9, 1], vec![0, 2, 8]]
    }

    fn ink_in(canvas: &Canvas, xs: std::ops::Range<usize>, ys: std::ops::Range<usize>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| canvas.get(x, y) == Some(INK))
    }

    #[test]
    fn test_writes_png_signature() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plots").join("cm.png");
        save_confusion_matrix(&sample(), &IRIS_CLASSES, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_label_count_mismatch() {
        let dir = tempdir().unwrap();
        let err = save_confusion_matrix(&sample(), &["a", "b"], &dir.path().join("cm.png"));
        assert!(matches!(err, Err(Error::InvalidExperiment(_))));
    }

    #[test]
    fn test_font_covers_plot_text() {
        for text in IRIS_CLASSES.iter().chain(&[TITLE, X_AXIS, Y_AXIS, "0123456789"]) {
            for c in text.chars().filter(|c| *c != ' ') {
                assert!(glyph(c).is_some(), "no glyph for {c:?}");
            }
        }
        assert_eq!(glyph('A'), glyph('a'));
        assert!(glyph('?').is_none());
    }

    #[test]
    fn test_labels_and_titles_drawn() {
        let (canvas, layout) = render(&sample(), &IRIS_CLASSES);
        let line = GLYPH_H * LABEL_SCALE;

        // title, x-axis title, column labels
        for y in [layout.title_y, layout.axis_y, layout.col_label_y] {
            assert!(ink_in(&canvas, layout.left..layout.left + 3 * CELL, y..y + line));
        }
        // y-axis title and every row label left of the grid
        assert!(ink_in(&canvas, 0..layout.left, layout.col_label_y..layout.col_label_y + line));
        for k in 0..3 {
            let y0 = layout.top + k * CELL;
            assert!(ink_in(&canvas, 0..layout.left, y0..y0 + CELL), "row label {k}");
        }
    }

    #[test]
    fn test_layout_fits_longest_label() {
        let layout = Layout::new(3, &IRIS_CLASSES);
        assert!(layout.left >= MARGIN + text_width("versicolor", LABEL_SCALE));
        assert!(text_width("versicolor", LABEL_SCALE) < CELL);
        assert_eq!(layout.width, layout.left + 3 * CELL + MARGIN);
        assert_eq!(layout.height, layout.top + 3 * CELL + MARGIN);
    }

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("ab", 2), 14);
    }

    #[test]
    fn test_heat_endpoints() {
        assert_eq!(heat(0.0), LOW);
        assert_eq!(heat(1.0), HIGH);
        assert_eq!(text_color(LOW), [255, 255, 255]);
        assert_eq!(text_color(HIGH), INK);
    }

    #[test]
    fn test_text_stays_in_bounds() {
        let mut canvas = Canvas::new(8, 8, BACKGROUND);
        canvas.draw_text_centered("12345", 4, 4, COUNT_SCALE, INK);
        assert_eq!(canvas.pixels.len(), 8 * 8 * 3);
    }
}
