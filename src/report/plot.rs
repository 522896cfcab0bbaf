use std::path::Path;

use image::{Rgb, RgbImage};

use crate::checkpoint::metric_logger::{MetricHistory, TRAIN_LOSS, VAL_LOSS};
use crate::error::Result;
use crate::report::font::{draw_text, fill_rect, text_height, text_width};
use crate::report::png::save_png;

pub const DEFAULT_DPI: u32 = 200;
pub const LEARNING_CURVE_TITLE: &str = "Dice Coefficient Loss";

/// Figure size in inches.
const FIG_WIDTH: f64 = 6.4;
const FIG_HEIGHT: f64 = 4.8;
/// Axes box as fractions of the figure (left, right, top, bottom from the top edge).
const AXES: (f64, f64, f64, f64) = (0.125, 0.9, 0.12, 0.89);

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([176, 176, 176]);
const LEGEND_EDGE: Rgb<u8> = Rgb([204, 204, 204]);
const PALETTE: [Rgb<u8>; 4] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

/// Line chart of one or more series against their index, with title,
/// legend and grid.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub series: Vec<Series>,
    pub dpi: u32,
}

/// Pixel rectangle of the plotting area.
#[derive(Debug, Clone, Copy)]
struct Frame {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Frame {
    fn px(&self, x: f64, y: f64) -> (f64, f64) {
        let (x0, x1) = self.x_range;
        let (y0, y1) = self.y_range;
        (
            self.left + (x - x0) / (x1 - x0) * (self.right - self.left),
            self.bottom - (y - y0) / (y1 - y0) * (self.bottom - self.top),
        )
    }
}

impl LineChart {
    pub fn new(title: impl Into<String>) -> LineChart {
        LineChart { title: title.into(), series: Vec::new(), dpi: DEFAULT_DPI }
    }

    pub fn with_series(mut self, label: impl Into<String>, values: Vec<f64>) -> LineChart {
        self.series.push(Series { label: label.into(), values });
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> LineChart {
        self.dpi = dpi.max(1);
        self
    }

    /// Pixel size of the rendered figure.
    pub fn dimensions(&self) -> (u32, u32) {
        (
            (FIG_WIDTH * self.dpi as f64).round() as u32,
            (FIG_HEIGHT * self.dpi as f64).round() as u32,
        )
    }

    pub fn render(&self) -> RgbImage {
        let (w, h) = self.dimensions();
        let s = self.dpi as f64 / 100.0;
        let tick_scale = ((1.4 * s).round() as u32).max(1);
        let title_scale = ((2.0 * s).round() as u32).max(1);
        let line_width = ((1.5 * self.dpi as f64 / 72.0).round() as i64).max(1);
        let thin = (s.round() as i64).max(1);

        let mut img = RgbImage::from_pixel(w, h, WHITE);
        let frame = Frame {
            left: AXES.0 * w as f64,
            right: AXES.1 * w as f64,
            top: AXES.2 * h as f64,
            bottom: AXES.3 * h as f64,
            x_range: self.x_range(),
            y_range: self.y_range(),
        };

        // Grid and tick labels.
        let tick_gap = (4.0 * s) as i64;
        for x in nice_ticks(frame.x_range.0, frame.x_range.1) {
            let (px, _) = frame.px(x, frame.y_range.0);
            fill_rect(&mut img, px as i64, frame.top as i64, thin, (frame.bottom - frame.top) as i64, GRID);
            let label = format_tick(x, frame.x_range);
            let tw = text_width(&label, tick_scale) as i64;
            draw_text(&mut img, &label, px as i64 - tw / 2, frame.bottom as i64 + tick_gap, tick_scale, BLACK);
        }
        for y in nice_ticks(frame.y_range.0, frame.y_range.1) {
            let (_, py) = frame.px(frame.x_range.0, y);
            fill_rect(&mut img, frame.left as i64, py as i64, (frame.right - frame.left) as i64, thin, GRID);
            let label = format_tick(y, frame.y_range);
            let tw = text_width(&label, tick_scale) as i64;
            let th = text_height(tick_scale) as i64;
            draw_text(&mut img, &label, frame.left as i64 - tick_gap - tw, py as i64 - th / 2, tick_scale, BLACK);
        }

        // Series.
        for (i, series) in self.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let points: Vec<(f64, f64)> = series
                .values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(x, &v)| frame.px(x as f64, v))
                .collect();
            if let [only] = points.as_slice() {
                stamp(&mut img, only.0, only.1, line_width, color);
            }
            for pair in points.windows(2) {
                draw_line(&mut img, pair[0], pair[1], line_width, color);
            }
        }

        // Axes box.
        let (l, r, t, b) = (frame.left as i64, frame.right as i64, frame.top as i64, frame.bottom as i64);
        fill_rect(&mut img, l, t, r - l + thin, thin, BLACK);
        fill_rect(&mut img, l, b, r - l + thin, thin, BLACK);
        fill_rect(&mut img, l, t, thin, b - t, BLACK);
        fill_rect(&mut img, r, t, thin, b - t, BLACK);

        // Title.
        let tw = text_width(&self.title, title_scale) as i64;
        let th = text_height(title_scale) as i64;
        let title_x = ((frame.left + frame.right) / 2.0) as i64 - tw / 2;
        draw_text(&mut img, &self.title, title_x, t - th - (6.0 * s) as i64, title_scale, BLACK);

        self.draw_legend(&mut img, &frame, tick_scale, line_width, s);
        img
    }

    fn draw_legend(&self, img: &mut RgbImage, frame: &Frame, scale: u32, line_width: i64, s: f64) {
        if self.series.is_empty() {
            return;
        }
        let pad = (6.0 * s) as i64;
        let swatch = (20.0 * s) as i64;
        let row_h = text_height(scale) as i64 + pad;
        let label_w = self
            .series
            .iter()
            .map(|series| text_width(&series.label, scale) as i64)
            .max()
            .unwrap_or(0);
        let box_w = pad * 3 + swatch + label_w;
        let box_h = pad + row_h * self.series.len() as i64;
        let x = frame.right as i64 - pad - box_w;
        let y = frame.top as i64 + pad;

        fill_rect(img, x, y, box_w, box_h, LEGEND_EDGE);
        fill_rect(img, x + 1, y + 1, box_w - 2, box_h - 2, WHITE);
        for (i, series) in self.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let row_y = y + pad + i as i64 * row_h;
            let mid = row_y + text_height(scale) as i64 / 2;
            fill_rect(img, x + pad, mid - line_width / 2, swatch, line_width, color);
            draw_text(img, &series.label, x + pad * 2 + swatch, row_y, scale, BLACK);
        }
    }

    fn x_range(&self) -> (f64, f64) {
        let longest = self.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
        let hi = longest.saturating_sub(1).max(1) as f64;
        with_margin(0.0, hi)
    }

    fn y_range(&self) -> (f64, f64) {
        let finite = self.series.iter().flat_map(|s| s.values.iter()).filter(|v| v.is_finite());
        let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
        if lo > hi {
            return with_margin(0.0, 1.0);
        }
        if lo == hi {
            let pad = if lo == 0.0 { 0.5 } else { lo.abs() * 0.05 };
            return (lo - pad, hi + pad);
        }
        with_margin(lo, hi)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_png(&self.render(), path, self.dpi)
    }
}

/// The training-curve figure: `train_loss` and `val_loss` against epoch.
pub fn learning_curve(history: &MetricHistory) -> LineChart {
    [TRAIN_LOSS, VAL_LOSS].iter().fold(LineChart::new(LEARNING_CURVE_TITLE), |chart, key| {
        chart.with_series(*key, history.get(key).map(|v| v.to_vec()).unwrap_or_default())
    })
}

fn with_margin(lo: f64, hi: f64) -> (f64, f64) {
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// Tick positions at 1, 2 or 5 times a power of ten, roughly six per axis.
fn nice_ticks(lo: f64, hi: f64) -> Vec<f64> {
    let span = hi - lo;
    if !(span.is_finite() && span > 0.0) {
        return Vec::new();
    }
    let raw = span / 6.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|&step| step >= raw)
        .unwrap_or(10.0 * magnitude);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

fn format_tick(v: f64, range: (f64, f64)) -> String {
    let ticks = nice_ticks(range.0, range.1);
    let step = match ticks.as_slice() {
        [a, b, ..] => b - a,
        _ => 1.0,
    };
    let decimals = if step >= 1.0 { 0 } else { (-step.log10()).ceil() as usize };
    let text = format!("{:.*}", decimals, v);
    // "-0" and "-0.00" read better without the sign
    if text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        text.trim_start_matches('-').to_owned()
    } else {
        text
    }
}

/// Square brush of side `width` centred on `(x, y)`.
fn stamp(img: &mut RgbImage, x: f64, y: f64, width: i64, color: Rgb<u8>) {
    let half = width / 2;
    fill_rect(img, x.round() as i64 - half, y.round() as i64 - half, width, width, color);
}

fn draw_line(img: &mut RgbImage, from: (f64, f64), to: (f64, f64), width: i64, color: Rgb<u8>) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        stamp(img, from.0 + dx * t, from.1 + dy * t, width, color);
    }
}
