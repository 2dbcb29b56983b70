use crate::audio::analyzer::SpectrumSnapshot;
use crate::eq::{BAND_CENTERS_HZ, band_label};
use crate::spectrum::{DECADE_LINES_HZ, LogAxis};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const BACKGROUND: Rgb = Rgb(0x11, 0x11, 0x11);
pub const BAR: Rgb = Rgb(0x24, 0xd1, 0xa0);
pub const GRID: Rgb = Rgb(0x24, 0x24, 0x24);
pub const MARKER: Rgb = Rgb(0x3c, 0x3c, 0x3c);
pub const LABEL: Rgb = Rgb(0xb8, 0xb8, 0xb8);

/// Distance of band labels from the top edge.
pub const LABEL_BASELINE: f32 = 14.0;

/// Drawing target. Origin top-left, y grows downward.
pub trait Surface {
    fn clear(&mut self, color: Rgb);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb);

    /// Full-height vertical line.
    fn vline(&mut self, x: f32, color: Rgb);

    /// Text centered on `x`.
    fn label(&mut self, x: f32, y: f32, text: &str, color: Rgb);
}

/// One analyzer bin laid out on the log axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x: f32,
    pub width: f32,
    pub height: f32,
}

pub struct SpectrumRenderer {
    width: f32,
    height: f32,
    labels: Vec<(f32, String)>,
}

impl SpectrumRenderer {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            labels: BAND_CENTERS_HZ
                .iter()
                .map(|&f| (f, band_label(f)))
                .collect(),
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub const fn width(&self) -> f32 {
        self.width
    }

    pub const fn height(&self) -> f32 {
        self.height
    }

    pub fn axis(&self, snapshot: &SpectrumSnapshot) -> LogAxis {
        LogAxis::for_sample_rate(self.width, snapshot.sample_rate)
    }

    /// Bin `i` of `n` covers `[i * nyquist / n, (i + 1) * nyquist / n)`.
    pub fn bars(&self, snapshot: &SpectrumSnapshot) -> Vec<Bar> {
        let axis = self.axis(snapshot);
        let nyquist = snapshot.nyquist();
        let n = snapshot.bins.len() as f32;

        snapshot
            .bins
            .iter()
            .enumerate()
            .map(|(i, &magnitude)| {
                let f1 = i as f32 * nyquist / n;
                let f2 = (i + 1) as f32 * nyquist / n;
                let x1 = axis.x(f1);
                let x2 = axis.x(f2);
                Bar {
                    x: x1,
                    width: (x2 - x1).max(1.0),
                    height: f32::from(magnitude) / 255.0 * self.height,
                }
            })
            .collect()
    }

    pub fn render(&self, snapshot: &SpectrumSnapshot, surface: &mut dyn Surface) {
        surface.clear(BACKGROUND);

        for bar in self.bars(snapshot) {
            if bar.height > 0.0 {
                surface.fill_rect(bar.x, self.height - bar.height, bar.width, bar.height, BAR);
            }
        }

        let axis = self.axis(snapshot);
        for &f in &DECADE_LINES_HZ {
            if axis.contains(f) {
                surface.vline(axis.x(f), GRID);
            }
        }

        for (f, text) in &self.labels {
            if axis.contains(*f) {
                let x = axis.x(*f);
                surface.vline(x, MARKER);
                surface.label(x, LABEL_BASELINE, text, LABEL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear(Rgb),
        Rect(f32, f32, f32, f32),
        Line(f32, Rgb),
        Label(String),
    }

    #[derive(Default)]
    struct Recorder(Vec<Op>);

    impl Surface for Recorder {
        fn clear(&mut self, color: Rgb) {
            self.0.push(Op::Clear(color));
        }

        fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, _color: Rgb) {
            self.0.push(Op::Rect(x, y, width, height));
        }

        fn vline(&mut self, x: f32, color: Rgb) {
            self.0.push(Op::Line(x, color));
        }

        fn label(&mut self, _x: f32, _y: f32, text: &str, _color: Rgb) {
            self.0.push(Op::Label(text.to_string()));
        }
    }

    fn snapshot(bins: Vec<u8>) -> SpectrumSnapshot {
        SpectrumSnapshot {
            bins,
            sample_rate: 48_000,
        }
    }

    #[test]
    fn bars_are_at_least_one_pixel_wide() {
        let renderer = SpectrumRenderer::new(300.0, 100.0);
        let bars = renderer.bars(&snapshot(vec![255; 1024]));

        assert_eq!(bars.len(), 1024);
        assert!(bars.iter().all(|b| b.width >= 1.0));
        assert!(bars.iter().all(|b| b.height == 100.0));
        // The first bins sit below 20 Hz and collapse onto the left edge.
        assert_eq!(bars[0].x, 0.0);
        assert!((bars[1023].x + bars[1023].width - 300.0).abs() < 1.0);
    }

    #[test]
    fn bar_height_scales_with_magnitude() {
        let renderer = SpectrumRenderer::new(100.0, 51.0);
        let bars = renderer.bars(&snapshot(vec![0, 5, 255, 128]));
        assert_eq!(bars[0].height, 0.0);
        assert!((bars[1].height - 1.0).abs() < 1e-4);
        assert_eq!(bars[2].height, 51.0);
    }

    #[test]
    fn overlay_draws_decades_and_labelled_bands() {
        let renderer = SpectrumRenderer::new(640.0, 200.0);
        let mut surface = Recorder::default();
        renderer.render(&snapshot(vec![0; 1024]), &mut surface);

        assert_eq!(surface.0[0], Op::Clear(BACKGROUND));
        assert!(!surface.0.iter().any(|op| matches!(op, Op::Rect(..))));

        let grid = surface
            .0
            .iter()
            .filter(|op| matches!(op, Op::Line(_, c) if *c == GRID))
            .count();
        assert_eq!(grid, 3);

        let labels: Vec<&str> = surface
            .0
            .iter()
            .filter_map(|op| match op {
                Op::Label(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            labels,
            ["31.5", "63", "125", "250", "500", "1k", "2k", "4k", "8k", "16k"]
        );
    }

    #[test]
    fn overlay_skips_lines_past_nyquist() {
        let renderer = SpectrumRenderer::new(640.0, 200.0);
        let mut surface = Recorder::default();
        let low_rate = SpectrumSnapshot {
            bins: vec![10; 128],
            sample_rate: 16_000,
        };
        renderer.render(&low_rate, &mut surface);

        let grid = surface
            .0
            .iter()
            .filter(|op| matches!(op, Op::Line(_, c) if *c == GRID))
            .count();
        assert_eq!(grid, 2, "10 kHz is above an 8 kHz Nyquist");

        let labels = surface
            .0
            .iter()
            .filter(|op| matches!(op, Op::Label(_)))
            .count();
        assert_eq!(labels, 8, "8k and 16k sit at or past Nyquist");
    }
}
