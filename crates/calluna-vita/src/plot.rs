//! Confusion-matrix tile plot rendered with plotters.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::debug;

use crate::error::VitaError;
use crate::eval::ContingencyTable;

const TILE_FILL: (u8, u8, u8) = (70, 130, 180);

/// Tile plot of a contingency table.
///
/// Columns are the reference (observed) levels, rows the predicted levels.
/// Tile fill darkens with the log of the count so small off-diagonal cells
/// stay visible next to a dominant diagonal.
#[derive(Debug, Clone)]
pub struct ConfusionPlot {
    table: ContingencyTable,
    accuracy: f64,
    kappa: f64,
    title: Option<String>,
}

impl ConfusionPlot {
    pub(crate) fn new(
        table: ContingencyTable,
        accuracy: f64,
        kappa: f64,
        title: Option<String>,
    ) -> Self {
        Self {
            table,
            accuracy,
            kappa,
            title,
        }
    }

    /// Write the plot as a PNG of the given pixel size.
    ///
    /// # Errors
    ///
    /// Returns [`VitaError::Plot`] when the backend fails to draw or write.
    pub fn save_png<P: AsRef<Path>>(&self, path: P, size: (u32, u32)) -> Result<(), VitaError> {
        let root = BitMapBackend::new(path.as_ref(), size).into_drawing_area();
        self.render(&root)
    }

    /// Write the plot as an SVG of the given pixel size.
    ///
    /// # Errors
    ///
    /// Returns [`VitaError::Plot`] when the backend fails to draw or write.
    pub fn save_svg<P: AsRef<Path>>(&self, path: P, size: (u32, u32)) -> Result<(), VitaError> {
        let root = SVGBackend::new(path.as_ref(), size).into_drawing_area();
        self.render(&root)
    }

    fn caption(&self) -> String {
        let stats = format!(
            "accuracy {:.1}%, kappa {:.1}%",
            self.accuracy * 100.0,
            self.kappa * 100.0
        );
        match &self.title {
            Some(title) => format!("{title} ({stats})"),
            None => stats,
        }
    }

    fn render<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
    ) -> Result<(), VitaError> {
        let levels = self.table.levels();
        let counts = self.table.as_rows();
        let n = levels.len();
        let max_count = counts
            .iter()
            .flat_map(|row| row.iter())
            .copied()
            .max()
            .unwrap_or(0);
        debug!(levels = n, max_count, "rendering confusion plot");

        root.fill(&WHITE).map_err(plot_err)?;

        let mut chart = ChartBuilder::on(root)
            .caption(self.caption(), ("sans-serif", 22))
            .margin(20)
            .build_cartesian_2d(-1.0..n as f64, -1.0..n as f64)
            .map_err(plot_err)?;

        let count_style = ("sans-serif", 16)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center));
        let label_style = ("sans-serif", 15)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center));

        for (pred_idx, _) in levels.iter().enumerate() {
            // Predicted rows run top-down.
            let y0 = (n - 1 - pred_idx) as f64;
            for (obs_idx, _) in levels.iter().enumerate() {
                let count = counts[obs_idx][pred_idx];
                let fill = tile_color(count, max_count);
                let x0 = obs_idx as f64;
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                        fill.filled(),
                    )))
                    .map_err(plot_err)?;
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                        BLACK.stroke_width(1),
                    )))
                    .map_err(plot_err)?;
                chart
                    .draw_series(std::iter::once(Text::new(
                        count.to_string(),
                        (x0 + 0.5, y0 + 0.5),
                        count_style.clone(),
                    )))
                    .map_err(plot_err)?;
            }
        }

        // Reference labels below the grid, predicted labels to its left.
        for (idx, level) in levels.iter().enumerate() {
            chart
                .draw_series(std::iter::once(Text::new(
                    level.clone(),
                    (idx as f64 + 0.5, -0.4),
                    label_style.clone(),
                )))
                .map_err(plot_err)?;
            chart
                .draw_series(std::iter::once(Text::new(
                    level.clone(),
                    (-0.5, (n - 1 - idx) as f64 + 0.5),
                    label_style.clone(),
                )))
                .map_err(plot_err)?;
        }

        root.present().map_err(plot_err)?;
        Ok(())
    }
}

/// Blend white toward the tile fill by the log of the count.
fn tile_color(count: usize, max_count: usize) -> RGBColor {
    if max_count == 0 {
        return WHITE;
    }
    let t = ((count as f64 + 1.0).ln() / (max_count as f64 + 1.0).ln()).clamp(0.0, 1.0);
    let (r, g, b) = TILE_FILL;
    let blend = |target: u8| (255.0 - t * f64::from(255 - target)).round() as u8;
    RGBColor(blend(r), blend(g), blend(b))
}

fn plot_err<E: std::error::Error>(err: E) -> VitaError {
    VitaError::Plot {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ContingencyTable {
        let observed: Vec<String> = ["a", "a", "a", "b", "b", "b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let predicted: Vec<String> = ["a", "a", "b", "b", "b", "a"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        ContingencyTable::from_labels(&observed, &predicted).unwrap()
    }

    #[test]
    fn tile_color_scales_with_count() {
        assert_eq!(tile_color(0, 10), WHITE);
        let full = tile_color(10, 10);
        assert_eq!((full.0, full.1, full.2), TILE_FILL);
        let mid = tile_color(3, 10);
        assert!(mid.0 < 255 && mid.0 > TILE_FILL.0);
    }

    #[test]
    fn empty_table_tiles_stay_white() {
        assert_eq!(tile_color(0, 0), WHITE);
    }

    #[test]
    fn caption_includes_title_and_stats() {
        let table = sample_table();
        let plot = ConfusionPlot::new(table, 0.85, 0.7, Some("holdout".to_string()));
        assert_eq!(plot.caption(), "holdout (accuracy 85.0%, kappa 70.0%)");
    }

    #[test]
    fn renders_svg_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confusion.svg");
        let plot = ConfusionPlot::new(sample_table(), 0.75, 0.5, None);
        plot.save_svg(&path, (640, 480)).unwrap();
        let written = std::fs::metadata(&path).unwrap().len();
        assert!(written > 0);
    }
}
