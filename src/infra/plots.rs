// ============================================================
// Layer 6 — Training Curves
// ============================================================
// One PNG per (metric, feature): training vs validation value
// against epoch. The drawing area is dropped as soon as the file
// is presented so repeated runs never hold figures open.

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;

use crate::infra::metrics::Metric;

const SIZE: (u32, u32) = (800, 500);

/// Render `train` and `valid` (one value per epoch) to `path`.
/// Non-finite values are left out of the chart.
pub fn plot_metric(
    path:    &Path,
    feature: &str,
    metric:  Metric,
    train:   &[f64],
    valid:   &[f64],
) -> Result<()> {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let epochs = train.len().max(valid.len()).max(1);
    let (y_min, y_max) = value_range(train.iter().chain(valid));

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{}: {}", feature, metric.title()), ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(1f64..(epochs as f64).max(2.0), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Epoch")
        .y_desc(metric.name())
        .draw()?;

    chart
        .draw_series(LineSeries::new(points(train), &BLUE))?
        .label("train")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(points(valid), &RED))?
        .label("validation")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("Cannot write plot '{}'", path.display()))?;
    drop(chart);
    drop(root);

    tracing::debug!("Saved {} plot to '{}'", metric.name(), path.display());
    Ok(())
}

fn points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| ((i + 1) as f64, *v))
        .collect()
}

/// Padded (min, max) over finite values; a flat or empty series
/// still gets a non-empty axis.
fn value_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));

    if !min.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(max.abs().max(1.0) * 1e-3);
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_range_handles_flat_and_empty_series() {
        let (lo, hi) = value_range([2.0, 2.0].iter());
        assert!(lo < 2.0 && hi > 2.0);
        assert_eq!(value_range([f64::NAN].iter()), (0.0, 1.0));
    }

    #[test]
    fn test_points_skip_non_finite_values() {
        let pts = points(&[1.0, f64::NAN, 3.0]);
        assert_eq!(pts, vec![(1.0, 1.0), (3.0, 3.0)]);
    }

    #[test]
    fn test_plot_is_written_and_overwritten() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss-G.png");
        plot_metric(&path, "G", Metric::Loss, &[3.0, 2.0, 1.5], &[3.5, 2.5, 2.4]).unwrap();
        assert!(path.exists());
        plot_metric(&path, "G", Metric::Loss, &[1.0], &[1.1]).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
