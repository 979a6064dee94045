//! Chart projection: turns a [`ChartSeries`] into something the line chart
//! widget can draw.

use crate::state::ChartSeries;

pub const CHART_TITLE: &str = "Price Trends by Year";
pub const SERIES_LABEL: &str = "Average Price Trend";

/// Everything needed to draw one line chart
#[derive(Debug, Clone, PartialEq)]
pub struct LineChartSpec {
    pub title: &'static str,
    pub series_label: &'static str,
    pub labels: Vec<String>,
    /// One `(index, value)` point per value.
    pub points: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

/// Project a series onto a line chart. `None` when there are no labels.
///
/// Label/value length mismatches are passed through untouched.
pub fn project_chart(series: &ChartSeries) -> Option<LineChartSpec> {
    if series.labels.is_empty() {
        return None;
    }

    let points: Vec<(f64, f64)> = series
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v))
        .collect();

    let span = series.labels.len().max(points.len());
    let x_bounds = [0.0, span.saturating_sub(1).max(1) as f64];

    Some(LineChartSpec {
        title: CHART_TITLE,
        series_label: SERIES_LABEL,
        labels: series.labels.clone(),
        points,
        x_bounds,
        y_bounds: value_bounds(&series.values),
    })
}

/// Padded min/max of the values, so the line doesn't sit on the frame.
fn value_bounds(values: &[f64]) -> [f64; 2] {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !min.is_finite() {
        return [0.0, 1.0];
    }
    if min == max {
        return [min - 1.0, max + 1.0];
    }

    let pad = (max - min) * 0.1;
    [min - pad, max + pad]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(labels: &[&str], values: &[f64]) -> ChartSeries {
        ChartSeries {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn projects_one_point_per_value() {
        let spec = project_chart(&series(&["2021", "2022", "2023"], &[50.0, 58.0, 65.0])).unwrap();
        assert_eq!(spec.labels.len(), 3);
        assert_eq!(spec.points, vec![(0.0, 50.0), (1.0, 58.0), (2.0, 65.0)]);
        assert_eq!(spec.x_bounds, [0.0, 2.0]);
        assert!(spec.y_bounds[0] < 50.0 && spec.y_bounds[1] > 65.0);
        assert_eq!(spec.title, "Price Trends by Year");
    }

    #[test]
    fn no_labels_means_no_chart() {
        assert!(project_chart(&series(&[], &[1.0, 2.0])).is_none());
        assert!(project_chart(&ChartSeries::default()).is_none());
    }

    #[test]
    fn length_mismatch_passes_through() {
        let spec = project_chart(&series(&["2021", "2022", "2023"], &[50.0])).unwrap();
        assert_eq!(spec.labels.len(), 3);
        assert_eq!(spec.points.len(), 1);
        assert_eq!(spec.x_bounds, [0.0, 2.0]);
    }

    #[test]
    fn flat_or_missing_values_get_usable_bounds() {
        assert_eq!(value_bounds(&[]), [0.0, 1.0]);
        assert_eq!(value_bounds(&[5.0, 5.0]), [4.0, 6.0]);
        assert_eq!(value_bounds(&[f64::NAN]), [0.0, 1.0]);
    }
}
