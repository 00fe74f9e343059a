use crate::join::RateRange;
use crate::scale::{ColorScale, Rgb};

/// Vertical color ramp with min/max captions
#[derive(Clone, Debug)]
pub struct Legend {
    pub title: String,
    /// Swatch values from low to high with their fill
    pub swatches: Vec<(f64, Rgb)>,
    pub range: RateRange,
}

/// Percent with two decimals, as the legend captions show it
pub fn format_percent(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

impl Legend {
    /// Swatch `i` sits at `min + i * (max - min) / steps`
    pub fn new(scale: &ColorScale, steps: usize, title: &str) -> Self {
        let range = scale.range();
        let steps = steps.max(1);
        let swatches = (0..steps)
            .map(|i| {
                let v = range.min + i as f64 * (range.max - range.min) / steps as f64;
                (v, scale.color(Some(v)))
            })
            .collect();

        Self {
            title: title.to_string(),
            swatches,
            range,
        }
    }

    pub fn min_label(&self) -> String {
        format_percent(self.range.min)
    }

    pub fn max_label(&self) -> String {
        format_percent(self.range.max)
    }

    /// Pick `rows` swatches top (high) to bottom (low) for a bar of that height
    pub fn sample(&self, rows: usize) -> Vec<Rgb> {
        if rows == 0 || self.swatches.is_empty() {
            return Vec::new();
        }
        let last = self.swatches.len() - 1;
        (0..rows)
            .map(|row| {
                let from_bottom = rows - 1 - row;
                let idx = if rows == 1 { last } else { from_bottom * last / (rows - 1) };
                self.swatches[idx].1
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> ColorScale {
        ColorScale::new(
            RateRange { min: 0.01, max: 0.05 },
            Rgb::new(0, 128, 0),
            Rgb::new(255, 0, 0),
            Rgb::new(128, 128, 128),
        )
    }

    #[test]
    fn test_swatches_span_range() {
        let legend = Legend::new(&scale(), 500, "Death rate");
        assert_eq!(legend.swatches.len(), 500);
        assert_eq!(legend.swatches[0], (0.01, Rgb::new(0, 128, 0)));
        let (last, _) = legend.swatches[499];
        assert!(last < 0.05 && last > 0.0499);
        assert!(legend.swatches.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_labels() {
        let legend = Legend::new(&scale(), 10, "Death rate");
        assert_eq!(legend.min_label(), "1.00%");
        assert_eq!(legend.max_label(), "5.00%");
    }

    #[test]
    fn test_sample_is_high_on_top() {
        let legend = Legend::new(&scale(), 500, "Death rate");
        let bar = legend.sample(8);
        assert_eq!(bar.len(), 8);
        assert_eq!(bar[7], Rgb::new(0, 128, 0));
        assert!(bar[0].r > 250 && bar[0].g < 5);
        assert!(legend.sample(0).is_empty());
        assert_eq!(legend.sample(1).len(), 1);
    }
}
