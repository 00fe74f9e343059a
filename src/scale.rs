use crate::join::RateRange;

/// 24-bit color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `#rgb` or one of a handful of CSS color names
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            // from_str_radix would also take a sign
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            return match hex.len() {
                6 => {
                    let v = u32::from_str_radix(hex, 16).ok()?;
                    Some(Self::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
                }
                3 => {
                    let v = u16::from_str_radix(hex, 16).ok()?;
                    let expand = |n: u16| (n as u8 & 0xf) * 0x11;
                    Some(Self::new(expand(v >> 8), expand(v >> 4), expand(v)))
                }
                _ => None,
            };
        }

        let named = match s.to_ascii_lowercase().as_str() {
            "black" => Self::new(0, 0, 0),
            "white" => Self::new(255, 255, 255),
            "gray" | "grey" => Self::new(128, 128, 128),
            "red" => Self::new(255, 0, 0),
            "green" => Self::new(0, 128, 0),
            "blue" => Self::new(0, 0, 255),
            "yellow" => Self::new(255, 255, 0),
            "orange" => Self::new(255, 165, 0),
            "purple" => Self::new(128, 0, 128),
            "steelblue" => Self::new(70, 130, 180),
            _ => return None,
        };
        Some(named)
    }

    /// Channel-wise linear interpolation, `t` in [0, 1]
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Black or white, whichever reads better on top of this color
    pub fn contrasting(self) -> Rgb {
        let luma = 0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64;
        if luma > 140.0 {
            Rgb::new(0, 0, 0)
        } else {
            Rgb::new(255, 255, 255)
        }
    }
}

/// Linear map from a rate range onto a two-color gradient.
///
/// Out-of-range values clamp to the endpoint colors; missing or NaN
/// values get the neutral `missing` color.
#[derive(Clone, Copy, Debug)]
pub struct ColorScale {
    range: RateRange,
    low: Rgb,
    high: Rgb,
    missing: Rgb,
}

impl ColorScale {
    pub fn new(range: RateRange, low: Rgb, high: Rgb, missing: Rgb) -> Self {
        Self {
            range,
            low,
            high,
            missing,
        }
    }

    pub fn range(&self) -> RateRange {
        self.range
    }

    /// Interpolation position of `value` in [0, 1], `None` for NaN
    pub fn position(&self, value: f64) -> Option<f64> {
        if value.is_nan() {
            return None;
        }
        let span = self.range.max - self.range.min;
        if span <= 0.0 {
            // Degenerate domain: everything sits on the low end
            return Some(if value > self.range.max { 1.0 } else { 0.0 });
        }
        Some(((value - self.range.min) / span).clamp(0.0, 1.0))
    }

    pub fn color(&self, value: Option<f64>) -> Rgb {
        match value.and_then(|v| self.position(v)) {
            Some(t) if t <= 0.0 => self.low,
            Some(t) if t >= 1.0 => self.high,
            Some(t) => self.low.lerp(self.high, t),
            None => self.missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: Rgb = Rgb::new(0, 128, 0);
    const HIGH: Rgb = Rgb::new(255, 0, 0);
    const GRAY: Rgb = Rgb::new(128, 128, 128);

    fn scale(min: f64, max: f64) -> ColorScale {
        ColorScale::new(RateRange { min, max }, LOW, HIGH, GRAY)
    }

    #[test]
    fn test_parse_colors() {
        assert_eq!(Rgb::parse("green"), Some(LOW));
        assert_eq!(Rgb::parse("#FF0000"), Some(HIGH));
        assert_eq!(Rgb::parse("#888"), Some(Rgb::new(0x88, 0x88, 0x88)));
        assert_eq!(Rgb::parse("#12345"), None);
        assert_eq!(Rgb::parse("mauve-ish"), None);
        assert_eq!(Rgb::parse("#+ffff0"), None);
        assert_eq!(Rgb::parse("#+ff"), None);
        assert_eq!(Rgb::parse("#-12"), None);
    }

    #[test]
    fn test_endpoints_exact() {
        let cs = scale(0.01, 0.05);
        assert_eq!(cs.color(Some(0.01)), LOW);
        assert_eq!(cs.color(Some(0.05)), HIGH);
    }

    #[test]
    fn test_clamps_outside_domain() {
        let cs = scale(0.01, 0.05);
        assert_eq!(cs.color(Some(-3.0)), LOW);
        assert_eq!(cs.color(Some(0.0)), LOW);
        assert_eq!(cs.color(Some(0.5)), HIGH);
        assert_eq!(cs.color(Some(f64::INFINITY)), HIGH);
        assert_eq!(cs.color(Some(f64::NEG_INFINITY)), LOW);
    }

    #[test]
    fn test_missing_is_gray() {
        let cs = scale(0.01, 0.05);
        assert_eq!(cs.color(None), GRAY);
        assert_eq!(cs.color(Some(f64::NAN)), GRAY);
    }

    #[test]
    fn test_monotonic_position() {
        let cs = scale(0.002, 0.031);
        let mut prev = cs.position(0.002).unwrap();
        for i in 1..=200 {
            let v = 0.002 + (0.031 - 0.002) * i as f64 / 200.0;
            let t = cs.position(v).unwrap();
            assert!(t >= prev, "position went backwards at {v}");
            prev = t;
        }
        assert!((prev - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_midpoint_blend() {
        let cs = scale(0.0, 1.0);
        assert_eq!(cs.color(Some(0.5)), Rgb::new(128, 64, 0));
    }

    #[test]
    fn test_degenerate_range() {
        let cs = scale(0.02, 0.02);
        assert_eq!(cs.color(Some(0.02)), LOW);
        assert_eq!(cs.color(Some(0.03)), HIGH);
    }
}
