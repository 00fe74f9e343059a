use geo::{BoundingRect, MapCoordsInPlace};
use glam::DVec2;
use std::f64::consts::PI;

use crate::config::{MapConfig, ProjectionKind};
use crate::data::GeoFeature;

/// Zoom step for keys and the scroll wheel
pub const ZOOM_STEP: f64 = 1.5;

/// Maps map-plane coordinates to canvas pixels.
///
/// A point `p` is drawn at `k * base_scale * (p + base_translate) + offset`
/// inside a `frame`-sized box, which is then fit (aspect preserved,
/// centered) into the `width` x `height` pixel canvas. `k` and `offset`
/// are the interactive zoom transform; the base transform never changes.
#[derive(Clone, Debug)]
pub struct Viewport {
    pub k: f64,
    pub offset: DVec2,
    pub base_scale: f64,
    pub base_translate: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub frame: DVec2,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(config: &MapConfig, width: usize, height: usize) -> Self {
        Self {
            k: 1.0,
            offset: DVec2::ZERO,
            base_scale: config.initial_scale,
            base_translate: config.initial_translate,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            frame: DVec2::new(config.width, config.height),
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Pixels per frame unit, and the margin centering the frame
    fn fit(&self) -> (f64, DVec2) {
        let canvas = DVec2::new(self.width as f64, self.height as f64);
        let fit = (canvas.x / self.frame.x).min(canvas.y / self.frame.y).max(f64::EPSILON);
        (fit, (canvas - self.frame * fit) / 2.0)
    }

    fn to_frame(&self, p: DVec2) -> DVec2 {
        (p + DVec2::splat(self.base_translate)) * self.base_scale * self.k + self.offset
    }

    /// Project a map-plane point to fractional canvas pixels
    pub fn project_f(&self, x: f64, y: f64) -> DVec2 {
        let (fit, margin) = self.fit();
        self.to_frame(DVec2::new(x, y)) * fit + margin
    }

    /// Project a map-plane point to canvas pixels
    pub fn project(&self, x: f64, y: f64) -> (i32, i32) {
        let p = self.project_f(x, y);
        (p.x.floor() as i32, p.y.floor() as i32)
    }

    /// Canvas pixel back to map-plane coordinates
    pub fn unproject(&self, px: f64, py: f64) -> (f64, f64) {
        let (fit, margin) = self.fit();
        let frame = (DVec2::new(px, py) - margin) / fit;
        let p = (frame - self.offset) / (self.k * self.base_scale) - DVec2::splat(self.base_translate);
        (p.x, p.y)
    }

    /// Pan the view by a pixel delta (content moves the opposite way)
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let (fit, _) = self.fit();
        self.offset -= DVec2::new(dx as f64, dy as f64) / fit;
    }

    /// Scale by `factor` (clamped to the zoom extent) keeping the point
    /// under (px, py) fixed
    pub fn zoom_at(&mut self, px: f64, py: f64, factor: f64) {
        let new_k = (self.k * factor).clamp(self.min_zoom, self.max_zoom);
        let (fit, margin) = self.fit();
        let anchor = (DVec2::new(px, py) - margin) / fit;
        self.offset = anchor - (anchor - self.offset) * (new_k / self.k);
        self.k = new_k;
    }

    /// Back to the identity zoom transform
    pub fn reset(&mut self) {
        self.k = 1.0;
        self.offset = DVec2::ZERO;
    }

    pub fn is_identity(&self) -> bool {
        self.k == 1.0 && self.offset == DVec2::ZERO
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

/// Web Mercator, normalized to [0, 1] with y growing southwards
fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-85.05, 85.05);
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat * PI / 180.0;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// Bring loaded features into the map plane. Lon/lat input is projected
/// and fit into the `width` x `height` frame; pre-projected input is left
/// as is.
pub fn project_features(features: &mut [GeoFeature], kind: ProjectionKind, width: f64, height: f64) {
    if kind == ProjectionKind::Identity {
        return;
    }

    for feature in features.iter_mut() {
        feature.geometry.map_coords_in_place(|c| {
            let (x, y) = mercator(c.x, c.y);
            geo::coord! { x: x, y: y }
        });
    }

    let Some(bounds) = features
        .iter()
        .filter_map(|f| f.geometry.bounding_rect())
        .reduce(|a, b| {
            geo::Rect::new(
                geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
    else {
        return;
    };

    let scale = (width / bounds.width()).min(height / bounds.height());
    if !scale.is_finite() {
        return;
    }
    let offset_x = (width - bounds.width() * scale) / 2.0 - bounds.min().x * scale;
    let offset_y = (height - bounds.height() * scale) / 2.0 - bounds.min().y * scale;

    for feature in features.iter_mut() {
        feature.geometry.map_coords_in_place(|c| geo::coord! { x: c.x * scale + offset_x, y: c.y * scale + offset_y });
    }
}
