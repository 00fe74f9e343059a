use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::scale::Rgb;

/// Errors reading or validating the TOML configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML configuration")]
    Parse(#[from] toml::de::Error),

    #[error("invalid color {0:?} (expected #rrggbb, #rgb or a CSS color name)")]
    Color(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub map: MapConfig,
    pub legend: LegendConfig,
}

/// How input coordinates relate to the map frame
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    /// Coordinates are already projected into the frame (us-10m.v2.json)
    #[default]
    Identity,
    /// Coordinates are lon/lat and get Web Mercator projected, then fit
    Mercator,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    /// URL or path of the boundary TopoJSON/GeoJSON
    pub topology: String,
    /// Object inside the topology holding the state geometries
    pub topology_object: String,
    /// Feature property carrying the state name
    pub name_property: String,
    /// Path of the seasonal metric CSV
    pub metrics: PathBuf,
    pub name_column: String,
    pub abbreviation_column: String,
    pub projection: ProjectionKind,
    pub fetch_timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            topology: "https://d3js.org/us-10m.v2.json".to_string(),
            topology_object: "states".to_string(),
            name_property: "name".to_string(),
            metrics: PathBuf::from("data/Covid_per_season_per_state.csv"),
            name_column: "Province_State".to_string(),
            abbreviation_column: "Abbreviation".to_string(),
            projection: ProjectionKind::Identity,
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// Map frame width in map-plane units
    pub width: f64,
    pub height: f64,
    /// Base transform applied under every zoom/pan
    pub initial_scale: f64,
    pub initial_translate: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub low_color: String,
    pub high_color: String,
    pub missing_color: String,
    pub outline_color: String,
    /// Abbreviations that get no centroid label
    pub label_skip: Vec<String>,
    /// Delay before annotations reappear after a reset
    pub annotation_reveal_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 600.0,
            initial_scale: 0.75,
            initial_translate: 100.0,
            min_zoom: 0.5,
            max_zoom: 6.0,
            low_color: "green".to_string(),
            high_color: "red".to_string(),
            missing_color: "#808080".to_string(),
            outline_color: "#202020".to_string(),
            label_skip: vec!["DC".to_string()],
            annotation_reveal_ms: 1000,
        }
    }
}

/// Colors resolved from the map section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub low: Rgb,
    pub high: Rgb,
    pub missing: Rgb,
    pub outline: Rgb,
}

impl MapConfig {
    pub fn palette(&self) -> Result<Palette, ConfigError> {
        let parse = |s: &String| Rgb::parse(s).ok_or_else(|| ConfigError::Color(s.clone()));
        Ok(Palette {
            low: parse(&self.low_color)?,
            high: parse(&self.high_color)?,
            missing: parse(&self.missing_color)?,
            outline: parse(&self.outline_color)?,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LegendConfig {
    pub steps: usize,
    pub title: String,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            steps: 500,
            title: "Death rate".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        // Fail on bad colors at startup rather than mid-render
        config.map.palette()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.map.width, 960.0);
        assert_eq!(config.map.height, 600.0);
        assert_eq!(config.map.initial_scale, 0.75);
        assert_eq!(config.map.initial_translate, 100.0);
        assert_eq!((config.map.min_zoom, config.map.max_zoom), (0.5, 6.0));
        assert_eq!(config.legend.steps, 500);
        assert_eq!(config.map.label_skip, vec!["DC".to_string()]);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r##"
            [data]
            metrics = "rates.csv"
            projection = "mercator"

            [map]
            high_color = "#ff8800"
            "##,
        )
        .unwrap();
        assert_eq!(config.data.metrics, PathBuf::from("rates.csv"));
        assert_eq!(config.data.projection, ProjectionKind::Mercator);
        assert_eq!(config.data.name_column, "Province_State");
        assert_eq!(config.map.palette().unwrap().high, Rgb::new(255, 136, 0));
        assert_eq!(config.legend.title, "Death rate");
    }

    #[test]
    fn test_bad_color_rejected() {
        let err = Config::from_toml("[map]\nlow_color = \"chartreuse-ish\"").unwrap_err();
        assert!(matches!(err, ConfigError::Color(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_from_file(Path::new("/nonexistent/season-map.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
