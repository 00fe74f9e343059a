mod topojson;

pub use topojson::Topology;

use crate::config::{DataConfig, MapConfig};
use crate::map::project_features;
use csv::{ReaderBuilder, Trim};
use geo::MultiPolygon;
use geojson::GeoJson;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Failures loading either input. Any of these halts rendering.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("boundary source is not valid JSON")]
    Json(#[from] serde_json::Error),

    #[error("invalid TopoJSON")]
    TopoJson(#[from] simd_json::Error),

    #[error("invalid GeoJSON")]
    GeoJson(#[from] geojson::Error),

    #[error("topology has no object named {0:?}")]
    MissingObject(String),

    #[error("malformed topology: {0}")]
    Topology(String),

    #[error("boundary source contains no named polygon features")]
    NoFeatures,

    #[error("failed to parse metrics CSV")]
    Csv(#[from] csv::Error),

    #[error("metrics CSV has no {0:?} column")]
    MissingColumn(String),
}

/// One state's boundary in map-plane coordinates
#[derive(Clone, Debug)]
pub struct GeoFeature {
    pub id: Option<String>,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// One CSV row: the join key, the abbreviation, and every other column raw
#[derive(Clone, Debug, Default)]
pub struct SeasonalMetricRow {
    pub state: String,
    pub abbreviation: String,
    pub fields: HashMap<String, String>,
}

impl SeasonalMetricRow {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Both inputs, loaded once and reused by every render pass
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub features: Vec<GeoFeature>,
    pub rows: Vec<SeasonalMetricRow>,
}

/// Load boundaries and metrics. Both must succeed before anything renders.
pub fn load_dataset(data: &DataConfig, map: &MapConfig) -> Result<Dataset, LoadError> {
    let mut bytes = fetch_bytes(&data.topology, Duration::from_secs(data.fetch_timeout_secs))?;
    let mut features = parse_boundaries(&mut bytes, &data.topology_object, &data.name_property)?;
    project_features(&mut features, data.projection, map.width, map.height);
    info!(source = %data.topology, count = features.len(), "loaded state boundaries");

    let rows = load_metrics(&data.metrics, &data.name_column, &data.abbreviation_column)?;
    info!(path = ?data.metrics, count = rows.len(), "loaded seasonal metrics");

    Ok(Dataset { features, rows })
}

/// Read a resource from an http(s) URL or a local path
pub fn fetch_bytes(source: &str, timeout: Duration) -> Result<Vec<u8>, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let fetch_err = |e: reqwest::Error| LoadError::Fetch {
            url: source.to_string(),
            source: e,
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(fetch_err)?;
        let response = client
            .get(source)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        let body = response.bytes().map_err(fetch_err)?;
        return Ok(body.to_vec());
    }

    fs::read(source).map_err(|e| LoadError::Read {
        path: PathBuf::from(source),
        source: e,
    })
}

#[derive(Deserialize)]
struct Probe {
    #[serde(rename = "type")]
    kind: String,
}

/// Decode TopoJSON or GeoJSON polygon features.
/// `object` names the TopoJSON object and is ignored for GeoJSON.
pub fn parse_boundaries(bytes: &mut [u8], object: &str, name_property: &str) -> Result<Vec<GeoFeature>, LoadError> {
    let probe: Probe = serde_json::from_slice(bytes)?;

    let features = if probe.kind == "Topology" {
        Topology::from_slice(bytes)?.features(object, name_property)?
    } else {
        let text = std::str::from_utf8(bytes).map_err(|e| LoadError::Topology(e.to_string()))?;
        geojson_features(text.parse()?, name_property)
    };

    if features.is_empty() {
        return Err(LoadError::NoFeatures);
    }
    Ok(features)
}

fn geojson_features(geojson: GeoJson, name_property: &str) -> Vec<GeoFeature> {
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => return Vec::new(),
    };

    features
        .into_iter()
        .filter_map(|feature| {
            let name = feature
                .properties
                .as_ref()
                .and_then(|p| p.get(name_property))
                .and_then(|v| v.as_str())?
                .to_string();
            let id = feature.id.as_ref().map(|id| match id {
                geojson::feature::Id::String(s) => s.clone(),
                geojson::feature::Id::Number(n) => n.to_string(),
            });

            let geometry = match geo::Geometry::<f64>::try_from(feature.geometry?.value) {
                Ok(geo::Geometry::MultiPolygon(mp)) => mp,
                Ok(geo::Geometry::Polygon(p)) => MultiPolygon::new(vec![p]),
                Ok(_) => return None,
                Err(e) => {
                    warn!(%name, error = %e, "skipping unconvertible geometry");
                    return None;
                }
            };

            Some(GeoFeature { id, name, geometry })
        })
        .collect()
}

/// Load the seasonal metric CSV from disk
pub fn load_metrics(path: &Path, name_column: &str, abbreviation_column: &str) -> Result<Vec<SeasonalMetricRow>, LoadError> {
    let file = fs::File::open(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_metrics(file, name_column, abbreviation_column)
}

pub fn parse_metrics<R: Read>(
    reader: R,
    name_column: &str,
    abbreviation_column: &str,
) -> Result<Vec<SeasonalMetricRow>, LoadError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let name_idx = column(name_column)?;
    let abbr_idx = column(abbreviation_column)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let state = record.get(name_idx).unwrap_or("").to_string();
        if state.is_empty() {
            warn!(line = ?record.position().map(|p| p.line()), "skipping row without a state name");
            continue;
        }

        let fields = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| *i != name_idx && *i != abbr_idx)
            .map(|(_, (h, v))| (h.to_string(), v.to_string()))
            .collect();

        rows.push(SeasonalMetricRow {
            state,
            abbreviation: record.get(abbr_idx).unwrap_or("").to_string(),
            fields,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Write;

    const CSV: &str = "\
Province_State,Abbreviation,spring_rate,summer_rate,autumn_rate,winter_rate
New York,NY,0.05,0.01,0.004,0.012
Texas,TX,0.01,0.03,0.012,0.02
,XX,1,1,1,1
Guam,GU,,n/a,0.001,0.002
";

    #[test]
    fn test_parse_metrics() {
        let rows = parse_metrics(CSV.as_bytes(), "Province_State", "Abbreviation").unwrap();
        assert_eq!(rows.len(), 3, "nameless row is skipped");
        assert_eq!(rows[0].state, "New York");
        assert_eq!(rows[0].abbreviation, "NY");
        assert_eq!(rows[0].field("spring_rate"), Some("0.05"));
        assert_eq!(rows[0].field("Province_State"), None);
        assert_eq!(rows[2].field("spring_rate"), Some(""));
        assert_eq!(rows[2].field("fall_rate"), None);
    }

    #[test]
    fn test_missing_column() {
        let err = parse_metrics("State,Abbreviation\nOhio,OH\n".as_bytes(), "Province_State", "Abbreviation").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(c) if c == "Province_State"));
    }

    #[test]
    fn test_header_only_csv_is_empty_not_error() {
        let rows = parse_metrics("Province_State,Abbreviation,spring_rate\n".as_bytes(), "Province_State", "Abbreviation").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_geojson_boundaries() {
        let mut bytes = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 48, "properties": {"name": "Texas"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,4],[0,0]]]}},
                {"type": "Feature", "properties": {"name": "Pin"},
                 "geometry": {"type": "Point", "coordinates": [1, 1]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}
            ]
        }"#
        .to_vec();
        let features = parse_boundaries(&mut bytes, "states", "name").unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].name, "Texas");
        assert_eq!(features[0].id.as_deref(), Some("48"));
    }

    #[test]
    fn test_no_features_is_error() {
        let mut bytes = br#"{"type": "FeatureCollection", "features": []}"#.to_vec();
        assert!(matches!(parse_boundaries(&mut bytes, "states", "name"), Err(LoadError::NoFeatures)));
    }

    #[test]
    fn test_not_json() {
        let mut bytes = b"<html>404</html>".to_vec();
        assert!(matches!(parse_boundaries(&mut bytes, "states", "name"), Err(LoadError::Json(_))));
    }

    #[test]
    fn test_load_dataset_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let topo_path = dir.path().join("us.json");
        let csv_path = dir.path().join("rates.csv");

        fs::write(
            &topo_path,
            r#"{"type": "Topology",
                "objects": {"states": {"type": "GeometryCollection", "geometries": [
                    {"type": "Polygon", "id": "36", "arcs": [[0]], "properties": {"name": "New York"}}
                ]}},
                "arcs": [[[700, 100], [760, 100], [760, 160], [700, 160], [700, 100]]]}"#,
        )
        .unwrap();
        let mut csv = fs::File::create(&csv_path).unwrap();
        csv.write_all(CSV.as_bytes()).unwrap();

        let mut config = Config::default();
        config.data.topology = topo_path.to_string_lossy().into_owned();
        config.data.metrics = csv_path;

        let dataset = load_dataset(&config.data, &config.map).unwrap();
        assert_eq!(dataset.features.len(), 1);
        assert_eq!(dataset.features[0].name, "New York");
        assert_eq!(dataset.rows.len(), 3);
    }

    #[test]
    fn test_missing_files_report_read_error() {
        let mut config = Config::default();
        config.data.topology = "/nonexistent/us-10m.json".to_string();
        let err = load_dataset(&config.data, &config.map).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
        assert!(err.to_string().contains("us-10m.json"));
    }
}
