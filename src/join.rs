use std::collections::HashMap;

use crate::data::{GeoFeature, SeasonalMetricRow};

/// Smallest and largest parsed target value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateRange {
    pub min: f64,
    pub max: f64,
}

impl RateRange {
    /// Single linear scan. `None` when there are no values.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |range, v| {
            Some(match range {
                None => RateRange { min: v, max: v },
                Some(r) => RateRange {
                    min: r.min.min(v),
                    max: r.max.max(v),
                },
            })
        })
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// One geographic feature with whatever the metric table knows about it
#[derive(Clone, Debug, PartialEq)]
pub struct JoinedState<'a> {
    pub name: &'a str,
    pub abbreviation: Option<&'a str>,
    /// `None` when the table has no usable value for this name
    pub value: Option<f64>,
    pub feature: usize,
}

/// Lookups produced by joining boundaries and metrics on exact state name
#[derive(Clone, Debug, Default)]
pub struct JoinedData {
    values: HashMap<String, f64>,
    abbreviations: HashMap<String, String>,
    names_by_abbreviation: HashMap<String, String>,
    geometries: HashMap<String, usize>,
    feature_names: Vec<String>,
    range: Option<RateRange>,
}

/// Parse a metric cell, rejecting blanks, garbage and non-finite numbers
pub fn parse_rate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Join `rows` onto `features` for the column `field`.
///
/// Rows whose `field` cell is absent or unparsable contribute an
/// abbreviation but no value. Duplicate names or abbreviations keep the
/// last row.
pub fn join(features: &[GeoFeature], rows: &[SeasonalMetricRow], field: &str) -> JoinedData {
    let mut values = HashMap::with_capacity(rows.len());
    let mut abbreviations = HashMap::with_capacity(rows.len());
    let mut names_by_abbreviation = HashMap::with_capacity(rows.len());

    for row in rows {
        match row.field(field).and_then(parse_rate) {
            Some(v) => {
                values.insert(row.state.clone(), v);
            }
            None => tracing::debug!(state = %row.state, field, "no usable value"),
        }
        if !row.abbreviation.is_empty() {
            abbreviations.insert(row.state.clone(), row.abbreviation.clone());
            names_by_abbreviation.insert(row.abbreviation.clone(), row.state.clone());
        }
    }

    let geometries: HashMap<String, usize> = features
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.clone(), i))
        .collect();

    for name in geometries.keys().filter(|n| !values.contains_key(*n)) {
        tracing::warn!(state = %name, field, "boundary has no metric value");
    }
    for name in rows.iter().map(|r| &r.state).filter(|n| !geometries.contains_key(*n)) {
        tracing::warn!(state = %name, "metric row has no boundary");
    }

    let range = RateRange::of(values.values().copied());

    JoinedData {
        values,
        abbreviations,
        names_by_abbreviation,
        geometries,
        feature_names: features.iter().map(|f| f.name.clone()).collect(),
        range,
    }
}

impl JoinedData {
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn abbreviation_of(&self, name: &str) -> Option<&str> {
        self.abbreviations.get(name).map(String::as_str)
    }

    /// Index into the feature list the data was joined against
    pub fn geometry_of(&self, name: &str) -> Option<usize> {
        self.geometries.get(name).copied()
    }

    pub fn name_for_abbreviation(&self, abbreviation: &str) -> Option<&str> {
        self.names_by_abbreviation.get(abbreviation).map(String::as_str)
    }

    pub fn range(&self) -> Option<RateRange> {
        self.range
    }

    /// Every parsed value, in no particular order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.values().copied()
    }

    /// One entry per geographic feature, in feature order
    pub fn states(&self) -> impl Iterator<Item = JoinedState<'_>> + '_ {
        self.feature_names.iter().enumerate().map(|(feature, name)| JoinedState {
            name,
            abbreviation: self.abbreviation_of(name),
            value: self.value_of(name),
            feature,
        })
    }
}
