use std::fmt;

/// One of the four seasons the metric CSV carries a rate column for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    /// CSV column holding this season's rate
    pub fn field(self) -> &'static str {
        match self {
            Season::Spring => "spring_rate",
            Season::Summer => "summer_rate",
            Season::Autumn => "autumn_rate",
            Season::Winter => "winter_rate",
        }
    }

    /// Exact match against the four rate column names
    pub fn from_field(field: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.field() == field)
    }

    /// Position in `ALL`, used to index per-season tables
    pub fn index(self) -> usize {
        self as usize
    }

    /// Next season in calendar order (wraps winter → spring)
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        };
        f.write_str(name)
    }
}

/// The metric column selected for a render pass.
///
/// Any string is accepted; only the four rate columns map to a season.
/// An unrecognized field still renders (with no annotation overlay), and
/// if the CSV has no such column every state shows as missing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub field: String,
    pub season: Option<Season>,
}

impl Target {
    pub fn parse(field: &str) -> Self {
        Self {
            field: field.to_string(),
            season: Season::from_field(field),
        }
    }

    pub fn season(season: Season) -> Self {
        Self {
            field: season.field().to_string(),
            season: Some(season),
        }
    }

    /// Human-readable title for the map border
    pub fn title(&self) -> String {
        match self.season {
            Some(season) => format!("{season} death rate"),
            None => self.field.clone(),
        }
    }
}
