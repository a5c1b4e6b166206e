use serde::Serialize;

/// Traffic-volume bucket of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Mid,
    High,
}

impl Tier {
    /// Places an aggregate count relative to the two cut points.
    ///
    /// | Range                   | Tier |
    /// |-------------------------|------|
    /// | `> high`                | High |
    /// | `> low` and `<= high`   | Mid  |
    /// | `<= low`                | Low  |
    pub fn assign(aggregate: f64, low: f64, high: f64) -> Tier {
        match aggregate {
            a if a > high => Tier::High,
            a if a > low => Tier::Mid,
            _ => Tier::Low,
        }
    }

    /// Marker color: red carries the most trucks, green the fewest.
    pub fn color(self) -> &'static str {
        match self {
            Tier::Low => "green",
            Tier::Mid => "orange",
            Tier::High => "red",
        }
    }
}
