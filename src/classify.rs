//! Classification rules shared by the SQL the catalog emits and the styling
//! the visualization builder applies, so both sides agree on every row.

use serde::Serialize;
use strum::{Display, EnumString};

/// Points in a cell at or above this count are high density
pub const HIGH_DENSITY_MIN: i64 = 3;
/// Points in a cell at or above this count (and below high) are medium
pub const MEDIUM_DENSITY_MIN: i64 = 2;

/// Neighbor count at or above which a point is a core point
pub const CORE_MIN_NEIGHBORS: i64 = 3;
/// Neighbor count at or above which a point is a border point
pub const BORDER_MIN_NEIGHBORS: i64 = 2;

/// Standard deviations above the mean for "isolated"
pub const ISOLATED_SIGMA: f64 = 2.0;
/// Standard deviations above the mean for "somewhat isolated"
pub const SOMEWHAT_ISOLATED_SIGMA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum Density {
    High,
    Medium,
    Low,
}

impl Density {
    pub fn from_count(count: i64) -> Self {
        if count >= HIGH_DENSITY_MIN {
            Density::High
        } else if count >= MEDIUM_DENSITY_MIN {
            Density::Medium
        } else {
            Density::Low
        }
    }

    /// SQL `CASE` expression that yields the same labels as `from_count`
    pub fn sql_case(column: &str) -> String {
        format!(
            "CASE\n        WHEN {col} >= {high} THEN '{h}'\n        WHEN {col} >= {medium} THEN '{m}'\n        ELSE '{l}'\n    END",
            col = column,
            high = HIGH_DENSITY_MIN,
            medium = MEDIUM_DENSITY_MIN,
            h = Density::High,
            m = Density::Medium,
            l = Density::Low,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum ClusterRole {
    Core,
    Border,
    Noise,
}

impl ClusterRole {
    pub fn from_neighbors(neighbors: i64) -> Self {
        if neighbors >= CORE_MIN_NEIGHBORS {
            ClusterRole::Core
        } else if neighbors >= BORDER_MIN_NEIGHBORS {
            ClusterRole::Border
        } else {
            ClusterRole::Noise
        }
    }

    pub fn sql_case(column: &str) -> String {
        format!(
            "CASE\n        WHEN {col} >= {core} THEN '{c}'\n        WHEN {col} >= {border} THEN '{b}'\n        ELSE '{n}'\n    END",
            col = column,
            core = CORE_MIN_NEIGHBORS,
            border = BORDER_MIN_NEIGHBORS,
            c = ClusterRole::Core,
            b = ClusterRole::Border,
            n = ClusterRole::Noise,
        )
    }

    pub fn color(self) -> &'static str {
        match self {
            ClusterRole::Core => "#FF5722",
            ClusterRole::Border => "#FFC107",
            ClusterRole::Noise => "#9E9E9E",
        }
    }

    pub fn radius(self) -> u32 {
        match self {
            ClusterRole::Core => 12,
            ClusterRole::Border => 8,
            ClusterRole::Noise => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
pub enum Isolation {
    #[strum(serialize = "isolated")]
    Isolated,
    #[strum(serialize = "somewhat isolated")]
    SomewhatIsolated,
    #[strum(serialize = "normal")]
    Normal,
}

impl Isolation {
    /// Inclusive comparison: a distance equal to a threshold is flagged.
    /// A run without spread (`stddev == 0`) is entirely normal.
    pub fn classify(distance: f64, mean: f64, stddev: f64) -> Self {
        if stddev <= 0.0 {
            Isolation::Normal
        } else if distance >= mean + stddev * ISOLATED_SIGMA {
            Isolation::Isolated
        } else if distance >= mean + stddev * SOMEWHAT_ISOLATED_SIGMA {
            Isolation::SomewhatIsolated
        } else {
            Isolation::Normal
        }
    }

    /// SQL `CASE` over a distance column and the `avg_dist`/`std_dist`
    /// columns of the statistics relation aliased `stats_alias`
    pub fn sql_case(distance: &str, stats_alias: &str) -> String {
        format!(
            "CASE\n        WHEN {s}.std_dist > 0 AND {d} >= {s}.avg_dist + {s}.std_dist * {iso} THEN '{i}'\n        WHEN {s}.std_dist > 0 AND {d} >= {s}.avg_dist + {s}.std_dist * {some} THEN '{w}'\n        ELSE '{n}'\n    END",
            d = distance,
            s = stats_alias,
            iso = ISOLATED_SIGMA,
            some = SOMEWHAT_ISOLATED_SIGMA,
            i = Isolation::Isolated,
            w = Isolation::SomewhatIsolated,
            n = Isolation::Normal,
        )
    }
}

/// Mean and population standard deviation
pub fn mean_and_stddev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Classify every nearest-neighbor distance against the statistics of the
/// whole run
pub fn classify_isolation(distances: &[f64]) -> Vec<Isolation> {
    match mean_and_stddev(distances) {
        Some((mean, stddev)) => distances
            .iter()
            .map(|d| Isolation::classify(*d, mean, stddev))
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_thresholds() {
        assert_eq!(Density::from_count(5), Density::High);
        assert_eq!(Density::from_count(3), Density::High);
        assert_eq!(Density::from_count(2), Density::Medium);
        assert_eq!(Density::from_count(1), Density::Low);
        assert_eq!(Density::High.to_string(), "high");
    }

    #[test]
    fn test_cluster_roles() {
        assert_eq!(ClusterRole::from_neighbors(4), ClusterRole::Core);
        assert_eq!(ClusterRole::from_neighbors(2), ClusterRole::Border);
        assert_eq!(ClusterRole::from_neighbors(0), ClusterRole::Noise);
        assert_eq!(ClusterRole::Core.radius(), 12);
    }

    #[test]
    fn test_isolation_boundary_is_inclusive() {
        let distances = [100.0, 100.0, 100.0, 100.0, 1000.0];
        let (mean, stddev) = mean_and_stddev(&distances).unwrap();
        assert_eq!(mean, 280.0);
        assert_eq!(stddev, 360.0);

        let classes = classify_isolation(&distances);
        assert_eq!(classes[4], Isolation::Isolated);
        assert!(classes[..4].iter().all(|c| *c == Isolation::Normal));
    }

    #[test]
    fn test_isolation_labels_round_trip() {
        assert_eq!(Isolation::SomewhatIsolated.to_string(), "somewhat isolated");
        assert_eq!(
            "somewhat isolated".parse::<Isolation>().unwrap(),
            Isolation::SomewhatIsolated
        );
    }

    #[test]
    fn test_sql_case_mentions_thresholds() {
        let sql = Density::sql_case("count");
        assert!(sql.contains("WHEN count >= 3 THEN 'high'"));
        assert!(sql.contains("WHEN count >= 2 THEN 'medium'"));
        let sql = Isolation::sql_case("nd.nearest_m", "s");
        assert!(sql.contains(
            "WHEN s.std_dist > 0 AND nd.nearest_m >= s.avg_dist + s.std_dist * 2 THEN 'isolated'"
        ));
        assert!(sql.contains(
            "WHEN s.std_dist > 0 AND nd.nearest_m >= s.avg_dist + s.std_dist * 1 THEN 'somewhat isolated'"
        ));
    }

    #[test]
    fn test_uniform_distances_are_normal() {
        assert_eq!(
            classify_isolation(&[250.0, 250.0]),
            vec![Isolation::Normal, Isolation::Normal]
        );
        assert!(classify_isolation(&[100.0; 3])
            .iter()
            .all(|c| *c == Isolation::Normal));
        assert_eq!(Isolation::classify(100.0, 100.0, 0.0), Isolation::Normal);
    }

    #[test]
    fn test_empty_distances() {
        assert!(classify_isolation(&[]).is_empty());
    }
}
