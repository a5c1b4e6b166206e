//! Percentile-based traffic classification.
//!
//! Sites are split into three tiers using the 33rd and 67th percentiles of
//! their aggregate counts under the current class selection. Thresholds are
//! derived on every call from the sites passed in; nothing is cached.

pub mod tier;
pub mod utility;

pub use tier::Tier;

use serde::Serialize;

use crate::classify::utility::quantile;
use crate::model::{ClassSelection, TrafficSite};

/// Percentile of the lower cut point.
pub const LOW_QUANTILE: f64 = 0.33;
/// Percentile of the upper cut point.
pub const HIGH_QUANTILE: f64 = 0.67;

/// Per-site aggregates and tiers, index-aligned with the input sites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub aggregates: Vec<u64>,
    pub tiers: Vec<Tier>,
    pub low_threshold: f64,
    pub high_threshold: f64,
}

impl Classification {
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tier_of(&self, index: usize) -> Option<Tier> {
        self.tiers.get(index).copied()
    }

    pub fn aggregate_of(&self, index: usize) -> Option<u64> {
        self.aggregates.get(index).copied()
    }

    /// Number of sites in `tier`.
    pub fn count(&self, tier: Tier) -> usize {
        self.tiers.iter().filter(|t| **t == tier).count()
    }
}

/// Classifies `sites` under `selection`. Empty input yields zero thresholds.
pub fn classify(sites: &[TrafficSite], selection: &ClassSelection) -> Classification {
    let aggregates: Vec<u64> = sites
        .iter()
        .map(|s| selection.aggregate(&s.counts))
        .collect();

    let values: Vec<f64> = aggregates.iter().map(|a| *a as f64).collect();
    let low_threshold = quantile(&values, LOW_QUANTILE);
    let high_threshold = quantile(&values, HIGH_QUANTILE);

    let tiers = values
        .iter()
        .map(|v| Tier::assign(*v, low_threshold, high_threshold))
        .collect();

    Classification {
        aggregates,
        tiers,
        low_threshold,
        high_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassCounts, Coordinate, SiteDescriptor, VehicleClass};

    fn site(n: u32, class3: u64, class9: u64) -> TrafficSite {
        TrafficSite {
            site: SiteDescriptor {
                site_number: n.to_string(),
                road_name: format!("Road {n}"),
                location_desc: "Somewhere".to_string(),
                road_dir: "Both".to_string(),
                location: Coordinate::new(-31.0, 116.0),
            },
            counts: ClassCounts {
                class3,
                class9,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_three_sites_low_mid_high() {
        let sites = vec![site(1, 10, 0), site(2, 50, 0), site(3, 90, 0)];
        let c = classify(&sites, &ClassSelection::all());

        assert!((c.low_threshold - 36.4).abs() < 1e-9);
        assert!((c.high_threshold - 63.6).abs() < 1e-9);
        assert_eq!(c.tiers, vec![Tier::Low, Tier::Mid, Tier::High]);
    }

    #[test]
    fn test_empty_input() {
        let c = classify(&[], &ClassSelection::all());
        assert!(c.is_empty());
        assert_eq!(c.low_threshold, 0.0);
        assert_eq!(c.high_threshold, 0.0);
    }

    #[test]
    fn test_single_site_is_low() {
        let c = classify(&[site(1, 7, 3)], &ClassSelection::all());
        assert_eq!(c.low_threshold, 10.0);
        assert_eq!(c.high_threshold, 10.0);
        assert_eq!(c.tiers, vec![Tier::Low]);
    }

    #[test]
    fn test_partition_is_total_and_ordered() {
        let sites: Vec<_> = (0..25u32)
            .map(|i| site(i, u64::from(i * 7 % 11), u64::from(i * 13 % 17)))
            .collect();
        let c = classify(&sites, &ClassSelection::all());

        assert_eq!(c.len(), sites.len());
        assert_eq!(
            c.count(Tier::Low) + c.count(Tier::Mid) + c.count(Tier::High),
            sites.len()
        );
        assert!(c.high_threshold >= c.low_threshold);
    }

    #[test]
    fn test_selection_changes_thresholds_without_mutating_sites() {
        let sites = vec![site(1, 100, 1), site(2, 1, 100), site(3, 50, 50)];
        let before = sites.clone();

        let all = classify(&sites, &ClassSelection::all());
        let heavy: ClassSelection = [VehicleClass::Class9].into_iter().collect();
        let filtered = classify(&sites, &heavy);

        assert_eq!(sites, before);
        assert_eq!(filtered.aggregates, vec![1, 100, 50]);
        assert_eq!(filtered.tier_of(1), Some(Tier::High));
        assert_eq!(filtered.tier_of(0), Some(Tier::Low));
        assert_ne!(all.tiers, filtered.tiers);
    }
}
