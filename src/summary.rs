use serde::Serialize;

use crate::model::{TrafficSite, VehicleClass};

/// Fleet-wide count for one vehicle class across every site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassTotal {
    pub class: VehicleClass,
    pub label: String,
    pub total: u64,
}

/// Sums each vehicle class over all sites, in class order.
pub fn class_totals(sites: &[TrafficSite]) -> Vec<ClassTotal> {
    VehicleClass::ALL
        .into_iter()
        .map(|class| ClassTotal {
            class,
            label: class.label(),
            total: sites.iter().map(|s| s.counts.get(class)).sum(),
        })
        .collect()
}

pub fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Formats an integer with `,` thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassCounts, Coordinate, SiteDescriptor};

    fn site(counts: ClassCounts) -> TrafficSite {
        TrafficSite {
            site: SiteDescriptor {
                site_number: "1".to_string(),
                road_name: "Brand Hwy".to_string(),
                location_desc: "North of Muchea".to_string(),
                road_dir: "Both".to_string(),
                location: Coordinate::new(-31.5, 115.9),
            },
            counts,
        }
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_class_totals_sum_all_sites() {
        let sites = vec![
            site(ClassCounts {
                class3: 5,
                class10: 2,
                ..Default::default()
            }),
            site(ClassCounts {
                class3: 1,
                class8: 7,
                ..Default::default()
            }),
        ];
        let totals = class_totals(&sites);

        assert_eq!(totals.len(), 8);
        assert_eq!(totals[0].label, "Class 3");
        assert_eq!(totals[0].total, 6);
        assert_eq!(totals[5].class, VehicleClass::Class8);
        assert_eq!(totals[5].total, 7);
        assert_eq!(totals[7].total, 2);
    }

    #[test]
    fn test_class_totals_empty() {
        assert!(class_totals(&[]).iter().all(|t| t.total == 0));
    }
}
