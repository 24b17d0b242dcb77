//! The configured harvest job catalog and the priority corridors watched by
//! the signal feed and the arbitrage scanner.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::domain::{HarvestJob, TradeType};

/// A (commodity, origin group, port pair) route watched for flow and basis
/// signals.
#[derive(Debug, Clone, Serialize)]
pub struct Corridor {
    pub name: &'static str,
    /// HCT identifier of the commodity moving on this corridor
    pub commodity: &'static str,
    pub origins: Vec<&'static str>,
    pub origin_port: &'static str,
    pub dest_port: &'static str,
}

static HARVEST_JOBS: Lazy<Vec<HarvestJob>> = Lazy::new(|| {
    vec![
        HarvestJob::new("rcn_india_imports", TradeType::Import, "INDIA", vec![801], 30, 1)
            .with_origins(&["IVORY COAST", "GHANA", "TANZANIA", "GUINEA BISSAU", "BENIN"]),
        HarvestJob::new("rcn_vietnam_imports", TradeType::Import, "VIETNAM", vec![801], 30, 1)
            .with_origins(&["IVORY COAST", "GHANA", "NIGERIA", "TANZANIA"]),
        HarvestJob::new("kernel_india_exports", TradeType::Export, "INDIA", vec![801], 30, 1),
        HarvestJob::new("kernel_vietnam_exports", TradeType::Export, "VIETNAM", vec![801], 30, 2),
        HarvestJob::new("sesame_india_exports", TradeType::Export, "INDIA", vec![1207], 30, 1),
        HarvestJob::new("sesame_nigeria_exports", TradeType::Export, "NIGERIA", vec![1207], 45, 1)
            .with_destinations(&["CHINA", "JAPAN", "TURKEY"]),
        HarvestJob::new("sesame_ethiopia_exports", TradeType::Export, "ETHIOPIA", vec![1207], 45, 2),
        HarvestJob::new("rice_india_exports", TradeType::Export, "INDIA", vec![1006], 30, 1)
            .with_destinations(&["NIGERIA", "BENIN", "SENEGAL", "IVORY COAST", "GHANA"]),
        HarvestJob::new("soybean_nigeria_exports", TradeType::Export, "NIGERIA", vec![1201], 45, 2),
        HarvestJob::new("cocoa_india_imports", TradeType::Import, "INDIA", vec![1801], 60, 2)
            .with_origins(&["IVORY COAST", "GHANA", "NIGERIA"]),
    ]
});

static PRIORITY_CORRIDORS: Lazy<Vec<Corridor>> = Lazy::new(|| {
    vec![
        Corridor {
            name: "West Africa RCN → India",
            commodity: "HCT-0801-RCN-INSHELL",
            origins: vec!["IVORY COAST", "GHANA", "BENIN", "GUINEA BISSAU"],
            origin_port: "ABIDJAN",
            dest_port: "TUTICORIN",
        },
        Corridor {
            name: "East Africa RCN → India",
            commodity: "HCT-0801-RCN-INSHELL",
            origins: vec!["TANZANIA", "MOZAMBIQUE"],
            origin_port: "DAR ES SALAAM",
            dest_port: "TUTICORIN",
        },
        Corridor {
            name: "West Africa RCN → Vietnam",
            commodity: "HCT-0801-RCN-INSHELL",
            origins: vec!["IVORY COAST", "GHANA"],
            origin_port: "ABIDJAN",
            dest_port: "HO CHI MINH",
        },
        Corridor {
            name: "Nigeria Sesame → China",
            commodity: "HCT-1207-SESAME",
            origins: vec!["NIGERIA"],
            origin_port: "LAGOS",
            dest_port: "TIANJIN",
        },
        Corridor {
            name: "Ethiopia Sesame → Asia",
            commodity: "HCT-1207-SESAME",
            origins: vec!["ETHIOPIA", "SUDAN"],
            origin_port: "DJIBOUTI",
            dest_port: "KANDLA",
        },
        Corridor {
            name: "India Rice → West Africa",
            commodity: "HCT-1006-RICE-NONBASMATI",
            origins: vec!["INDIA"],
            origin_port: "KAKINADA",
            dest_port: "LAGOS",
        },
        Corridor {
            name: "Nigeria Soybean → Asia",
            commodity: "HCT-1201-SOYBEAN",
            origins: vec!["NIGERIA"],
            origin_port: "LAGOS",
            dest_port: "QINGDAO",
        },
    ]
});

/// The configured harvest job catalog.
pub fn harvest_jobs() -> &'static [HarvestJob] {
    &HARVEST_JOBS
}

/// Corridors watched for flow-velocity and basis signals.
pub fn priority_corridors() -> &'static [Corridor] {
    &PRIORITY_CORRIDORS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_names_unique() {
        let mut names: Vec<_> = harvest_jobs().iter().map(|j| j.name.as_str()).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn test_corridor_commodities_exist_in_taxonomy() {
        for corridor in priority_corridors() {
            assert!(
                crate::reference::taxonomy::entry_by_id(corridor.commodity).is_some(),
                "corridor {} references unknown commodity {}",
                corridor.name,
                corridor.commodity
            );
        }
    }

    #[test]
    fn test_priority_one_jobs_include_india_fast_path() {
        let india_p1 = harvest_jobs()
            .iter()
            .filter(|j| j.priority == 1 && j.trade_country == "INDIA")
            .count();
        assert!(india_p1 >= 2);
    }
}
