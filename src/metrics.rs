// Portfolio-wide scalars for the KPI cards and the resources page.
// Nothing here joins to allocations.

use std::collections::BTreeMap;

use crate::analytics::type_split;
use crate::types::{CategoryCount, PortfolioMetrics, Resource, ResourceRow, Trial};
use crate::util::{average, format_int, round_int};

pub fn portfolio_metrics(filtered: &[&Trial], resources: &[Resource]) -> PortfolioMetrics {
    let active_trials = filtered
        .iter()
        .filter(|t| !t.status.eq_ignore_ascii_case("completed"))
        .count();
    let planning_trials = filtered
        .iter()
        .filter(|t| t.status.eq_ignore_ascii_case("planning"))
        .count();

    let fte = resources
        .iter()
        .filter(|r| r.resource_type.is_fte())
        .count();
    let (fte_share, fsp_share) = type_split(fte, resources.len());

    let utilizations: Vec<f64> = resources
        .iter()
        .map(|r| r.utilization.unwrap_or(0.0))
        .collect();

    PortfolioMetrics {
        active_trials,
        planning_trials,
        total_resources: resources.len(),
        fte_share,
        fsp_share,
        avg_utilization: round_int(average(&utilizations)),
    }
}

pub fn planning_text(metrics: &PortfolioMetrics) -> String {
    format!("{} in planning", metrics.planning_trials)
}

pub fn resources_subtitle(metrics: &PortfolioMetrics) -> String {
    format!("{}% FTE, {}% FSP", metrics.fte_share, metrics.fsp_share)
}

pub fn avg_util_label(metrics: &PortfolioMetrics) -> String {
    format!("{}%", metrics.avg_utilization)
}

pub fn utilization_band(avg_utilization: i64) -> &'static str {
    if avg_utilization < 30 {
        "Underutilized"
    } else if avg_utilization <= 70 {
        "Balanced workload"
    } else {
        "High load"
    }
}

/// Site badge text for a trial header, e.g. `"12 sites"`.
pub fn sites_label(trial: &Trial) -> String {
    match trial.sites_count.map(round_int) {
        Some(1) => "1 site".to_string(),
        Some(n) => format!("{} sites", format_int(n)),
        None => "sites n/a".to_string(),
    }
}

fn count_by<F>(trials: &[Trial], key: F) -> Vec<CategoryCount>
where
    F: Fn(&Trial) -> &str,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in trials {
        let k = key(t);
        if !k.is_empty() && k != "0" {
            *counts.entry(k).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: label.to_string(),
            count,
        })
        .collect()
}

/// Trials per phase, sorted by phase label.
pub fn phase_counts(trials: &[Trial]) -> Vec<CategoryCount> {
    count_by(trials, |t| t.phase.as_str())
}

/// Trials per therapeutic area, sorted by area name.
pub fn therapeutic_area_counts(trials: &[Trial]) -> Vec<CategoryCount> {
    count_by(trials, |t| t.therapeutic_area.as_str())
}

/// Resources whose name, role, type or department contains `query`,
/// ignoring case. A blank query keeps every resource.
pub fn search_resources(resources: &[Resource], query: &str) -> Vec<ResourceRow> {
    let query = query.trim().to_lowercase();
    resources
        .iter()
        .filter(|r| {
            query.is_empty()
                || [&r.name, &r.role, &r.type_raw, &r.department]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&query))
        })
        .map(|r| ResourceRow {
            key: r.key.clone(),
            name: r.name.clone(),
            role: r.role.clone(),
            resource_type: r.resource_type,
            department: r.department.clone(),
        })
        .collect()
}
