// Per-trial resource analytics: joins the selected trial to its
// allocations and resources and derives utilization, type split,
// functional-area and department rollups and per-resource detail rows.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::store::RecordStore;
use crate::types::{
    Allocation, Resource, ResourceAllocationRow, ResourceDetailRow, ResourcePanelSummary,
    RollupEntry, Trial, TrialAnalytics, TrialListRow,
};
use crate::util::{average, percent_of, round_dp, round_int};

/// Fixed chart palette, assigned to rollup entries in order and reused
/// cyclically.
pub const PALETTE: [&str; 8] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#06B6D4", "#EC4899", "#84CC16",
];

/// Group label for resources without a role or department.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Where the "which numeric columns exist" check for utilization looks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FeatureDetection {
    /// Across the entire allocation table.
    #[default]
    Dataset,
    /// Across the resource's own allocation rows only.
    PerResource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsOptions {
    pub detection: FeatureDetection,
}

/// Which tier of the utilization fallback applies to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoursSource {
    /// Summed weekly hours over capacity.
    WeeklyHours,
    /// Summed allocation percentages, already a percent.
    Percentage,
    /// The resource's own utilization column, or 0.
    Precomputed,
}

/// The three-tier utilization policy. Hours win only when a positive
/// capacity is known to divide by.
pub fn resolve_hours_source(
    has_weekly_hours: bool,
    has_percentage: bool,
    capacity: Option<f64>,
) -> HoursSource {
    if has_weekly_hours && capacity.is_some_and(|c| c > 0.0) {
        HoursSource::WeeklyHours
    } else if has_percentage {
        HoursSource::Percentage
    } else {
        HoursSource::Precomputed
    }
}

/// Hours one allocation contributes: its weekly hours, else its percentage
/// of the resource's capacity.
pub fn allocation_hours(allocation: &Allocation, capacity: Option<f64>) -> f64 {
    match allocation.weekly_hours {
        Some(hours) => hours,
        None => {
            allocation.allocation_percentage.unwrap_or(0.0) / 100.0 * capacity.unwrap_or(0.0)
        }
    }
}

/// Utilization percentage of one resource over all of its allocations,
/// floored at 0.
pub fn resource_utilization(store: &RecordStore, key: &str, options: AnalyticsOptions) -> f64 {
    let resource = store.resource(key);
    let mut hours = 0.0;
    let mut pct = 0.0;
    let mut own_hours = false;
    let mut own_pct = false;
    for a in store.allocations_for_resource(key) {
        if let Some(h) = a.weekly_hours {
            hours += h;
            own_hours = true;
        }
        if let Some(p) = a.allocation_percentage {
            pct += p;
            own_pct = true;
        }
    }

    let (has_hours, has_pct) = match options.detection {
        FeatureDetection::Dataset => (store.has_weekly_hours(), store.has_allocation_percentage()),
        FeatureDetection::PerResource => (own_hours, own_pct),
    };
    let capacity = resource.and_then(Resource::positive_capacity);
    let source = resolve_hours_source(has_hours, has_pct, capacity);
    let utilization = match (source, capacity) {
        (HoursSource::WeeklyHours, Some(cap)) => hours / cap * 100.0,
        (HoursSource::Percentage, _) => pct,
        _ => resource.and_then(|r| r.utilization).unwrap_or(0.0),
    };
    tracing::debug!(resource = key, ?source, utilization, "Resolved utilization");
    utilization.max(0.0)
}

/// Find the selected trial in the filtered view by id or protocol id.
/// Returns the first match and whether more than one trial matched.
pub fn resolve_trial<'a>(filtered: &[&'a Trial], target: &str) -> Option<(&'a Trial, bool)> {
    let target = target.trim();
    let mut matches = filtered.iter().copied().filter(|t| t.matches_id(target));
    let first = matches.next()?;
    let ambiguous = matches.next().is_some();
    if ambiguous {
        tracing::warn!(
            trial_id = target,
            "Several trials share this id; using the first in list order"
        );
    }
    Some((first, ambiguous))
}

/// Derive the analytics bundle for `selected`. No selection, or a selection
/// outside the filtered view, yields the empty default bundle.
pub fn trial_analytics(
    store: &RecordStore,
    filtered: &[&Trial],
    selected: Option<&str>,
    options: AnalyticsOptions,
) -> TrialAnalytics {
    let Some((trial, ambiguous)) = selected.and_then(|id| resolve_trial(filtered, id)) else {
        return TrialAnalytics::default();
    };

    let allocations: Vec<&Allocation> = store.allocations_for_trial(trial).collect();
    let resource_keys: Vec<String> = allocations
        .iter()
        .map(|a| a.resource_key.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    tracing::debug!(
        trial = %trial.id,
        allocations = allocations.len(),
        resources = resource_keys.len(),
        "Resolved trial allocations"
    );

    let utilization_by_resource: Vec<(String, f64)> = resource_keys
        .iter()
        .map(|k| (k.clone(), resource_utilization(store, k, options)))
        .collect();
    let utilizations: Vec<f64> = utilization_by_resource.iter().map(|(_, u)| *u).collect();

    let count = resource_keys.len();
    let fte = resource_keys
        .iter()
        .filter(|k| store.resource(k).is_some_and(|r| r.resource_type.is_fte()))
        .count();
    let (fte_pct, fsp_pct) = type_split(fte, count);

    let hours_by_key: Vec<(&str, f64)> = resource_keys
        .iter()
        .map(|k| {
            let capacity = store.resource(k).and_then(Resource::positive_capacity);
            let hours: f64 = allocations
                .iter()
                .filter(|a| &a.resource_key == k)
                .map(|a| allocation_hours(a, capacity))
                .sum();
            (k.as_str(), hours)
        })
        .collect();

    let functional_breakdown = rollup(&hours_by_key, |k| {
        store.resource(k).map(|r| r.role.as_str()).unwrap_or("")
    });
    let department_breakdown = rollup(&hours_by_key, |k| {
        store.resource(k).map(|r| r.department.as_str()).unwrap_or("")
    });

    let resources_detail = detail_rows(store, &allocations, &utilization_by_resource);
    let total_weekly_hours = round_int(resources_detail.iter().map(|r| r.weekly_hours).sum());

    TrialAnalytics {
        trial: Some(trial.clone()),
        ambiguous,
        allocated_resources_count: count,
        avg_utilization: if count == 0 { 0 } else { round_int(average(&utilizations)) },
        overallocated_count: utilizations.iter().filter(|u| **u > 100.0).count(),
        fte_pct,
        fsp_pct,
        resource_keys,
        utilization_by_resource,
        functional_breakdown,
        department_breakdown,
        resources_detail,
        total_weekly_hours,
    }
}

/// FTE share rounded, FSP share derived so the pair sums to 100.
pub fn type_split(fte_count: usize, total: usize) -> (i64, i64) {
    if total == 0 {
        return (0, 0);
    }
    let fte_pct = percent_of(fte_count as f64, total as f64);
    (fte_pct, 100 - fte_pct)
}

fn rollup<'a, F>(hours_by_key: &[(&'a str, f64)], group_of: F) -> Vec<RollupEntry>
where
    F: Fn(&'a str) -> &'a str,
{
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, f64> = HashMap::new();
    for &(key, hours) in hours_by_key {
        let label = match group_of(key).trim() {
            "" => UNKNOWN_GROUP.to_string(),
            other => other.to_string(),
        };
        if !sums.contains_key(&label) {
            order.push(label.clone());
        }
        *sums.entry(label).or_insert(0.0) += hours;
    }

    let mut groups: Vec<(String, f64)> = order
        .into_iter()
        .map(|label| {
            let hours = sums.get(&label).copied().unwrap_or(0.0);
            (label, hours)
        })
        .collect();
    groups.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let total: f64 = groups.iter().map(|(_, h)| h).sum();
    groups
        .into_iter()
        .enumerate()
        .map(|(idx, (label, hours))| RollupEntry {
            label,
            hours: round_dp(hours, 1),
            pct: percent_of(hours, total),
            color: PALETTE[idx % PALETTE.len()].to_string(),
        })
        .collect()
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    let fmt = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
    match (start, end) {
        (Some(s), Some(e)) => format!("{} to {}", fmt(s), fmt(e)),
        (Some(s), None) => format!("from {}", fmt(s)),
        (None, Some(e)) => format!("until {}", fmt(e)),
        (None, None) => String::new(),
    }
}

/// Fill whichever of hours/percentage is zero from the other via capacity.
fn backfill(hours: f64, pct: f64, capacity: Option<f64>) -> (f64, f64) {
    match capacity {
        Some(cap) if hours == 0.0 && pct > 0.0 => (pct / 100.0 * cap, pct),
        Some(cap) if pct == 0.0 && hours > 0.0 => (hours, hours / cap * 100.0),
        _ => (hours, pct),
    }
}

fn detail_rows(
    store: &RecordStore,
    allocations: &[&Allocation],
    utilization_by_resource: &[(String, f64)],
) -> Vec<ResourceDetailRow> {
    let mut rows: Vec<ResourceDetailRow> = utilization_by_resource
        .iter()
        .map(|(key, utilization)| {
            let resource = store.resource(key);
            let own: Vec<&&Allocation> =
                allocations.iter().filter(|a| &a.resource_key == key).collect();
            let hours: f64 = own.iter().filter_map(|a| a.weekly_hours).sum();
            let pct: f64 = own.iter().filter_map(|a| a.allocation_percentage).sum();
            let capacity = resource.and_then(Resource::positive_capacity);
            let (weekly_hours, allocation_pct) = backfill(hours, pct, capacity);
            let start = own.iter().filter_map(|a| a.start_date).min();
            let end = own.iter().filter_map(|a| a.end_date).max();

            let name = resource
                .map(|r| r.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| key.clone());
            ResourceDetailRow {
                name,
                role: resource.map(|r| r.role.clone()).unwrap_or_default(),
                resource_type: resource
                    .map(|r| r.resource_type.label().to_string())
                    .unwrap_or_default(),
                department: resource.map(|r| r.department.clone()).unwrap_or_default(),
                weekly_hours: round_dp(weekly_hours, 1),
                allocation_pct: round_dp(allocation_pct, 1),
                utilization: round_dp(*utilization, 1),
                date_range: date_range(start, end),
                key: key.clone(),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.allocation_pct
            .total_cmp(&a.allocation_pct)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

/// Number of distinct resources allocated to `trial`.
pub fn resource_count(store: &RecordStore, trial: &Trial) -> usize {
    store
        .allocations_for_trial(trial)
        .map(|a| a.resource_key.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Trial list rows with their allocated resource counts.
pub fn trials_with_counts(store: &RecordStore, trials: &[&Trial]) -> Vec<TrialListRow> {
    trials
        .iter()
        .map(|t| TrialListRow {
            protocol_id: t.protocol_id.clone(),
            title: t.title.clone(),
            status: t.status.clone(),
            phase: t.phase.clone(),
            resource_count: resource_count(store, t),
            id: t.id.clone(),
        })
        .collect()
}

fn trial_for<'a>(store: &'a RecordStore, allocation: &Allocation) -> Option<&'a Trial> {
    store.trials().iter().find(|t| allocation.belongs_to(t))
}

/// Every allocation of one resource across the whole portfolio.
pub fn resource_allocations(store: &RecordStore, key: &str) -> Vec<ResourceAllocationRow> {
    let capacity = store.resource(key).and_then(Resource::positive_capacity);
    store
        .allocations_for_resource(key)
        .map(|a| {
            let trial = trial_for(store, a);
            let label = match trial {
                Some(t) => t.display_name().to_string(),
                None => a
                    .trial_id
                    .clone()
                    .or_else(|| a.protocol_id.clone())
                    .unwrap_or_default(),
            };
            let (hours, pct) = backfill(
                a.weekly_hours.unwrap_or(0.0),
                a.allocation_percentage.unwrap_or(0.0),
                capacity,
            );
            let iso = |d: Option<NaiveDate>| {
                d.map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            };
            ResourceAllocationRow {
                trial: label,
                phase: trial.map(|t| t.phase.clone()).unwrap_or_default(),
                allocation: format!("{}%", round_dp(pct, 1)),
                weekly_hours: round_dp(hours, 1),
                start_date: iso(a.start_date),
                end_date: iso(a.end_date),
            }
        })
        .collect()
}

/// Header KPIs for the resource allocation panel.
pub fn resource_panel_summary(store: &RecordStore, key: &str) -> ResourcePanelSummary {
    let capacity = store.resource(key).and_then(|r| r.capacity).unwrap_or(0.0);
    let positive = Some(capacity).filter(|c| *c > 0.0);
    let mut summary = ResourcePanelSummary {
        weekly_capacity: capacity,
        ..ResourcePanelSummary::default()
    };
    let mut active: HashSet<&str> = HashSet::new();
    for a in store.allocations_for_resource(key) {
        let (hours, pct) = backfill(
            a.weekly_hours.unwrap_or(0.0),
            a.allocation_percentage.unwrap_or(0.0),
            positive,
        );
        summary.weekly_hours += hours;
        summary.total_allocation_pct += pct;
        if let Some(t) = trial_for(store, a) {
            if !t.status.eq_ignore_ascii_case("completed") {
                active.insert(t.id.as_str());
            }
        }
    }
    summary.weekly_hours = round_dp(summary.weekly_hours, 1);
    summary.total_allocation_pct = round_dp(summary.total_allocation_pct, 1);
    summary.active_trials = active.len();
    summary
}
