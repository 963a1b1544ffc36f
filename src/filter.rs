// Trial filtering and the option lists behind the filter dropdowns.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::types::Trial;

/// Wildcard value for the dropdown selectors.
pub const ALL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilterField {
    Query,
    Phase,
    Priority,
    TherapeuticArea,
    Status,
    Department,
}

impl FilterField {
    /// The dropdown-backed fields, in display order.
    pub const SELECTORS: [FilterField; 5] = [
        FilterField::Status,
        FilterField::Phase,
        FilterField::Priority,
        FilterField::TherapeuticArea,
        FilterField::Department,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterField::Query => "query",
            FilterField::Phase => "phase",
            FilterField::Priority => "priority",
            FilterField::TherapeuticArea => "therapeutic_area",
            FilterField::Status => "status",
            FilterField::Department => "department",
        }
    }

    /// Parse a user-supplied field name (`"Therapeutic Area"`, `"ta"`, ...).
    pub fn parse(input: &str) -> Option<Self> {
        match crate::columns::normalize_key(input).as_str() {
            "query" | "search" | "q" => Some(FilterField::Query),
            "phase" => Some(FilterField::Phase),
            "priority" => Some(FilterField::Priority),
            "therapeuticarea" | "area" | "ta" => Some(FilterField::TherapeuticArea),
            "status" => Some(FilterField::Status),
            "department" | "dept" => Some(FilterField::Department),
            _ => None,
        }
    }

    /// The trial's value for this field, `None` if the trial does not carry it.
    pub fn trial_value(self, trial: &Trial) -> Option<&str> {
        match self {
            FilterField::Query => None,
            FilterField::Phase => Some(trial.phase.as_str()),
            FilterField::Priority => Some(trial.priority.as_str()),
            FilterField::TherapeuticArea => Some(trial.therapeutic_area.as_str()),
            FilterField::Status => Some(trial.status.as_str()),
            FilterField::Department => trial.department.as_deref(),
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub query: String,
    pub phase: String,
    pub priority: String,
    pub therapeutic_area: String,
    pub status: String,
    pub department: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            query: String::new(),
            phase: ALL.to_string(),
            priority: ALL.to_string(),
            therapeutic_area: ALL.to_string(),
            status: ALL.to_string(),
            department: ALL.to_string(),
        }
    }
}

impl FilterCriteria {
    pub fn get(&self, field: FilterField) -> &str {
        match field {
            FilterField::Query => &self.query,
            FilterField::Phase => &self.phase,
            FilterField::Priority => &self.priority,
            FilterField::TherapeuticArea => &self.therapeutic_area,
            FilterField::Status => &self.status,
            FilterField::Department => &self.department,
        }
    }

    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        let value = value.into();
        let slot = match field {
            FilterField::Query => &mut self.query,
            FilterField::Phase => &mut self.phase,
            FilterField::Priority => &mut self.priority,
            FilterField::TherapeuticArea => &mut self.therapeutic_area,
            FilterField::Status => &mut self.status,
            FilterField::Department => &mut self.department,
        };
        *slot = value;
    }

    /// True when no criterion narrows the trial list.
    pub fn is_unfiltered(&self) -> bool {
        self.query.trim().is_empty()
            && FilterField::SELECTORS
                .iter()
                .all(|f| self.get(*f) == ALL)
    }
}

fn matches_query(trial: &Trial, query: &str) -> bool {
    trial.title.to_lowercase().contains(query) || trial.protocol_id.to_lowercase().contains(query)
}

/// Apply every criterion conjunctively.
///
/// The query is a case-insensitive substring match on title or protocol id.
/// Dropdown criteria are exact matches and are skipped when set to [`ALL`].
/// The department criterion is also skipped when no remaining trial has a
/// department at all.
pub fn filter_trials<'a>(trials: &'a [Trial], criteria: &FilterCriteria) -> Vec<&'a Trial> {
    let mut data: Vec<&Trial> = trials.iter().collect();

    let query = criteria.query.trim().to_lowercase();
    if !query.is_empty() {
        data.retain(|t| matches_query(t, &query));
    }

    for field in [
        FilterField::Status,
        FilterField::Phase,
        FilterField::Priority,
        FilterField::TherapeuticArea,
    ] {
        let wanted = criteria.get(field);
        if wanted != ALL {
            data.retain(|t| field.trial_value(t) == Some(wanted));
        }
    }

    let department = criteria.department.as_str();
    if department != ALL && data.iter().any(|t| t.department.is_some()) {
        data.retain(|t| t.department.as_deref() == Some(department));
    }

    tracing::debug!(
        total = trials.len(),
        matched = data.len(),
        "Filtered trials"
    );
    data
}

/// `"All"` followed by the sorted, distinct, non-empty values of `field`,
/// ignoring the `"0"` placeholder that blank cells were filled with.
pub fn compute_options(trials: &[Trial], field: FilterField) -> Vec<String> {
    let values: BTreeSet<&str> = trials
        .iter()
        .filter_map(|t| field.trial_value(t))
        .filter(|v| !v.is_empty() && *v != "0")
        .collect();
    std::iter::once(ALL.to_string())
        .chain(values.into_iter().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn trial(id: &str, title: &str, phase: &str, status: &str, dept: Option<&str>) -> Trial {
        Trial {
            id: id.to_string(),
            protocol_id: format!("PROT-{id}"),
            title: title.to_string(),
            phase: phase.to_string(),
            therapeutic_area: "Oncology".to_string(),
            status: status.to_string(),
            priority: "High".to_string(),
            department: dept.map(str::to_string),
            start_date: None,
            end_date: None,
            fte_allocation: None,
            fsp_allocation: None,
            sites_count: None,
        }
    }

    fn ids(trials: &[&Trial]) -> Vec<String> {
        trials.iter().map(|t| t.id.clone()).collect()
    }

    fn sample() -> Vec<Trial> {
        vec![
            trial("1", "Lung Cancer Study", "Phase 2", "Ongoing", None),
            trial("2", "Asthma Relief", "Phase 3", "Planning", None),
            trial("3", "Lung Function", "Phase 3", "Completed", None),
        ]
    }

    #[test]
    fn default_criteria_keep_everything() {
        let trials = sample();
        let criteria = FilterCriteria::default();
        assert!(criteria.is_unfiltered());
        assert_eq!(filter_trials(&trials, &criteria).len(), 3);
    }

    #[test]
    fn query_matches_title_or_protocol_case_insensitively() {
        let trials = sample();
        let mut criteria = FilterCriteria::default();
        criteria.set(FilterField::Query, "  LUNG ");
        assert_eq!(ids(&filter_trials(&trials, &criteria)), vec!["1", "3"]);

        criteria.set(FilterField::Query, "prot-2");
        assert_eq!(ids(&filter_trials(&trials, &criteria)), vec!["2"]);
    }

    #[test]
    fn dropdown_filters_are_conjunctive() {
        let trials = sample();
        let mut criteria = FilterCriteria::default();
        criteria.set(FilterField::Phase, "Phase 3");
        criteria.set(FilterField::Status, "Completed");
        assert_eq!(ids(&filter_trials(&trials, &criteria)), vec!["3"]);

        criteria.set(FilterField::Status, "Ongoing");
        assert!(filter_trials(&trials, &criteria).is_empty());
    }

    #[test]
    fn department_filter_skipped_without_department_data() {
        let trials = sample();
        let mut criteria = FilterCriteria::default();
        criteria.set(FilterField::Department, "Biostatistics");
        assert_eq!(filter_trials(&trials, &criteria).len(), 3);
    }

    #[test]
    fn department_filter_applies_when_any_trial_has_one() {
        let trials = vec![
            trial("1", "A", "Phase 1", "Ongoing", Some("Clinical Ops")),
            trial("2", "B", "Phase 1", "Ongoing", None),
        ];
        let mut criteria = FilterCriteria::default();
        criteria.set(FilterField::Department, "Clinical Ops");
        assert_eq!(ids(&filter_trials(&trials, &criteria)), vec!["1"]);
    }

    #[test]
    fn options_are_sorted_distinct_and_prefixed() {
        let mut trials = sample();
        trials.push(trial("4", "X", "0", "", None));
        assert_eq!(
            compute_options(&trials, FilterField::Phase),
            vec!["All", "Phase 2", "Phase 3"]
        );
        assert_eq!(
            compute_options(&trials, FilterField::Status),
            vec!["All", "Completed", "Ongoing", "Planning"]
        );
        assert_eq!(compute_options(&trials, FilterField::Department), vec!["All"]);
        assert_eq!(compute_options(&[], FilterField::Priority), vec!["All"]);
    }

    #[test]
    fn parses_field_names() {
        assert_eq!(FilterField::parse("Therapeutic Area"), Some(FilterField::TherapeuticArea));
        assert_eq!(FilterField::parse("STATUS"), Some(FilterField::Status));
        assert_eq!(FilterField::parse("colour"), None);
    }

    fn arb_trial() -> impl Strategy<Value = Trial> {
        (
            0u8..6,
            prop::sample::select(vec!["Phase 1", "Phase 2", "Phase 3"]),
            prop::sample::select(vec!["Ongoing", "Planning", "Completed"]),
            prop::sample::select(vec!["High", "Low"]),
            prop::sample::select(vec!["Ops", "Stats"]),
        )
            .prop_map(|(n, phase, status, priority, dept)| {
                let mut t = trial(&n.to_string(), &format!("Study {n}"), phase, status, Some(dept));
                t.priority = priority.to_string();
                t
            })
    }

    fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
        (
            prop::sample::select(vec!["", "study 1", "prot", "zzz"]),
            prop::sample::select(vec![ALL, "Phase 1", "Phase 3"]),
            prop::sample::select(vec![ALL, "Ongoing", "Completed"]),
            prop::sample::select(vec![ALL, "High"]),
            prop::sample::select(vec![ALL, "Ops", "Stats"]),
        )
            .prop_map(|(query, phase, status, priority, dept)| FilterCriteria {
                query: query.to_string(),
                phase: phase.to_string(),
                priority: priority.to_string(),
                therapeutic_area: ALL.to_string(),
                status: status.to_string(),
                department: dept.to_string(),
            })
    }

    proptest! {
        #[test]
        fn relaxing_a_criterion_never_shrinks_the_result(
            trials in prop::collection::vec(arb_trial(), 0..12),
            with_departments in any::<bool>(),
            criteria in arb_criteria(),
            which in 0usize..6,
        ) {
            // A department column is either present for every trial or for none.
            let mut trials = trials;
            if !with_departments {
                for t in &mut trials {
                    t.department = None;
                }
            }
            let narrow = filter_trials(&trials, &criteria).len();
            let mut relaxed = criteria.clone();
            match which {
                0 => relaxed.set(FilterField::Query, ""),
                n => relaxed.set(FilterField::SELECTORS[n - 1], ALL),
            }
            prop_assert!(filter_trials(&trials, &relaxed).len() >= narrow);
        }

        #[test]
        fn options_start_with_all_and_come_from_input(
            trials in prop::collection::vec(arb_trial(), 0..12),
        ) {
            let options = compute_options(&trials, FilterField::Phase);
            prop_assert_eq!(options[0].as_str(), ALL);
            let rest = &options[1..];
            prop_assert!(rest.windows(2).all(|w| w[0] < w[1]));
            for value in rest {
                prop_assert!(trials.iter().any(|t| &t.phase == value));
            }
        }
    }
}
