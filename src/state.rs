// Caller-owned application state.
//
// Filter criteria, the selected trial and the resources-page controls are
// the only mutable fields. Every read recomputes from the current state, so
// a value read after a setter always reflects that setter.

use crate::analytics::{self, AnalyticsOptions};
use crate::filter::{self, FilterCriteria, FilterField};
use crate::metrics;
use crate::store::{Dataset, RecordStore};
use crate::types::{
    PortfolioMetrics, ResourceAllocationRow, ResourcePanelSummary, ResourceRow, Trial,
    TrialAnalytics, TrialListRow,
};

#[derive(Debug, Clone, Default)]
pub struct AppState {
    store: RecordStore,
    criteria: FilterCriteria,
    selected_trial_id: Option<String>,
    resources_search: String,
    open_resource: Option<String>,
    options: AnalyticsOptions,
}

impl AppState {
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self::new(RecordStore::from_raw(dataset))
    }

    pub fn with_options(mut self, options: AnalyticsOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn analytics_options(&self) -> AnalyticsOptions {
        self.options
    }

    // ---- mutations ----

    pub fn set_filter(&mut self, field: FilterField, value: impl Into<String>) {
        let value = value.into();
        tracing::debug!(field = %field, value = %value, "Filter changed");
        self.criteria.set(field, value);
    }

    pub fn reset_filters(&mut self) {
        self.criteria = FilterCriteria::default();
    }

    pub fn select_trial(&mut self, trial_id: impl Into<String>) {
        let trial_id = trial_id.into();
        tracing::debug!(trial_id = %trial_id, "Trial selected");
        self.selected_trial_id = Some(trial_id);
    }

    pub fn clear_selection(&mut self) {
        self.selected_trial_id = None;
    }

    pub fn set_resources_search(&mut self, query: impl Into<String>) {
        self.resources_search = query.into();
    }

    pub fn open_allocations(&mut self, resource_key: impl Into<String>) {
        self.open_resource = Some(resource_key.into());
    }

    pub fn close_allocations(&mut self) {
        self.open_resource = None;
    }

    // ---- reads ----

    pub fn selected_trial_id(&self) -> Option<&str> {
        self.selected_trial_id.as_deref()
    }

    pub fn filtered_trials(&self) -> Vec<&Trial> {
        filter::filter_trials(self.store.trials(), &self.criteria)
    }

    pub fn filtered_trials_with_counts(&self) -> Vec<TrialListRow> {
        analytics::trials_with_counts(&self.store, &self.filtered_trials())
    }

    /// Dropdown values for `field`, derived from the full trial table.
    pub fn filter_options(&self, field: FilterField) -> Vec<String> {
        filter::compute_options(self.store.trials(), field)
    }

    pub fn selected_analytics(&self) -> TrialAnalytics {
        analytics::trial_analytics(
            &self.store,
            &self.filtered_trials(),
            self.selected_trial_id(),
            self.options,
        )
    }

    pub fn portfolio_metrics(&self) -> PortfolioMetrics {
        metrics::portfolio_metrics(&self.filtered_trials(), self.store.resources())
    }

    pub fn resources_search(&self) -> &str {
        &self.resources_search
    }

    pub fn filtered_resources(&self) -> Vec<ResourceRow> {
        metrics::search_resources(self.store.resources(), &self.resources_search)
    }

    pub fn allocations_open(&self) -> bool {
        self.open_resource.is_some()
    }

    /// Allocations of the resource whose panel is open; empty when closed.
    pub fn resource_allocations(&self) -> Vec<ResourceAllocationRow> {
        match &self.open_resource {
            Some(key) => analytics::resource_allocations(&self.store, key),
            None => Vec::new(),
        }
    }

    pub fn resource_panel_summary(&self) -> Option<ResourcePanelSummary> {
        self.open_resource
            .as_deref()
            .map(|key| analytics::resource_panel_summary(&self.store, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::records;
    use serde_json::json;

    fn state() -> AppState {
        AppState::from_dataset(&Dataset {
            trials: records(json!([
                {"id": "T1", "protocol_id": "P1", "title": "Lung", "status": "Ongoing", "phase": "Phase 2"},
                {"id": "T2", "protocol_id": "P2", "title": "Heart", "status": "Planning", "phase": "Phase 3"}
            ])),
            resources: records(json!([
                {"id": "R1", "name": "Ann", "type": "FTE", "capacity": 40, "utilization": 60},
                {"id": "R2", "name": "Bob", "type": "FSP", "capacity": 40, "utilization": 20}
            ])),
            allocations: records(json!([
                {"trial_id": "T1", "resource_id": "R1", "weekly_hours": 20},
                {"trial_id": "T2", "resource_id": "R2", "weekly_hours": 10}
            ])),
        })
    }

    #[test]
    fn selection_follows_setters() {
        let mut s = state();
        assert!(!s.selected_analytics().is_selected());

        s.select_trial("P1");
        let a = s.selected_analytics();
        assert_eq!(a.trial.as_ref().map(|t| t.id.as_str()), Some("T1"));
        assert_eq!(a.allocated_resources_count, 1);

        s.clear_selection();
        assert_eq!(s.selected_analytics(), TrialAnalytics::default());
    }

    #[test]
    fn filtering_out_the_selection_empties_the_bundle() {
        let mut s = state();
        s.select_trial("T1");
        s.set_filter(FilterField::Status, "Planning");
        assert!(!s.selected_analytics().is_selected());
        assert_eq!(s.selected_trial_id(), Some("T1"));

        s.reset_filters();
        assert!(s.selected_analytics().is_selected());
    }

    #[test]
    fn portfolio_metrics_follow_filters() {
        let mut s = state();
        assert_eq!(s.portfolio_metrics().active_trials, 2);
        s.set_filter(FilterField::Query, "heart");
        let m = s.portfolio_metrics();
        assert_eq!(m.active_trials, 1);
        assert_eq!(m.planning_trials, 1);
        assert_eq!(m.total_resources, 2);
        assert_eq!(m.avg_utilization, 40);
    }

    #[test]
    fn trial_list_and_options() {
        let s = state();
        let rows = s.filtered_trials_with_counts();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.resource_count == 1));
        assert_eq!(
            s.filter_options(FilterField::Phase),
            vec!["All", "Phase 2", "Phase 3"]
        );
        assert_eq!(s.filter_options(FilterField::Department), vec!["All"]);
    }

    #[test]
    fn resources_page_and_allocation_panel() {
        let mut s = state();
        s.set_resources_search("fsp");
        assert_eq!(s.filtered_resources().len(), 1);

        assert!(!s.allocations_open());
        assert!(s.resource_allocations().is_empty());
        s.open_allocations("R1");
        assert!(s.allocations_open());
        assert_eq!(s.resource_allocations()[0].trial, "Lung");
        assert_eq!(
            s.resource_panel_summary().map(|p| p.weekly_hours),
            Some(20.0)
        );
        s.close_allocations();
        assert!(s.resource_panel_summary().is_none());
    }
}
