use serde_json::{json, Value};
use trial_portfolio::{AppState, Dataset, FilterField, RawRecord, TrialAnalytics};

fn table(value: Value) -> Vec<RawRecord> {
    serde_json::from_value(value).expect("fixture is an array of objects")
}

fn state(trials: Value, resources: Value, allocations: Value) -> AppState {
    AppState::from_dataset(&Dataset {
        trials: table(trials),
        resources: table(resources),
        allocations: table(allocations),
    })
}

#[test]
fn hours_based_utilization_for_single_fte() {
    let mut app = state(
        json!([{"id": "T1", "protocol_id": "P1"}]),
        json!([{"id": "R1", "type": "FTE", "capacity": 40}]),
        json!([{"trial_id": "T1", "resource_id": "R1", "weekly_hours": 20}]),
    );
    app.select_trial("T1");
    let a = app.selected_analytics();

    assert_eq!(a.allocated_resources_count, 1);
    assert_eq!(a.utilization_of("R1"), Some(50.0));
    assert_eq!(a.fte_pct, 100);
    assert_eq!(a.fsp_pct, 0);
}

#[test]
fn percentage_based_utilization_without_capacity() {
    let mut app = state(
        json!([{"id": "T1", "protocol_id": "P1"}]),
        json!([{"id": "R1", "type": "FTE"}]),
        json!([{"trial_id": "T1", "resource_id": "R1", "allocation_percentage": 50}]),
    );
    app.select_trial("T1");
    assert_eq!(app.selected_analytics().utilization_of("R1"), Some(50.0));
}

#[test]
fn no_selection_returns_defaults() {
    let app = state(
        json!([{"id": "T1", "protocol_id": "P1"}]),
        json!([{"id": "R1", "type": "FTE", "capacity": 40}]),
        json!([{"trial_id": "T1", "resource_id": "R1", "weekly_hours": 20}]),
    );
    let a = app.selected_analytics();
    assert_eq!(a, TrialAnalytics::default());
    assert_eq!((a.fte_pct, a.fsp_pct), (0, 0));
    assert!(a.functional_breakdown.is_empty());
    assert!(a.resources_detail.is_empty());
}

#[test]
fn allocation_to_unknown_resource() {
    let mut app = state(
        json!([{"id": "T1", "protocol_id": "P1"}]),
        json!([{"id": "R1", "type": "FTE", "capacity": 40}]),
        json!([
            {"trial_id": "T1", "resource_id": "R1", "weekly_hours": 20},
            {"trial_id": "T1", "resource_id": "R404", "weekly_hours": 10}
        ]),
    );
    app.select_trial("P1");
    let a = app.selected_analytics();

    let ghost = a
        .resources_detail
        .iter()
        .find(|r| r.key == "R404")
        .expect("unknown resource still listed");
    assert_eq!(ghost.role, "");
    assert_eq!(ghost.resource_type, "");
    assert_eq!(ghost.department, "");
    assert_eq!(a.utilization_of("R404"), Some(0.0));
    assert_eq!(a.allocated_resources_count, 2);
    assert_eq!(a.fte_pct + a.fsp_pct, 100);
}

#[test]
fn empty_tables_never_fail() {
    let mut app = state(json!([]), json!([]), json!([]));
    app.set_filter(FilterField::Status, "Ongoing");
    app.select_trial("T1");
    assert!(app.filtered_trials().is_empty());
    assert_eq!(app.filter_options(FilterField::Phase), vec!["All"]);
    assert_eq!(app.selected_analytics(), TrialAnalytics::default());
    assert_eq!(app.portfolio_metrics().total_resources, 0);
}

#[test]
fn inconsistent_headers_and_name_join() {
    let mut app = state(
        json!([
            {"Trial ID": "T1", "Protocol": "P1", "Title": "Alpha", "Status": "Ongoing",
             "Department": "Clinical Ops"},
            {"Trial ID": "T2", "Protocol": "P2", "Title": "Beta", "Status": "Planning",
             "Department": "Medical Affairs"}
        ]),
        json!([
            {"Full Name": "Dr. Jane O'Brien", "Resource Type": "fte", "Role": "CRA",
             "Weekly Capacity": "40"}
        ]),
        json!([
            {"Protocol Number": "P1", "Employee Name": "JANE OBRIEN", "Hours": "30",
             "Start": "2024-01-01", "End": "2024-12-31"}
        ]),
    );
    app.set_filter(FilterField::Department, "Clinical Ops");
    assert_eq!(app.filtered_trials().len(), 1);
    assert_eq!(
        app.filter_options(FilterField::Department),
        vec!["All", "Clinical Ops", "Medical Affairs"]
    );

    app.select_trial("T1");
    let a = app.selected_analytics();
    assert_eq!(a.utilization_of("jane obrien"), Some(75.0));
    let row = &a.resources_detail[0];
    assert_eq!(row.name, "Dr. Jane O'Brien");
    assert_eq!(row.resource_type, "FTE");
    assert_eq!(row.allocation_pct, 75.0);
    assert_eq!(row.date_range, "2024-01-01 to 2024-12-31");
    assert_eq!(a.functional_breakdown[0].label, "CRA");
    assert_eq!(a.functional_breakdown[0].pct, 100);
    assert_eq!(a.department_breakdown[0].label, "Unknown");
}
