// Console front-end for the portfolio analytics.
//
// - Option [1] loads the three CSV tables and builds the state.
// - Options [2]-[6] change filters or the selection and print the derived
//   views; every view is recomputed from the state after each change.
// - Option [7] exports the current views to JSON and CSV.
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::Path;
use trial_portfolio::filter::FilterField;
use trial_portfolio::loader;
use trial_portfolio::logging;
use trial_portfolio::metrics;
use trial_portfolio::output;
use trial_portfolio::types::{PortfolioMetrics, TrialAnalytics};
use trial_portfolio::util::{format_int, format_number};
use trial_portfolio::{AppState, DataConfig};

const SUMMARY_FILE: &str = "portfolio_summary.json";
const DETAIL_FILE: &str = "trial_resources.csv";

/// One trimmed line from `reader`, or `None` at end of input.
fn read_line_from<R: BufRead>(reader: &mut R) -> Option<String> {
    let mut buf = String::new();
    match reader.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Print `prompt` and read one trimmed line from stdin.
fn prompt_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    read_line_from(&mut io::stdin().lock())
}

fn read_input(prompt: &str) -> String {
    prompt_line(prompt).unwrap_or_default()
}

/// Handle option [1]: locate the data directory and load every table.
fn handle_load(config: &DataConfig) -> Option<AppState> {
    match loader::load_dataset(config, Path::new(".")) {
        Ok((dataset, report)) => {
            println!(
                "Loaded {} trials, {} resources, {} allocations.",
                format_int(report.trial_rows),
                format_int(report.resource_rows),
                format_int(report.allocation_rows)
            );
            if !report.failed_tables.is_empty() {
                println!(
                    "Note: treated as empty: {}",
                    report.failed_tables.join(", ")
                );
            }
            println!();
            Some(AppState::from_dataset(&dataset).with_options(config.analytics_options()))
        }
        Err(e) => {
            eprintln!("Failed to load data: {}\n", e);
            None
        }
    }
}

fn print_kpis(m: &PortfolioMetrics) {
    println!(
        "Active trials: {} ({})",
        format_int(m.active_trials),
        metrics::planning_text(m)
    );
    println!(
        "Resources: {} ({})",
        format_int(m.total_resources),
        metrics::resources_subtitle(m)
    );
    println!(
        "Avg utilization: {} ({})\n",
        metrics::avg_util_label(m),
        metrics::utilization_band(m.avg_utilization)
    );
}

/// Handle option [2]: KPIs, pipeline counts and the filtered trial list.
fn show_overview(state: &AppState) {
    print_kpis(&state.portfolio_metrics());
    let phases = metrics::phase_counts(state.store().trials());
    let total: usize = phases.iter().map(|p| p.count).sum();
    output::preview_table("Pipeline by phase", Some(&format!("{} trials", total)), &phases, 10);
    let trials = state.filtered_trials_with_counts();
    let criteria = state.criteria();
    let note = format!(
        "query='{}' status={} phase={} priority={} area={} department={}",
        criteria.query,
        criteria.status,
        criteria.phase,
        criteria.priority,
        criteria.therapeutic_area,
        criteria.department
    );
    output::preview_table("Clinical Trials", Some(&note), &trials, 20);
}

/// Handle option [3]: pick a field, show its options, set a value.
fn handle_filter(state: &mut AppState) {
    let field_name = read_input("Filter (query/status/phase/priority/area/department): ");
    let Some(field) = FilterField::parse(&field_name) else {
        println!("Unknown filter '{}'.\n", field_name);
        return;
    };
    if field != FilterField::Query {
        println!("Options: {}", state.filter_options(field).join(" | "));
    }
    let value = read_input("Value: ");
    state.set_filter(field, value);
    println!(
        "{} trials match.\n",
        format_int(state.filtered_trials().len())
    );
}

fn show_trial(analytics: &TrialAnalytics) {
    let Some(trial) = &analytics.trial else {
        println!("No trial selected (or it is filtered out).\n");
        return;
    };
    println!("Resource Analytics: {}", trial.display_name());
    println!(
        "[{}] [{}] [{}] [{}]",
        trial.protocol_id,
        trial.phase,
        trial.therapeutic_area,
        metrics::sites_label(trial)
    );
    if analytics.ambiguous {
        println!("Warning: several trials share this id; showing the first.");
    }
    println!(
        "Allocated resources: {} | Weekly hours: {}h | Avg utilization: {}% | Over-allocated: {}",
        analytics.allocated_resources_count,
        format_int(analytics.total_weekly_hours),
        analytics.avg_utilization,
        analytics.overallocated_count
    );
    println!(
        "Resource type: FTE {}% / FSP {}%\n",
        analytics.fte_pct, analytics.fsp_pct
    );
    output::preview_table(
        "Functional Area Distribution",
        None,
        &analytics.functional_breakdown,
        10,
    );
    output::preview_table(
        "Hours by Department",
        None,
        &analytics.department_breakdown,
        10,
    );
    output::preview_table(
        "Allocated Resources Detail",
        Some(&format!("{} total", analytics.resources_detail.len())),
        &analytics.resources_detail,
        25,
    );
}

/// Handle option [6]: search resources and open one allocation panel.
fn handle_resources(state: &mut AppState) {
    state.set_resources_search(read_input("Search resources (blank for all): "));
    output::preview_table("Resources", None, &state.filtered_resources(), 25);
    let key = read_input("Resource key to inspect (blank to skip): ");
    if key.is_empty() {
        return;
    }
    state.open_allocations(key);
    if let Some(summary) = state.resource_panel_summary() {
        println!(
            "Weekly capacity: {}h | Total allocation: {}% | Weekly hours: {}h | Active trials: {}\n",
            format_number(summary.weekly_capacity, 0),
            format_number(summary.total_allocation_pct, 1),
            format_number(summary.weekly_hours, 1),
            summary.active_trials
        );
    }
    output::preview_table("Allocations", None, &state.resource_allocations(), 50);
    state.close_allocations();
}

#[derive(Serialize)]
struct ExportSummary<'a> {
    metrics: PortfolioMetrics,
    selected_trial_id: Option<&'a str>,
    analytics: TrialAnalytics,
}

/// Handle option [7]: write the KPIs and selected-trial bundle to JSON and
/// the detail rows to CSV.
fn handle_export(state: &AppState) {
    let analytics = state.selected_analytics();
    if let Err(e) = output::write_csv(Path::new(DETAIL_FILE), &analytics.resources_detail) {
        eprintln!("Write error: {}", e);
    }
    let summary = ExportSummary {
        metrics: state.portfolio_metrics(),
        selected_trial_id: state.selected_trial_id(),
        analytics,
    };
    match output::write_json(Path::new(SUMMARY_FILE), &summary) {
        Ok(()) => println!("Exported {} and {}.\n", SUMMARY_FILE, DETAIL_FILE),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

fn main() {
    let config = DataConfig::from_env();
    logging::init_logging(&config.log_level);

    let mut state: Option<AppState> = None;
    loop {
        println!("Portfolio Resourcing:");
        println!("[1] Load data");
        println!("[2] Portfolio overview");
        println!("[3] Set filter");
        println!("[4] Select trial");
        println!("[5] Clear selection and filters");
        println!("[6] Resource allocations");
        println!("[7] Export views");
        println!("[0] Exit\n");
        let Some(choice) = prompt_line("Enter choice: ") else {
            println!();
            break;
        };
        if choice == "0" {
            println!("Exiting the program.");
            break;
        }
        if choice == "1" {
            if let Some(loaded) = handle_load(&config) {
                state = Some(loaded);
            }
            continue;
        }
        let Some(app) = state.as_mut() else {
            println!("Error: No data loaded. Please load the data first (option 1).\n");
            continue;
        };
        match choice.as_str() {
            "2" => show_overview(app),
            "3" => handle_filter(app),
            "4" => {
                let id = read_input("Trial id or protocol id: ");
                app.select_trial(id);
                show_trial(&app.selected_analytics());
            }
            "5" => {
                app.clear_selection();
                app.reset_filters();
                println!("Selection and filters cleared.\n");
            }
            "6" => handle_resources(app),
            "7" => handle_export(app),
            _ => println!("Invalid choice. Please enter 0-7.\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn end_of_input_ends_the_menu() {
        let mut input = Cursor::new("  2 \n");
        assert_eq!(read_line_from(&mut input).as_deref(), Some("2"));
        assert_eq!(read_line_from(&mut input), None);
    }

    #[test]
    fn blank_line_is_not_end_of_input() {
        let mut input = Cursor::new("\n");
        assert_eq!(read_line_from(&mut input).as_deref(), Some(""));
    }
}
