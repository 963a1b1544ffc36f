use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tabled::Tabled;

/// Canonical staffing category shown in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    Fte,
    Fsp,
    Contractor,
    Other,
}

impl ResourceType {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "FTE" => ResourceType::Fte,
            "FSP" => ResourceType::Fsp,
            "CONTRACTOR" => ResourceType::Contractor,
            _ => ResourceType::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceType::Fte => "FTE",
            ResourceType::Fsp => "FSP",
            ResourceType::Contractor => "CONTRACTOR",
            ResourceType::Other => "OTHER",
        }
    }

    /// Anything that is not FTE counts towards the FSP/contractor share.
    pub fn is_fte(self) -> bool {
        self == ResourceType::Fte
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trial {
    pub id: String,
    pub protocol_id: String,
    pub title: String,
    pub phase: String,
    pub therapeutic_area: String,
    pub status: String,
    pub priority: String,
    /// `None` when the trial table has no department column at all.
    pub department: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub fte_allocation: Option<f64>,
    pub fsp_allocation: Option<f64>,
    pub sites_count: Option<f64>,
}

impl Trial {
    /// True if `target` names this trial by id or protocol id.
    pub fn matches_id(&self, target: &str) -> bool {
        !target.is_empty() && (self.id == target || self.protocol_id == target)
    }

    /// Title when present, otherwise the most specific identifier.
    pub fn display_name(&self) -> &str {
        [&self.title, &self.protocol_id, &self.id]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    /// Join key: the explicit id, or the normalized name when the dataset
    /// carries no resource identifiers.
    pub key: String,
    pub name: String,
    pub role: String,
    /// Type text as it appeared in the source.
    pub type_raw: String,
    pub resource_type: ResourceType,
    pub department: String,
    /// Weekly hours available.
    pub capacity: Option<f64>,
    /// Pre-computed utilization percentage from the source sheet.
    pub utilization: Option<f64>,
}

impl Resource {
    pub fn positive_capacity(&self) -> Option<f64> {
        self.capacity.filter(|c| *c > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub trial_id: Option<String>,
    pub protocol_id: Option<String>,
    /// Matches [`Resource::key`].
    pub resource_key: String,
    pub weekly_hours: Option<f64>,
    pub allocation_percentage: Option<f64>,
    pub role: Option<String>,
    pub resource_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Allocation {
    /// Three-way match: `trial_id == trial.id`, `protocol_id ==
    /// trial.protocol_id`, or `trial_id == trial.protocol_id`.
    pub fn belongs_to(&self, trial: &Trial) -> bool {
        let eq = |a: &Option<String>, b: &str| {
            a.as_deref().is_some_and(|a| !a.is_empty() && a == b)
        };
        eq(&self.trial_id, &trial.id)
            || eq(&self.protocol_id, &trial.protocol_id)
            || eq(&self.trial_id, &trial.protocol_id)
    }
}

/// One entry in the trial list, annotated with its allocated resource count.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct TrialListRow {
    #[tabled(rename = "Protocol")]
    pub protocol_id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Phase")]
    pub phase: String,
    #[tabled(rename = "Resources")]
    pub resource_count: usize,
    #[tabled(skip)]
    pub id: String,
}

/// Hours grouped by functional area or department for the selected trial.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct RollupEntry {
    #[tabled(rename = "Group")]
    pub label: String,
    #[tabled(rename = "Hours")]
    pub hours: f64,
    #[tabled(rename = "Pct")]
    pub pct: i64,
    #[tabled(rename = "Color")]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ResourceDetailRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub resource_type: String,
    #[tabled(rename = "Department")]
    pub department: String,
    #[tabled(rename = "WeeklyHours")]
    pub weekly_hours: f64,
    #[tabled(rename = "AllocationPct")]
    pub allocation_pct: f64,
    #[tabled(rename = "Utilization")]
    pub utilization: f64,
    #[tabled(rename = "Dates")]
    pub date_range: String,
    #[tabled(skip)]
    pub key: String,
}

/// Resources page row.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ResourceRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[tabled(rename = "Department")]
    pub department: String,
}

/// One allocation of a resource, as listed in the resource allocation panel.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ResourceAllocationRow {
    #[tabled(rename = "Trial")]
    pub trial: String,
    #[tabled(rename = "Phase")]
    pub phase: String,
    #[tabled(rename = "Allocation")]
    pub allocation: String,
    #[tabled(rename = "WeeklyHours")]
    pub weekly_hours: f64,
    #[tabled(rename = "Start")]
    pub start_date: String,
    #[tabled(rename = "End")]
    pub end_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourcePanelSummary {
    pub weekly_capacity: f64,
    pub total_allocation_pct: f64,
    pub weekly_hours: f64,
    pub active_trials: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct CategoryCount {
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Trials")]
    pub count: usize,
}

/// Portfolio-wide scalars for the KPI cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortfolioMetrics {
    pub active_trials: usize,
    pub planning_trials: usize,
    pub total_resources: usize,
    pub fte_share: i64,
    pub fsp_share: i64,
    pub avg_utilization: i64,
}

/// Everything derived for the selected trial. `Default` is the
/// no-selection bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrialAnalytics {
    pub trial: Option<Trial>,
    /// More than one trial in the view matched the selected id.
    pub ambiguous: bool,
    pub resource_keys: Vec<String>,
    pub utilization_by_resource: Vec<(String, f64)>,
    pub allocated_resources_count: usize,
    pub avg_utilization: i64,
    pub overallocated_count: usize,
    pub fte_pct: i64,
    pub fsp_pct: i64,
    pub functional_breakdown: Vec<RollupEntry>,
    pub department_breakdown: Vec<RollupEntry>,
    pub resources_detail: Vec<ResourceDetailRow>,
    pub total_weekly_hours: i64,
}

impl TrialAnalytics {
    pub fn is_selected(&self) -> bool {
        self.trial.is_some()
    }

    pub fn utilization_of(&self, key: &str) -> Option<f64> {
        self.utilization_by_resource
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, u)| *u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(id: &str, protocol: &str) -> Trial {
        Trial {
            id: id.to_string(),
            protocol_id: protocol.to_string(),
            title: String::new(),
            phase: String::new(),
            therapeutic_area: String::new(),
            status: String::new(),
            priority: String::new(),
            department: None,
            start_date: None,
            end_date: None,
            fte_allocation: None,
            fsp_allocation: None,
            sites_count: None,
        }
    }

    fn allocation(trial_id: Option<&str>, protocol_id: Option<&str>) -> Allocation {
        Allocation {
            trial_id: trial_id.map(str::to_string),
            protocol_id: protocol_id.map(str::to_string),
            resource_key: "R1".to_string(),
            weekly_hours: None,
            allocation_percentage: None,
            role: None,
            resource_type: None,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn resource_type_canonicalization() {
        assert_eq!(ResourceType::from_raw("fte"), ResourceType::Fte);
        assert_eq!(ResourceType::from_raw(" Contractor "), ResourceType::Contractor);
        assert_eq!(ResourceType::from_raw(""), ResourceType::Other);
        assert!(!ResourceType::from_raw("FSP").is_fte());
    }

    #[test]
    fn allocation_matches_all_three_paths() {
        let t = trial("T1", "P1");
        assert!(allocation(Some("T1"), None).belongs_to(&t));
        assert!(allocation(None, Some("P1")).belongs_to(&t));
        assert!(allocation(Some("P1"), None).belongs_to(&t));
        assert!(!allocation(Some("T2"), Some("P2")).belongs_to(&t));
        assert!(!allocation(None, None).belongs_to(&t));
    }

    #[test]
    fn blank_ids_never_match() {
        let t = trial("", "");
        assert!(!allocation(Some(""), Some("")).belongs_to(&t));
        assert!(!t.matches_id(""));
    }

    #[test]
    fn display_name_falls_back_to_ids() {
        let mut t = trial("T1", "P1");
        assert_eq!(t.display_name(), "P1");
        t.title = "Study".to_string();
        assert_eq!(t.display_name(), "Study");
    }
}
