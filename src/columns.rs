// Column resolution for independently authored spreadsheets.
//
// The trial, resource and allocation tables do not agree on column names
// (`"NTID"`, `"Network ID"` and `"resource_ntid"` all name the same field).
// Keys are compared after `normalize_key`, and each logical `Field`
// carries an alias list per `Entity` in priority order.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::util::coerce_f64;

/// One loaded row: column name to cell value, in source column order.
pub type RawRecord = serde_json::Map<String, Value>;

/// The table a record came from. Alias lists differ per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Trial,
    Resource,
    Allocation,
}

/// Logical fields the analytics code reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    TrialId,
    ProtocolId,
    Title,
    Phase,
    TherapeuticArea,
    Status,
    Priority,
    Department,
    StartDate,
    EndDate,
    FteAllocation,
    FspAllocation,
    SitesCount,
    ResourceId,
    Name,
    Role,
    ResourceType,
    Capacity,
    Utilization,
    WeeklyHours,
    AllocationPercentage,
}

impl Field {
    /// Accepted column names for this field in `entity`'s table, highest
    /// priority first. Empty when the table never carries the field.
    pub fn aliases(self, entity: Entity) -> &'static [&'static str] {
        use Entity::{Allocation, Resource, Trial};
        match (entity, self) {
            (Trial, Field::Id) => &["id", "trial_id"],
            (Trial, Field::ProtocolId) => &["protocol_id", "protocol", "protocol_number"],
            (Trial, Field::Title) => &["title", "trial_title", "study_title"],
            (Trial, Field::Phase) => &["phase", "trial_phase"],
            (Trial, Field::TherapeuticArea) => &["therapeutic_area", "ta", "area"],
            (Trial, Field::Status) => &["status", "trial_status"],
            (Trial, Field::Priority) => &["priority"],
            (Trial, Field::Department) => &["department", "dept"],
            (Trial, Field::FteAllocation) => &["fte_allocation", "fte"],
            (Trial, Field::FspAllocation) => &["fsp_allocation", "fsp"],
            (Trial, Field::SitesCount) => &["sites_count", "site_count", "sites"],

            (Resource, Field::Id) => &[
                "id",
                "resource_id",
                "ntid",
                "network_id",
                "resource_ntid",
                "employee_id",
            ],
            (Resource, Field::Name) => &["name", "resource_name", "full_name", "employee_name"],
            (Resource, Field::Role) => &["role", "functional_area", "function", "job_role"],
            (Resource, Field::ResourceType) => &["type", "resource_type", "employment_type"],
            (Resource, Field::Department) => &["department", "dept", "business_unit"],
            (Resource, Field::Capacity) => &[
                "capacity",
                "weekly_capacity",
                "capacity_hours",
                "hours_per_week",
            ],
            (Resource, Field::Utilization) => &["utilization", "utilization_pct", "util"],

            (Allocation, Field::TrialId) => &["trial_id", "trial", "study_id"],
            (Allocation, Field::ProtocolId) => &["protocol_id", "protocol", "protocol_number"],
            (Allocation, Field::ResourceId) => &[
                "resource_id",
                "ntid",
                "network_id",
                "resource_ntid",
                "employee_id",
            ],
            (Allocation, Field::Name) => &["resource_name", "name", "employee_name", "resource"],
            (Allocation, Field::WeeklyHours) => &["weekly_hours", "hours_per_week", "hours"],
            (Allocation, Field::AllocationPercentage) => &[
                "allocation_percentage",
                "allocation_pct",
                "allocation",
                "percent_allocation",
            ],
            (Allocation, Field::Role) => &["role", "functional_area"],
            (Allocation, Field::ResourceType) => &["type", "resource_type"],

            (Trial | Allocation, Field::StartDate) => &["start_date", "start"],
            (Trial | Allocation, Field::EndDate) => &["end_date", "end"],

            _ => &[],
        }
    }
}

const ALL_FIELDS: [Field; 22] = [
    Field::Id,
    Field::TrialId,
    Field::ProtocolId,
    Field::Title,
    Field::Phase,
    Field::TherapeuticArea,
    Field::Status,
    Field::Priority,
    Field::Department,
    Field::StartDate,
    Field::EndDate,
    Field::FteAllocation,
    Field::FspAllocation,
    Field::SitesCount,
    Field::ResourceId,
    Field::Name,
    Field::Role,
    Field::ResourceType,
    Field::Capacity,
    Field::Utilization,
    Field::WeeklyHours,
    Field::AllocationPercentage,
];

// Normalized once; record views look fields up on every load.
static NORMALIZED_ALIASES: Lazy<HashMap<(Entity, Field), Vec<String>>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for entity in [Entity::Trial, Entity::Resource, Entity::Allocation] {
        for field in ALL_FIELDS {
            let aliases: Vec<String> = field
                .aliases(entity)
                .iter()
                .map(|a| normalize_key(a))
                .collect();
            if !aliases.is_empty() {
                table.insert((entity, field), aliases);
            }
        }
    }
    table
});

/// Lowercase and drop every non-alphanumeric character.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Render a cell as trimmed text. `null` is the empty string and integral
/// numbers drop their fractional part.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn find<'a, S: AsRef<str>>(record: &'a RawRecord, normalized: &[S]) -> Option<&'a Value> {
    normalized.iter().find_map(|alias| {
        record
            .iter()
            .find(|(key, _)| normalize_key(key) == alias.as_ref())
            .map(|(_, value)| value)
    })
}

/// Value of the first column matching any alias. Aliases are tried in the
/// order given; within one alias the first matching column wins.
pub fn lookup<'a>(record: &'a RawRecord, aliases: &[&str]) -> Option<&'a Value> {
    let normalized: Vec<String> = aliases.iter().map(|a| normalize_key(a)).collect();
    find(record, normalized.as_slice())
}

/// Resolve a logical field to text, or `""` when no alias matches or the
/// matched cell is null.
pub fn resolve(record: &RawRecord, aliases: &[&str]) -> String {
    lookup(record, aliases)
        .map(value_to_string)
        .unwrap_or_default()
}

/// Typed accessors over one raw record, using the cached alias tables for
/// its entity.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    record: &'a RawRecord,
    entity: Entity,
}

impl<'a> RecordView<'a> {
    pub fn new(record: &'a RawRecord, entity: Entity) -> Self {
        Self { record, entity }
    }

    pub fn get(&self, field: Field) -> Option<&'a Value> {
        let aliases = NORMALIZED_ALIASES.get(&(self.entity, field))?;
        find(self.record, aliases.as_slice())
    }

    /// `Some` whenever the column exists, even if the cell is blank.
    pub fn text(&self, field: Field) -> Option<String> {
        self.get(field).map(value_to_string)
    }

    /// Text of the field, or `""` when the column is absent.
    pub fn text_or_empty(&self, field: Field) -> String {
        self.text(field).unwrap_or_default()
    }

    /// `None` when the column is absent or the cell is blank. Cells that
    /// hold text which does not parse as a number coerce to 0.0.
    pub fn number(&self, field: Field) -> Option<f64> {
        match self.get(field)? {
            Value::Null => None,
            Value::Number(n) => Some(n.as_f64().unwrap_or(0.0)),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            other => {
                let text = value_to_string(other);
                if text.is_empty() {
                    None
                } else {
                    Some(coerce_f64(&text))
                }
            }
        }
    }
}
