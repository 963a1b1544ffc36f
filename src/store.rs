// Typed, read-only view over the three loaded tables.
//
// Column aliases are resolved exactly once here; everything downstream
// works on `Trial`, `Resource` and `Allocation` values.

use std::collections::HashMap;

use serde::Serialize;

use crate::columns::{Entity, Field, RawRecord, RecordView};
use crate::names::normalize_name;
use crate::types::{Allocation, Resource, ResourceType, Trial};
use crate::util::parse_date_safe;

/// The three tables as handed over by the record source.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub trials: Vec<RawRecord>,
    pub resources: Vec<RawRecord>,
    pub allocations: Vec<RawRecord>,
}

/// How allocations are matched to resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinKeyStrategy {
    /// Both tables carry an explicit resource identifier.
    ResourceId,
    /// At least one table lacks identifiers; normalized names are used.
    NormalizedName,
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    trials: Vec<Trial>,
    resources: Vec<Resource>,
    allocations: Vec<Allocation>,
    strategy: JoinKeyStrategy,
    by_key: HashMap<String, usize>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::from_raw(&Dataset::default())
    }
}

impl RecordStore {
    pub fn from_raw(dataset: &Dataset) -> Self {
        let trials: Vec<Trial> = dataset.trials.iter().map(trial_from_raw).collect();

        let resources_have_ids = any_value(&dataset.resources, Entity::Resource, Field::Id);
        let allocations_have_ids =
            any_value(&dataset.allocations, Entity::Allocation, Field::ResourceId);
        let strategy = if resources_have_ids && allocations_have_ids {
            JoinKeyStrategy::ResourceId
        } else {
            JoinKeyStrategy::NormalizedName
        };

        let resources: Vec<Resource> = dataset
            .resources
            .iter()
            .map(|r| resource_from_raw(r, strategy))
            .collect();

        let mut by_key = HashMap::new();
        let mut by_name = HashMap::new();
        for (idx, r) in resources.iter().enumerate() {
            if !r.key.is_empty() {
                by_key.entry(r.key.clone()).or_insert(idx);
            }
            let name = normalize_name(&r.name);
            if !name.is_empty() {
                by_name.entry(name).or_insert_with(|| r.key.clone());
            }
        }

        let mut skipped = 0usize;
        let allocations: Vec<Allocation> = dataset
            .allocations
            .iter()
            .filter_map(|a| {
                let alloc = allocation_from_raw(a, strategy, &by_name);
                if alloc.is_none() {
                    skipped += 1;
                }
                alloc
            })
            .collect();
        if skipped > 0 {
            tracing::debug!(skipped, "Dropped allocations without a resource reference");
        }

        let unknown = allocations
            .iter()
            .filter(|a| !by_key.contains_key(&a.resource_key))
            .count();
        if unknown > 0 && !resources.is_empty() {
            tracing::warn!(
                allocations = unknown,
                "Allocations reference resources missing from the resource table"
            );
        }

        tracing::info!(
            trials = trials.len(),
            resources = resources.len(),
            allocations = allocations.len(),
            strategy = ?strategy,
            "Record store built"
        );

        Self {
            trials,
            resources,
            allocations,
            strategy,
            by_key,
        }
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn join_strategy(&self) -> JoinKeyStrategy {
        self.strategy
    }

    pub fn resource(&self, key: &str) -> Option<&Resource> {
        self.by_key.get(key).map(|&idx| &self.resources[idx])
    }

    /// Any allocation row in the whole table carries weekly hours.
    pub fn has_weekly_hours(&self) -> bool {
        self.allocations.iter().any(|a| a.weekly_hours.is_some())
    }

    /// Any allocation row in the whole table carries an allocation percentage.
    pub fn has_allocation_percentage(&self) -> bool {
        self.allocations
            .iter()
            .any(|a| a.allocation_percentage.is_some())
    }

    pub fn allocations_for_resource<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Iterator<Item = &'a Allocation> + 'a {
        self.allocations
            .iter()
            .filter(move |a| a.resource_key == key)
    }

    pub fn allocations_for_trial<'a>(
        &'a self,
        trial: &'a Trial,
    ) -> impl Iterator<Item = &'a Allocation> + 'a {
        self.allocations.iter().filter(move |a| a.belongs_to(trial))
    }
}

fn any_value(records: &[RawRecord], entity: Entity, field: Field) -> bool {
    records.iter().any(|r| {
        RecordView::new(r, entity)
            .text(field)
            .is_some_and(|v| !v.is_empty())
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn trial_from_raw(record: &RawRecord) -> Trial {
    let view = RecordView::new(record, Entity::Trial);
    Trial {
        id: view.text_or_empty(Field::Id),
        protocol_id: view.text_or_empty(Field::ProtocolId),
        title: view.text_or_empty(Field::Title),
        phase: view.text_or_empty(Field::Phase),
        therapeutic_area: view.text_or_empty(Field::TherapeuticArea),
        status: view.text_or_empty(Field::Status),
        priority: view.text_or_empty(Field::Priority),
        department: view.text(Field::Department),
        start_date: parse_date_safe(view.text(Field::StartDate).as_deref()),
        end_date: parse_date_safe(view.text(Field::EndDate).as_deref()),
        fte_allocation: view.number(Field::FteAllocation),
        fsp_allocation: view.number(Field::FspAllocation),
        sites_count: view.number(Field::SitesCount),
    }
}

fn resource_from_raw(record: &RawRecord, strategy: JoinKeyStrategy) -> Resource {
    let view = RecordView::new(record, Entity::Resource);
    let name = view.text_or_empty(Field::Name);
    let id = view.text_or_empty(Field::Id);
    let key = match strategy {
        JoinKeyStrategy::ResourceId if !id.is_empty() => id,
        _ => {
            let normalized = normalize_name(&name);
            if normalized.is_empty() {
                id
            } else {
                normalized
            }
        }
    };
    let type_raw = view.text_or_empty(Field::ResourceType);
    Resource {
        key,
        resource_type: ResourceType::from_raw(&type_raw),
        type_raw,
        role: view.text_or_empty(Field::Role),
        department: view.text_or_empty(Field::Department),
        capacity: view.number(Field::Capacity),
        utilization: view.number(Field::Utilization),
        name,
    }
}

fn allocation_from_raw(
    record: &RawRecord,
    strategy: JoinKeyStrategy,
    by_name: &HashMap<String, String>,
) -> Option<Allocation> {
    let view = RecordView::new(record, Entity::Allocation);
    let id = view.text_or_empty(Field::ResourceId);
    let name = normalize_name(&view.text_or_empty(Field::Name));
    let resource_key = match strategy {
        JoinKeyStrategy::ResourceId if !id.is_empty() => id,
        // Rows missing the id column still join when the name is known.
        JoinKeyStrategy::ResourceId => by_name.get(&name).cloned().unwrap_or(name),
        JoinKeyStrategy::NormalizedName if !name.is_empty() => name,
        JoinKeyStrategy::NormalizedName => id,
    };
    if resource_key.is_empty() {
        return None;
    }
    Some(Allocation {
        trial_id: non_empty(view.text(Field::TrialId)),
        protocol_id: non_empty(view.text(Field::ProtocolId)),
        resource_key,
        weekly_hours: view.number(Field::WeeklyHours),
        allocation_percentage: view.number(Field::AllocationPercentage),
        role: non_empty(view.text(Field::Role)),
        resource_type: non_empty(view.text(Field::ResourceType)),
        start_date: parse_date_safe(view.text(Field::StartDate).as_deref()),
        end_date: parse_date_safe(view.text(Field::EndDate).as_deref()),
    })
}
