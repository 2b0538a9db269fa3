//! Read-only views derived from a snapshot.

use serde::Serialize;
use uuid::Uuid;

use super::state::AppState;
use crate::models::{Area, Objective};

/// Objectives of the displayed time frame that belong to `area_id`, in order.
pub fn objectives_for_area(state: &AppState, area_id: Uuid) -> Vec<&Objective> {
    state
        .objectives
        .iter()
        .filter(|o| o.area_id == area_id)
        .collect()
}

/// Mean progress of the area's objectives, `0.0` when it has none.
pub fn area_progress(state: &AppState, area_id: Uuid) -> f64 {
    let objectives = objectives_for_area(state, area_id);
    if objectives.is_empty() {
        return 0.0;
    }
    objectives.iter().map(|o| o.progress()).sum::<f64>() / objectives.len() as f64
}

/// An area with what the area list renders next to it.
#[derive(Debug, Clone, Serialize)]
pub struct AreaSummary {
    #[serde(flatten)]
    pub area: Area,
    pub objectives: Vec<Objective>,
    pub progress: f64,
}

pub fn area_summary(state: &AppState, area_id: Uuid) -> Option<AreaSummary> {
    let area = state.area(area_id)?.clone();
    Some(AreaSummary {
        area,
        objectives: objectives_for_area(state, area_id)
            .into_iter()
            .cloned()
            .collect(),
        progress: area_progress(state, area_id),
    })
}

pub fn area_summaries(state: &AppState) -> Vec<AreaSummary> {
    state
        .areas
        .iter()
        .filter_map(|area| area_summary(state, area.id))
        .collect()
}
