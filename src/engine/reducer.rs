//! The state transition function.
//!
//! [`reduce`] folds one [`Outcome`] into a snapshot and returns the next
//! snapshot. It never fails and never performs I/O. Outcomes that change
//! nothing return the input `Arc` itself.

use std::sync::Arc;

use uuid::Uuid;

use super::action::Outcome;
use super::error::EngineError;
use super::state::{AppState, Panel};
use crate::models::*;

pub fn reduce(state: &Arc<AppState>, outcome: Outcome) -> Arc<AppState> {
    match &outcome {
        Outcome::CascadeDeleteSucceeded { .. } | Outcome::Failed(EngineError::NotInitializedYet) => {
            return Arc::clone(state);
        }
        // A response for a time frame that is no longer displayed.
        Outcome::ObjectivesLoaded { time_frame_id, .. }
            if state.displayed_time_frame_id != Some(*time_frame_id) =>
        {
            return Arc::clone(state);
        }
        _ => {}
    }

    let mut next = AppState::clone(state);
    apply(&mut next, outcome);
    Arc::new(next)
}

fn apply(state: &mut AppState, outcome: Outcome) {
    match outcome {
        // ============================================================
        // Objectives
        // ============================================================
        Outcome::ObjectiveCreated(objective) => {
            if state.displayed_time_frame_id == Some(objective.time_frame_id) {
                upsert(&mut state.objectives, objective);
            }
            state.panel = None;
            state.pending_error = None;
        }
        Outcome::ObjectiveEdited(objective) => {
            replace(&mut state.objectives, objective);
            state.panel = None;
            state.pending_error = None;
        }
        Outcome::KeyResultEdited {
            objective_id,
            key_result,
        } => {
            let slot = state
                .objectives
                .iter_mut()
                .find(|o| o.id == objective_id)
                .and_then(|o| o.key_results.iter_mut().find(|kr| kr.id == key_result.id));
            if let Some(slot) = slot {
                *slot = key_result;
            }
            state.pending_error = None;
        }
        Outcome::ObjectiveDeleted(id) => {
            state.objectives.retain(|o| o.id != id);
            if state.panel == Some(Panel::EditObjective(id)) {
                state.panel = None;
            }
            state.pending_error = None;
        }
        Outcome::ObjectivesLoaded {
            time_frame_id,
            objectives,
        } => {
            state.objectives = objectives
                .into_iter()
                .filter(|o| o.time_frame_id == time_frame_id)
                .collect();
            sort(&mut state.objectives);
            state.loaded_objectives_for = Some(time_frame_id);
            state.pending_error = None;
        }

        // ============================================================
        // Areas
        // ============================================================
        Outcome::AreaCreated(area) => {
            let id = area.id;
            upsert(&mut state.areas, area);
            if state.selected_area_id.is_none() {
                state.selected_area_id = Some(id);
            }
            state.panel = None;
            state.pending_error = None;
        }
        Outcome::AreaEdited(area) => {
            replace(&mut state.areas, area);
            state.panel = None;
            state.pending_error = None;
        }
        Outcome::AreaDeleted(id) => {
            state.areas.retain(|a| a.id != id);
            state.objectives.retain(|o| o.area_id != id);
            if state.selected_area_id == Some(id) {
                state.selected_area_id = state.areas.first().map(|a| a.id);
            }
            if state.panel == Some(Panel::EditArea(id)) {
                state.panel = None;
            }
            state.pending_error = None;
        }
        Outcome::AreasLoaded(areas) => {
            state.areas = areas;
            sort(&mut state.areas);
            ensure_selected_area(state);
            state.pending_error = None;
        }

        // ============================================================
        // Time frames
        // ============================================================
        Outcome::TimeFramesLoaded(time_frames) => {
            state.time_frames = time_frames;
            sort(&mut state.time_frames);
            ensure_displayed_time_frame(state);
            state.pending_error = None;
        }
        Outcome::TimeFrameCreated { created, demoted } => {
            for time_frame in demoted {
                replace(&mut state.time_frames, time_frame);
            }
            upsert(&mut state.time_frames, created);
            ensure_displayed_time_frame(state);
            state.pending_error = None;
        }
        Outcome::TimeFramesEdited(time_frames) => {
            for time_frame in time_frames {
                replace(&mut state.time_frames, time_frame);
            }
            state.pending_error = None;
        }

        // ============================================================
        // Initialization and project metadata
        // ============================================================
        Outcome::InitializeSucceeded { areas, time_frames } => {
            state.areas = areas;
            sort(&mut state.areas);
            state.time_frames = time_frames;
            sort(&mut state.time_frames);
            let displayed = default_time_frame(&state.time_frames).map(|tf| tf.id);
            show_time_frame(state, displayed);
            ensure_selected_area(state);
            state.initialized = true;
            state.pending_error = None;
        }
        Outcome::InitializedWithNoData => {
            state.areas.clear();
            state.time_frames.clear();
            state.objectives.clear();
            state.selected_area_id = None;
            state.displayed_time_frame_id = None;
            state.loaded_objectives_for = None;
            state.initialized = true;
            state.pending_error = None;
        }
        Outcome::ProjectNameLoaded(name) => {
            state.project_name = name;
            state.pending_error = None;
        }

        // ============================================================
        // Failures
        // ============================================================
        Outcome::CascadeDeleteFailed { area_id, error } => {
            state.pending_error = Some(EngineError::CascadeDeleteFailed {
                area_id,
                source: error,
            });
        }
        Outcome::Failed(error) => {
            state.pending_error = Some(error);
        }
        Outcome::CascadeDeleteSucceeded { .. } => {}

        // ============================================================
        // Selection and navigation
        // ============================================================
        Outcome::AreaSelected(id) => {
            if state.area(id).is_some() {
                state.selected_area_id = Some(id);
            }
        }
        Outcome::TimeFrameShown(id) => {
            if state.time_frames.iter().any(|tf| tf.id == id) {
                show_time_frame(state, Some(id));
            }
        }
        Outcome::PanelOpened(panel) => state.panel = Some(panel),
        Outcome::EditCancelled => state.panel = None,
        Outcome::PageChanged(page) => state.page = page,
        Outcome::ErrorDismissed => state.pending_error = None,
    }
}

/// Switch the displayed time frame. Objectives of the previous one are dropped
/// so the in-memory set never mixes time frames.
fn show_time_frame(state: &mut AppState, id: Option<Uuid>) {
    if state.displayed_time_frame_id != id {
        state.displayed_time_frame_id = id;
        state.objectives.clear();
        state.loaded_objectives_for = None;
    }
}

fn ensure_displayed_time_frame(state: &mut AppState) {
    let still_listed = state
        .displayed_time_frame_id
        .is_some_and(|id| state.time_frames.iter().any(|tf| tf.id == id));
    if !still_listed {
        let fallback = default_time_frame(&state.time_frames).map(|tf| tf.id);
        show_time_frame(state, fallback);
    }
}

fn ensure_selected_area(state: &mut AppState) {
    let still_listed = state
        .selected_area_id
        .is_some_and(|id| state.areas.iter().any(|a| a.id == id));
    if !still_listed {
        state.selected_area_id = state.areas.first().map(|a| a.id);
    }
}

trait Entity {
    fn id(&self) -> Uuid;
    fn order(&self) -> i64;
}

impl Entity for Area {
    fn id(&self) -> Uuid {
        self.id
    }
    fn order(&self) -> i64 {
        self.order
    }
}

impl Entity for Objective {
    fn id(&self) -> Uuid {
        self.id
    }
    fn order(&self) -> i64 {
        self.order
    }
}

impl Entity for TimeFrame {
    fn id(&self) -> Uuid {
        self.id
    }
    fn order(&self) -> i64 {
        self.order
    }
}

fn sort<T: Entity>(items: &mut [T]) {
    items.sort_by_key(|item| (item.order(), item.id()));
}

/// Replace the item sharing `item`'s id, or insert it.
fn upsert<T: Entity>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
    sort(items);
}

/// Replace the item sharing `item`'s id. Unknown ids are ignored.
fn replace<T: Entity>(items: &mut [T], item: T) {
    if let Some(existing) = items.iter_mut().find(|existing| existing.id() == item.id()) {
        *existing = item;
        sort(items);
    }
}
