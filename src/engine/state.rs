use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::EngineError;
use crate::models::*;

/// Top-level page the UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    /// Grid of areas with their progress.
    #[default]
    AreaView,
    /// List of areas with the objectives of the selected one.
    DetailView,
}

/// Side panel currently open, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "panel", content = "id", rename_all = "snake_case")]
pub enum Panel {
    AddObjective,
    EditObjective(Uuid),
    AddArea,
    EditArea(Uuid),
    TimeFrameSettings,
}

/// The renderable state snapshot.
///
/// Only the reducer produces new snapshots. `objectives` always belong to the
/// displayed time frame. Collections are kept sorted by `(order, id)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    pub areas: Vec<Area>,
    pub objectives: Vec<Objective>,
    pub time_frames: Vec<TimeFrame>,
    pub selected_area_id: Option<Uuid>,
    pub displayed_time_frame_id: Option<Uuid>,
    /// Time frame `objectives` were last loaded for. `None` while they still
    /// have to be fetched.
    pub loaded_objectives_for: Option<Uuid>,
    pub project_name: Option<String>,
    pub pending_error: Option<EngineError>,
    pub page: Page,
    pub panel: Option<Panel>,
    /// Set once the first initialization finished, with or without data.
    pub initialized: bool,
}

impl AppState {
    pub fn selected_area(&self) -> Option<&Area> {
        let id = self.selected_area_id?;
        self.areas.iter().find(|a| a.id == id)
    }

    pub fn displayed_time_frame(&self) -> Option<&TimeFrame> {
        let id = self.displayed_time_frame_id?;
        self.time_frames.iter().find(|tf| tf.id == id)
    }

    pub fn area(&self, id: Uuid) -> Option<&Area> {
        self.areas.iter().find(|a| a.id == id)
    }

    pub fn objective(&self, id: Uuid) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == id)
    }
}
