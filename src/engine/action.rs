//! The closed vocabulary of intents flowing through the engine.
//!
//! [`Request`]s come from the UI and go to the orchestrator. [`Outcome`]s are
//! what the orchestrator reports back and the only input the reducer accepts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{EngineError, ErrorScope};
use super::state::{Page, Panel};
use crate::models::*;
use crate::services::ServiceError;

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Request {
    CreateObjective(NewObjective),
    EditObjective {
        objective: Objective,
        patch: UpdateObjectiveInput,
    },
    /// Change one key result (status, comment, wording) of an objective in state.
    EditKeyResult {
        objective_id: Uuid,
        key_result_id: Uuid,
        patch: UpdateKeyResultInput,
    },
    DeleteObjective(Uuid),
    CreateArea(CreateAreaInput),
    EditArea {
        area: Area,
        patch: UpdateAreaInput,
    },
    DeleteArea(Uuid),
    GetObjectives(Uuid),
    GetAreas,
    GetTimeFrames,
    CreateTimeFrame(CreateTimeFrameInput),
    EditTimeFrame {
        time_frame: TimeFrame,
        patch: UpdateTimeFrameInput,
    },
    Initialize,
    GetProjectName,
    SelectArea(Area),
    /// Switch the time frame whose objectives are shown.
    ShowTimeFrame(Uuid),
    OpenPanel(Panel),
    CancelEdit,
    NavigateTo(Page),
    DismissError,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::CreateObjective(_) => "create_objective",
            Request::EditObjective { .. } => "edit_objective",
            Request::EditKeyResult { .. } => "edit_key_result",
            Request::DeleteObjective(_) => "delete_objective",
            Request::CreateArea(_) => "create_area",
            Request::EditArea { .. } => "edit_area",
            Request::DeleteArea(_) => "delete_area",
            Request::GetObjectives(_) => "get_objectives",
            Request::GetAreas => "get_areas",
            Request::GetTimeFrames => "get_time_frames",
            Request::CreateTimeFrame(_) => "create_time_frame",
            Request::EditTimeFrame { .. } => "edit_time_frame",
            Request::Initialize => "initialize",
            Request::GetProjectName => "get_project_name",
            Request::SelectArea(_) => "select_area",
            Request::ShowTimeFrame(_) => "show_time_frame",
            Request::OpenPanel(_) => "open_panel",
            Request::CancelEdit => "cancel_edit",
            Request::NavigateTo(_) => "navigate_to",
            Request::DismissError => "dismiss_error",
        }
    }
}

/// The asynchronous operations a request can fail in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateObjective,
    EditObjective,
    EditKeyResult,
    DeleteObjective,
    GetObjectives,
    CreateArea,
    EditArea,
    DeleteArea,
    GetAreas,
    GetTimeFrames,
    CreateTimeFrame,
    EditTimeFrame,
    Initialize,
    GetProjectName,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateObjective => "create_objective",
            Self::EditObjective => "edit_objective",
            Self::EditKeyResult => "edit_key_result",
            Self::DeleteObjective => "delete_objective",
            Self::GetObjectives => "get_objectives",
            Self::CreateArea => "create_area",
            Self::EditArea => "edit_area",
            Self::DeleteArea => "delete_area",
            Self::GetAreas => "get_areas",
            Self::GetTimeFrames => "get_time_frames",
            Self::CreateTimeFrame => "create_time_frame",
            Self::EditTimeFrame => "edit_time_frame",
            Self::Initialize => "initialize",
            Self::GetProjectName => "get_project_name",
        }
    }

    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::CreateObjective
            | Self::EditObjective
            | Self::EditKeyResult
            | Self::DeleteObjective
            | Self::GetObjectives => ErrorScope::Objective,
            Self::CreateArea | Self::EditArea | Self::DeleteArea | Self::GetAreas => {
                ErrorScope::Area
            }
            Self::GetTimeFrames | Self::CreateTimeFrame | Self::EditTimeFrame => {
                ErrorScope::TimeFrame
            }
            // Initialization reads areas and time frames; failures surface
            // next to the area list.
            Self::Initialize => ErrorScope::Area,
            Self::GetProjectName => ErrorScope::Project,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened. Only outcomes change state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Outcome {
    ObjectiveCreated(Objective),
    ObjectiveEdited(Objective),
    KeyResultEdited {
        objective_id: Uuid,
        key_result: KeyResult,
    },
    ObjectiveDeleted(Uuid),
    /// Objectives of one time frame. Tagged with the time frame they were
    /// fetched for so late responses can be recognized.
    ObjectivesLoaded {
        time_frame_id: Uuid,
        objectives: Vec<Objective>,
    },
    AreaCreated(Area),
    AreaEdited(Area),
    AreaDeleted(Uuid),
    AreasLoaded(Vec<Area>),
    TimeFramesLoaded(Vec<TimeFrame>),
    /// A new time frame plus any time frame that lost its current flag to it.
    TimeFrameCreated {
        created: TimeFrame,
        demoted: Vec<TimeFrame>,
    },
    TimeFramesEdited(Vec<TimeFrame>),
    InitializeSucceeded {
        areas: Vec<Area>,
        time_frames: Vec<TimeFrame>,
    },
    InitializedWithNoData,
    /// `None` when no project name was ever stored.
    ProjectNameLoaded(Option<String>),
    /// Objectives of a deleted area were removed from storage.
    CascadeDeleteSucceeded {
        area_id: Uuid,
    },
    CascadeDeleteFailed {
        area_id: Uuid,
        error: ServiceError,
    },
    Failed(EngineError),

    AreaSelected(Uuid),
    TimeFrameShown(Uuid),
    PanelOpened(Panel),
    EditCancelled,
    PageChanged(Page),
    ErrorDismissed,
}

impl Outcome {
    pub fn failed(operation: Operation, source: ServiceError) -> Self {
        Outcome::Failed(EngineError::OperationFailed {
            scope: operation.scope(),
            operation,
            source,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Outcome::ObjectiveCreated(_) => "objective_created",
            Outcome::ObjectiveEdited(_) => "objective_edited",
            Outcome::KeyResultEdited { .. } => "key_result_edited",
            Outcome::ObjectiveDeleted(_) => "objective_deleted",
            Outcome::ObjectivesLoaded { .. } => "objectives_loaded",
            Outcome::AreaCreated(_) => "area_created",
            Outcome::AreaEdited(_) => "area_edited",
            Outcome::AreaDeleted(_) => "area_deleted",
            Outcome::AreasLoaded(_) => "areas_loaded",
            Outcome::TimeFramesLoaded(_) => "time_frames_loaded",
            Outcome::TimeFrameCreated { .. } => "time_frame_created",
            Outcome::TimeFramesEdited(_) => "time_frames_edited",
            Outcome::InitializeSucceeded { .. } => "initialize_succeeded",
            Outcome::InitializedWithNoData => "initialized_with_no_data",
            Outcome::ProjectNameLoaded(_) => "project_name_loaded",
            Outcome::CascadeDeleteSucceeded { .. } => "cascade_delete_succeeded",
            Outcome::CascadeDeleteFailed { .. } => "cascade_delete_failed",
            Outcome::Failed(_) => "failed",
            Outcome::AreaSelected(_) => "area_selected",
            Outcome::TimeFrameShown(_) => "time_frame_shown",
            Outcome::PanelOpened(_) => "panel_opened",
            Outcome::EditCancelled => "edit_cancelled",
            Outcome::PageChanged(_) => "page_changed",
            Outcome::ErrorDismissed => "error_dismissed",
        }
    }
}
