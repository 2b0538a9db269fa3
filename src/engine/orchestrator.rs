//! Translates requests into service calls.
//!
//! Every request ends in exactly one terminal [`Outcome`] sent to the outbox,
//! however many service calls it chains. Two requests start a second, separate
//! piece of work with its own outcome: `DeleteArea` reports `AreaDeleted` first
//! and the objective cleanup reports later, and the first `CreateArea` also
//! persists the default time frame.

use std::future::Future;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use super::action::{Operation, Outcome, Request};
use super::error::EngineError;
use super::state::AppState;
use crate::models::*;
use crate::services::{ServiceError, Services};

pub struct Orchestrator {
    services: Services,
    outbox: UnboundedSender<Outcome>,
    /// Id of the default time frame being created, until its outcome is seen.
    bootstrap: Option<Uuid>,
}

impl Orchestrator {
    pub fn new(services: Services, outbox: UnboundedSender<Outcome>) -> Self {
        Self {
            services,
            outbox,
            bootstrap: None,
        }
    }

    /// Track outcomes that settle work started here. The store calls this for
    /// every outcome before reducing it.
    pub fn observe(&mut self, outcome: &Outcome) {
        let Some(pending) = self.bootstrap else {
            return;
        };
        let settled = match outcome {
            Outcome::TimeFrameCreated { created, .. } => created.id == pending,
            Outcome::TimeFramesLoaded(time_frames) => time_frames.iter().any(|tf| tf.is_current),
            Outcome::Failed(EngineError::OperationFailed { operation, .. }) => {
                *operation == Operation::CreateTimeFrame
            }
            _ => false,
        };
        if settled {
            self.bootstrap = None;
        }
    }

    /// Start handling `request` against the current snapshot.
    ///
    /// Returns as soon as the work is scheduled. Must run inside a tokio runtime.
    pub fn handle(&mut self, request: Request, state: &AppState) {
        tracing::debug!(request = request.name(), "Handling request");

        match request {
            Request::CreateObjective(new) => self.create_objective(new, state),
            Request::EditObjective { objective, patch } => {
                let merged = patch.apply(&objective);
                let objectives = self.services.objectives.clone();
                self.spawn(async move {
                    match objectives.save(merged.time_frame_id, merged).await {
                        Ok(saved) => Outcome::ObjectiveEdited(saved),
                        Err(e) => Outcome::failed(Operation::EditObjective, e),
                    }
                });
            }
            Request::EditKeyResult {
                objective_id,
                key_result_id,
                patch,
            } => self.edit_key_result(objective_id, key_result_id, patch, state),
            Request::DeleteObjective(id) => self.delete_objective(id, state),
            Request::CreateArea(input) => self.create_area(input, state),
            Request::EditArea { area, patch } => {
                let merged = patch.apply(&area);
                let areas = self.services.areas.clone();
                self.spawn(async move {
                    match areas.save(merged).await {
                        Ok(saved) => Outcome::AreaEdited(saved),
                        Err(e) => Outcome::failed(Operation::EditArea, e),
                    }
                });
            }
            Request::DeleteArea(id) => self.delete_area(id, state),
            Request::GetObjectives(time_frame_id) => {
                let objectives = self.services.objectives.clone();
                self.spawn(async move {
                    match objectives.get_all(time_frame_id).await {
                        Ok(objectives) => Outcome::ObjectivesLoaded {
                            time_frame_id,
                            objectives,
                        },
                        // No objective was ever created in this time frame.
                        Err(e) if e.is_collection_not_found() => Outcome::ObjectivesLoaded {
                            time_frame_id,
                            objectives: vec![],
                        },
                        Err(e) => Outcome::failed(Operation::GetObjectives, e),
                    }
                });
            }
            Request::GetAreas => {
                let areas = self.services.areas.clone();
                self.spawn(async move {
                    match areas.get_all().await {
                        Ok(areas) => Outcome::AreasLoaded(areas),
                        Err(e) if e.is_collection_not_found() => Outcome::AreasLoaded(vec![]),
                        Err(e) => Outcome::failed(Operation::GetAreas, e),
                    }
                });
            }
            Request::GetTimeFrames => {
                let time_frames = self.services.time_frames.clone();
                self.spawn(async move {
                    match time_frames.get_all().await {
                        Ok(time_frames) => Outcome::TimeFramesLoaded(time_frames),
                        Err(e) if e.is_collection_not_found() => {
                            Outcome::TimeFramesLoaded(vec![])
                        }
                        Err(e) => Outcome::failed(Operation::GetTimeFrames, e),
                    }
                });
            }
            Request::CreateTimeFrame(input) => self.create_time_frame(input, state),
            Request::EditTimeFrame { time_frame, patch } => {
                self.edit_time_frame(patch.apply(&time_frame), state)
            }
            Request::Initialize => self.initialize(),
            Request::GetProjectName => {
                let project = self.services.project.clone();
                self.spawn(async move {
                    match project.project_name().await {
                        Ok(name) => Outcome::ProjectNameLoaded(Some(name)),
                        Err(e) if e.is_collection_not_found() => Outcome::ProjectNameLoaded(None),
                        Err(e) => Outcome::failed(Operation::GetProjectName, e),
                    }
                });
            }
            Request::SelectArea(area) => self.emit(Outcome::AreaSelected(area.id)),
            Request::ShowTimeFrame(id) => self.emit(Outcome::TimeFrameShown(id)),
            Request::OpenPanel(panel) => self.emit(Outcome::PanelOpened(panel)),
            Request::CancelEdit => self.emit(Outcome::EditCancelled),
            Request::NavigateTo(page) => self.emit(Outcome::PageChanged(page)),
            Request::DismissError => self.emit(Outcome::ErrorDismissed),
        }
    }

    fn create_objective(&self, new: NewObjective, state: &AppState) {
        let time_frame_id = new.time_frame_id;
        // Siblings in state are only complete for the time frame they were
        // loaded for. Anything else is ranked against storage.
        let loaded = (state.loaded_objectives_for == Some(time_frame_id))
            .then(|| state.objectives.clone());

        let objectives = self.services.objectives.clone();
        self.spawn(async move {
            let siblings = match loaded {
                Some(siblings) => siblings,
                None => match objectives.get_all(time_frame_id).await {
                    Ok(siblings) => siblings,
                    Err(e) if e.is_collection_not_found() => vec![],
                    Err(e) => return Outcome::failed(Operation::CreateObjective, e),
                },
            };
            let input = new.into_input(&siblings);
            tracing::debug!(order = input.order, "Creating objective");

            match objectives.create(time_frame_id, input).await {
                Ok(created) => Outcome::ObjectiveCreated(created),
                Err(e) => Outcome::failed(Operation::CreateObjective, e),
            }
        });
    }

    fn edit_key_result(
        &self,
        objective_id: Uuid,
        key_result_id: Uuid,
        patch: UpdateKeyResultInput,
        state: &AppState,
    ) {
        let Some(objective) = state.objective(objective_id) else {
            return self.emit(Outcome::Failed(EngineError::missing(
                Operation::EditKeyResult,
                format!("objective {objective_id}"),
            )));
        };
        let Some(merged) = objective
            .key_result(key_result_id)
            .map(|kr| patch.apply(kr))
            .and_then(|kr| objective.with_key_result(kr))
        else {
            return self.emit(Outcome::Failed(EngineError::missing(
                Operation::EditKeyResult,
                format!("key result {key_result_id}"),
            )));
        };

        let objectives = self.services.objectives.clone();
        self.spawn(async move {
            match objectives.save(merged.time_frame_id, merged).await {
                Ok(saved) => match saved.key_result(key_result_id) {
                    Some(key_result) => Outcome::KeyResultEdited {
                        objective_id,
                        key_result: key_result.clone(),
                    },
                    None => Outcome::ObjectiveEdited(saved),
                },
                Err(e) => Outcome::failed(Operation::EditKeyResult, e),
            }
        });
    }

    fn delete_objective(&self, id: Uuid, state: &AppState) {
        let scope = state
            .objective(id)
            .map(|o| o.time_frame_id)
            .or(state.displayed_time_frame_id);
        let Some(time_frame_id) = scope else {
            return self.emit(Outcome::Failed(EngineError::missing(
                Operation::DeleteObjective,
                "a displayed time frame",
            )));
        };

        let objectives = self.services.objectives.clone();
        self.spawn(async move {
            match objectives
                .delete(time_frame_id, Box::new(move |o: &Objective| o.id == id))
                .await
            {
                Ok(()) => Outcome::ObjectiveDeleted(id),
                Err(e) => Outcome::failed(Operation::DeleteObjective, e),
            }
        });
    }

    fn create_area(&mut self, input: CreateAreaInput, state: &AppState) {
        // Objective views need a time frame. On first use persist one
        // alongside the area instead of waiting for it.
        if state.areas.is_empty()
            && state.displayed_time_frame_id.is_none()
            && self.bootstrap.is_none()
        {
            self.bootstrap_time_frame();
        }

        let areas = self.services.areas.clone();
        self.spawn(async move {
            match areas.create(input).await {
                Ok(created) => Outcome::AreaCreated(created),
                Err(e) => Outcome::failed(Operation::CreateArea, e),
            }
        });
    }

    /// Persist the default current time frame unless storage already has a
    /// current one the snapshot has not seen yet.
    fn bootstrap_time_frame(&mut self) {
        let input = CreateTimeFrameInput::bootstrap();
        self.bootstrap = input.id;

        let time_frames = self.services.time_frames.clone();
        self.spawn(async move {
            let existing = match time_frames.get_all().await {
                Ok(existing) => existing,
                Err(e) if e.is_collection_not_found() => vec![],
                Err(e) => return Outcome::failed(Operation::CreateTimeFrame, e),
            };
            if existing.iter().any(|tf| tf.is_current) {
                tracing::debug!("Current time frame already stored, skipping the default one");
                return Outcome::TimeFramesLoaded(existing);
            }

            tracing::info!("No time frame yet, creating the default one");
            match time_frames.create(input).await {
                Ok(created) => Outcome::TimeFrameCreated {
                    created,
                    demoted: vec![],
                },
                Err(e) => Outcome::failed(Operation::CreateTimeFrame, e),
            }
        });
    }

    fn delete_area(&self, id: Uuid, state: &AppState) {
        let areas = self.services.areas.clone();
        let objectives = self.services.objectives.clone();
        let time_frames = self.services.time_frames.clone();
        let known: Vec<Uuid> = state.time_frames.iter().map(|tf| tf.id).collect();
        let outbox = self.outbox.clone();

        tokio::spawn(async move {
            if let Err(e) = areas.delete(Box::new(move |a: &Area| a.id == id)).await {
                tracing::warn!(area_id = %id, "Deleting area failed: {}", e);
                let _ = outbox.send(Outcome::failed(Operation::DeleteArea, e));
                return;
            }
            let _ = outbox.send(Outcome::AreaDeleted(id));

            // Fire-and-forget relative to the area outcome above.
            let cleanup = async move {
                let scopes = cascade_scopes(time_frames.as_ref(), known).await?;
                remove_area_objectives(objectives.as_ref(), id, scopes).await
            };
            let outcome = match cleanup.await {
                Ok(()) => Outcome::CascadeDeleteSucceeded { area_id: id },
                Err(e) => {
                    tracing::warn!(area_id = %id, "Cascade delete failed: {}", e);
                    Outcome::CascadeDeleteFailed { area_id: id, error: e }
                }
            };
            let _ = outbox.send(outcome);
        });
    }

    fn create_time_frame(&self, input: CreateTimeFrameInput, state: &AppState) {
        let to_demote: Vec<TimeFrame> = if input.is_current {
            currently_current(state, input.id)
        } else {
            vec![]
        };

        let time_frames = self.services.time_frames.clone();
        self.spawn(async move {
            let result = async {
                let created = time_frames.create(input).await?;
                let demoted = demote(time_frames.as_ref(), to_demote).await?;
                Ok::<_, ServiceError>((created, demoted))
            }
            .await;

            match result {
                Ok((created, demoted)) => Outcome::TimeFrameCreated { created, demoted },
                Err(e) => Outcome::failed(Operation::CreateTimeFrame, e),
            }
        });
    }

    fn edit_time_frame(&self, merged: TimeFrame, state: &AppState) {
        let to_demote: Vec<TimeFrame> = if merged.is_current {
            currently_current(state, Some(merged.id))
        } else {
            vec![]
        };

        let time_frames = self.services.time_frames.clone();
        self.spawn(async move {
            let result = async {
                let saved = time_frames.save(merged).await?;
                let mut changed = vec![saved];
                changed.extend(demote(time_frames.as_ref(), to_demote).await?);
                Ok::<_, ServiceError>(changed)
            }
            .await;

            match result {
                Ok(changed) => Outcome::TimeFramesEdited(changed),
                Err(e) => Outcome::failed(Operation::EditTimeFrame, e),
            }
        });
    }

    fn initialize(&self) {
        let time_frames = self.services.time_frames.clone();
        let areas = self.services.areas.clone();

        self.spawn(async move {
            let (time_frames, areas) = tokio::join!(time_frames.get_all(), areas.get_all());

            match (time_frames, areas) {
                (Ok(time_frames), Ok(areas)) => Outcome::InitializeSucceeded { areas, time_frames },
                (Err(t), Err(a)) if t.is_collection_not_found() && a.is_collection_not_found() => {
                    tracing::info!("Nothing stored yet, starting empty");
                    Outcome::InitializedWithNoData
                }
                // One collection exists and the other was never written to.
                (Ok(time_frames), Err(e)) if e.is_collection_not_found() => {
                    Outcome::InitializeSucceeded {
                        areas: vec![],
                        time_frames,
                    }
                }
                (Err(e), Ok(areas)) if e.is_collection_not_found() => {
                    Outcome::InitializeSucceeded {
                        areas,
                        time_frames: vec![],
                    }
                }
                (Err(e), _) | (_, Err(e)) => Outcome::failed(Operation::Initialize, e),
            }
        });
    }

    /// Run `work` on its own task and send its outcome to the outbox.
    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let outbox = self.outbox.clone();
        tokio::spawn(async move {
            let outcome = work.await;
            if let Outcome::Failed(e) = &outcome {
                tracing::warn!(scope = ?e.scope(), "{}", e);
            }
            let _ = outbox.send(outcome);
        });
    }

    fn emit(&self, outcome: Outcome) {
        if let Outcome::Failed(e) = &outcome {
            tracing::warn!(scope = ?e.scope(), "{}", e);
        }
        if self.outbox.send(outcome).is_err() {
            tracing::debug!("Outcome dropped, store is shutting down");
        }
    }
}

/// Time frames flagged current, other than `except`.
fn currently_current(state: &AppState, except: Option<Uuid>) -> Vec<TimeFrame> {
    state
        .time_frames
        .iter()
        .filter(|tf| tf.is_current && Some(tf.id) != except)
        .cloned()
        .collect()
}

/// Clear the current flag on each time frame, one save at a time.
async fn demote(
    service: &dyn crate::services::TimeFrameService,
    time_frames: Vec<TimeFrame>,
) -> Result<Vec<TimeFrame>, ServiceError> {
    let mut demoted = Vec::with_capacity(time_frames.len());
    for time_frame in time_frames {
        let patch = UpdateTimeFrameInput {
            is_current: Some(false),
            ..Default::default()
        };
        demoted.push(service.save(patch.apply(&time_frame)).await?);
    }
    Ok(demoted)
}

/// Every time frame that may hold objectives: the stored ones plus any the
/// snapshot knows about.
async fn cascade_scopes(
    service: &dyn crate::services::TimeFrameService,
    known: Vec<Uuid>,
) -> Result<Vec<Uuid>, ServiceError> {
    let stored = match service.get_all().await {
        Ok(stored) => stored,
        Err(e) if e.is_collection_not_found() => vec![],
        Err(e) => return Err(e),
    };
    let mut scopes = known;
    for time_frame in stored {
        if !scopes.contains(&time_frame.id) {
            scopes.push(time_frame.id);
        }
    }
    Ok(scopes)
}

/// Delete the objectives of `area_id` in every time frame.
///
/// Time frames that never stored an objective have nothing to remove.
async fn remove_area_objectives(
    service: &dyn crate::services::ObjectiveService,
    area_id: Uuid,
    time_frame_ids: Vec<Uuid>,
) -> Result<(), ServiceError> {
    for time_frame_id in time_frame_ids {
        match service
            .delete(time_frame_id, Box::new(move |o: &Objective| o.area_id == area_id))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_collection_not_found() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
