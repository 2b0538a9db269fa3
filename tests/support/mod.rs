//! In-memory entity services for engine tests.
//!
//! `FakeBackend` keeps collections in memory, records every call and can be
//! told to fail a given operation.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Barrier;
use uuid::Uuid;

use okr_tracker::engine::{AppState, Store};
use okr_tracker::models::*;
use okr_tracker::services::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetAreas,
    CreateArea(CreateAreaInput),
    SaveArea(Area),
    DeleteAreas,
    GetObjectives(Uuid),
    CreateObjective(Uuid, CreateObjectiveInput),
    SaveObjective(Uuid, Objective),
    DeleteObjectives(Uuid),
    GetTimeFrames,
    CreateTimeFrame(CreateTimeFrameInput),
    SaveTimeFrame(TimeFrame),
    DeleteTimeFrames,
    GetProjectName,
}

#[derive(Default)]
struct Collections {
    /// `None` means the collection was never created.
    areas: Option<Vec<Area>>,
    time_frames: Option<Vec<TimeFrame>>,
    objectives: HashMap<Uuid, Vec<Objective>>,
    project_name: Option<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    data: Mutex<Collections>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, ServiceError>>,
    /// Both initialization reads wait here when set, so they only proceed if
    /// they are in flight at the same time.
    init_barrier: Option<Arc<Barrier>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_init_barrier() -> Arc<Self> {
        Arc::new(Self {
            init_barrier: Some(Arc::new(Barrier::new(2))),
            ..Default::default()
        })
    }

    pub fn services(self: &Arc<Self>) -> Services {
        Services {
            areas: self.clone(),
            objectives: self.clone(),
            time_frames: self.clone(),
            project: self.clone(),
        }
    }

    pub fn start(self: &Arc<Self>, initial: AppState) -> Store {
        Store::start_with(self.services(), initial).0
    }

    /// Make every call of `operation` (e.g. `"areas.delete"`) fail with `error`.
    pub fn fail(&self, operation: &'static str, error: ServiceError) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn seed_areas(&self, areas: Vec<Area>) {
        self.data.lock().unwrap().areas = Some(areas);
    }

    pub fn seed_time_frames(&self, time_frames: Vec<TimeFrame>) {
        self.data.lock().unwrap().time_frames = Some(time_frames);
    }

    pub fn seed_objectives(&self, time_frame_id: Uuid, objectives: Vec<Objective>) {
        self.data
            .lock()
            .unwrap()
            .objectives
            .insert(time_frame_id, objectives);
    }

    pub fn set_project_name(&self, name: &str) {
        self.data.lock().unwrap().project_name = Some(name.to_string());
    }

    pub fn stored_objectives(&self, time_frame_id: Uuid) -> Vec<Objective> {
        self.data
            .lock()
            .unwrap()
            .objectives
            .get(&time_frame_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn init_gate(&self) {
        if let Some(barrier) = &self.init_barrier {
            barrier.wait().await;
        }
    }
}

fn missing(name: &str) -> ServiceError {
    ServiceError::CollectionNotFound {
        name: name.to_string(),
    }
}

#[async_trait]
impl AreaService for FakeBackend {
    async fn get_all(&self) -> Result<Vec<Area>, ServiceError> {
        self.init_gate().await;
        self.record("areas.get_all", Call::GetAreas)?;
        self.data.lock().unwrap().areas.clone().ok_or_else(|| missing("areas"))
    }

    async fn create(&self, input: CreateAreaInput) -> Result<Area, ServiceError> {
        self.record("areas.create", Call::CreateArea(input.clone()))?;
        let area = area_from(input);
        self.data
            .lock()
            .unwrap()
            .areas
            .get_or_insert_with(Vec::new)
            .push(area.clone());
        Ok(area)
    }

    async fn save(&self, area: Area) -> Result<Area, ServiceError> {
        self.record("areas.save", Call::SaveArea(area.clone()))?;
        let mut data = self.data.lock().unwrap();
        let slot = data
            .areas
            .as_mut()
            .and_then(|areas| areas.iter_mut().find(|a| a.id == area.id))
            .ok_or_else(|| ServiceError::not_found("Area", area.id))?;
        *slot = area.clone();
        Ok(area)
    }

    async fn delete(&self, predicate: Predicate<Area>) -> Result<(), ServiceError> {
        self.record("areas.delete", Call::DeleteAreas)?;
        let mut data = self.data.lock().unwrap();
        let areas = data.areas.as_mut().ok_or_else(|| missing("areas"))?;
        areas.retain(|a| !predicate(a));
        Ok(())
    }
}

#[async_trait]
impl ObjectiveService for FakeBackend {
    async fn get_all(&self, time_frame_id: Uuid) -> Result<Vec<Objective>, ServiceError> {
        self.record("objectives.get_all", Call::GetObjectives(time_frame_id))?;
        self.data
            .lock()
            .unwrap()
            .objectives
            .get(&time_frame_id)
            .cloned()
            .ok_or_else(|| missing("objectives"))
    }

    async fn create(
        &self,
        time_frame_id: Uuid,
        input: CreateObjectiveInput,
    ) -> Result<Objective, ServiceError> {
        self.record(
            "objectives.create",
            Call::CreateObjective(time_frame_id, input.clone()),
        )?;
        let now = Utc::now();
        let objective = Objective {
            id: Uuid::new_v4(),
            name: input.name,
            area_id: input.area_id,
            time_frame_id,
            key_results: input.key_results,
            comments: input.comments,
            order: input.order,
            created_at: now,
            updated_at: now,
        };
        self.data
            .lock()
            .unwrap()
            .objectives
            .entry(time_frame_id)
            .or_default()
            .push(objective.clone());
        Ok(objective)
    }

    async fn save(
        &self,
        time_frame_id: Uuid,
        objective: Objective,
    ) -> Result<Objective, ServiceError> {
        self.record(
            "objectives.save",
            Call::SaveObjective(time_frame_id, objective.clone()),
        )?;
        let mut data = self.data.lock().unwrap();
        let slot = data
            .objectives
            .get_mut(&time_frame_id)
            .and_then(|objectives| objectives.iter_mut().find(|o| o.id == objective.id))
            .ok_or_else(|| ServiceError::not_found("Objective", objective.id))?;
        *slot = objective.clone();
        Ok(objective)
    }

    async fn delete(
        &self,
        time_frame_id: Uuid,
        predicate: Predicate<Objective>,
    ) -> Result<(), ServiceError> {
        self.record("objectives.delete", Call::DeleteObjectives(time_frame_id))?;
        let mut data = self.data.lock().unwrap();
        let objectives = data
            .objectives
            .get_mut(&time_frame_id)
            .ok_or_else(|| missing("objectives"))?;
        objectives.retain(|o| !predicate(o));
        Ok(())
    }
}

#[async_trait]
impl TimeFrameService for FakeBackend {
    async fn get_all(&self) -> Result<Vec<TimeFrame>, ServiceError> {
        self.init_gate().await;
        self.record("time_frames.get_all", Call::GetTimeFrames)?;
        self.data
            .lock()
            .unwrap()
            .time_frames
            .clone()
            .ok_or_else(|| missing("time_frames"))
    }

    async fn create(&self, input: CreateTimeFrameInput) -> Result<TimeFrame, ServiceError> {
        self.record("time_frames.create", Call::CreateTimeFrame(input.clone()))?;
        let now = Utc::now();
        let time_frame = TimeFrame {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            name: input.name,
            is_current: input.is_current,
            order: input.order,
            created_at: now,
            updated_at: now,
        };
        self.data
            .lock()
            .unwrap()
            .time_frames
            .get_or_insert_with(Vec::new)
            .push(time_frame.clone());
        Ok(time_frame)
    }

    async fn save(&self, time_frame: TimeFrame) -> Result<TimeFrame, ServiceError> {
        self.record("time_frames.save", Call::SaveTimeFrame(time_frame.clone()))?;
        let mut data = self.data.lock().unwrap();
        let slot = data
            .time_frames
            .as_mut()
            .and_then(|tfs| tfs.iter_mut().find(|tf| tf.id == time_frame.id))
            .ok_or_else(|| ServiceError::not_found("TimeFrame", time_frame.id))?;
        *slot = time_frame.clone();
        Ok(time_frame)
    }

    async fn delete(&self, predicate: Predicate<TimeFrame>) -> Result<(), ServiceError> {
        self.record("time_frames.delete", Call::DeleteTimeFrames)?;
        let mut data = self.data.lock().unwrap();
        let time_frames = data.time_frames.as_mut().ok_or_else(|| missing("time_frames"))?;
        time_frames.retain(|tf| !predicate(tf));
        Ok(())
    }
}

#[async_trait]
impl ProjectService for FakeBackend {
    async fn project_name(&self) -> Result<String, ServiceError> {
        self.record("project.name", Call::GetProjectName)?;
        self.data
            .lock()
            .unwrap()
            .project_name
            .clone()
            .ok_or_else(|| missing("project_meta"))
    }
}

// ============================================================
// Builders
// ============================================================

fn area_from(input: CreateAreaInput) -> Area {
    let now = Utc::now();
    Area {
        id: Uuid::new_v4(),
        name: input.name,
        description: input.description,
        order: input.order,
        created_at: now,
        updated_at: now,
    }
}

pub fn area(name: &str, order: i64) -> Area {
    area_from(CreateAreaInput {
        name: name.to_string(),
        description: None,
        order,
    })
}

pub fn time_frame(name: &str, is_current: bool, order: i64) -> TimeFrame {
    let now = Utc::now();
    TimeFrame {
        id: Uuid::new_v4(),
        name: name.to_string(),
        is_current,
        order,
        created_at: now,
        updated_at: now,
    }
}

pub fn objective(name: &str, area_id: Uuid, time_frame_id: Uuid, order: i64) -> Objective {
    let now = Utc::now();
    Objective {
        id: Uuid::new_v4(),
        name: name.to_string(),
        area_id,
        time_frame_id,
        key_results: vec![],
        comments: vec![],
        order,
        created_at: now,
        updated_at: now,
    }
}

/// A state showing `time_frame` with `areas` and `objectives` loaded.
pub fn loaded_state(areas: Vec<Area>, time_frame: &TimeFrame, objectives: Vec<Objective>) -> AppState {
    AppState {
        selected_area_id: areas.first().map(|a| a.id),
        areas,
        objectives,
        time_frames: vec![time_frame.clone()],
        displayed_time_frame_id: Some(time_frame.id),
        loaded_objectives_for: Some(time_frame.id),
        initialized: true,
        ..Default::default()
    }
}

/// Wait until `ready` holds, failing the test after two seconds.
pub async fn settle(store: &Store, ready: impl FnMut(&AppState) -> bool) -> Arc<AppState> {
    tokio::time::timeout(Duration::from_secs(2), store.wait_until(ready))
        .await
        .expect("timed out waiting for state")
        .expect("store closed")
}

/// Poll `check` until it holds, failing the test after two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
