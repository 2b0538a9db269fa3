//! Entity services: the persistence boundary the engine talks to.
//!
//! Each entity kind gets its own CRUD trait. Implementations decide where data
//! lives; the engine only relies on the contract below:
//!
//! - `get_all` fails with [`ServiceError::CollectionNotFound`] when nothing of
//!   that kind was ever created, so "empty because new" can be told apart from a
//!   real failure.
//! - `save` persists a complete entity, never a partial patch.
//! - `delete` removes every entity the predicate matches.

mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::Database;
use crate::models::*;

pub use sqlite::SqliteServices;

/// Selects the entities a `delete` call removes.
pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Failure reported by an entity service.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceError {
    #[error("Collection {name} does not exist yet")]
    CollectionNotFound { name: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: Uuid },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl ServiceError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: Uuid) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id,
        }
    }

    pub fn is_collection_not_found(&self) -> bool {
        matches!(self, Self::CollectionNotFound { .. })
    }
}

#[async_trait]
pub trait AreaService: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Area>, ServiceError>;
    async fn create(&self, input: CreateAreaInput) -> Result<Area, ServiceError>;
    async fn save(&self, area: Area) -> Result<Area, ServiceError>;
    async fn delete(&self, predicate: Predicate<Area>) -> Result<(), ServiceError>;
}

/// Objectives are scoped by the id of the time frame they belong to.
#[async_trait]
pub trait ObjectiveService: Send + Sync {
    async fn get_all(&self, time_frame_id: Uuid) -> Result<Vec<Objective>, ServiceError>;
    async fn create(
        &self,
        time_frame_id: Uuid,
        input: CreateObjectiveInput,
    ) -> Result<Objective, ServiceError>;
    async fn save(
        &self,
        time_frame_id: Uuid,
        objective: Objective,
    ) -> Result<Objective, ServiceError>;
    async fn delete(
        &self,
        time_frame_id: Uuid,
        predicate: Predicate<Objective>,
    ) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait TimeFrameService: Send + Sync {
    async fn get_all(&self) -> Result<Vec<TimeFrame>, ServiceError>;
    async fn create(&self, input: CreateTimeFrameInput) -> Result<TimeFrame, ServiceError>;
    async fn save(&self, time_frame: TimeFrame) -> Result<TimeFrame, ServiceError>;
    async fn delete(&self, predicate: Predicate<TimeFrame>) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait ProjectService: Send + Sync {
    async fn project_name(&self) -> Result<String, ServiceError>;
}

/// The set of backing services handed to the engine.
#[derive(Clone)]
pub struct Services {
    pub areas: Arc<dyn AreaService>,
    pub objectives: Arc<dyn ObjectiveService>,
    pub time_frames: Arc<dyn TimeFrameService>,
    pub project: Arc<dyn ProjectService>,
}

impl Services {
    /// Back every service with the same SQLite database.
    pub fn sqlite(db: Database) -> Self {
        let backend = Arc::new(SqliteServices::new(db));
        Self {
            areas: backend.clone(),
            objectives: backend.clone(),
            time_frames: backend.clone(),
            project: backend,
        }
    }
}
