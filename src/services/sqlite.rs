use async_trait::async_trait;
use uuid::Uuid;

use super::*;
use crate::db::MissingCollection;

/// Entity services backed by the local SQLite [`Database`].
///
/// Database calls block, so each one runs on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteServices {
    db: Database,
}

impl SqliteServices {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| ServiceError::storage(format!("spawn_blocking failed: {e}")))?
            .map_err(classify)
    }
}

/// Keep "collection does not exist" distinguishable from other failures.
fn classify(err: anyhow::Error) -> ServiceError {
    match err.downcast_ref::<MissingCollection>() {
        Some(MissingCollection(name)) => ServiceError::CollectionNotFound { name: name.clone() },
        None => {
            tracing::error!("Storage error: {:#}", err);
            ServiceError::storage(format!("{err:#}"))
        }
    }
}

#[async_trait]
impl AreaService for SqliteServices {
    async fn get_all(&self) -> Result<Vec<Area>, ServiceError> {
        self.run(|db| db.get_areas()).await
    }

    async fn create(&self, input: CreateAreaInput) -> Result<Area, ServiceError> {
        self.run(move |db| db.create_area(input)).await
    }

    async fn save(&self, area: Area) -> Result<Area, ServiceError> {
        let id = area.id;
        self.run(move |db| db.save_area(&area))
            .await?
            .ok_or_else(|| ServiceError::not_found("Area", id))
    }

    async fn delete(&self, predicate: Predicate<Area>) -> Result<(), ServiceError> {
        self.run(move |db| {
            let ids: Vec<Uuid> = db
                .get_areas()?
                .iter()
                .filter(|area| predicate(*area))
                .map(|area| area.id)
                .collect();
            db.delete_areas(&ids)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectiveService for SqliteServices {
    async fn get_all(&self, time_frame_id: Uuid) -> Result<Vec<Objective>, ServiceError> {
        self.run(move |db| db.get_objectives(time_frame_id)).await
    }

    async fn create(
        &self,
        time_frame_id: Uuid,
        input: CreateObjectiveInput,
    ) -> Result<Objective, ServiceError> {
        self.run(move |db| db.create_objective(time_frame_id, input))
            .await
    }

    async fn save(
        &self,
        time_frame_id: Uuid,
        objective: Objective,
    ) -> Result<Objective, ServiceError> {
        let id = objective.id;
        self.run(move |db| db.save_objective(time_frame_id, &objective))
            .await?
            .ok_or_else(|| ServiceError::not_found("Objective", id))
    }

    async fn delete(
        &self,
        time_frame_id: Uuid,
        predicate: Predicate<Objective>,
    ) -> Result<(), ServiceError> {
        self.run(move |db| {
            let ids: Vec<Uuid> = db
                .get_objectives(time_frame_id)?
                .iter()
                .filter(|objective| predicate(*objective))
                .map(|objective| objective.id)
                .collect();
            db.delete_objectives(time_frame_id, &ids)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TimeFrameService for SqliteServices {
    async fn get_all(&self) -> Result<Vec<TimeFrame>, ServiceError> {
        self.run(|db| db.get_time_frames()).await
    }

    async fn create(&self, input: CreateTimeFrameInput) -> Result<TimeFrame, ServiceError> {
        self.run(move |db| db.create_time_frame(input)).await
    }

    async fn save(&self, time_frame: TimeFrame) -> Result<TimeFrame, ServiceError> {
        let id = time_frame.id;
        self.run(move |db| db.save_time_frame(&time_frame))
            .await?
            .ok_or_else(|| ServiceError::not_found("TimeFrame", id))
    }

    async fn delete(&self, predicate: Predicate<TimeFrame>) -> Result<(), ServiceError> {
        self.run(move |db| {
            let ids: Vec<Uuid> = db
                .get_time_frames()?
                .iter()
                .filter(|tf| predicate(*tf))
                .map(|tf| tf.id)
                .collect();
            db.delete_time_frames(&ids)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectService for SqliteServices {
    async fn project_name(&self) -> Result<String, ServiceError> {
        self.run(|db| db.get_project_name())
            .await?
            .ok_or_else(|| ServiceError::CollectionNotFound {
                name: "project_meta".to_string(),
            })
    }
}
