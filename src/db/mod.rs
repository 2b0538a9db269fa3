mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

pub const AREAS_COLLECTION: &str = "areas";
pub const TIME_FRAMES_COLLECTION: &str = "time_frames";

const PROJECT_NAME_KEY: &str = "project_name";

/// Objectives live in one collection per time frame.
pub fn objectives_collection(time_frame_id: Uuid) -> String {
    format!("objectives/{}", time_frame_id)
}

/// Raised when reading from a collection nothing was ever written to.
///
/// Callers receive it inside an [`anyhow::Error`] and can recover it with
/// `downcast_ref`.
#[derive(Debug, Error)]
#[error("Collection {0} does not exist")]
pub struct MissingCollection(pub String);

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "okr-tracker")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("okr-tracker.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Collection registry
    // ============================================================

    pub fn collection_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        collection_exists(&conn, name)
    }

    // ============================================================
    // Area operations
    // ============================================================

    pub fn get_areas(&self) -> Result<Vec<Area>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_collection(&conn, AREAS_COLLECTION)?;

        let mut stmt = conn.prepare(
            "SELECT id, name, description, sort_order, created_at, updated_at
             FROM areas ORDER BY sort_order, name",
        )?;
        let areas = stmt
            .query_map([], area_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(areas)
    }

    pub fn get_area(&self, id: Uuid) -> Result<Option<Area>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let area = conn
            .query_row(
                "SELECT id, name, description, sort_order, created_at, updated_at
                 FROM areas WHERE id = ?",
                [id.to_string()],
                area_from_row,
            )
            .optional()?;
        Ok(area)
    }

    pub fn create_area(&self, input: CreateAreaInput) -> Result<Area> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        register_collection(&conn, AREAS_COLLECTION)?;
        conn.execute(
            "INSERT INTO areas (id, name, description, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                input.order,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Area {
            id,
            name: input.name,
            description: input.description,
            order: input.order,
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrite every stored field of `area`. Returns `None` if it does not exist.
    pub fn save_area(&self, area: &Area) -> Result<Option<Area>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        let rows = conn.execute(
            "UPDATE areas SET name = ?, description = ?, sort_order = ?, updated_at = ? WHERE id = ?",
            (
                &area.name,
                &area.description,
                area.order,
                now.to_rfc3339(),
                area.id.to_string(),
            ),
        )?;

        Ok((rows > 0).then(|| Area {
            updated_at: now,
            ..area.clone()
        }))
    }

    pub fn delete_areas(&self, ids: &[Uuid]) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_collection(&conn, AREAS_COLLECTION)?;
        delete_by_ids(&conn, "DELETE FROM areas WHERE id = ?", ids)
    }

    // ============================================================
    // Time frame operations
    // ============================================================

    pub fn get_time_frames(&self) -> Result<Vec<TimeFrame>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_collection(&conn, TIME_FRAMES_COLLECTION)?;

        let mut stmt = conn.prepare(
            "SELECT id, name, is_current, sort_order, created_at, updated_at
             FROM time_frames ORDER BY sort_order, name",
        )?;
        let time_frames = stmt
            .query_map([], time_frame_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(time_frames)
    }

    pub fn create_time_frame(&self, input: CreateTimeFrameInput) -> Result<TimeFrame> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let now = Utc::now();

        register_collection(&conn, TIME_FRAMES_COLLECTION)?;
        conn.execute(
            "INSERT INTO time_frames (id, name, is_current, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                if input.is_current { 1 } else { 0 },
                input.order,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(TimeFrame {
            id,
            name: input.name,
            is_current: input.is_current,
            order: input.order,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn save_time_frame(&self, time_frame: &TimeFrame) -> Result<Option<TimeFrame>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        let rows = conn.execute(
            "UPDATE time_frames SET name = ?, is_current = ?, sort_order = ?, updated_at = ? WHERE id = ?",
            (
                &time_frame.name,
                if time_frame.is_current { 1 } else { 0 },
                time_frame.order,
                now.to_rfc3339(),
                time_frame.id.to_string(),
            ),
        )?;

        Ok((rows > 0).then(|| TimeFrame {
            updated_at: now,
            ..time_frame.clone()
        }))
    }

    pub fn delete_time_frames(&self, ids: &[Uuid]) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_collection(&conn, TIME_FRAMES_COLLECTION)?;
        delete_by_ids(&conn, "DELETE FROM time_frames WHERE id = ?", ids)
    }

    // ============================================================
    // Objective operations (scoped by time frame)
    // ============================================================

    pub fn get_objectives(&self, time_frame_id: Uuid) -> Result<Vec<Objective>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_collection(&conn, &objectives_collection(time_frame_id))?;

        let mut stmt = conn.prepare(
            "SELECT id, time_frame_id, area_id, name, key_results, comments, sort_order, created_at, updated_at
             FROM objectives WHERE time_frame_id = ? ORDER BY sort_order, name",
        )?;
        let objectives = stmt
            .query_map([time_frame_id.to_string()], objective_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(objectives)
    }

    pub fn create_objective(
        &self,
        time_frame_id: Uuid,
        input: CreateObjectiveInput,
    ) -> Result<Objective> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        register_collection(&conn, &objectives_collection(time_frame_id))?;
        conn.execute(
            "INSERT INTO objectives (id, time_frame_id, area_id, name, key_results, comments, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                time_frame_id.to_string(),
                input.area_id.to_string(),
                &input.name,
                serde_json::to_string(&input.key_results)?,
                serde_json::to_string(&input.comments)?,
                input.order,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Objective {
            id,
            name: input.name,
            area_id: input.area_id,
            time_frame_id,
            key_results: input.key_results,
            comments: input.comments,
            order: input.order,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn save_objective(
        &self,
        time_frame_id: Uuid,
        objective: &Objective,
    ) -> Result<Option<Objective>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        let rows = conn.execute(
            "UPDATE objectives
             SET area_id = ?, name = ?, key_results = ?, comments = ?, sort_order = ?, updated_at = ?
             WHERE id = ? AND time_frame_id = ?",
            (
                objective.area_id.to_string(),
                &objective.name,
                serde_json::to_string(&objective.key_results)?,
                serde_json::to_string(&objective.comments)?,
                objective.order,
                now.to_rfc3339(),
                objective.id.to_string(),
                time_frame_id.to_string(),
            ),
        )?;

        Ok((rows > 0).then(|| Objective {
            time_frame_id,
            updated_at: now,
            ..objective.clone()
        }))
    }

    pub fn delete_objectives(&self, time_frame_id: Uuid, ids: &[Uuid]) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_collection(&conn, &objectives_collection(time_frame_id))?;
        delete_by_ids(&conn, "DELETE FROM objectives WHERE id = ?", ids)
    }

    // ============================================================
    // Project metadata
    // ============================================================

    pub fn get_project_name(&self) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let name = conn
            .query_row(
                "SELECT value FROM project_meta WHERE key = ?",
                [PROJECT_NAME_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    pub fn set_project_name(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO project_meta (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (PROJECT_NAME_KEY, name, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn collection_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM collections WHERE name = ?",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn require_collection(conn: &Connection, name: &str) -> Result<()> {
    if collection_exists(conn, name)? {
        Ok(())
    } else {
        Err(MissingCollection(name.to_string()).into())
    }
}

fn register_collection(conn: &Connection, name: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)",
        (name, Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

fn delete_by_ids(conn: &Connection, sql: &str, ids: &[Uuid]) -> Result<usize> {
    let mut stmt = conn.prepare(sql)?;
    let mut deleted = 0;
    for id in ids {
        deleted += stmt.execute([id.to_string()])?;
    }
    Ok(deleted)
}

fn area_from_row(row: &Row<'_>) -> rusqlite::Result<Area> {
    Ok(Area {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        order: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn time_frame_from_row(row: &Row<'_>) -> rusqlite::Result<TimeFrame> {
    Ok(TimeFrame {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        is_current: row.get::<_, i32>(2)? != 0,
        order: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn objective_from_row(row: &Row<'_>) -> rusqlite::Result<Objective> {
    Ok(Objective {
        id: parse_uuid(row.get::<_, String>(0)?),
        time_frame_id: parse_uuid(row.get::<_, String>(1)?),
        area_id: parse_uuid(row.get::<_, String>(2)?),
        name: row.get(3)?,
        key_results: json_column(row, 4)?,
        comments: json_column(row, 5)?,
        order: row.get(6)?,
        created_at: parse_datetime(row.get::<_, String>(7)?),
        updated_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
