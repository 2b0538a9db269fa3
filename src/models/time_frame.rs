use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to the time frame created on first use.
pub const BOOTSTRAP_TIME_FRAME_NAME: &str = "Current";

/// A planning period objectives are scoped to.
///
/// At most one time frame is current at a time. Storage does not know about
/// that rule; the engine demotes the previous current time frame whenever
/// another one is promoted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeFrame {
    pub id: Uuid,
    pub name: String,
    pub is_current: bool,
    /// Sort key among time frames, ascending.
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new time frame.
///
/// `id` lets the caller pick the identity up front. When `None`, storage
/// generates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTimeFrameInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub order: i64,
}

impl CreateTimeFrameInput {
    /// The default time frame persisted when the first area is created.
    pub fn bootstrap() -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            name: BOOTSTRAP_TIME_FRAME_NAME.to_string(),
            is_current: true,
            order: 0,
        }
    }
}

/// Input for updating an existing time frame. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTimeFrameInput {
    pub name: Option<String>,
    pub is_current: Option<bool>,
    pub order: Option<i64>,
}

impl UpdateTimeFrameInput {
    pub fn apply(&self, time_frame: &TimeFrame) -> TimeFrame {
        TimeFrame {
            name: self.name.clone().unwrap_or_else(|| time_frame.name.clone()),
            is_current: self.is_current.unwrap_or(time_frame.is_current),
            order: self.order.unwrap_or(time_frame.order),
            ..time_frame.clone()
        }
    }
}

/// Pick the time frame to display: the one flagged current, otherwise the
/// first by `order`.
pub fn default_time_frame(time_frames: &[TimeFrame]) -> Option<&TimeFrame> {
    time_frames
        .iter()
        .find(|tf| tf.is_current)
        .or_else(|| time_frames.iter().min_by_key(|tf| (tf.order, tf.id)))
}
