use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Gap left between consecutive objectives so new ones sort last without
/// renumbering the rest.
pub const ORDER_STEP: i64 = 10;

/// A goal within an area for one time frame.
///
/// Objectives are stored per time frame (`time_frame_id` is their storage
/// scope) and reference their area through `area_id`. Progress is never
/// stored; call [`Objective::progress`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: Uuid,
    pub name: String,
    pub area_id: Uuid,
    pub time_frame_id: Uuid,
    pub key_results: Vec<KeyResult>,
    pub comments: Vec<String>,
    /// Rank among the objectives of the same time frame, ascending.
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Objective {
    /// Share of key results that are complete, in `0.0..=1.0`.
    ///
    /// An objective without key results has no progress.
    pub fn progress(&self) -> f64 {
        if self.key_results.is_empty() {
            return 0.0;
        }
        let complete = self
            .key_results
            .iter()
            .filter(|kr| kr.status == KeyResultStatus::Complete)
            .count();
        complete as f64 / self.key_results.len() as f64
    }

    pub fn key_result(&self, id: Uuid) -> Option<&KeyResult> {
        self.key_results.iter().find(|kr| kr.id == id)
    }

    /// Copy of this objective with the key result sharing `key_result.id`
    /// replaced. Returns `None` when no such key result exists.
    pub fn with_key_result(&self, key_result: KeyResult) -> Option<Objective> {
        let index = self
            .key_results
            .iter()
            .position(|kr| kr.id == key_result.id)?;
        let mut updated = self.clone();
        updated.key_results[index] = key_result;
        Some(updated)
    }
}

/// A measurable sub-item of an objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: Uuid,
    pub content: String,
    pub status: KeyResultStatus,
    #[serde(default)]
    pub comment: String,
}

impl KeyResult {
    /// A fresh, queued key result.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            status: KeyResultStatus::Queued,
            comment: String::new(),
        }
    }
}

/// Where a key result stands.
///
/// - `Queued`: Not started
/// - `InProgress`: Being worked on
/// - `Complete`: Done, counts toward progress
/// - `AtRisk`: Started but may not land this time frame
/// - `OffTrack`: Will not land without a change of plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyResultStatus {
    #[default]
    Queued,
    InProgress,
    Complete,
    AtRisk,
    OffTrack,
}

impl KeyResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::AtRisk => "at_risk",
            Self::OffTrack => "off_track",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "in_progress" => Some(Self::InProgress),
            "complete" => Some(Self::Complete),
            "at_risk" => Some(Self::AtRisk),
            "off_track" => Some(Self::OffTrack),
            _ => None,
        }
    }
}

/// What the UI submits to create an objective. The engine assigns `order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObjective {
    pub name: String,
    pub area_id: Uuid,
    pub time_frame_id: Uuid,
    #[serde(default)]
    pub key_results: Vec<KeyResult>,
    #[serde(default)]
    pub comments: Vec<String>,
}

/// Input for persisting a new objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateObjectiveInput {
    pub name: String,
    pub area_id: Uuid,
    pub key_results: Vec<KeyResult>,
    pub comments: Vec<String>,
    pub order: i64,
}

impl NewObjective {
    /// Turn the submitted objective into a create input ranked last among
    /// `siblings`.
    ///
    /// Only siblings in the same time frame count toward the rank.
    pub fn into_input(self, siblings: &[Objective]) -> CreateObjectiveInput {
        let order = next_order(siblings, self.time_frame_id);
        CreateObjectiveInput {
            name: self.name,
            area_id: self.area_id,
            key_results: self.key_results,
            comments: self.comments,
            order,
        }
    }
}

/// `max(order of objectives in time_frame_id, 0) + ORDER_STEP`.
pub fn next_order(objectives: &[Objective], time_frame_id: Uuid) -> i64 {
    objectives
        .iter()
        .filter(|o| o.time_frame_id == time_frame_id)
        .map(|o| o.order)
        .fold(0, i64::max)
        + ORDER_STEP
}

/// Input for updating an existing objective. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateObjectiveInput {
    pub name: Option<String>,
    /// Move the objective to another area.
    pub area_id: Option<Uuid>,
    /// Replaces the whole key-result list when set.
    pub key_results: Option<Vec<KeyResult>>,
    pub comments: Option<Vec<String>>,
    pub order: Option<i64>,
}

impl UpdateObjectiveInput {
    pub fn apply(&self, objective: &Objective) -> Objective {
        Objective {
            name: self.name.clone().unwrap_or_else(|| objective.name.clone()),
            area_id: self.area_id.unwrap_or(objective.area_id),
            key_results: self
                .key_results
                .clone()
                .unwrap_or_else(|| objective.key_results.clone()),
            comments: self
                .comments
                .clone()
                .unwrap_or_else(|| objective.comments.clone()),
            order: self.order.unwrap_or(objective.order),
            ..objective.clone()
        }
    }
}

/// Patch for a single key result: status, comment or wording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateKeyResultInput {
    pub content: Option<String>,
    pub status: Option<KeyResultStatus>,
    pub comment: Option<String>,
}

impl UpdateKeyResultInput {
    pub fn apply(&self, key_result: &KeyResult) -> KeyResult {
        KeyResult {
            id: key_result.id,
            content: self
                .content
                .clone()
                .unwrap_or_else(|| key_result.content.clone()),
            status: self.status.unwrap_or(key_result.status),
            comment: self
                .comment
                .clone()
                .unwrap_or_else(|| key_result.comment.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objective(time_frame_id: Uuid, order: i64) -> Objective {
        let now = Utc::now();
        Objective {
            id: Uuid::new_v4(),
            name: "Ship it".to_string(),
            area_id: Uuid::new_v4(),
            time_frame_id,
            key_results: vec![],
            comments: vec![],
            order,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn next_order_starts_at_ten() {
        assert_eq!(next_order(&[], Uuid::new_v4()), 10);
    }

    #[test]
    fn next_order_ignores_other_time_frames() {
        let tf = Uuid::new_v4();
        let objectives = vec![objective(tf, 20), objective(Uuid::new_v4(), 90)];
        assert_eq!(next_order(&objectives, tf), 30);
    }

    #[test]
    fn next_order_clamps_negative_orders_to_zero() {
        let tf = Uuid::new_v4();
        assert_eq!(next_order(&[objective(tf, -40)], tf), 10);
    }

    #[test]
    fn progress_counts_complete_key_results() {
        let mut o = objective(Uuid::new_v4(), 10);
        assert_eq!(o.progress(), 0.0);

        let mut done = KeyResult::new("a");
        done.status = KeyResultStatus::Complete;
        let mut risky = KeyResult::new("b");
        risky.status = KeyResultStatus::AtRisk;
        o.key_results = vec![done, risky];
        assert_eq!(o.progress(), 0.5);
    }

    #[test]
    fn update_does_not_touch_the_input() {
        let original = objective(Uuid::new_v4(), 10);
        let patch = UpdateObjectiveInput {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let merged = patch.apply(&original);
        assert_eq!(merged.name, "Renamed");
        assert_eq!(original.name, "Ship it");
        assert_eq!(merged.id, original.id);
        assert_eq!(merged.order, original.order);
    }

    #[test]
    fn with_key_result_replaces_by_id() {
        let mut o = objective(Uuid::new_v4(), 10);
        let k1 = KeyResult::new("one");
        let k2 = KeyResult::new("two");
        o.key_results = vec![k1.clone(), k2.clone()];

        let edited = UpdateKeyResultInput {
            status: Some(KeyResultStatus::InProgress),
            ..Default::default()
        }
        .apply(&k2);
        let updated = o.with_key_result(edited).unwrap();

        assert_eq!(updated.key_results[0], k1);
        assert_eq!(updated.key_results[1].status, KeyResultStatus::InProgress);
        assert!(o.with_key_result(KeyResult::new("ghost")).is_none());
    }
}
