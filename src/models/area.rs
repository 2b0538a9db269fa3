use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A grouping of objectives, such as a team or a product line.
///
/// Areas own objectives by reference only: an [`Objective`](super::Objective)
/// carries the `area_id` of the area it belongs to. Removing an area therefore
/// has to remove its objectives explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Sort key among areas, ascending.
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAreaInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i64,
}

/// Input for updating an existing area. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAreaInput {
    pub name: Option<String>,
    /// `None` keeps the description, `Some(None)` clears it. On the wire an
    /// absent field keeps it and `null` clears it.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    pub order: Option<i64>,
}

/// Deserialize a field that is present, so `null` becomes `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateAreaInput {
    /// Overlay this patch on `area`, returning the merged area.
    pub fn apply(&self, area: &Area) -> Area {
        Area {
            name: self.name.clone().unwrap_or_else(|| area.name.clone()),
            description: match &self.description {
                Some(description) => description.clone(),
                None => area.description.clone(),
            },
            order: self.order.unwrap_or(area.order),
            ..area.clone()
        }
    }
}
