//! Domain models for the OKR tracker.
//!
//! # Core Concepts
//!
//! - [`Area`]: A named grouping of objectives (a team, a product line). Objectives
//!   point back at their area through `area_id`; areas do not contain them.
//! - [`TimeFrame`]: A planning period. Objectives are stored per time frame and at
//!   most one time frame is flagged current.
//! - [`Objective`]: A goal inside an area and a time frame, measured by an ordered
//!   list of [`KeyResult`]s. Its progress is derived from key-result statuses and
//!   never persisted.
//!
//! Each entity comes with a `Create*Input` used when persisting a new value and an
//! `Update*Input` patch. Patches are applied with `apply`, which always produces a
//! complete merged copy of the entity.

mod area;
mod objective;
mod time_frame;

pub use area::*;
pub use objective::*;
pub use time_frame::*;
