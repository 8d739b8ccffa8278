// src/models/mod.rs

//! Domain models for the schedule scraper.

mod cache;
mod entity;
mod event;
mod session;

// Re-export all public types
pub use cache::{CacheRecord, WeekSlot};
pub use entity::{EntityClass, PageTarget, load_roster};
pub use event::{Event, TeacherRef};
pub use session::{
    InitialData, RemoteCall, SESSION_COOKIE_NAME, ServerMemo, Session, UpdateResponse,
};
