// src/lib.rs

//! Schedule scraper and cache for the Sirius University timetable.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
