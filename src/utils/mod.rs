//! Utility functions and helpers.

pub mod ics;
