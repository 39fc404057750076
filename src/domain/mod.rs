//! Domain layer containing business entities and logic.
//!
//! Independent of infrastructure and presentation concerns.
//!
//! - [`entities`] - Counters and query model
//! - [`rates`] - Pure rate calculation and formatting
//! - [`repositories`] - Data access trait definitions

pub mod entities;
pub mod rates;
pub mod repositories;
