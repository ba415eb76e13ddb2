//! bandcard-core: artist progression engine.
//!
//! Rankings, passive growth, sales milestones, career evolution and the
//! subscription-tier credit economy, persisted through one SQLite store.

pub mod achievement_engine;
pub mod batch_job;
pub mod career_progression;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod growth_engine;
pub mod model;
pub mod ranking_engine;
pub mod rng;
pub mod score_model;
pub mod store;
pub mod tier_economy;
pub mod types;
