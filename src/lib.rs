//! Air Board program summary dashboard.
//!
//! The data layer ([`data`]) is a pure load → filter → summarize pipeline;
//! [`export`] encodes a filtered view; [`app`], [`state`] and [`ui`] are the
//! egui front end on top of it.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod state;
pub mod ui;
