//! egui front end: filter panel, KPIs and charts, filtered table.

pub mod charts;
pub mod format;
pub mod panels;
pub mod table;
