pub mod availability;
pub mod conflict;
pub mod grid;
pub mod models;
pub mod navigator;
pub mod time_basis;
