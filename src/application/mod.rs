pub mod bootstrap;
pub mod calendar_engine;
pub mod conflict_check;
