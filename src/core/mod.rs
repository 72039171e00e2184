pub mod copier;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod planner;
