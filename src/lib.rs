//! Personal day planner: tasks with due dates and priorities, time tracking,
//! calendar views and notes, served over a JSON API.

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod planner;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod workspace;
