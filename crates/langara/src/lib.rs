pub mod config;
pub mod db;
pub mod professors;
pub mod scheduler;
pub mod server;
pub mod timetable;
pub mod transfer;
pub mod types;
