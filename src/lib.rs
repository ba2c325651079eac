pub mod achievements;
pub mod api;
pub mod chapter_file;
pub mod comments;
pub mod configuration;
pub mod context;
pub mod error;
pub mod imgbb;
pub mod library;
pub mod lifetime;
pub mod model;
pub mod profile;
pub mod ratings;
pub mod reading_time;
pub mod session;
pub mod startup;
pub mod storage;
pub mod telemetry;
