pub mod config;
pub mod profile;
pub mod reminder;
pub mod task;
pub mod timer;
pub mod trash;
