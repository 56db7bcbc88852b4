pub mod analytics;
pub mod appointment;
pub mod consultation;
pub mod profile;
pub mod project;
pub mod service;
