pub mod ai;
pub mod analytics;
pub mod appointments;
pub mod auth;
pub mod consultations;
pub mod health;
pub mod projects;
pub mod services;
pub mod upload;
