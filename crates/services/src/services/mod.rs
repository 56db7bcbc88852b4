pub mod analytics;
pub mod assistant;
pub mod auth;
pub mod completion;
pub mod database_validator;
pub mod identity;
pub mod media;
