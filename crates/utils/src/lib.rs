pub mod response;
pub mod sanitize;
pub mod validation;
