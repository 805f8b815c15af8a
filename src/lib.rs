pub mod application;
pub mod auth;
pub mod domain;
pub mod error;
pub mod http;
pub mod infrastructure;
pub mod validation;

pub use error::AppError;
