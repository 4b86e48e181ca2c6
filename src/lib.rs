pub mod backends;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use backends::*;
pub use error::*;
pub use models::*;
pub use services::*;
