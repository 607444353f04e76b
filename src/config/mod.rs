pub mod error;
pub mod proc_loader;
pub mod proc_validator;
pub mod settings;

pub use error::ConfigError;
pub use settings::DemoConfig;
