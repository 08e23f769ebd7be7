pub mod config;
pub mod dataset;
pub mod error;
pub mod value;

pub use config::Config;
pub use dataset::*;
pub use error::*;
pub use value::*;
