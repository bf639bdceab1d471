pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;

pub use cache::{GvlManager, GvlManagerBuilder, LoadHandle, VendorRecord};
pub use config::GvlConfig;
pub use error::GvlError;
