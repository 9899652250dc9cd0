pub mod classifier;
pub mod config;
pub mod error;
pub mod launcher;
pub mod machine;
pub mod session;
pub mod shutdown;
pub mod supervisor;
pub mod utils;

pub use config::Options;
pub use error::SupervisorError;
pub use supervisor::{ServerHandle, Supervisor};
