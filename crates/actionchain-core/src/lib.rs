pub mod config;
pub mod control;
pub mod declaration;
pub mod endpoint;
pub mod error;
pub mod io;
pub mod lifecycle;
pub mod owner;
pub mod paths;
pub mod planner;
pub mod scanner;
pub mod state_id;
pub mod top;
pub mod types;
pub mod writer;

pub use error::{ActionChainError, Result};
pub use lifecycle::ActionChainGenerator;
