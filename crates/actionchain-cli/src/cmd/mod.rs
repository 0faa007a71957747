pub mod clean;
pub mod config;
pub mod inspect;
pub mod plan;
pub mod top;
