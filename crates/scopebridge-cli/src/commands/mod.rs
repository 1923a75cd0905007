pub mod check_config;
pub mod replay;

pub use check_config::CheckConfigCommand;
pub use replay::ReplayCommand;
