pub mod check_config;
pub mod registry;
pub mod serve;
