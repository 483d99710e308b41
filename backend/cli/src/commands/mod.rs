pub mod config;
pub mod list;
pub mod review;
pub mod status;
