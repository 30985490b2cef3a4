pub mod config;
pub mod grade;
pub mod serve;
