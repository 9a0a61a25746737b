pub mod aliases;
pub mod authority;
pub mod config;
pub mod engine;
pub mod noise;
