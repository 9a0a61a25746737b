pub mod conversion;
pub mod histogram;
pub mod last_touch;
