#![forbid(unsafe_code)]

pub mod keys;
pub mod merge;
pub mod model;
pub mod time;

pub use time::Clock;
