#![forbid(unsafe_code)]

pub mod evaluator;
pub mod model;
pub mod time;
pub mod tracker;

pub use time::Clock;
