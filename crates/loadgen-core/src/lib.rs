pub mod attempt_log;
pub mod config;
pub mod driver;
pub mod environment;
pub mod error;
pub mod executor;
pub mod report;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use attempt_log::*;
pub use config::*;
pub use driver::*;
pub use environment::*;
pub use error::*;
pub use executor::*;
pub use report::*;
pub use stats::*;
