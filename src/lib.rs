#[macro_use]
extern crate tracing;

mod errors;
pub mod logging;
pub mod runner;
pub mod scenario;

pub use conference_config::{
    Args,
    Config,
};
pub use errors::init_errors;
pub use logging::init_logging;
pub use runner::run;
pub use scenario::{
    parse_scenario,
    Scenario,
};
