//! Utils Module
pub mod a1;
pub mod logging;

pub use a1::parse_a1;
pub use logging::init_logging;
