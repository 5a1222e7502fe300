//! CLI command implementations.
//!
//! | Module    | Commands handled |
//! |-----------|------------------|
//! | `analyze` | `Analyze`        |
//! | `rules`   | `Rules`          |
//! | `config`  | `Config`         |

pub mod analyze;
pub mod config;
pub mod rules;

pub use analyze::cmd_analyze;
pub use config::cmd_config;
pub use rules::cmd_rules;
