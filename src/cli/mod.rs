// src/cli/mod.rs
// Command-line front end for evaluating style layers

pub mod eval_args;
pub mod eval_parsing;
pub mod eval_types;
pub mod style_eval;

pub use eval_args::EvalCliConfig;
pub use eval_types::{EvalCliError, PropertyTarget};
pub use style_eval::{run, run_style_eval_cli};
