mod clap;
mod util;

pub use self::clap::{blueprints_subcommand, browse_subcommand, materialize_subcommand};
pub use self::util::{handle_matches, CliContext};
