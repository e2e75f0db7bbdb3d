use clap::{Arg, ArgAction, ArgGroup, Command};

fn limit_arg() -> Arg {
  Arg::new("limit")
    .long("limit")
    .value_name("N")
    .default_value("20")
    .help("Specifies the maximum number of results (1 - 50)")
}

pub fn materialize_subcommand() -> Command {
  Command::new("materialize")
    .version(env!("CARGO_PKG_VERSION"))
    .author(env!("CARGO_PKG_AUTHORS"))
    .about("Builds a real playlist out of a blueprint")
    .long_about(
      "Creates a new playlist on your account and fills it block by block, in \
blueprint order. Blocks that cannot deliver (a deleted show, a source that is \
briefly unreachable) are skipped and reported; the rest of the playlist is \
still built. Pass a stored blueprint by id or name, or `--file` to run one \
straight from a JSON file. `--seed` makes the random picks repeatable, which \
is mostly useful for scripting and debugging.",
    )
    .visible_alias("m")
    .arg(
      Arg::new("blueprint")
        .value_name("BLUEPRINT")
        .help("Id or name of a stored blueprint"),
    )
    .arg(
      Arg::new("file")
        .short('f')
        .long("file")
        .value_name("PATH")
        .help("Reads the blueprint from a JSON file instead of the store"),
    )
    .arg(
      Arg::new("seed")
        .long("seed")
        .value_name("U64")
        .help("Pins the random choices so reruns pick the same tracks"),
    )
    .arg(
      Arg::new("timeout")
        .long("timeout")
        .value_name("SECONDS")
        .help("Gives up if the whole run takes longer than SECONDS"),
    )
    .arg(
      Arg::new("open")
        .short('o')
        .long("open")
        .action(ArgAction::SetTrue)
        .help("Opens the created playlist in the browser"),
    )
    .group(
      ArgGroup::new("target")
        .args(["blueprint", "file"])
        .required(true)
        .multiple(false),
    )
}

pub fn blueprints_subcommand() -> Command {
  Command::new("blueprints")
    .version(env!("CARGO_PKG_VERSION"))
    .author(env!("CARGO_PKG_AUTHORS"))
    .about("Lists, shows, imports and deletes stored blueprints")
    .long_about(
      "Manages the local blueprint store. Without flags (or with `--list`) the \
stored blueprints are listed one per line. `--show` prints a single blueprint \
block by block, `--import` adds a blueprint from a JSON file and `--delete` \
removes one. Blueprints can be addressed by id or by name everywhere; an \
ambiguous name is an error rather than a guess.",
    )
    .visible_alias("b")
    .arg(
      Arg::new("list")
        .short('l')
        .long("list")
        .action(ArgAction::SetTrue)
        .help("Lists stored blueprints (default)"),
    )
    .arg(
      Arg::new("show")
        .short('s')
        .long("show")
        .value_name("BLUEPRINT")
        .help("Prints one blueprint block by block"),
    )
    .arg(
      Arg::new("import")
        .short('i')
        .long("import")
        .value_name("FILE")
        .help("Adds a blueprint from a JSON file to the store"),
    )
    .arg(
      Arg::new("delete")
        .short('d')
        .long("delete")
        .value_name("BLUEPRINT")
        .help("Removes a blueprint from the store"),
    )
    .group(
      ArgGroup::new("action")
        .args(["list", "show", "import", "delete"])
        .multiple(false),
    )
}

pub fn browse_subcommand() -> Command {
  Command::new("browse")
    .version(env!("CARGO_PKG_VERSION"))
    .author(env!("CARGO_PKG_AUTHORS"))
    .about("Lists the feeds blueprints draw content from")
    .long_about(
      "Read-only listings of everything a blueprint can reference: your \
playlists, your saved podcast shows, one show's episodes (newest first), a \
preview of your liked songs, and your current top tracks and artists. \
`--search-shows` finds shows you have not saved yet. The printed ids are what \
goes into a blueprint's blocks. `--limit` caps the number of results \
(between 1 and 50).",
    )
    .visible_alias("br")
    .arg(
      Arg::new("playlists")
        .short('p')
        .long("playlists")
        .action(ArgAction::SetTrue)
        .help("Lists your own and followed playlists"),
    )
    .arg(
      Arg::new("shows")
        .short('w')
        .long("shows")
        .action(ArgAction::SetTrue)
        .help("Lists your saved podcast shows"),
    )
    .arg(
      Arg::new("episodes")
        .short('e')
        .long("episodes")
        .value_name("SHOW_ID")
        .help("Lists a show's episodes, newest first"),
    )
    .arg(
      Arg::new("liked")
        .long("liked")
        .action(ArgAction::SetTrue)
        .help("Shows a preview of your liked songs"),
    )
    .arg(
      Arg::new("top-tracks")
        .short('t')
        .long("top-tracks")
        .action(ArgAction::SetTrue)
        .help("Lists your current top tracks"),
    )
    .arg(
      Arg::new("top-artists")
        .short('a')
        .long("top-artists")
        .action(ArgAction::SetTrue)
        .help("Lists your current top artists"),
    )
    .arg(
      Arg::new("search-shows")
        .long("search-shows")
        .value_name("QUERY")
        .help("Searches podcast shows by name"),
    )
    .arg(limit_arg())
    .group(
      ArgGroup::new("feed")
        .args([
          "playlists",
          "shows",
          "episodes",
          "liked",
          "top-tracks",
          "top-artists",
          "search-shows",
        ])
        .required(true)
        .multiple(false),
    )
}
