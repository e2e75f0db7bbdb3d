use anyhow::{anyhow, Result};
use clap::ArgMatches;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use crate::core::blocks::{Block, BlockKind, Blueprint, LIKED_SOURCE_ID};
use crate::core::fetch::SourceFetch;
use crate::core::materialize::{materialize, materialize_with_timeout, MaterializeOutcome};
use crate::infra::spotify::{BrowseRow, SpotifyClient};
use crate::infra::store::{read_blueprint_file, BlueprintStore};

/// Everything the command handlers need.
pub struct CliContext {
  pub client: SpotifyClient,
  pub store: BlueprintStore,
}

// Which feed `browse` prints
pub enum Feed {
  Playlists,
  Shows,
  Episodes(String),
  Liked,
  TopTracks,
  TopArtists,
  SearchShows(String),
}

impl Feed {
  pub fn from_matches(m: &ArgMatches) -> Self {
    if m.get_flag("playlists") {
      Self::Playlists
    } else if m.get_flag("shows") {
      Self::Shows
    } else if let Some(show_id) = m.get_one::<String>("episodes") {
      Self::Episodes(show_id.clone())
    } else if m.get_flag("liked") {
      Self::Liked
    } else if m.get_flag("top-tracks") {
      Self::TopTracks
    } else if m.get_flag("top-artists") {
      Self::TopArtists
    } else if let Some(query) = m.get_one::<String>("search-shows") {
      Self::SearchShows(query.clone())
    }
    // Enforced by clap
    else {
      unreachable!()
    }
  }
}

// What `blueprints` does; listing is the default
pub enum StoreAction {
  List,
  Show(String),
  Import(String),
  Delete(String),
}

impl StoreAction {
  pub fn from_matches(m: &ArgMatches) -> Self {
    if let Some(query) = m.get_one::<String>("show") {
      Self::Show(query.clone())
    } else if let Some(path) = m.get_one::<String>("import") {
      Self::Import(path.clone())
    } else if let Some(query) = m.get_one::<String>("delete") {
      Self::Delete(query.clone())
    } else {
      Self::List
    }
  }
}

pub async fn handle_matches(matches: &ArgMatches, cmd: String, ctx: CliContext) -> Result<String> {
  match cmd.as_str() {
    "materialize" => handle_materialize(matches, &ctx).await,
    "blueprints" => handle_blueprints(matches, &ctx),
    "browse" => handle_browse(matches, &ctx).await,
    // Enforced by clap
    _ => unreachable!(),
  }
}

async fn handle_materialize(m: &ArgMatches, ctx: &CliContext) -> Result<String> {
  let blueprint = if let Some(path) = m.get_one::<String>("file") {
    read_blueprint_file(Path::new(path))?
  } else {
    // Save, because clap requires one of the two
    let query = m.get_one::<String>("blueprint").unwrap();
    ctx
      .store
      .find(query)?
      .ok_or_else(|| anyhow!("No blueprint named `{}`", query))?
  };

  let incomplete = blueprint.incomplete_blocks();
  if !incomplete.is_empty() {
    let titles: Vec<&str> = incomplete.iter().map(|b| b.title.as_str()).collect();
    return Err(anyhow!(
      "`{}` is not ready to run; these blocks still need content: {}",
      blueprint.name,
      titles.join(", ")
    ));
  }

  let mut rng = match m.get_one::<String>("seed") {
    Some(raw) => {
      let seed = raw
        .parse::<u64>()
        .map_err(|_| anyhow!("`{}` is not a valid seed", raw))?;
      StdRng::seed_from_u64(seed)
    }
    None => StdRng::from_entropy(),
  };

  let outcome = match m.get_one::<String>("timeout") {
    Some(raw) => {
      let secs = raw
        .parse::<u64>()
        .map_err(|_| anyhow!("`{}` is not a valid number of seconds", raw))?;
      materialize_with_timeout(&ctx.client, &blueprint, &mut rng, Duration::from_secs(secs)).await?
    }
    None => materialize(&ctx.client, &blueprint, &mut rng).await?,
  };

  let mut report = render_report(&blueprint, &outcome);
  if m.get_flag("open") {
    if let Err(e) = open::that(&outcome.playlist_url) {
      let _ = write!(report, "\nCould not open the browser: {}", e);
    }
  }
  Ok(report)
}

fn render_report(blueprint: &Blueprint, outcome: &MaterializeOutcome) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Materialized `{}`", blueprint.name);

  let width = blueprint
    .blocks
    .iter()
    .map(|b| b.title.chars().count())
    .max()
    .unwrap_or(0);
  for (block, resolved) in blueprint.blocks.iter().zip(&outcome.blocks) {
    let status = match &resolved.error {
      Some(kind) => format!("failed ({})", kind),
      None if resolved.uris.is_empty() => "empty".to_string(),
      None if resolved.uris.len() == 1 => "1 item".to_string(),
      None => format!("{} items", resolved.uris.len()),
    };
    let _ = writeln!(out, "  {:<width$}  {}", block.title, status, width = width);
  }

  let failed = outcome.failed_blocks();
  if failed > 0 {
    let _ = writeln!(
      out,
      "{} of {} blocks failed; their spots were left out",
      failed,
      outcome.blocks.len()
    );
  }
  let _ = write!(out, "{}", outcome.playlist_url);
  out
}

fn handle_blueprints(m: &ArgMatches, ctx: &CliContext) -> Result<String> {
  match StoreAction::from_matches(m) {
    StoreAction::List => {
      let blueprints = ctx.store.load()?;
      if blueprints.is_empty() {
        return Ok(
          "No blueprints stored. Add one with `blockmix blueprints --import <FILE>`.".to_string(),
        );
      }
      let width = blueprints
        .iter()
        .map(|b| b.name.chars().count())
        .max()
        .unwrap_or(0);
      let mut out = String::new();
      for blueprint in &blueprints {
        let _ = writeln!(
          out,
          "{:<width$}  {:>2} blocks  {}",
          blueprint.name,
          blueprint.blocks.len(),
          blueprint.id,
          width = width
        );
      }
      Ok(out.trim_end().to_string())
    }
    StoreAction::Show(query) => {
      let blueprint = ctx
        .store
        .find(&query)?
        .ok_or_else(|| anyhow!("No blueprint named `{}`", query))?;
      Ok(render_blueprint(&blueprint))
    }
    StoreAction::Import(path) => {
      let blueprint = ctx.store.import(read_blueprint_file(Path::new(&path))?)?;
      Ok(format!("Imported `{}` ({})", blueprint.name, blueprint.id))
    }
    StoreAction::Delete(query) => {
      if ctx.store.delete(&query)? {
        Ok(format!("Deleted `{}`", query))
      } else {
        Ok(format!("No blueprint named `{}`", query))
      }
    }
  }
}

fn render_blueprint(blueprint: &Blueprint) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{} ({})", blueprint.name, blueprint.id);
  if !blueprint.description.is_empty() {
    let _ = writeln!(out, "{}", blueprint.description);
  }

  // Stored for the authoring side; nothing here acts on them.
  let mut flags = Vec::new();
  if blueprint.daily {
    flags.push("daily");
  }
  if blueprint.self_deleting {
    flags.push("self-deleting");
  }
  if !flags.is_empty() {
    let _ = writeln!(out, "flags: {}", flags.join(", "));
  }

  for (i, block) in blueprint.blocks.iter().enumerate() {
    let marker = if block.is_complete() { ' ' } else { '!' };
    let _ = writeln!(
      out,
      "{:>2}{} {}  [{}]",
      i + 1,
      marker,
      block.title,
      block_summary(block)
    );
  }
  if !blueprint.incomplete_blocks().is_empty() {
    let _ = writeln!(
      out,
      "Blocks marked `!` still need content before this blueprint can run."
    );
  }
  out.trim_end().to_string()
}

fn block_summary(block: &Block) -> String {
  match &block.kind {
    BlockKind::FixedEpisode { episode_id } => match episode_id {
      Some(id) => format!("episode {}", id),
      None => "episode (unset)".to_string(),
    },
    BlockKind::LatestShowEpisode { show_id } => match show_id {
      Some(id) => format!("latest episode of show {}", id),
      None => "latest episode (unset)".to_string(),
    },
    BlockKind::SongsFromSource { source_id, range } => match source_id.as_deref() {
      Some(id) if id == LIKED_SOURCE_ID => format!("{} songs from liked songs", range),
      Some(id) => format!("{} songs from playlist {}", range, id),
      None => format!("{} songs (source unset)", range),
    },
    BlockKind::RecommendedSongs { range } => format!("{} recommended songs", range),
  }
}

async fn handle_browse(m: &ArgMatches, ctx: &CliContext) -> Result<String> {
  // Save, because clap fills in the default
  let raw_limit = m.get_one::<String>("limit").unwrap();
  let limit = raw_limit
    .parse::<u32>()
    .map_err(|_| anyhow!("`{}` is not a valid limit", raw_limit))?
    .clamp(1, 50);

  match Feed::from_matches(m) {
    Feed::Playlists => {
      let playlists = ctx.client.user_playlists(limit).await?;
      Ok(render_pairs(
        playlists.into_iter().map(|p| (p.name, p.id)),
      ))
    }
    Feed::Shows => {
      let rows = ctx.client.saved_shows(limit).await?;
      Ok(render_rows(&rows))
    }
    Feed::Episodes(show_id) => {
      let rows = ctx.client.show_episodes(&show_id, limit).await?;
      Ok(render_rows(&rows))
    }
    Feed::Liked => {
      let (rows, total) = ctx.client.liked_rows(limit).await?;
      let mut out = render_rows(&rows);
      let _ = write!(out, "\n{} of {} liked songs", rows.len(), total);
      Ok(out)
    }
    Feed::TopTracks => {
      let rows = ctx.client.top_track_rows(limit).await?;
      Ok(render_rows(&rows))
    }
    Feed::TopArtists => {
      let artists = ctx.client.top_artists(limit).await?;
      Ok(render_pairs(artists.into_iter().map(|a| (a.name, a.id))))
    }
    Feed::SearchShows(query) => {
      let rows = ctx.client.search_shows(&query, limit).await?;
      Ok(render_rows(&rows))
    }
  }
}

fn render_rows(rows: &[BrowseRow]) -> String {
  if rows.is_empty() {
    return "Nothing found".to_string();
  }
  let width = rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);
  let mut out = String::new();
  for row in rows {
    let _ = writeln!(
      out,
      "{:<width$}  {}  ({})",
      row.name,
      row.detail,
      row.id,
      width = width
    );
  }
  out.trim_end().to_string()
}

fn render_pairs<I: IntoIterator<Item = (String, String)>>(pairs: I) -> String {
  let pairs: Vec<(String, String)> = pairs.into_iter().collect();
  if pairs.is_empty() {
    return "Nothing found".to_string();
  }
  let width = pairs
    .iter()
    .map(|(name, _)| name.chars().count())
    .max()
    .unwrap_or(0);
  let mut out = String::new();
  for (name, id) in &pairs {
    let _ = writeln!(out, "{:<width$}  ({})", name, id, width = width);
  }
  out.trim_end().to_string()
}
