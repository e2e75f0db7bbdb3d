//! Blueprint data model: typed blocks, song ranges, and the stored record.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved source id meaning the user's liked tracks rather than a playlist.
pub const LIKED_SOURCE_ID: &str = "liked_songs";

/// Inclusive bounds on how many songs a block contributes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(try_from = "SongRangeRepr")]
pub struct SongRange {
  pub min: u32,
  pub max: u32,
}

/// Accepts both `{"min": 4, "max": 7}` and a preset name like `"some"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SongRangeRepr {
  Preset(String),
  Bounds { min: u32, max: u32 },
}

impl TryFrom<SongRangeRepr> for SongRange {
  type Error = String;

  fn try_from(repr: SongRangeRepr) -> Result<Self, Self::Error> {
    match repr {
      SongRangeRepr::Preset(name) => {
        SongRange::preset(&name).ok_or_else(|| format!("unknown song range preset `{}`", name))
      }
      SongRangeRepr::Bounds { min, max } => SongRange::new(min, max).map_err(|e| e.to_string()),
    }
  }
}

impl SongRange {
  pub fn new(min: u32, max: u32) -> Result<Self> {
    if min > max {
      return Err(anyhow!("song range minimum {} exceeds maximum {}", min, max));
    }
    Ok(SongRange { min, max })
  }

  /// Named sizes offered by the authoring side.
  pub fn preset(name: &str) -> Option<Self> {
    match name {
      "few" => Some(SongRange { min: 2, max: 4 }),
      "some" => Some(SongRange { min: 4, max: 7 }),
      "many" => Some(SongRange { min: 7, max: 12 }),
      "lots" => Some(SongRange { min: 12, max: 20 }),
      _ => None,
    }
  }

  /// The preset name these bounds correspond to, if any.
  pub fn preset_name(&self) -> Option<&'static str> {
    ["few", "some", "many", "lots"]
      .into_iter()
      .find(|name| SongRange::preset(name) == Some(*self))
  }
}

impl fmt::Display for SongRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.preset_name() {
      Some(name) => write!(f, "{}-{} ({})", self.min, self.max, name),
      None => write!(f, "{}-{}", self.min, self.max),
    }
  }
}

/// What a block resolves to. The tag values are the stored wire names.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockKind {
  /// One hand-picked podcast episode.
  #[serde(rename = "podcast")]
  FixedEpisode { episode_id: Option<String> },
  /// Whatever episode of a show is newest when the run happens.
  #[serde(rename = "latest-podcast")]
  LatestShowEpisode { show_id: Option<String> },
  /// A random slice of a track source: the liked library or a playlist.
  #[serde(rename = "songs")]
  SongsFromSource {
    source_id: Option<String>,
    range: SongRange,
  },
  /// Taste-based picks drawn from the candidate pool.
  #[serde(rename = "recommended-songs")]
  RecommendedSongs { range: SongRange },
}

impl BlockKind {
  /// Complete means the content reference is populated. Recommended
  /// blocks carry no reference and are always complete.
  pub fn is_complete(&self) -> bool {
    match self {
      BlockKind::FixedEpisode { episode_id } => episode_id.is_some(),
      BlockKind::LatestShowEpisode { show_id } => show_id.is_some(),
      BlockKind::SongsFromSource { source_id, .. } => source_id.is_some(),
      BlockKind::RecommendedSongs { .. } => true,
    }
  }

  pub fn display_name(&self) -> &'static str {
    match self {
      BlockKind::FixedEpisode { .. } => "episode",
      BlockKind::LatestShowEpisode { .. } => "latest episode",
      BlockKind::SongsFromSource { .. } => "songs",
      BlockKind::RecommendedSongs { .. } => "recommended",
    }
  }

  /// The song range, for the two kinds that have one.
  pub fn song_range(&self) -> Option<SongRange> {
    match self {
      BlockKind::SongsFromSource { range, .. } | BlockKind::RecommendedSongs { range } => {
        Some(*range)
      }
      _ => None,
    }
  }
}

/// One typed slot in a blueprint.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Block {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(flatten)]
  pub kind: BlockKind,
}

impl Block {
  pub fn is_complete(&self) -> bool {
    self.kind.is_complete()
  }
}

/// A stored, ordered list of blocks plus naming metadata.
///
/// `self_deleting` and `daily` come along from the authoring side and are
/// only ever displayed; nothing in this crate acts on them.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Blueprint {
  #[serde(default)]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub blocks: Vec<Block>,
  #[serde(default)]
  pub self_deleting: bool,
  #[serde(default)]
  pub daily: bool,
  #[serde(default)]
  pub created_at: String,
}

impl Blueprint {
  /// Blocks still missing their content reference, in order.
  pub fn incomplete_blocks(&self) -> Vec<&Block> {
    self.blocks.iter().filter(|b| !b.is_complete()).collect()
  }
}
