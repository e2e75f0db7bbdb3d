//! Per-block resolution into ordered lists of remote URIs.

use log::{info, warn};
use rand::Rng;
use std::fmt;

use crate::core::blocks::{Block, BlockKind, LIKED_SOURCE_ID};
use crate::core::fetch::{FetchError, SourceFetch};
use crate::core::pool::build_candidate_pool;
use crate::core::select::{range_random, tier_weighted};

/// The original app fetches at most one page of a track source.
const SOURCE_TRACK_FETCH: u32 = 50;

/// Why a block failed, as reported to the caller.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockErrorKind {
  Unauthorized,
  RemoteUnavailable,
  /// The recommendation pool was empty after exclusion.
  NoCandidates,
}

impl fmt::Display for BlockErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      BlockErrorKind::Unauthorized => "unauthorized",
      BlockErrorKind::RemoteUnavailable => "remote unavailable",
      BlockErrorKind::NoCandidates => "no candidates",
    };
    write!(f, "{}", text)
  }
}

/// What one block contributed to the run.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResolvedBlock {
  pub block_id: String,
  pub uris: Vec<String>,
  pub ok: bool,
  pub error: Option<BlockErrorKind>,
}

impl ResolvedBlock {
  fn done(block: &Block, uris: Vec<String>) -> Self {
    ResolvedBlock {
      block_id: block.id.clone(),
      uris,
      ok: true,
      error: None,
    }
  }

  fn failed(block: &Block, error: BlockErrorKind) -> Self {
    ResolvedBlock {
      block_id: block.id.clone(),
      uris: Vec::new(),
      ok: false,
      error: Some(error),
    }
  }
}

/// Resolve one block into the URIs it contributes.
///
/// This never fails the run by itself: fetch errors land in the returned
/// record, and a block with no content reference resolves to nothing
/// with `ok` still set.
pub async fn resolve_block<F: SourceFetch, R: Rng>(
  fetcher: &F,
  block: &Block,
  rng: &mut R,
) -> ResolvedBlock {
  match &block.kind {
    BlockKind::FixedEpisode { episode_id } => match episode_id {
      // The URI is derived from the stored id; no fetch needed.
      Some(id) => ResolvedBlock::done(block, vec![format!("spotify:episode:{}", id)]),
      None => incomplete(block),
    },

    BlockKind::LatestShowEpisode { show_id } => match show_id {
      Some(id) => match fetcher.latest_show_episode(id).await {
        Ok(Some(episode)) => {
          info!("block `{}` resolved to newest episode {}", block.title, episode.name);
          ResolvedBlock::done(block, vec![episode.uri])
        }
        Ok(None) => {
          info!("show {} has no episodes, block `{}` stays empty", id, block.title);
          ResolvedBlock::done(block, Vec::new())
        }
        Err(e) => fetch_failed(block, e),
      },
      None => incomplete(block),
    },

    BlockKind::SongsFromSource { source_id, range } => match source_id.as_deref() {
      Some(id) => {
        let fetched = if id == LIKED_SOURCE_ID {
          fetcher.liked_tracks(SOURCE_TRACK_FETCH).await
        } else {
          fetcher.playlist_tracks(id, SOURCE_TRACK_FETCH).await
        };
        match fetched {
          Ok(tracks) => {
            let uris: Vec<String> = tracks.into_iter().map(|track| track.uri).collect();
            ResolvedBlock::done(block, range_random(uris, *range, rng))
          }
          Err(e) => fetch_failed(block, e),
        }
      }
      None => incomplete(block),
    },

    BlockKind::RecommendedSongs { range } => match build_candidate_pool(fetcher, rng).await {
      Ok(pool) if pool.is_empty() => {
        warn!("no candidates survived exclusion for block `{}`", block.title);
        ResolvedBlock::failed(block, BlockErrorKind::NoCandidates)
      }
      Ok(pool) => ResolvedBlock::done(block, tier_weighted(pool.into_candidates(), *range, rng)),
      Err(e) => fetch_failed(block, e),
    },
  }
}

fn incomplete(block: &Block) -> ResolvedBlock {
  info!("block `{}` has no content reference, contributing nothing", block.title);
  ResolvedBlock::done(block, Vec::new())
}

fn fetch_failed(block: &Block, err: FetchError) -> ResolvedBlock {
  match err {
    // A reference the remote id syntax rejects behaves like a missing
    // one: the block contributes nothing but does not fail.
    FetchError::InvalidReference(reference) => {
      warn!("block `{}` reference `{}` is not a usable id, treating it as unset", block.title, reference);
      ResolvedBlock::done(block, Vec::new())
    }
    FetchError::Unauthorized(e) => {
      warn!("block `{}` hit an authorization failure: {}", block.title, e);
      ResolvedBlock::failed(block, BlockErrorKind::Unauthorized)
    }
    FetchError::RemoteUnavailable(e) => {
      warn!("block `{}` could not reach the remote: {}", block.title, e);
      ResolvedBlock::failed(block, BlockErrorKind::RemoteUnavailable)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::blocks::SongRange;
  use crate::core::testutil::{episode, track, FakeRemote, InjectedFailure};
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn block(kind: BlockKind) -> Block {
    Block {
      id: "b1".to_string(),
      title: "Test block".to_string(),
      description: String::new(),
      kind,
    }
  }

  fn rng() -> StdRng {
    StdRng::seed_from_u64(21)
  }

  #[tokio::test]
  async fn test_fixed_episode_builds_uri_without_fetching() {
    let remote = FakeRemote::new();
    let resolved = resolve_block(
      &remote,
      &block(BlockKind::FixedEpisode {
        episode_id: Some("abc123".to_string()),
      }),
      &mut rng(),
    )
    .await;

    assert!(resolved.ok);
    assert_eq!(resolved.uris, vec!["spotify:episode:abc123".to_string()]);
  }

  #[tokio::test]
  async fn test_incomplete_block_resolves_empty_and_ok() {
    let remote = FakeRemote::new();
    let resolved = resolve_block(
      &remote,
      &block(BlockKind::FixedEpisode { episode_id: None }),
      &mut rng(),
    )
    .await;

    assert!(resolved.ok);
    assert!(resolved.uris.is_empty());
    assert_eq!(resolved.error, None);
  }

  #[tokio::test]
  async fn test_latest_episode_takes_the_newest() {
    let mut remote = FakeRemote::new();
    remote.show_episodes.insert(
      "show1".to_string(),
      vec![
        episode("spotify:episode:new", "Newest"),
        episode("spotify:episode:old", "Older"),
      ],
    );

    let resolved = resolve_block(
      &remote,
      &block(BlockKind::LatestShowEpisode {
        show_id: Some("show1".to_string()),
      }),
      &mut rng(),
    )
    .await;

    assert!(resolved.ok);
    assert_eq!(resolved.uris, vec!["spotify:episode:new".to_string()]);
  }

  #[tokio::test]
  async fn test_latest_episode_of_empty_show_is_ok_and_empty() {
    let remote = FakeRemote::new();
    let resolved = resolve_block(
      &remote,
      &block(BlockKind::LatestShowEpisode {
        show_id: Some("show1".to_string()),
      }),
      &mut rng(),
    )
    .await;

    assert!(resolved.ok);
    assert!(resolved.uris.is_empty());
  }

  #[tokio::test]
  async fn test_latest_episode_fetch_failure_fails_the_block() {
    let mut remote = FakeRemote::new();
    remote.fail("latest_show_episode", InjectedFailure::Unavailable);

    let resolved = resolve_block(
      &remote,
      &block(BlockKind::LatestShowEpisode {
        show_id: Some("show1".to_string()),
      }),
      &mut rng(),
    )
    .await;

    assert!(!resolved.ok);
    assert_eq!(resolved.error, Some(BlockErrorKind::RemoteUnavailable));
    assert!(resolved.uris.is_empty());
  }

  #[tokio::test]
  async fn test_songs_from_liked_library() {
    let mut remote = FakeRemote::new();
    remote.liked = (0..20)
      .map(|i| track(&format!("spotify:track:liked{}", i), 40))
      .collect();

    let resolved = resolve_block(
      &remote,
      &block(BlockKind::SongsFromSource {
        source_id: Some(LIKED_SOURCE_ID.to_string()),
        range: SongRange { min: 5, max: 5 },
      }),
      &mut rng(),
    )
    .await;

    assert!(resolved.ok);
    assert_eq!(resolved.uris.len(), 5);
    for uri in &resolved.uris {
      assert!(uri.starts_with("spotify:track:liked"));
    }
  }

  #[tokio::test]
  async fn test_songs_from_playlist_caps_at_available() {
    let mut remote = FakeRemote::new();
    remote
      .playlist_track_map
      .insert("pl9".to_string(), vec![track("spotify:track:only", 5)]);

    let resolved = resolve_block(
      &remote,
      &block(BlockKind::SongsFromSource {
        source_id: Some("pl9".to_string()),
        range: SongRange { min: 3, max: 6 },
      }),
      &mut rng(),
    )
    .await;

    assert!(resolved.ok);
    assert_eq!(resolved.uris, vec!["spotify:track:only".to_string()]);
  }

  #[tokio::test]
  async fn test_malformed_reference_acts_like_an_unset_one() {
    let mut remote = FakeRemote::new();
    remote.invalid_ids.insert("not a real id".to_string());

    let resolved = resolve_block(
      &remote,
      &block(BlockKind::SongsFromSource {
        source_id: Some("not a real id".to_string()),
        range: SongRange { min: 1, max: 2 },
      }),
      &mut rng(),
    )
    .await;

    assert!(resolved.ok);
    assert!(resolved.uris.is_empty());
    assert_eq!(resolved.error, None);
  }

  #[tokio::test]
  async fn test_recommended_songs_flags_an_empty_pool() {
    // Nothing configured: both signals come back empty.
    let remote = FakeRemote::new();
    let resolved = resolve_block(
      &remote,
      &block(BlockKind::RecommendedSongs {
        range: SongRange { min: 2, max: 4 },
      }),
      &mut rng(),
    )
    .await;

    assert!(!resolved.ok);
    assert_eq!(resolved.error, Some(BlockErrorKind::NoCandidates));
  }

  #[tokio::test]
  async fn test_recommended_songs_draws_from_the_pool() {
    let mut remote = FakeRemote::new();
    remote.top_artists = vec![("artist1", "One").into()];
    remote.artist_tracks.insert(
      "artist1".to_string(),
      (0..30).map(|i| track(&format!("spotify:track:c{}", i), 60)).collect(),
    );

    let resolved = resolve_block(
      &remote,
      &block(BlockKind::RecommendedSongs {
        range: SongRange { min: 6, max: 6 },
      }),
      &mut rng(),
    )
    .await;

    assert!(resolved.ok);
    assert_eq!(resolved.uris.len(), 6);
  }

  #[tokio::test]
  async fn test_saved_tracks_never_reach_recommended_output() {
    let mut remote = FakeRemote::new();
    remote.top_artists = vec![("artist1", "One").into()];
    remote.artist_tracks.insert(
      "artist1".to_string(),
      (0..10).map(|i| track(&format!("spotify:track:c{}", i), 60)).collect(),
    );
    remote.liked = vec![track("spotify:track:c3", 60), track("spotify:track:c7", 60)];

    let resolved = resolve_block(
      &remote,
      &block(BlockKind::RecommendedSongs {
        range: SongRange { min: 8, max: 8 },
      }),
      &mut rng(),
    )
    .await;

    assert!(resolved.ok);
    assert_eq!(resolved.uris.len(), 8);
    assert!(!resolved.uris.contains(&"spotify:track:c3".to_string()));
    assert!(!resolved.uris.contains(&"spotify:track:c7".to_string()));
  }
}
