//! Run-scoped candidate pool for recommended-songs blocks.
//!
//! Two signals feed the pool (the user's top artists and a sample of
//! their playlists), then their saved tracks are excluded. The signals
//! run one after the other; within a signal the per-item fetches run
//! concurrently with a bound on how many are in flight, and everything
//! is joined before exclusion and selection.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::fetch::{FetchError, SourceFetch, SourceTrack};

/// Upper bound on signal sub-fetches in flight at once.
pub const SUBFETCH_CONCURRENCY: usize = 10;

const TOP_ARTIST_FETCH: u32 = 50;
const ARTIST_SAMPLE: usize = 10;
const ARTIST_WEIGHT: f64 = 0.8;
const PLAYLIST_FETCH: u32 = 50;
const PLAYLIST_SAMPLE: usize = 8;
const PLAYLIST_TRACK_FETCH: u32 = 30;
const PLAYLIST_WEIGHT: f64 = 0.3;
const SAVED_FETCH: u32 = 50;
const DEFAULT_POPULARITY: u32 = 50;

/// One pool entry: a track plus the evidence that put it there.
#[derive(Clone, PartialEq, Debug)]
pub struct CandidateTrack {
  pub uri: String,
  pub popularity: u32,
  pub weight: f64,
}

/// URI-keyed accumulation of candidates across every signal. Ordered
/// keys keep seeded runs reproducible no matter how fetches interleave.
#[derive(Default, Debug)]
pub struct CandidatePool {
  tracks: BTreeMap<String, CandidateTrack>,
}

impl CandidatePool {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fold one track in. Weights add up across signals; popularity keeps
  /// its first observed value, defaulting when the remote reports none.
  pub fn merge(&mut self, track: &SourceTrack, weight: f64) {
    self
      .tracks
      .entry(track.uri.clone())
      .and_modify(|existing| existing.weight += weight)
      .or_insert_with(|| CandidateTrack {
        uri: track.uri.clone(),
        popularity: track.popularity.unwrap_or(DEFAULT_POPULARITY),
        weight,
      });
  }

  /// Drop every given URI from the pool.
  pub fn exclude<'a>(&mut self, uris: impl IntoIterator<Item = &'a String>) {
    for uri in uris {
      self.tracks.remove(uri);
    }
  }

  pub fn len(&self) -> usize {
    self.tracks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tracks.is_empty()
  }

  pub fn get(&self, uri: &str) -> Option<&CandidateTrack> {
    self.tracks.get(uri)
  }

  /// Hand the candidates over for selection, in key order.
  pub fn into_candidates(self) -> Vec<CandidateTrack> {
    self.tracks.into_values().collect()
  }
}

/// Build the pool for one recommended-songs block.
///
/// A failed sub-fetch (or a whole failed signal) contributes nothing and
/// the build keeps going; a failed saved-tracks fetch skips exclusion the
/// same way. Credential failures abort immediately wherever they surface.
pub async fn build_candidate_pool<F: SourceFetch, R: Rng>(
  fetcher: &F,
  rng: &mut R,
) -> Result<CandidatePool, FetchError> {
  let mut pool = CandidatePool::new();

  match fetcher.top_artists(TOP_ARTIST_FETCH).await {
    Ok(mut artists) => {
      artists.shuffle(rng);
      artists.truncate(ARTIST_SAMPLE);
      let fetches = artists
        .iter()
        .map(|artist| fetcher.artist_top_tracks(&artist.id));
      let results: Vec<_> = stream::iter(fetches)
        .buffered(SUBFETCH_CONCURRENCY)
        .collect()
        .await;
      for (artist, result) in artists.iter().zip(results) {
        match result {
          Ok(tracks) => {
            for track in &tracks {
              pool.merge(track, ARTIST_WEIGHT);
            }
          }
          Err(e) if e.is_fatal() => return Err(e),
          Err(e) => warn!("skipping top tracks of artist {}: {}", artist.name, e),
        }
      }
    }
    Err(e) if e.is_fatal() => return Err(e),
    Err(e) => warn!("artist signal unavailable: {}", e),
  }

  match fetcher.user_playlists(PLAYLIST_FETCH).await {
    Ok(mut playlists) => {
      playlists.shuffle(rng);
      playlists.truncate(PLAYLIST_SAMPLE);
      let fetches = playlists
        .iter()
        .map(|playlist| fetcher.playlist_tracks(&playlist.id, PLAYLIST_TRACK_FETCH));
      let results: Vec<_> = stream::iter(fetches)
        .buffered(SUBFETCH_CONCURRENCY)
        .collect()
        .await;
      for (playlist, result) in playlists.iter().zip(results) {
        match result {
          Ok(tracks) => {
            for track in &tracks {
              pool.merge(track, PLAYLIST_WEIGHT);
            }
          }
          Err(e) if e.is_fatal() => return Err(e),
          Err(e) => warn!("skipping tracks of playlist {}: {}", playlist.name, e),
        }
      }
    }
    Err(e) if e.is_fatal() => return Err(e),
    Err(e) => warn!("playlist signal unavailable: {}", e),
  }

  // Exclusion runs strictly after every merge.
  match fetcher.liked_tracks(SAVED_FETCH).await {
    Ok(saved) => {
      let saved_uris: Vec<String> = saved.into_iter().map(|track| track.uri).collect();
      pool.exclude(&saved_uris);
    }
    Err(e) if e.is_fatal() => return Err(e),
    Err(e) => warn!("saved tracks unavailable, skipping exclusion: {}", e),
  }

  Ok(pool)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::testutil::{track, FakeRemote, InjectedFailure};
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn source(uri: &str, popularity: Option<u32>) -> SourceTrack {
    SourceTrack {
      uri: uri.to_string(),
      popularity,
    }
  }

  #[test]
  fn test_merge_adds_weight_across_signals() {
    let mut pool = CandidatePool::new();
    pool.merge(&source("spotify:track:a", Some(70)), 0.8);
    pool.merge(&source("spotify:track:a", Some(10)), 0.3);

    let entry = pool.get("spotify:track:a").unwrap();
    assert!((entry.weight - 1.1).abs() < 1e-9);
    // First write wins for popularity.
    assert_eq!(entry.popularity, 70);
  }

  #[test]
  fn test_merge_defaults_missing_popularity() {
    let mut pool = CandidatePool::new();
    pool.merge(&source("spotify:track:a", None), 0.3);
    assert_eq!(pool.get("spotify:track:a").unwrap().popularity, 50);
  }

  #[test]
  fn test_exclude_removes_entries() {
    let mut pool = CandidatePool::new();
    pool.merge(&source("spotify:track:a", Some(1)), 0.8);
    pool.merge(&source("spotify:track:b", Some(2)), 0.8);
    pool.exclude(&["spotify:track:a".to_string()]);
    assert_eq!(pool.len(), 1);
    assert!(pool.get("spotify:track:a").is_none());
  }

  #[test]
  fn test_candidates_come_out_in_stable_order() {
    let mut pool = CandidatePool::new();
    pool.merge(&source("spotify:track:c", None), 0.8);
    pool.merge(&source("spotify:track:a", None), 0.8);
    pool.merge(&source("spotify:track:b", None), 0.8);
    let uris: Vec<String> = pool.into_candidates().into_iter().map(|c| c.uri).collect();
    assert_eq!(
      uris,
      vec![
        "spotify:track:a".to_string(),
        "spotify:track:b".to_string(),
        "spotify:track:c".to_string()
      ]
    );
  }

  #[tokio::test]
  async fn test_build_pool_merges_both_signals_and_excludes_saved() {
    let mut remote = FakeRemote::new();
    remote.top_artists = vec![("artist1", "First Artist").into()];
    remote
      .artist_tracks
      .insert("artist1".to_string(), vec![track("spotify:track:art1", 80)]);
    remote.playlists = vec![("pl1", "My Mix").into()];
    remote.playlist_track_map.insert(
      "pl1".to_string(),
      vec![
        track("spotify:track:art1", 80),
        track("spotify:track:pl_only", 20),
        track("spotify:track:saved", 90),
      ],
    );
    remote.liked = vec![track("spotify:track:saved", 90)];

    let mut rng = StdRng::seed_from_u64(11);
    let pool = build_candidate_pool(&remote, &mut rng).await.unwrap();

    assert_eq!(pool.len(), 2);
    let both = pool.get("spotify:track:art1").unwrap();
    assert!((both.weight - 1.1).abs() < 1e-9);
    let single = pool.get("spotify:track:pl_only").unwrap();
    assert!((single.weight - 0.3).abs() < 1e-9);
    assert!(pool.get("spotify:track:saved").is_none());
  }

  #[tokio::test]
  async fn test_build_pool_survives_a_dead_signal() {
    let mut remote = FakeRemote::new();
    remote.fail("top_artists", InjectedFailure::Unavailable);
    remote.playlists = vec![("pl1", "My Mix").into()];
    remote
      .playlist_track_map
      .insert("pl1".to_string(), vec![track("spotify:track:pl_only", 20)]);

    let mut rng = StdRng::seed_from_u64(12);
    let pool = build_candidate_pool(&remote, &mut rng).await.unwrap();
    assert_eq!(pool.len(), 1);
  }

  #[tokio::test]
  async fn test_build_pool_survives_one_bad_sub_fetch() {
    let mut remote = FakeRemote::new();
    remote.top_artists = vec![
      ("artist1", "Fine Artist").into(),
      ("artist2", "Broken Artist").into(),
    ];
    remote
      .artist_tracks
      .insert("artist1".to_string(), vec![track("spotify:track:art1", 80)]);
    remote.fail_id("artist2");

    let mut rng = StdRng::seed_from_u64(13);
    let pool = build_candidate_pool(&remote, &mut rng).await.unwrap();
    assert_eq!(pool.len(), 1);
    assert!(pool.get("spotify:track:art1").is_some());
  }

  #[tokio::test]
  async fn test_build_pool_skips_exclusion_when_saved_list_is_down() {
    let mut remote = FakeRemote::new();
    remote.top_artists = vec![("artist1", "First Artist").into()];
    remote
      .artist_tracks
      .insert("artist1".to_string(), vec![track("spotify:track:art1", 80)]);
    remote.fail("liked_tracks", InjectedFailure::Unavailable);

    let mut rng = StdRng::seed_from_u64(14);
    let pool = build_candidate_pool(&remote, &mut rng).await.unwrap();
    assert_eq!(pool.len(), 1);
    assert!(pool.get("spotify:track:art1").is_some());
  }

  #[tokio::test]
  async fn test_auth_failure_on_the_saved_list_still_aborts() {
    let mut remote = FakeRemote::new();
    remote.top_artists = vec![("artist1", "First Artist").into()];
    remote
      .artist_tracks
      .insert("artist1".to_string(), vec![track("spotify:track:art1", 80)]);
    remote.fail("liked_tracks", InjectedFailure::Unauthorized);

    let mut rng = StdRng::seed_from_u64(14);
    let result = build_candidate_pool(&remote, &mut rng).await;
    assert!(matches!(result, Err(FetchError::Unauthorized(_))));
  }

  #[tokio::test]
  async fn test_build_pool_propagates_auth_failures() {
    let mut remote = FakeRemote::new();
    remote.fail("top_artists", InjectedFailure::Unauthorized);

    let mut rng = StdRng::seed_from_u64(15);
    let result = build_candidate_pool(&remote, &mut rng).await;
    assert!(matches!(result, Err(FetchError::Unauthorized(_))));
  }
}
