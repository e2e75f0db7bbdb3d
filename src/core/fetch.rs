//! The remote-platform seam: normalized types plus the read and write
//! traits the engine is generic over. The real client lives in
//! `infra::spotify`; tests substitute an in-memory double.

use thiserror::Error;

/// A playable track as the engine sees it, wherever it came from.
/// Implementations only return non-local entries with usable ids.
#[derive(Clone, PartialEq, Debug)]
pub struct SourceTrack {
  pub uri: String,
  /// 0..=100 when the remote reports one.
  pub popularity: Option<u32>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ArtistRef {
  pub id: String,
  pub name: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PlaylistRef {
  pub id: String,
  pub name: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EpisodeRef {
  pub uri: String,
  pub name: String,
}

/// A playlist created on the remote during a run.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RemotePlaylist {
  pub id: String,
  pub url: String,
}

/// Why a remote call failed, coarse enough to drive abort-or-continue
/// policy without inspecting transport details.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Token missing, expired, or revoked.
  #[error("unauthorized: {0}")]
  Unauthorized(anyhow::Error),
  /// Network or server failure on an otherwise valid call.
  #[error("remote unavailable: {0}")]
  RemoteUnavailable(anyhow::Error),
  /// The stored reference does not parse as a remote id at all.
  #[error("invalid content reference `{0}`")]
  InvalidReference(String),
}

impl FetchError {
  /// True when the failure poisons the whole run, not just one call.
  pub fn is_fatal(&self) -> bool {
    matches!(self, FetchError::Unauthorized(_))
  }
}

/// Read access to the remote platform.
pub trait SourceFetch {
  /// Up to `limit` of the user's liked tracks.
  async fn liked_tracks(&self, limit: u32) -> Result<Vec<SourceTrack>, FetchError>;

  /// Up to `limit` tracks of one playlist.
  async fn playlist_tracks(&self, playlist_id: &str, limit: u32)
    -> Result<Vec<SourceTrack>, FetchError>;

  /// The user's top artists, most listened first.
  async fn top_artists(&self, limit: u32) -> Result<Vec<ArtistRef>, FetchError>;

  /// An artist's current top tracks.
  async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<SourceTrack>, FetchError>;

  /// The user's own and followed playlists.
  async fn user_playlists(&self, limit: u32) -> Result<Vec<PlaylistRef>, FetchError>;

  /// The newest episode of a show, or `None` for an empty show.
  async fn latest_show_episode(&self, show_id: &str) -> Result<Option<EpisodeRef>, FetchError>;
}

/// Write access used by materialization.
pub trait PlaylistWrite {
  /// The id of whoever the credentials belong to.
  async fn current_user_id(&self) -> Result<String, FetchError>;

  /// Create a public playlist owned by `user_id`.
  async fn create_playlist(
    &self,
    user_id: &str,
    name: &str,
    description: &str,
  ) -> Result<RemotePlaylist, FetchError>;

  /// Append `uris` to the end of the playlist, in order.
  async fn append_to_playlist(&self, playlist_id: &str, uris: &[String])
    -> Result<(), FetchError>;
}
