//! In-memory remote double shared by the engine tests.

use anyhow::anyhow;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::core::fetch::{
  ArtistRef, EpisodeRef, FetchError, PlaylistRef, PlaylistWrite, RemotePlaylist, SourceFetch,
  SourceTrack,
};

pub fn track(uri: &str, popularity: u32) -> SourceTrack {
  SourceTrack {
    uri: uri.to_string(),
    popularity: Some(popularity),
  }
}

pub fn episode(uri: &str, name: &str) -> EpisodeRef {
  EpisodeRef {
    uri: uri.to_string(),
    name: name.to_string(),
  }
}

impl From<(&str, &str)> for ArtistRef {
  fn from((id, name): (&str, &str)) -> Self {
    ArtistRef {
      id: id.to_string(),
      name: name.to_string(),
    }
  }
}

impl From<(&str, &str)> for PlaylistRef {
  fn from((id, name): (&str, &str)) -> Self {
    PlaylistRef {
      id: id.to_string(),
      name: name.to_string(),
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InjectedFailure {
  Unavailable,
  Unauthorized,
}

/// Scriptable stand-in for the real client.
///
/// Endpoints fail when scripted by method name via `fail`, individual
/// reference ids via `fail_id` / `invalid_ids`, and `stall_on` delays a
/// call for timeout tests. Writes land in the `created` and `appended`
/// journals.
#[derive(Default)]
pub struct FakeRemote {
  pub user_id: String,
  pub liked: Vec<SourceTrack>,
  pub playlists: Vec<PlaylistRef>,
  pub playlist_track_map: HashMap<String, Vec<SourceTrack>>,
  pub top_artists: Vec<ArtistRef>,
  pub artist_tracks: HashMap<String, Vec<SourceTrack>>,
  pub show_episodes: HashMap<String, Vec<EpisodeRef>>,
  pub invalid_ids: HashSet<String>,
  fail_ids: HashSet<String>,
  failures: HashMap<&'static str, InjectedFailure>,
  stalls: HashMap<&'static str, Duration>,
  pub created: Mutex<Vec<(String, String)>>,
  pub appended: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeRemote {
  pub fn new() -> Self {
    FakeRemote {
      user_id: "tester".to_string(),
      ..Default::default()
    }
  }

  pub fn fail(&mut self, endpoint: &'static str, how: InjectedFailure) {
    self.failures.insert(endpoint, how);
  }

  pub fn fail_id(&mut self, id: &str) {
    self.fail_ids.insert(id.to_string());
  }

  pub fn stall_on(&mut self, endpoint: &'static str, delay: Duration) {
    self.stalls.insert(endpoint, delay);
  }

  async fn gate(&self, endpoint: &'static str) -> Result<(), FetchError> {
    if let Some(delay) = self.stalls.get(endpoint) {
      tokio::time::sleep(*delay).await;
    }
    match self.failures.get(endpoint) {
      Some(InjectedFailure::Unavailable) => Err(FetchError::RemoteUnavailable(anyhow!(
        "injected outage at {}",
        endpoint
      ))),
      Some(InjectedFailure::Unauthorized) => Err(FetchError::Unauthorized(anyhow!(
        "injected auth failure at {}",
        endpoint
      ))),
      None => Ok(()),
    }
  }

  fn id_gate(&self, id: &str) -> Result<(), FetchError> {
    if self.invalid_ids.contains(id) {
      return Err(FetchError::InvalidReference(id.to_string()));
    }
    if self.fail_ids.contains(id) {
      return Err(FetchError::RemoteUnavailable(anyhow!(
        "injected outage for {}",
        id
      )));
    }
    Ok(())
  }
}

impl SourceFetch for FakeRemote {
  async fn liked_tracks(&self, limit: u32) -> Result<Vec<SourceTrack>, FetchError> {
    self.gate("liked_tracks").await?;
    Ok(self.liked.iter().take(limit as usize).cloned().collect())
  }

  async fn playlist_tracks(
    &self,
    playlist_id: &str,
    limit: u32,
  ) -> Result<Vec<SourceTrack>, FetchError> {
    self.gate("playlist_tracks").await?;
    self.id_gate(playlist_id)?;
    Ok(
      self
        .playlist_track_map
        .get(playlist_id)
        .map(|tracks| tracks.iter().take(limit as usize).cloned().collect())
        .unwrap_or_default(),
    )
  }

  async fn top_artists(&self, limit: u32) -> Result<Vec<ArtistRef>, FetchError> {
    self.gate("top_artists").await?;
    Ok(self.top_artists.iter().take(limit as usize).cloned().collect())
  }

  async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<SourceTrack>, FetchError> {
    self.gate("artist_top_tracks").await?;
    self.id_gate(artist_id)?;
    Ok(self.artist_tracks.get(artist_id).cloned().unwrap_or_default())
  }

  async fn user_playlists(&self, limit: u32) -> Result<Vec<PlaylistRef>, FetchError> {
    self.gate("user_playlists").await?;
    Ok(self.playlists.iter().take(limit as usize).cloned().collect())
  }

  async fn latest_show_episode(&self, show_id: &str) -> Result<Option<EpisodeRef>, FetchError> {
    self.gate("latest_show_episode").await?;
    self.id_gate(show_id)?;
    Ok(
      self
        .show_episodes
        .get(show_id)
        .and_then(|episodes| episodes.first().cloned()),
    )
  }
}

impl PlaylistWrite for FakeRemote {
  async fn current_user_id(&self) -> Result<String, FetchError> {
    self.gate("current_user_id").await?;
    Ok(self.user_id.clone())
  }

  async fn create_playlist(
    &self,
    _user_id: &str,
    name: &str,
    description: &str,
  ) -> Result<RemotePlaylist, FetchError> {
    self.gate("create_playlist").await?;
    self
      .created
      .lock()
      .await
      .push((name.to_string(), description.to_string()));
    Ok(RemotePlaylist {
      id: "pl_new".to_string(),
      url: "https://open.spotify.com/playlist/pl_new".to_string(),
    })
  }

  async fn append_to_playlist(
    &self,
    playlist_id: &str,
    uris: &[String],
  ) -> Result<(), FetchError> {
    self.gate("append_to_playlist").await?;
    self
      .appended
      .lock()
      .await
      .push((playlist_id.to_string(), uris.to_vec()));
    Ok(())
  }
}
