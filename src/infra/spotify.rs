//! rspotify-backed implementation of the remote seam. Everything the
//! engine reads or writes on Spotify goes through here.

use crate::core::fetch::{
  ArtistRef, EpisodeRef, FetchError, PlaylistRef, PlaylistWrite, RemotePlaylist, SourceFetch,
  SourceTrack,
};
use anyhow::anyhow;
use rspotify::model::{
  idtypes::{ArtistId, EpisodeId, PlayableId, PlaylistId, ShowId, TrackId, UserId},
  search::SearchResult,
  track::FullTrack,
  PlayableItem, SearchType, TimeRange,
};
use rspotify::{prelude::*, AuthCodePkceSpotify};

pub struct SpotifyClient {
  spotify: AuthCodePkceSpotify,
}

/// One line of a `browse` listing, already flattened for printing.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BrowseRow {
  pub id: String,
  pub name: String,
  pub detail: String,
}

/// Maps a failed call onto the engine's coarse error classes. The client
/// surfaces auth failures as text in several shapes, so match broadly.
fn classify(e: anyhow::Error) -> FetchError {
  let msg = format!("{:?}", e).to_lowercase();
  if msg.contains("401")
    || msg.contains("unauthorized")
    || msg.contains("invalid_grant")
    || msg.contains("token expired")
  {
    FetchError::Unauthorized(e)
  } else {
    FetchError::RemoteUnavailable(e)
  }
}

/// Local files carry no usable id, so they are dropped here.
fn track_to_source(track: &FullTrack) -> Option<SourceTrack> {
  if track.is_local {
    return None;
  }
  let id = track.id.as_ref()?;
  Some(SourceTrack {
    uri: id.uri(),
    popularity: Some(track.popularity),
  })
}

/// Playlists can hold episodes next to tracks. Episodes have no
/// popularity score but are still playable content.
fn item_to_source(item: &PlayableItem) -> Option<SourceTrack> {
  match item {
    PlayableItem::Track(track) => track_to_source(track),
    PlayableItem::Episode(episode) => Some(SourceTrack {
      uri: episode.id.uri(),
      popularity: None,
    }),
  }
}

fn artists_line(track: &FullTrack) -> String {
  track
    .artists
    .iter()
    .map(|artist| artist.name.as_str())
    .collect::<Vec<&str>>()
    .join(", ")
}

/// Parses a stored uri back into a typed id for the append call.
fn playable_id_from_uri(uri: &str) -> Result<PlayableId<'static>, FetchError> {
  if let Ok(track) = TrackId::from_uri(uri) {
    return Ok(PlayableId::Track(track.into_static()));
  }
  if let Ok(episode) = EpisodeId::from_uri(uri) {
    return Ok(PlayableId::Episode(episode.into_static()));
  }
  Err(FetchError::InvalidReference(uri.to_string()))
}

impl SpotifyClient {
  pub fn new(spotify: AuthCodePkceSpotify) -> Self {
    Self { spotify }
  }

  /// The user's saved podcast shows.
  pub async fn saved_shows(&self, limit: u32) -> Result<Vec<BrowseRow>, FetchError> {
    let page = self
      .spotify
      .get_saved_show_manual(Some(limit), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(
      page
        .items
        .into_iter()
        .map(|saved| BrowseRow {
          id: saved.show.id.id().to_string(),
          name: saved.show.name,
          detail: saved.show.publisher,
        })
        .collect(),
    )
  }

  /// Episodes of one show, newest first.
  pub async fn show_episodes(&self, show_id: &str, limit: u32) -> Result<Vec<BrowseRow>, FetchError> {
    let id =
      ShowId::from_id(show_id).map_err(|_| FetchError::InvalidReference(show_id.to_string()))?;
    let page = self
      .spotify
      .get_shows_episodes_manual(id, None, Some(limit), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(
      page
        .items
        .into_iter()
        .map(|episode| BrowseRow {
          id: episode.id.id().to_string(),
          name: episode.name,
          detail: episode.release_date,
        })
        .collect(),
    )
  }

  /// A preview of the liked library plus its full size.
  pub async fn liked_rows(&self, limit: u32) -> Result<(Vec<BrowseRow>, u32), FetchError> {
    let page = self
      .spotify
      .current_user_saved_tracks_manual(None, Some(limit), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    let total = page.total;
    let rows = page
      .items
      .iter()
      .filter_map(|saved| {
        let id = saved.track.id.as_ref()?;
        Some(BrowseRow {
          id: id.id().to_string(),
          name: saved.track.name.clone(),
          detail: artists_line(&saved.track),
        })
      })
      .collect();
    Ok((rows, total))
  }

  /// The user's short-term top tracks.
  pub async fn top_track_rows(&self, limit: u32) -> Result<Vec<BrowseRow>, FetchError> {
    let page = self
      .spotify
      .current_user_top_tracks_manual(Some(TimeRange::ShortTerm), Some(limit), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(
      page
        .items
        .iter()
        .filter_map(|track| {
          let id = track.id.as_ref()?;
          Some(BrowseRow {
            id: id.id().to_string(),
            name: track.name.clone(),
            detail: artists_line(track),
          })
        })
        .collect(),
    )
  }

  /// Show search, for finding ids to put into podcast blocks.
  pub async fn search_shows(&self, query: &str, limit: u32) -> Result<Vec<BrowseRow>, FetchError> {
    let result = self
      .spotify
      .search(query, SearchType::Show, None, None, Some(limit), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    if let SearchResult::Shows(page) = result {
      Ok(
        page
          .items
          .into_iter()
          .map(|show| BrowseRow {
            id: show.id.id().to_string(),
            name: show.name,
            detail: show.publisher,
          })
          .collect(),
      )
    } else {
      Ok(Vec::new())
    }
  }
}

impl SourceFetch for SpotifyClient {
  async fn liked_tracks(&self, limit: u32) -> Result<Vec<SourceTrack>, FetchError> {
    let page = self
      .spotify
      .current_user_saved_tracks_manual(None, Some(limit), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(
      page
        .items
        .iter()
        .filter_map(|saved| track_to_source(&saved.track))
        .collect(),
    )
  }

  async fn playlist_tracks(
    &self,
    playlist_id: &str,
    limit: u32,
  ) -> Result<Vec<SourceTrack>, FetchError> {
    let id = PlaylistId::from_id(playlist_id)
      .map_err(|_| FetchError::InvalidReference(playlist_id.to_string()))?;
    let page = self
      .spotify
      .playlist_items_manual(id, None, None, Some(limit), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(
      page
        .items
        .iter()
        .filter_map(|item| item.track.as_ref())
        .filter_map(item_to_source)
        .collect(),
    )
  }

  async fn top_artists(&self, limit: u32) -> Result<Vec<ArtistRef>, FetchError> {
    let page = self
      .spotify
      .current_user_top_artists_manual(Some(TimeRange::MediumTerm), Some(limit), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(
      page
        .items
        .into_iter()
        .map(|artist| ArtistRef {
          id: artist.id.id().to_string(),
          name: artist.name,
        })
        .collect(),
    )
  }

  async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<SourceTrack>, FetchError> {
    let id = ArtistId::from_id(artist_id)
      .map_err(|_| FetchError::InvalidReference(artist_id.to_string()))?;
    let tracks = self
      .spotify
      .artist_top_tracks(id, None)
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(tracks.iter().filter_map(track_to_source).collect())
  }

  async fn user_playlists(&self, limit: u32) -> Result<Vec<PlaylistRef>, FetchError> {
    let page = self
      .spotify
      .current_user_playlists_manual(Some(limit), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(
      page
        .items
        .into_iter()
        .map(|playlist| PlaylistRef {
          id: playlist.id.id().to_string(),
          name: playlist.name,
        })
        .collect(),
    )
  }

  async fn latest_show_episode(&self, show_id: &str) -> Result<Option<EpisodeRef>, FetchError> {
    let id =
      ShowId::from_id(show_id).map_err(|_| FetchError::InvalidReference(show_id.to_string()))?;
    // Spotify returns show episodes newest first.
    let page = self
      .spotify
      .get_shows_episodes_manual(id, None, Some(1), Some(0))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(page.items.first().map(|episode| EpisodeRef {
      uri: episode.id.uri(),
      name: episode.name.clone(),
    }))
  }
}

impl PlaylistWrite for SpotifyClient {
  async fn current_user_id(&self) -> Result<String, FetchError> {
    let user = self.spotify.me().await.map_err(|e| classify(anyhow!(e)))?;
    Ok(user.id.id().to_string())
  }

  async fn create_playlist(
    &self,
    user_id: &str,
    name: &str,
    description: &str,
  ) -> Result<RemotePlaylist, FetchError> {
    let id =
      UserId::from_id(user_id).map_err(|_| FetchError::InvalidReference(user_id.to_string()))?;
    let playlist = self
      .spotify
      .user_playlist_create(id, name, Some(true), Some(false), Some(description))
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    let url = playlist
      .external_urls
      .get("spotify")
      .cloned()
      .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", playlist.id.id()));
    Ok(RemotePlaylist {
      id: playlist.id.id().to_string(),
      url,
    })
  }

  async fn append_to_playlist(&self, playlist_id: &str, uris: &[String]) -> Result<(), FetchError> {
    let id = PlaylistId::from_id(playlist_id)
      .map_err(|_| FetchError::InvalidReference(playlist_id.to_string()))?;
    let mut items = Vec::with_capacity(uris.len());
    for uri in uris {
      items.push(playable_id_from_uri(uri)?);
    }
    self
      .spotify
      .playlist_add_items(id, items, None)
      .await
      .map_err(|e| classify(anyhow!(e)))?;
    Ok(())
  }
}
