//! Whole-run orchestration: create the playlist, then walk the blocks in
//! order, appending whatever each one resolves to.

use anyhow::{anyhow, Result};
use log::{info, warn};
use rand::Rng;
use std::time::Duration;

use crate::core::blocks::Blueprint;
use crate::core::fetch::{FetchError, PlaylistWrite, SourceFetch};
use crate::core::resolve::{resolve_block, BlockErrorKind, ResolvedBlock};

/// Remote cap on URIs per append call.
const APPEND_CHUNK: usize = 100;

/// Everything one run produced.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MaterializeOutcome {
  pub playlist_id: String,
  pub playlist_url: String,
  /// Per-block records, in blueprint order.
  pub blocks: Vec<ResolvedBlock>,
}

impl MaterializeOutcome {
  pub fn failed_blocks(&self) -> usize {
    self.blocks.iter().filter(|b| !b.ok).count()
  }

  pub fn appended_total(&self) -> usize {
    self.blocks.iter().filter(|b| b.ok).map(|b| b.uris.len()).sum()
  }
}

/// Create a playlist named after the blueprint and fill it block by
/// block. Failed blocks leave their gap and the run keeps going; nothing
/// is rolled back. Only credential failures abort.
pub async fn materialize<C, R>(
  client: &C,
  blueprint: &Blueprint,
  rng: &mut R,
) -> Result<MaterializeOutcome>
where
  C: SourceFetch + PlaylistWrite,
  R: Rng,
{
  let user_id = client.current_user_id().await.map_err(|e| anyhow!(e))?;
  info!("materializing `{}` as user {}", blueprint.name, user_id);

  let playlist = client
    .create_playlist(&user_id, &blueprint.name, &blueprint.description)
    .await
    .map_err(|e| anyhow!(e))?;
  info!("created playlist {}", playlist.id);

  let mut blocks = Vec::with_capacity(blueprint.blocks.len());
  for block in &blueprint.blocks {
    let mut resolved = resolve_block(client, block, rng).await;
    if resolved.error == Some(BlockErrorKind::Unauthorized) {
      return Err(anyhow!(
        "authorization lost while resolving block `{}`",
        block.title
      ));
    }

    if resolved.uris.is_empty() {
      blocks.push(resolved);
      continue;
    }

    match append_all(client, &playlist.id, &resolved.uris).await {
      Ok(()) => {
        info!("appended {} items for block `{}`", resolved.uris.len(), block.title);
      }
      Err(e) if e.is_fatal() => {
        return Err(anyhow!(
          "authorization lost while appending block `{}`: {}",
          block.title,
          e
        ));
      }
      Err(e) => {
        warn!("append failed for block `{}`: {}", block.title, e);
        resolved.ok = false;
        resolved.error = Some(BlockErrorKind::RemoteUnavailable);
      }
    }
    blocks.push(resolved);
  }

  Ok(MaterializeOutcome {
    playlist_id: playlist.id,
    playlist_url: playlist.url,
    blocks,
  })
}

/// The same run wrapped in a wall-clock budget. Hitting the deadline
/// drops the run future, cancelling whatever call was in flight.
pub async fn materialize_with_timeout<C, R>(
  client: &C,
  blueprint: &Blueprint,
  rng: &mut R,
  budget: Duration,
) -> Result<MaterializeOutcome>
where
  C: SourceFetch + PlaylistWrite,
  R: Rng,
{
  match tokio::time::timeout(budget, materialize(client, blueprint, rng)).await {
    Ok(outcome) => outcome,
    Err(_) => Err(anyhow!(
      "run did not finish within {}s",
      budget.as_secs()
    )),
  }
}

async fn append_all<C: PlaylistWrite>(
  client: &C,
  playlist_id: &str,
  uris: &[String],
) -> Result<(), FetchError> {
  for chunk in uris.chunks(APPEND_CHUNK) {
    client.append_to_playlist(playlist_id, chunk).await?;
  }
  Ok(())
}
