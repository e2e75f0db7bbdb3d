//! Blueprint persistence. The whole collection lives in one JSON
//! document under the user's config directory and is rewritten on every
//! change.

use crate::core::blocks::Blueprint;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

pub struct BlueprintStore {
  path: PathBuf,
}

/// Reads a single blueprint from a standalone JSON file, as exported by
/// the authoring side or written by hand.
pub fn read_blueprint_file(path: &Path) -> Result<Blueprint> {
  let raw = fs::read_to_string(path)
    .map_err(|e| anyhow!("Could not read blueprint file {}: {}", path.display(), e))?;
  serde_json::from_str(&raw)
    .map_err(|e| anyhow!("Could not parse blueprint file {}: {}", path.display(), e))
}

impl BlueprintStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn load(&self) -> Result<Vec<Blueprint>> {
    if !self.path.exists() {
      return Ok(Vec::new());
    }
    let raw = fs::read_to_string(&self.path)?;
    // serde fails if file is empty
    if raw.trim().is_empty() {
      return Ok(Vec::new());
    }
    serde_json::from_str(&raw)
      .map_err(|e| anyhow!("Could not parse {}: {}", self.path.display(), e))
  }

  pub fn save(&self, blueprints: &[Blueprint]) -> Result<()> {
    let content = serde_json::to_string_pretty(blueprints)?;
    fs::write(&self.path, content)?;
    Ok(())
  }

  /// Looks a blueprint up by exact id first, then by case-insensitive
  /// name. More than one name match is an error rather than a guess.
  pub fn find(&self, query: &str) -> Result<Option<Blueprint>> {
    let blueprints = self.load()?;
    if let Some(found) = blueprints.iter().find(|b| b.id == query) {
      return Ok(Some(found.clone()));
    }
    let wanted = query.to_lowercase();
    let matches: Vec<&Blueprint> = blueprints
      .iter()
      .filter(|b| b.name.to_lowercase() == wanted)
      .collect();
    match matches.len() {
      0 => Ok(None),
      1 => Ok(Some(matches[0].clone())),
      _ => {
        let ids: Vec<&str> = matches.iter().map(|b| b.id.as_str()).collect();
        Err(anyhow!(
          "`{}` names {} blueprints ({}); use an id instead",
          query,
          matches.len(),
          ids.join(", ")
        ))
      }
    }
  }

  /// Adds a blueprint to the collection, stamping missing bookkeeping
  /// fields. An existing blueprint with the same id is replaced.
  pub fn import(&self, mut blueprint: Blueprint) -> Result<Blueprint> {
    if blueprint.name.trim().is_empty() {
      return Err(anyhow!("A blueprint needs a name"));
    }
    if blueprint.id.is_empty() {
      blueprint.id = Utc::now().timestamp_millis().to_string();
    }
    if blueprint.created_at.is_empty() {
      blueprint.created_at = Utc::now().to_rfc3339();
    }
    let mut blueprints = self.load()?;
    match blueprints.iter_mut().find(|b| b.id == blueprint.id) {
      Some(slot) => *slot = blueprint.clone(),
      None => blueprints.push(blueprint.clone()),
    }
    self.save(&blueprints)?;
    Ok(blueprint)
  }

  /// Removes a blueprint by id or name. Returns whether one was removed.
  pub fn delete(&self, query: &str) -> Result<bool> {
    let Some(found) = self.find(query)? else {
      return Ok(false);
    };
    let mut blueprints = self.load()?;
    blueprints.retain(|b| b.id != found.id);
    self.save(&blueprints)?;
    Ok(true)
  }
}
