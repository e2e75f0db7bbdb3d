//! Client configuration: the OAuth app id and callback port, stored as
//! YAML under the app config directory.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{
  fs,
  io::{self, Write},
  path::{Path, PathBuf},
};

const FILE_NAME: &str = "client.yml";
const CONFIG_DIR: &str = ".config";
const APP_CONFIG_DIR: &str = "blockmix";
const TOKEN_CACHE_FILE: &str = ".spotify_token_cache.json";
const BLUEPRINTS_FILE: &str = "blueprints.json";
const DEFAULT_PORT: u16 = 8888;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
struct ClientConfigString {
  client_id: Option<String>,
  port: Option<u16>,
}

#[derive(Clone, Debug)]
pub struct ConfigPaths {
  pub config_file_path: PathBuf,
  pub token_cache_path: PathBuf,
  pub blueprints_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
  pub client_id: String,
  pub port: u16,
}

impl ClientConfig {
  pub fn new() -> ClientConfig {
    ClientConfig {
      client_id: String::new(),
      port: DEFAULT_PORT,
    }
  }

  pub fn get_or_build_paths(&self) -> Result<ConfigPaths> {
    match dirs::home_dir() {
      Some(home) => {
        let path = Path::new(&home);
        let home_config_dir = path.join(CONFIG_DIR);
        let app_config_dir = home_config_dir.join(APP_CONFIG_DIR);

        if !home_config_dir.exists() {
          fs::create_dir(&home_config_dir)?;
        }

        if !app_config_dir.exists() {
          fs::create_dir(&app_config_dir)?;
        }

        Ok(ConfigPaths {
          config_file_path: app_config_dir.join(FILE_NAME),
          token_cache_path: app_config_dir.join(TOKEN_CACHE_FILE),
          blueprints_path: app_config_dir.join(BLUEPRINTS_FILE),
        })
      }
      None => Err(anyhow!("No $HOME directory found for client config")),
    }
  }

  pub fn load_config(&mut self) -> Result<()> {
    let paths = self.get_or_build_paths()?;
    if paths.config_file_path.exists() {
      let config_string = fs::read_to_string(&paths.config_file_path)?;
      // serde fails if file is empty
      if config_string.trim().is_empty() {
        return self.ask_for_client_id(&paths);
      }

      let config_yml: ClientConfigString = serde_yaml::from_str(&config_string)?;
      match config_yml.client_id {
        Some(client_id) if !client_id.trim().is_empty() => {
          self.client_id = client_id.trim().to_string();
          self.port = config_yml.port.unwrap_or(DEFAULT_PORT);
          Ok(())
        }
        _ => self.ask_for_client_id(&paths),
      }
    } else {
      self.ask_for_client_id(&paths)
    }
  }

  /// Rerun the client id wizard over the existing config.
  pub fn reconfigure_auth(&mut self) -> Result<()> {
    let paths = self.get_or_build_paths()?;
    self.ask_for_client_id(&paths)
  }

  /// First-run wizard: walk the user through registering an app and
  /// store the resulting client id.
  fn ask_for_client_id(&mut self, paths: &ConfigPaths) -> Result<()> {
    println!(
      "Config will be saved to {}",
      paths.config_file_path.display()
    );
    println!("\nHow to get a client id:\n");
    println!("  1. Go to https://developer.spotify.com/dashboard/applications");
    println!("  2. Create an app");
    println!(
      "  3. Add `{}` to the app's redirect URIs",
      self.get_redirect_uri()
    );
    println!("  4. Paste the app's client id below\n");

    let client_id = loop {
      print!("Enter your client id: ");
      io::stdout().flush()?;
      let mut input = String::new();
      io::stdin().read_line(&mut input)?;
      let trimmed = input.trim();
      if !trimmed.is_empty() {
        break trimmed.to_string();
      }
      println!("The client id cannot be empty.");
    };

    self.client_id = client_id;
    self.save_config(paths)
  }

  fn save_config(&self, paths: &ConfigPaths) -> Result<()> {
    let config_yml = serde_yaml::to_string(&ClientConfigString {
      client_id: Some(self.client_id.clone()),
      port: Some(self.port),
    })?;
    fs::write(&paths.config_file_path, config_yml)?;
    Ok(())
  }

  pub fn get_redirect_uri(&self) -> String {
    format!("http://127.0.0.1:{}/callback", self.port)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_redirect_uri_uses_configured_port() {
    let mut config = ClientConfig::new();
    config.port = 9090;
    assert_eq!(config.get_redirect_uri(), "http://127.0.0.1:9090/callback");
  }

  #[test]
  fn test_config_yaml_shape() {
    let parsed: ClientConfigString =
      serde_yaml::from_str("client_id: abc123\nport: 9000\n").unwrap();
    assert_eq!(parsed.client_id.as_deref(), Some("abc123"));
    assert_eq!(parsed.port, Some(9000));

    // Port is optional
    let parsed: ClientConfigString = serde_yaml::from_str("client_id: abc123\n").unwrap();
    assert_eq!(parsed.port, None);
  }
}
