/*
    deezdl | Rust CLI tool to download music from Deezer and Spotify links.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR_NAME: &str = "deezdl";
const ARL_FILE_NAME: &str = ".arl";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Failed to read session token from {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write session token to {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Returns the folder holding `config.json` and `.arl`.
///
/// Portable mode keeps everything in `./config` next to where the tool is
/// launched; otherwise the platform configuration directory is used.
pub fn config_folder(portable: bool) -> PathBuf {
    if portable {
        return PathBuf::from(".").join("config");
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join("config"))
}

/// The ARL session token. Debug output never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(***)")
    }
}

/// File-backed storage for a single session token.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_folder(config_folder: &Path) -> Self {
        Self::new(config_folder.join(ARL_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the first line of the token file. `None` when the file does not
    /// exist or holds only whitespace.
    pub fn load(&self) -> Result<Option<SessionCredential>, CredentialError> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| CredentialError::Read {
            path: self.path.clone(),
            source,
        })?;
        let token = content.lines().next().unwrap_or_default().trim();
        if token.is_empty() {
            return Ok(None);
        }
        Ok(Some(SessionCredential::new(token)))
    }

    /// Overwrites the stored token, creating the config folder if needed.
    pub fn save(&self, credential: &SessionCredential) -> Result<(), CredentialError> {
        let write_err = |source| CredentialError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&self.path, credential.as_str()).map_err(write_err)
    }
}
