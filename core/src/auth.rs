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

use crate::client::{CatalogClient, UserInfo};
use crate::credentials::{CredentialError, CredentialStore, SessionCredential};
use async_trait::async_trait;
use log::{info, warn};
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Store(#[from] CredentialError),
    #[error("Failed to read session token: {0}")]
    Prompt(#[from] std::io::Error),
    #[error("No valid session token was provided before input closed")]
    PromptClosed,
    #[error("Timed out waiting for a session token")]
    PromptTimeout,
}

/// Source of replacement tokens when the stored one is missing or rejected.
#[async_trait]
pub trait TokenPrompt: Send {
    /// `Ok(None)` means the input is exhausted and no more tokens will come.
    async fn request_token(&mut self) -> std::io::Result<Option<String>>;
}

/// Asks on stdout and reads one line from stdin per attempt.
pub struct StdinPrompt {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenPrompt for StdinPrompt {
    async fn request_token(&mut self) -> std::io::Result<Option<String>> {
        print!("Paste here your arl:");
        std::io::stdout().flush()?;
        self.lines.next_line().await
    }
}

/// An authenticated client plus the token it was validated with.
///
/// Built once by [`Authenticator::ensure_session`] and then only borrowed.
pub struct Session {
    client: Box<dyn CatalogClient>,
    credential: SessionCredential,
}

impl Session {
    pub fn client(&self) -> &dyn CatalogClient {
        self.client.as_ref()
    }

    pub fn credential(&self) -> &SessionCredential {
        &self.credential
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.client.user()
    }
}

pub struct Authenticator<P> {
    store: CredentialStore,
    prompt: P,
    prompt_timeout: Option<Duration>,
}

impl<P: TokenPrompt> Authenticator<P> {
    pub fn new(store: CredentialStore, prompt: P) -> Self {
        Self {
            store,
            prompt,
            prompt_timeout: None,
        }
    }

    /// Bounds each wait for a replacement token. Without it the prompt waits forever.
    pub fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = Some(timeout);
        self
    }

    /// Logs `client` in with the stored token, or with the first prompted
    /// token the service accepts, and persists that token.
    ///
    /// Rejected tokens only cause another prompt. Store and input failures
    /// are returned immediately.
    pub async fn ensure_session<C>(mut self, mut client: C) -> Result<Session, AuthError>
    where
        C: CatalogClient + 'static,
    {
        let credential = match self.store.load()? {
            Some(stored) => {
                if validate(&mut client, &stored).await {
                    info!("Logged in with the stored session token");
                    stored
                } else {
                    warn!("Stored session token is no longer valid");
                    self.request_valid_token(&mut client).await?
                }
            }
            None => self.request_valid_token(&mut client).await?,
        };

        self.store.save(&credential)?;
        if let Some(user) = client.user() {
            info!("Authenticated as {} ({})", user.name, user.id);
        }

        Ok(Session {
            client: Box::new(client),
            credential,
        })
    }

    async fn request_valid_token<C: CatalogClient>(
        &mut self,
        client: &mut C,
    ) -> Result<SessionCredential, AuthError> {
        loop {
            let answer = match self.prompt_timeout {
                Some(limit) => tokio::time::timeout(limit, self.prompt.request_token())
                    .await
                    .map_err(|_| AuthError::PromptTimeout)?,
                None => self.prompt.request_token().await,
            };
            let Some(candidate) = answer? else {
                return Err(AuthError::PromptClosed);
            };

            let candidate = SessionCredential::new(candidate.trim());
            if candidate.as_str().is_empty() {
                continue;
            }
            if validate(client, &candidate).await {
                return Ok(candidate);
            }
            warn!("Session token rejected, try again");
        }
    }
}

async fn validate<C: CatalogClient>(client: &mut C, credential: &SessionCredential) -> bool {
    match client.login_via_arl(credential.as_str()).await {
        Ok(valid) => valid,
        Err(e) => {
            warn!("Could not validate session token: {}", e);
            false
        }
    }
}
