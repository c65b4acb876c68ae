//! Telegram feed provider backed by a grammers user session
//!
//! Channel history on Telegram is only readable through a user client (the
//! bot API cannot page arbitrary channel history), so this provider speaks
//! MTProto via grammers. The session token is persisted next to the daemon
//! and reused across runs; when it is missing or unauthorized the login flow
//! prompts interactively.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use grammers_client::{Client, Config, InitParams, SignInError};
use grammers_session::{PackedChat, Session};
use newswire_core::FeedItem;
use tracing::{debug, info};

use crate::error::FeedError;
use crate::provider::FeedProvider;

/// Telegram connection settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// API id from my.telegram.org
    pub api_id: i32,
    /// API hash from my.telegram.org
    pub api_hash: String,
    /// Where the session token is persisted
    pub session_path: PathBuf,
}

/// Feed provider over a Telegram user session.
pub struct TelegramFeed {
    client: Client,
    session_path: PathBuf,
    /// Resolved usernames, so repeated operations skip the resolve call
    peers: Mutex<HashMap<String, PackedChat>>,
}

impl TelegramFeed {
    /// Connect using the saved session, creating a fresh one when absent.
    pub async fn connect(config: TelegramConfig) -> Result<Self, FeedError> {
        let session = Session::load_file_or_create(&config.session_path)
            .map_err(|e| FeedError::Session(e.to_string()))?;

        info!(session = %config.session_path.display(), "connecting to Telegram");
        let client = Client::connect(Config {
            session,
            api_id: config.api_id,
            api_hash: config.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| FeedError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            session_path: config.session_path,
            peers: Mutex::new(HashMap::new()),
        })
    }

    /// Run the interactive login flow if the session is not yet authorized,
    /// then persist the session token.
    pub async fn authorize_interactive(&self) -> Result<(), FeedError> {
        if self
            .client
            .is_authorized()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?
        {
            debug!("session already authorized");
            return Ok(());
        }

        let phone = prompt("Please enter your number: ")?;
        let token = self
            .client
            .request_login_code(&phone)
            .await
            .map_err(|e| FeedError::Auth(e.to_string()))?;
        let code = prompt("Please enter the code you received: ")?;

        match self.client.sign_in(&token, &code).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = prompt("Please enter your password: ")?;
                self.client
                    .check_password(password_token, password)
                    .await
                    .map_err(|e| FeedError::Auth(e.to_string()))?;
            }
            Err(e) => return Err(FeedError::Auth(e.to_string())),
        }

        self.save_session()?;
        info!("Telegram session authorized");
        Ok(())
    }

    /// Persist the current session token to disk.
    pub fn save_session(&self) -> Result<(), FeedError> {
        self.client
            .session()
            .save_to_file(&self.session_path)
            .map_err(|e| FeedError::Session(e.to_string()))
    }

    async fn packed_peer(&self, identity: &str) -> Result<Option<PackedChat>, FeedError> {
        {
            let peers = self
                .peers
                .lock()
                .map_err(|_| FeedError::Io("peer cache lock poisoned".to_string()))?;
            if let Some(peer) = peers.get(identity) {
                return Ok(Some(peer.clone()));
            }
        }

        let chat = self
            .client
            .resolve_username(identity)
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        let packed = chat.map(|chat| chat.pack());

        if let Some(peer) = packed.clone() {
            let mut peers = self
                .peers
                .lock()
                .map_err(|_| FeedError::Io("peer cache lock poisoned".to_string()))?;
            peers.insert(identity.to_string(), peer);
        }
        Ok(packed)
    }
}

#[async_trait]
impl FeedProvider for TelegramFeed {
    async fn resolve_peer(&self, identity: &str) -> Result<bool, FeedError> {
        Ok(self.packed_peer(identity).await?.is_some())
    }

    async fn fetch_history(
        &self,
        identity: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FeedItem>, FeedError> {
        let peer = self
            .packed_peer(identity)
            .await?
            .ok_or_else(|| FeedError::UnknownPeer(identity.to_string()))?;

        debug!(channel = identity, limit, offset, "fetching Telegram history");

        // The iterator is newest-first; skip `offset` messages to reach the
        // requested window.
        let mut messages = self.client.iter_messages(peer).limit(offset + limit);
        let mut skipped = 0;
        let mut items = Vec::with_capacity(limit);
        while let Some(message) = messages
            .next()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?
        {
            if skipped < offset {
                skipped += 1;
                continue;
            }
            items.push(FeedItem::new(message.date(), message.text()));
            if items.len() == limit {
                break;
            }
        }
        Ok(items)
    }

    async fn send_message(&self, identity: &str, text: &str) -> Result<(), FeedError> {
        let peer = self
            .packed_peer(identity)
            .await?
            .ok_or_else(|| FeedError::UnknownPeer(identity.to_string()))?;
        self.client
            .send_message(peer, text)
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.client.is_authorized().await.unwrap_or(false)
    }
}

fn prompt(message: &str) -> Result<String, FeedError> {
    let mut stdout = io::stdout();
    stdout
        .write_all(message.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| FeedError::Io(e.to_string()))?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| FeedError::Io(e.to_string()))?;
    Ok(line.trim().to_string())
}
