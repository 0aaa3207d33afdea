//! Operator join-token minting.
//!
//! Operators join the live voice room with an HS256-signed bearer carrying a
//! room grant. The core holds no key material beyond what the configured env
//! vars provide; tests stub the trait.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use saarthi_domain::config::VoiceConfig;
use saarthi_domain::{Error, Result};

pub trait TokenMinter: Send + Sync {
    /// Mint a join token for `agent_id` on `room_name`, valid for
    /// `ttl_seconds`.
    fn mint_operator_token(
        &self,
        room_name: &str,
        agent_id: &str,
        display_name: &str,
        ttl_seconds: u64,
    ) -> Result<String>;

    /// WebSocket URL operators connect to with the token.
    fn join_url(&self) -> &str;

    /// Default token lifetime.
    fn default_ttl_seconds(&self) -> u64 {
        3600
    }
}

#[derive(Serialize)]
struct RoomGrant {
    room: String,
    join: bool,
    publish: bool,
    subscribe: bool,
    publish_data: bool,
}

#[derive(Serialize)]
struct RoomClaims {
    iss: String,
    sub: String,
    iat: i64,
    nbf: i64,
    exp: i64,
    name: String,
    room_grant: RoomGrant,
    metadata: String,
}

/// HS256 minter backed by the room provider's API key/secret.
pub struct RoomTokenMinter {
    api_key: String,
    api_secret: String,
    url: String,
    ttl_seconds: u64,
}

impl RoomTokenMinter {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        url: impl Into<String>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            url: url.into(),
            ttl_seconds,
        }
    }

    /// Build a minter from the voice config, resolving credentials from the
    /// named env vars.
    pub fn from_config(config: &VoiceConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| Error::Config(format!("env var {} is not set", config.api_key_env)))?;
        let api_secret = std::env::var(&config.api_secret_env).map_err(|_| {
            Error::Config(format!("env var {} is not set", config.api_secret_env))
        })?;
        Ok(Self::new(
            api_key,
            api_secret,
            config.url.clone(),
            config.token_ttl_seconds,
        ))
    }
}

impl TokenMinter for RoomTokenMinter {
    fn mint_operator_token(
        &self,
        room_name: &str,
        agent_id: &str,
        display_name: &str,
        ttl_seconds: u64,
    ) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = RoomClaims {
            iss: self.api_key.clone(),
            sub: agent_id.to_owned(),
            iat: now,
            nbf: now,
            exp: now + ttl_seconds as i64,
            name: display_name.to_owned(),
            room_grant: RoomGrant {
                room: room_name.to_owned(),
                join: true,
                publish: true,
                subscribe: true,
                publish_data: true,
            },
            metadata: format!(
                "{{\"role\":\"human_agent\",\"agent_id\":\"{agent_id}\"}}"
            ),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )
        .map_err(|e| Error::Token(e.to_string()))?;

        tracing::info!(
            agent_id = %agent_id,
            room_name = %room_name,
            "minted operator join token"
        );
        Ok(token)
    }

    fn join_url(&self) -> &str {
        &self.url
    }

    fn default_ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }
}

/// Dev-mode stand-in used when room credentials are not configured. Minting
/// always fails; the alert stays ASSIGNED and the caller sees the error.
pub struct UnconfiguredMinter;

impl TokenMinter for UnconfiguredMinter {
    fn mint_operator_token(
        &self,
        _room_name: &str,
        _agent_id: &str,
        _display_name: &str,
        _ttl_seconds: u64,
    ) -> Result<String> {
        Err(Error::Token(
            "room provider credentials are not configured".into(),
        ))
    }

    fn join_url(&self) -> &str {
        ""
    }
}
