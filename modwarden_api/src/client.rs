//! HTTP client for the Discord REST API.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::{
    query::{MessageQuery, Query},
    types::{Application, CreateMessage, Member, Message, PartialGuild, RateLimitBody, Role, User},
    user_agent::get_user_agent,
    Error,
};

/// Production REST endpoint, API version 10.
pub const API_BASE_URL: &str = "https://discord.com/api/v10";

/// Upper bound for a server-suggested rate limit wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Request timeout applied when the caller does not pick one.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the Discord REST API.
///
/// Authenticates every call with the bot token. The underlying
/// `reqwest::Client` is built once and shared, so connections are reused
/// between calls.
pub struct Client {
    http: reqwest::Client,
    /// Base URL for the API. Defaults to `https://discord.com/api/v10`.
    base_api_url: String,
    token: String,
}

impl Client {
    /// Creates a new client pointing at the production Discord API.
    pub fn new(token: &str) -> Result<Self, Error> {
        Self::with_base_url(API_BASE_URL, token, DEFAULT_TIMEOUT)
    }

    /// Creates a new client with a custom base URL and timeout. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str, token: &str, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed
            })?;
        Ok(Self {
            http,
            base_api_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn get_url(&self, path: &str, query: Option<&impl Query>) -> Result<Url, Error> {
        let url = Url::parse(format!("{}{}", &self.base_api_url, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::RequestFailed
        })?;
        Ok(match query {
            Some(query) => query.add_to_url(&url),
            None => url,
        })
    }

    /// Sends a request and returns the raw body of a successful response.
    async fn send<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<String, Error>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header("authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await.map_err(|e| {
            tracing::error!("Failed to {} {}: {}", method, url.path(), e);
            Error::RequestFailed
        })?;

        let status = resp.status();
        let header_retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok());
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::RequestFailed
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = serde_json::from_str::<RateLimitBody>(&body)
                .map(|b| b.retry_after)
                .ok()
                .or(header_retry_after)
                .unwrap_or(1.0);
            tracing::warn!("Rate limited on {} {}, retry after {:.2}s", method, url.path(), retry_after);
            return Err(Error::RateLimited {
                retry_after: retry_delay(retry_after),
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        Ok(body)
    }

    async fn get<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Query,
    {
        let url = self.get_url(path, query)?;
        let body = self.send::<()>(Method::GET, url, None).await?;
        parse(&body)
    }

    /// Fetches all roles defined in a guild.
    pub async fn get_guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, Error> {
        self.get::<Vec<Role>, MessageQuery>(format!("/guilds/{}/roles", guild_id).as_str(), None)
            .await
    }

    /// Fetches a guild member. Returns `Ok(None)` when the user is not in the guild.
    pub async fn get_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>, Error> {
        match self
            .get::<Member, MessageQuery>(
                format!("/guilds/{}/members/{}", guild_id, user_id).as_str(),
                None,
            )
            .await
        {
            Ok(member) => Ok(Some(member)),
            Err(Error::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetches messages of a channel, newest first.
    pub async fn get_channel_messages(
        &self,
        channel_id: &str,
        query: &MessageQuery,
    ) -> Result<Vec<Message>, Error> {
        self.get::<Vec<Message>, MessageQuery>(
            format!("/channels/{}/messages", channel_id).as_str(),
            Some(query),
        )
        .await
    }

    /// Deletes a single message.
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), Error> {
        let url = self.get_url(
            format!("/channels/{}/messages/{}", channel_id, message_id).as_str(),
            None::<&MessageQuery>,
        )?;
        self.send::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// Posts a plain text message to a channel.
    pub async fn create_message(&self, channel_id: &str, content: &str) -> Result<Message, Error> {
        let url = self.get_url(
            format!("/channels/{}/messages", channel_id).as_str(),
            None::<&MessageQuery>,
        )?;
        let body = self
            .send(Method::POST, url, Some(&CreateMessage { content }))
            .await?;
        parse(&body)
    }

    /// Fetches the user the token belongs to.
    pub async fn get_current_user(&self) -> Result<User, Error> {
        self.get::<User, MessageQuery>("/users/@me", None).await
    }

    /// Fetches the guilds the bot is a member of.
    pub async fn get_current_user_guilds(&self) -> Result<Vec<PartialGuild>, Error> {
        self.get::<Vec<PartialGuild>, MessageQuery>("/users/@me/guilds", None)
            .await
    }

    /// Fetches the application the bot token belongs to.
    pub async fn get_current_application(&self) -> Result<Application, Error> {
        self.get::<Application, MessageQuery>("/oauth2/applications/@me", None)
            .await
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str::<T>(body).map_err(|e| {
        let snippet = truncate_body(body);
        tracing::error!("Failed to parse resource: {} | body: {}", e, snippet);
        Error::ParseFailed
    })
}

/// Converts a `retry_after` in seconds, clamped to `0..=MAX_RETRY_AFTER`.
fn retry_delay(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::from_secs(1);
    }
    Duration::try_from_secs_f64(secs.max(0.0)).map_or(MAX_RETRY_AFTER, |d| d.min(MAX_RETRY_AFTER))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
