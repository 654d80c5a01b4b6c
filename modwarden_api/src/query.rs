//! Query builders for list endpoints: the [`Query`] trait and [`MessageQuery`].

use url::Url;

/// Trait implemented by all query builders. Provides URL serialization.
pub trait Query {
    /// Appends this query's parameters to the given URL, returning the modified URL.
    fn add_to_url(&self, url: &Url) -> Url;
}

/// Discord caps `limit` on the channel messages endpoint at 100.
const MAX_MESSAGE_LIMIT: u8 = 100;

/// Query for `GET /channels/{channel.id}/messages`.
///
/// Messages are returned newest first. `after` restricts the result to
/// messages with a snowflake greater than the given id.
#[derive(Clone, Debug, Default)]
pub struct MessageQuery {
    pub limit: Option<u8>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl MessageQuery {
    /// Only the newest message in the channel.
    pub fn latest() -> Self {
        Self::default().with_limit(1)
    }

    /// Sets the number of messages to return, clamped to `1..=100`.
    pub fn with_limit(mut self, limit: u8) -> Self {
        self.limit = Some(limit.clamp(1, MAX_MESSAGE_LIMIT));
        self
    }

    /// Only return messages newer than `message_id`.
    pub fn with_after(mut self, message_id: &str) -> Self {
        self.after = Some(message_id.to_string());
        self
    }

    /// Only return messages older than `message_id`.
    pub fn with_before(mut self, message_id: &str) -> Self {
        self.before = Some(message_id.to_string());
        self
    }
}

impl Query for MessageQuery {
    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        if let Some(limit) = self.limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        if let Some(after) = &self.after {
            url.query_pairs_mut().append_pair("after", after);
        }
        if let Some(before) = &self.before {
            url.query_pairs_mut().append_pair("before", before);
        }
        url
    }
}
