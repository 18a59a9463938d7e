use serde::{Deserialize, Serialize};
use std::fmt;

/// The two durable collections the worker maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Partition {
    /// New post submissions awaiting delivery.
    OutboundPosts,
    /// Feed-refresh requests awaiting delivery.
    PendingReads,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::OutboundPosts, Partition::PendingReads];

    /// File stem of this partition's on-disk log.
    pub fn log_name(&self) -> &'static str {
        match self {
            Partition::OutboundPosts => "outbound_posts",
            Partition::PendingReads => "pending_reads",
        }
    }

    pub fn retry_tag(&self) -> RetryTag {
        match self {
            Partition::OutboundPosts => RetryTag::SendPosts,
            Partition::PendingReads => RetryTag::GetPosts,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.log_name())
    }
}

/// Opaque tag handed to the host's deferred-retry trigger. The host passes
/// it back verbatim when connectivity permits another drain attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryTag {
    SendPosts,
    GetPosts,
}

impl RetryTag {
    pub fn partition(&self) -> Partition {
        match self {
            RetryTag::SendPosts => Partition::OutboundPosts,
            RetryTag::GetPosts => Partition::PendingReads,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetryTag::SendPosts => "send-posts",
            RetryTag::GetPosts => "get-posts",
        }
    }
}

impl fmt::Display for RetryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued data request. The `url` carries everything needed to replay the
/// request; no other state is consulted at replay time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: u64,
    pub url: String,
}

/// A single feed post as the remote store shapes it. The core carries this
/// through from response body to notification without validating it; unknown
/// extra fields are ignored, missing ones default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub title: String,
    pub text: String,
    pub date: serde_json::Value,
    pub user: String,
}

/// Commands a foreground page sends to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "kebab-case")]
pub enum ClientCommand {
    SendPost { url: String },
    GetPosts { url: String },
    /// Ask for the URLs still queued in the outbound partition. Answered
    /// point-to-point, so a page can render its "waiting" posts on attach.
    WaitingPosts,
}

/// Events the worker emits to foreground listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "kebab-case")]
pub enum ClientEvent {
    PostsSent,
    GotPosts { posts: Vec<Post> },
    WaitingPosts { urls: Vec<String> },
}
