//! Change feed service trait.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::events::feed::FeedMessage;
use crate::result::AppResult;
use crate::types::descriptor::FeedTopic;
use crate::types::id::ChannelId;

/// An open channel: its id plus the ordered queue of events and status
/// transitions. The transport guarantees emission order within a channel.
#[derive(Debug)]
pub struct FeedChannel {
    /// Service-assigned channel id, used to unsubscribe.
    pub id: ChannelId,
    /// Ordered messages for this channel. Closes when the channel is released.
    pub messages: mpsc::Receiver<FeedMessage>,
}

/// Live stream of row-level mutations scoped by topic.
#[async_trait]
pub trait ChangeFeedService: Send + Sync + std::fmt::Debug + 'static {
    /// Open a channel for the topic. The first status message is expected to
    /// be `Subscribed` once the server acknowledges the join.
    async fn subscribe(&self, topic: &FeedTopic) -> AppResult<FeedChannel>;

    /// Release a channel. Unknown ids are not an error.
    async fn unsubscribe(&self, id: ChannelId) -> AppResult<()>;
}
