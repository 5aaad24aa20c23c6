//! In-memory chat gateway

use async_trait::async_trait;
use native_vids::{ChatMessage, DeliveryError, Reply, StatusReply};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One thing the bot did in the channel
#[derive(Clone, Debug)]
pub enum ChatOp {
    /// New reply to the user's message
    Sent {
        reply_id: usize,
        reply: Reply,
        attachment_existed: bool,
    },
    /// Edit of an earlier reply
    Edited {
        reply_id: usize,
        reply: Reply,
        attachment_existed: bool,
    },
    /// Earlier reply removed
    Deleted { reply_id: usize },
}

impl ChatOp {
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            ChatOp::Sent { reply, .. } | ChatOp::Edited { reply, .. } => Some(reply),
            ChatOp::Deleted { .. } => None,
        }
    }

    pub fn reply_id(&self) -> usize {
        match self {
            ChatOp::Sent { reply_id, .. }
            | ChatOp::Edited { reply_id, .. }
            | ChatOp::Deleted { reply_id } => *reply_id,
        }
    }
}

#[derive(Default)]
struct Channel {
    ops: Mutex<Vec<ChatOp>>,
    next_id: AtomicUsize,
}

/// A user message whose replies are recorded
#[derive(Clone)]
pub struct TestMessage {
    content: String,
    author: String,
    channel: Arc<Channel>,
}

impl TestMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author: "alice".into(),
            channel: Arc::new(Channel::default()),
        }
    }

    pub fn shared(&self) -> Arc<dyn ChatMessage> {
        Arc::new(self.clone())
    }

    pub fn ops(&self) -> Vec<ChatOp> {
        self.channel.ops.lock().unwrap().clone()
    }

    /// Operations on one reply, in order
    pub fn thread(&self, reply_id: usize) -> Vec<ChatOp> {
        self.ops()
            .into_iter()
            .filter(|op| op.reply_id() == reply_id)
            .collect()
    }

    /// Ids of every reply sent, in order
    pub fn reply_ids(&self) -> Vec<usize> {
        self.ops()
            .iter()
            .filter_map(|op| match op {
                ChatOp::Sent { reply_id, .. } => Some(*reply_id),
                _ => None,
            })
            .collect()
    }

    /// The final state of each reply: last op carrying content, per reply id
    pub fn final_replies(&self) -> Vec<Reply> {
        self.reply_ids()
            .into_iter()
            .filter_map(|id| {
                self.thread(id)
                    .iter()
                    .rev()
                    .find_map(|op| op.reply().cloned())
            })
            .collect()
    }
}

#[async_trait]
impl ChatMessage for TestMessage {
    fn content(&self) -> &str {
        &self.content
    }

    fn author_display_name(&self) -> &str {
        &self.author
    }

    async fn reply(&self, reply: Reply) -> Result<Box<dyn StatusReply>, DeliveryError> {
        let reply_id = self.channel.next_id.fetch_add(1, Ordering::SeqCst);
        let attachment_existed = reply.attachment.as_ref().is_some_and(|p| p.exists());
        self.channel.ops.lock().unwrap().push(ChatOp::Sent {
            reply_id,
            reply,
            attachment_existed,
        });
        Ok(Box::new(TestReply {
            id: reply_id,
            channel: Arc::clone(&self.channel),
        }))
    }
}

struct TestReply {
    id: usize,
    channel: Arc<Channel>,
}

#[async_trait]
impl StatusReply for TestReply {
    async fn edit(&mut self, reply: Reply) -> Result<(), DeliveryError> {
        let attachment_existed = reply.attachment.as_ref().is_some_and(|p| p.exists());
        self.channel.ops.lock().unwrap().push(ChatOp::Edited {
            reply_id: self.id,
            reply,
            attachment_existed,
        });
        Ok(())
    }

    async fn delete(self: Box<Self>) -> Result<(), DeliveryError> {
        self.channel
            .ops
            .lock()
            .unwrap()
            .push(ChatOp::Deleted { reply_id: self.id });
        Ok(())
    }
}
