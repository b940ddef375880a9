//! Prompt submission: draft handling, dispatch to the chat service and
//! application of replies.

use crate::ai::ChatService;
use crate::conversation::ConversationState;
use crate::models::ChatMessage;
use crate::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Completion of one dispatched chat request.
#[derive(Debug)]
pub struct Reply {
    pub seq: u64,
    pub result: Result<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Draft was empty or whitespace-only.
    Ignored,
    Dispatched { seq: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Applied,
    /// An older submission's reply arrived after a newer submission.
    Stale,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingReply,
    LinesRendered,
    Failed(String),
}

/// Sends conversation snapshots to the chat service and reports completions
/// over a channel.
#[derive(Clone)]
pub struct Dispatcher {
    chat: Arc<dyn ChatService>,
    replies: mpsc::UnboundedSender<Reply>,
}

impl Dispatcher {
    pub fn new(chat: Arc<dyn ChatService>) -> (Self, mpsc::UnboundedReceiver<Reply>) {
        let (replies, rx) = mpsc::unbounded_channel();
        (Self { chat, replies }, rx)
    }

    /// Fire-and-forget: the reply is delivered on the channel, never returned.
    pub fn send(&self, seq: u64, history: Vec<ChatMessage>) {
        let chat = Arc::clone(&self.chat);
        let replies = self.replies.clone();

        tokio::spawn(async move {
            debug!("[#{}] Requesting story ({} messages)", seq, history.len());
            let result = chat.complete(&history).await;
            if replies.send(Reply { seq, result }).is_err() {
                debug!("[#{}] Reply receiver dropped", seq);
            }
        });
    }
}

pub struct PromptController {
    conversation: ConversationState,
    dispatcher: Dispatcher,
    draft: String,
    current_prompt: Option<String>,
    latest_seq: u64,
    in_flight: usize,
    discard_stale: bool,
    phase: Phase,
}

impl PromptController {
    pub fn new(system: ChatMessage, dispatcher: Dispatcher, discard_stale: bool) -> Result<Self> {
        Ok(Self {
            conversation: ConversationState::new(system)?,
            dispatcher,
            draft: String::new(),
            current_prompt: None,
            latest_seq: 0,
            in_flight: 0,
            discard_stale,
            phase: Phase::Idle,
        })
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// The last submitted prompt, shown as the story heading.
    pub fn current_prompt(&self) -> Option<&str> {
        self.current_prompt.as_deref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ChatMessage>> {
        self.conversation.subscribe()
    }

    /// Number of dispatched requests whose reply has not arrived yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn submit(&mut self) -> Result<SubmitOutcome> {
        if self.draft.trim().is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        let prompt = std::mem::take(&mut self.draft);
        if let Err(e) = self.conversation.append(ChatMessage::user(prompt.clone())) {
            self.draft = prompt;
            return Err(e);
        }

        self.latest_seq += 1;
        let seq = self.latest_seq;
        self.in_flight += 1;
        self.dispatcher.send(seq, self.conversation.messages().to_vec());

        info!("[#{}] Submitted story prompt: {}", seq, prompt);
        self.current_prompt = Some(prompt);
        self.phase = Phase::AwaitingReply;

        Ok(SubmitOutcome::Dispatched { seq })
    }

    pub fn apply_reply(&mut self, reply: Reply) -> Result<ReplyOutcome> {
        self.in_flight = self.in_flight.saturating_sub(1);

        if self.discard_stale && reply.seq < self.latest_seq {
            warn!(
                "[#{}] Discarding stale reply (latest submission is #{})",
                reply.seq, self.latest_seq
            );
            return Ok(ReplyOutcome::Stale);
        }

        match reply.result {
            Ok(text) => {
                info!("[#{}] Story reply received ({} chars)", reply.seq, text.len());
                self.conversation.append(ChatMessage::assistant(text))?;
                self.phase = Phase::LinesRendered;
                Ok(ReplyOutcome::Applied)
            }
            Err(e) => {
                error!("[#{}] Story request failed: {}", reply.seq, e);
                let reason = e.to_string();
                // A newer submission is still awaiting its reply.
                if reply.seq == self.latest_seq {
                    self.phase = Phase::Failed(reason.clone());
                }
                Ok(ReplyOutcome::Failed(reason))
            }
        }
    }
}
