//! The multi-step alert-creation conversation.
//!
//! One draft per chat, collected over three messages: symbol, direction,
//! target price. Drafts live only in this registry; a partial alert is never
//! handed to the store. The registry is keyed by chat id so concurrent chats
//! can never interleave or corrupt each other's drafts.

use crate::error::ConversationError;
use core_types::{Direction, NewAlert};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod error;

/// Which field the conversation is waiting for. Idle is modelled as the
/// absence of a draft for the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AwaitingSymbol,
    AwaitingDirection,
    AwaitingPrice,
}

/// What the dispatcher should do after a successfully handled message.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Symbol accepted; prompt for the direction.
    NeedDirection,
    /// Direction accepted; prompt for the target price.
    NeedPrice,
    /// All three fields collected; persist this and confirm.
    Ready(NewAlert),
}

#[derive(Debug)]
struct Draft {
    owner_id: i64,
    step: Step,
    symbol: Option<String>,
    direction: Option<Direction>,
}

/// All in-flight alert-creation conversations, keyed by chat id.
///
/// Purely synchronous transition logic; the mutex is never held across an
/// await point.
#[derive(Debug, Default)]
pub struct Conversations {
    drafts: Mutex<HashMap<i64, Draft>>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Draft>> {
        self.drafts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a conversation for `chat_id`, bound to the owner's user id.
    /// An already-running conversation in the same chat is discarded:
    /// last write wins, by design.
    pub fn begin(&self, chat_id: i64, owner_id: i64) {
        self.lock().insert(
            chat_id,
            Draft {
                owner_id,
                step: Step::AwaitingSymbol,
                symbol: None,
                direction: None,
            },
        );
    }

    /// The step the chat's conversation is waiting on, if one is active.
    pub fn step(&self, chat_id: i64) -> Option<Step> {
        self.lock().get(&chat_id).map(|d| d.step)
    }

    /// Discards the chat's draft. Returns whether one existed.
    pub fn cancel(&self, chat_id: i64) -> bool {
        self.lock().remove(&chat_id).is_some()
    }

    /// Routes a free-text message into the chat's conversation.
    ///
    /// `None` means no conversation is active for this chat. An `Err` leaves
    /// the draft exactly where it was so the dispatcher can re-prompt; only
    /// `Ok` advances the state, and `Ready` removes the draft.
    pub fn handle_text(
        &self,
        chat_id: i64,
        text: &str,
    ) -> Option<Result<SubmitOutcome, ConversationError>> {
        let mut drafts = self.lock();
        let draft = drafts.get_mut(&chat_id)?;

        let result = match draft.step {
            Step::AwaitingSymbol => {
                let symbol = text.trim().to_uppercase();
                if symbol.is_empty() {
                    Err(ConversationError::InvalidSymbol)
                } else {
                    draft.symbol = Some(symbol);
                    draft.step = Step::AwaitingDirection;
                    Ok(SubmitOutcome::NeedDirection)
                }
            }
            Step::AwaitingDirection => match Direction::parse_input(text) {
                Some(direction) => {
                    draft.direction = Some(direction);
                    draft.step = Step::AwaitingPrice;
                    Ok(SubmitOutcome::NeedPrice)
                }
                None => Err(ConversationError::InvalidDirection(text.trim().to_string())),
            },
            Step::AwaitingPrice => match Decimal::from_str(text.trim()) {
                Ok(price) if price > Decimal::ZERO => {
                    // Symbol and direction are guaranteed present once the
                    // draft reaches this step.
                    let symbol = draft.symbol.clone().unwrap_or_default();
                    let direction = draft.direction.unwrap_or(Direction::LowerOrEqual);
                    match NewAlert::new(draft.owner_id, &symbol, direction, price) {
                        Ok(new_alert) => {
                            drafts.remove(&chat_id);
                            Ok(SubmitOutcome::Ready(new_alert))
                        }
                        Err(e) => Err(ConversationError::InvalidPrice(e.to_string())),
                    }
                }
                _ => Err(ConversationError::InvalidPrice(text.trim().to_string())),
            },
        };

        Some(result)
    }
}
