use thiserror::Error;

/// User-input errors inside a conversation. Each one leaves the draft in its
/// current step; the dispatcher re-prompts in the same chat.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("A symbol must not be empty.")]
    InvalidSymbol,

    #[error("'{0}' is not a direction; answer 'lower' or 'greater'.")]
    InvalidDirection(String),

    #[error("'{0}' is not a positive price.")]
    InvalidPrice(String),
}
