//! Answer generation for the SecureAWS assistant.
//!
//! A [`ResponseResolver`] turns a user utterance plus recent history into a
//! [`ResolvedAnswer`], preferring a live [`GenerationProvider`] and degrading
//! to the built-in [`KnowledgeMatcher`] when the provider is absent or out of
//! quota.

pub mod error;
pub mod knowledge;
pub mod openai;
pub mod provider;
pub mod resolver;

pub use error::{GenerationError, ResolveError};
pub use knowledge::{KnowledgeDocument, KnowledgeMatcher, quick_actions};
pub use openai::OpenAiProvider;
pub use provider::{GeneratedAnswer, GenerationProvider, GenerationRequest, HistoryRole, HistoryTurn};
pub use resolver::{ResolvedAnswer, ResponseResolver};
