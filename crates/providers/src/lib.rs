//! Model backend implementations for the Windlass agent runtime.
//!
//! [`OpenAiCompatBackend`] covers any endpoint speaking the OpenAI wire
//! format: the stateless `/chat/completions` shape (the default path) and
//! the stateful `/responses` shape used when an agent carries a prompt
//! reference.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatBackend;
