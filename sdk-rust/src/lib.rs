//! Text-only language model boundary: a provider-agnostic [`LanguageModel`]
//! trait, a Gemini implementation and a scriptable mock for tests.
mod accumulator;
mod client_utils;
mod errors;
pub mod google;
mod language_model;
mod telemetry;
pub mod testing;
mod types;
mod types_ext;

pub use accumulator::StreamAccumulator;
pub use errors::*;
pub use language_model::{LanguageModel, LanguageModelStream};
pub use types::*;
