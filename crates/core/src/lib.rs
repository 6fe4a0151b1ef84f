//! `deckgen-core` — domain types for pitch-deck generation jobs.
//!
//! This crate contains **pure domain** logic (no I/O): job identity, inbound
//! request validation, the generated deck model, callback payloads and the
//! canonical output-key layout.

pub mod callback;
pub mod deck;
pub mod error;
pub mod id;
pub mod job;
pub mod layout;

pub use callback::{CallbackPayload, CallbackStatus};
pub use deck::{DeckShapeError, GenerationMetadata, GenerationResult, SlideRecord, parse_slides};
pub use error::{FieldError, InvalidId, JobError, JobResult, ValidationError};
pub use id::{JobId, ProjectId, UserId};
pub use job::{DEFAULT_MODEL, JobDescriptor, validate_event};
pub use layout::OutputLayout;
