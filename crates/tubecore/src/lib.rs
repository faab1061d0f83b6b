//! Core of the tubefetch bot: format selection and the size-bounded download
//! pipeline, independent of any chat transport.
//!
//! - [`catalog`] - candidate encodings and the presentation ordering
//! - [`orchestrator`] - the select → retrieve → size-check → fallback loop
//! - [`flow`] - chat-side handling on top of a [`gateway::ChatGateway`]
//! - [`ytdlp`] - the yt-dlp backed catalog provider and retrieval adapter

pub mod catalog;
pub mod core;
pub mod flow;
pub mod gateway;
pub mod orchestrator;
pub mod retrieval;
pub mod session;
pub mod thumbnail;
pub mod ytdlp;

pub use catalog::{Candidate, CandidateSelector, MediaCatalogProvider, MediaMetadata};
pub use core::{AppError, PipelineSettings, Settings};
pub use flow::InteractionFlow;
pub use gateway::{ChatGateway, SelectionChoice};
pub use orchestrator::{Delivery, DeliveryKind, DownloadOrchestrator, Presentation, Retrieved};
pub use retrieval::{ArtifactGuard, RetrievalAdapter};
pub use session::{IdentityId, SessionStore};
