//! Mock collaborators for pipeline integration tests
//!
//! Catalog, retriever and chat gateway doubles that never touch the network.

#![allow(dead_code)]

pub mod mock_catalog;
pub mod mock_retriever;
pub mod recording_gateway;

pub use mock_catalog::MockCatalog;
pub use mock_retriever::MockRetriever;
pub use recording_gateway::{GatewayCall, RecordingGateway};
