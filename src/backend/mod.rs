/// Backend client module for the case-management REST API
///
/// This module provides:
/// - The `BackendClient` seam used by enrichment and note posting
/// - A reqwest-based client authenticated with an API key
/// - An in-memory backend for demos and tests
/// - Request builders and `data` envelope handling

pub mod api;
pub mod client;
pub mod error;
pub mod memory;
pub mod soar;

pub use api::{PageRequest, ReturnLevel};
pub use client::{unwrap_data, unwrap_rows, BackendClient, FileUpload};
pub use error::{BackendError, BackendResult};
pub use memory::{InMemoryBackend, RecordedCall};
pub use soar::SoarClient;
