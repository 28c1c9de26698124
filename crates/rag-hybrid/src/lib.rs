//! rag-hybrid
//!
//! Fuses lexical and vector retrieval behind atomically published views and
//! runs the ingestion pipeline that keeps both indices in step.

pub mod engine;
pub mod fusion;
pub mod pipeline;
pub mod retriever;
pub mod view;

pub use engine::HybridEngine;
pub use fusion::{fuse, FusionParams, FusionWeights};
pub use pipeline::{IngestReport, Ingestor};
pub use retriever::{format_context, Retriever};
pub use view::{RetrievalView, Retrievers, ViewCell};
