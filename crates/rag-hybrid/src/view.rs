//! Immutable retrieval views and the cell they are published through.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;

use rag_core::traits::VectorStore;
use rag_text::Bm25Snapshot;

use crate::fusion::{FusionParams, FusionWeights};

/// Which retrievers a view can rank with.
#[derive(Clone)]
pub enum Retrievers {
    Hybrid { lexical: Arc<Bm25Snapshot>, vector: Arc<dyn VectorStore> },
    VectorOnly { vector: Arc<dyn VectorStore> },
}

/// Everything a query needs, captured once at query start.
#[derive(Clone)]
pub struct RetrievalView {
    retrievers: Retrievers,
    fusion: FusionParams,
}

impl RetrievalView {
    pub fn new(lexical: Option<Arc<Bm25Snapshot>>, vector: Arc<dyn VectorStore>, fusion: FusionParams) -> Self {
        let retrievers = match lexical {
            Some(lexical) => Retrievers::Hybrid { lexical, vector },
            None => Retrievers::VectorOnly { vector },
        };
        Self { retrievers, fusion }
    }

    pub fn retrievers(&self) -> &Retrievers {
        &self.retrievers
    }

    pub fn vector(&self) -> &Arc<dyn VectorStore> {
        match &self.retrievers {
            Retrievers::Hybrid { vector, .. } | Retrievers::VectorOnly { vector } => vector,
        }
    }

    pub fn lexical(&self) -> Option<&Arc<Bm25Snapshot>> {
        match &self.retrievers {
            Retrievers::Hybrid { lexical, .. } => Some(lexical),
            Retrievers::VectorOnly { .. } => None,
        }
    }

    /// Fusion parameters in effect for this view. A vector-only view ranks
    /// with the vector retriever at full weight.
    pub fn fusion(&self) -> FusionParams {
        match self.retrievers {
            Retrievers::Hybrid { .. } => self.fusion,
            Retrievers::VectorOnly { .. } => FusionParams { weights: FusionWeights::VECTOR_ONLY, ..self.fusion },
        }
    }

    /// Generation of the lexical snapshot this view serves, 0 when it has none.
    pub fn generation(&self) -> u64 {
        self.lexical().map_or(0, |s| s.generation())
    }
}

/// Holds the latest published view.
///
/// Readers load the current view without locking. Publishers serialize on a
/// short mutex around the swap, and a view built from an older lexical
/// generation than the current one is discarded.
pub struct ViewCell {
    current: ArcSwap<RetrievalView>,
    publish_lock: Mutex<()>,
}

impl ViewCell {
    pub fn new(initial: RetrievalView) -> Self {
        Self { current: ArcSwap::from_pointee(initial), publish_lock: Mutex::new(()) }
    }

    pub fn load(&self) -> Arc<RetrievalView> {
        self.current.load_full()
    }

    /// Swap in `view` unless a newer one is already published. Returns
    /// whether the swap happened.
    pub fn publish(&self, view: RetrievalView) -> bool {
        let _guard = self.publish_lock.lock();
        let current = self.current.load();
        if view.generation() <= current.generation() {
            debug!(offered = view.generation(), current = current.generation(), "discarding superseded view");
            return false;
        }
        self.current.store(Arc::new(view));
        true
    }
}
