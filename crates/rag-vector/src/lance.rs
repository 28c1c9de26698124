//! `VectorStore` backed by a LanceDB table.
use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray, UInt64Array,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use tracing::{debug, info};

use rag_core::error::Result;
use rag_core::traits::VectorStore;
use rag_core::types::{Chunk, ChunkKey, Meta, ScoredChunk, SourceKind};

use crate::schema::{
    build_chunks_schema, COL_CHUNK_INDEX, COL_CONTENT, COL_ID, COL_METADATA, COL_SOURCE_ID, COL_VECTOR,
};
use crate::table::{ensure_table, open_db, store_err};

pub struct LanceVectorStore {
    table: Table,
    dim: usize,
}

impl LanceVectorStore {
    pub async fn open(uri: &str, table_name: &str, dim: usize) -> Result<Self> {
        let conn = open_db(uri).await?;
        let table = ensure_table(&conn, table_name, build_chunks_schema(dim)).await?;
        info!(uri, table = table_name, dim, "opened LanceDB vector store");
        Ok(Self { table, dim })
    }

    fn to_record_batch(&self, chunks: &[Arc<Chunk>], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
        let now = Utc::now().timestamp_millis();
        let mut metadata = Vec::with_capacity(chunks.len());
        for c in chunks {
            metadata.push(serde_json::to_string(&c.metadata).map_err(store_err)?);
        }
        let vectors = embeddings.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
        RecordBatch::try_new(
            build_chunks_schema(self.dim),
            vec![
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.key.as_str()))),
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.source_id.as_str()))),
                Arc::new(UInt64Array::from_iter_values(chunks.iter().map(|c| c.chunk_index as u64))),
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
                Arc::new(StringArray::from(metadata)),
                Arc::new(TimestampMillisecondArray::from(vec![now; chunks.len()])),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, self.dim as i32)),
            ],
        )
        .map_err(store_err)
    }
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| store_err(format!("column '{name}' missing from result")))
}

fn batch_to_hits(batch: &RecordBatch, out: &mut Vec<ScoredChunk>) -> Result<()> {
    let sources = string_col(batch, COL_SOURCE_ID)?;
    let contents = string_col(batch, COL_CONTENT)?;
    let metadata = string_col(batch, COL_METADATA)?;
    let indices = batch
        .column_by_name(COL_CHUNK_INDEX)
        .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
        .ok_or_else(|| store_err("column 'chunk_index' missing from result"))?;
    let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    for i in 0..batch.num_rows() {
        let source_id = sources.value(i).to_string();
        let chunk_index = indices.value(i) as usize;
        let text = contents.value(i).to_string();
        let meta: Meta = serde_json::from_str(metadata.value(i)).map_err(store_err)?;
        let chunk = Chunk {
            key: ChunkKey::new(&source_id, chunk_index),
            char_len: text.chars().count(),
            source_id,
            chunk_index,
            text,
            metadata: meta,
        };
        // Cosine distance is 1 - similarity.
        let score = distances.map(|d| 1.0 - d.value(i)).unwrap_or(0.0);
        out.push(ScoredChunk::new(Arc::new(chunk), score, SourceKind::Vector));
    }
    Ok(())
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn upsert(&self, chunks: &[Arc<Chunk>], embeddings: &[Vec<f32>]) -> Result<usize> {
        crate::check_batch(chunks, embeddings, self.dim)?;
        if chunks.is_empty() {
            return Ok(0);
        }
        // merge_insert rejects duplicate keys within one source batch; the last one wins.
        let mut last: HashMap<&ChunkKey, usize> = HashMap::new();
        for (i, c) in chunks.iter().enumerate() {
            last.insert(&c.key, i);
        }
        let mut keep: Vec<usize> = last.into_values().collect();
        keep.sort_unstable();
        let chunks: Vec<Arc<Chunk>> = keep.iter().map(|&i| chunks[i].clone()).collect();
        let embeddings: Vec<Vec<f32>> = keep.iter().map(|&i| embeddings[i].clone()).collect();

        let rb = self.to_record_batch(&chunks, &embeddings)?;
        let schema = rb.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
        let mut mi = self.table.merge_insert(&[COL_ID]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(store_err)?;
        debug!(rows = chunks.len(), "upserted chunks into LanceDB");
        Ok(chunks.len())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        crate::check_dim(embedding, self.dim)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut stream = self
            .table
            .vector_search(embedding.to_vec())
            .map_err(store_err)?
            .column(COL_VECTOR)
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(store_err)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(store_err)? {
            batch_to_hits(&batch, &mut hits)?;
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        self.table.count_rows(None).await.map_err(store_err)
    }
}
