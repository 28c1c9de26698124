use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const COL_ID: &str = "id";
pub const COL_SOURCE_ID: &str = "source_id";
pub const COL_CHUNK_INDEX: &str = "chunk_index";
pub const COL_CONTENT: &str = "content";
pub const COL_METADATA: &str = "metadata";
pub const COL_INGESTED_AT: &str = "ingested_at";
pub const COL_VECTOR: &str = "vector";

/// Row layout of the chunks table. `metadata` holds the chunk metadata map
/// encoded as a JSON object.
pub fn build_chunks_schema(dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(COL_ID, DataType::Utf8, false),
		Field::new(COL_SOURCE_ID, DataType::Utf8, false),
		Field::new(COL_CHUNK_INDEX, DataType::UInt64, false),
		Field::new(COL_CONTENT, DataType::Utf8, false),
		Field::new(COL_METADATA, DataType::Utf8, false),
		Field::new(COL_INGESTED_AT, DataType::Timestamp(TimeUnit::Millisecond, None), false),
		Field::new(COL_VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
	]))
}
