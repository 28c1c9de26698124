//! LanceDB connection helpers.
use std::sync::Arc;

use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection, Table};

use rag_core::error::{Error, Result};

pub(crate) fn store_err(e: impl std::fmt::Display) -> Error {
    Error::StoreUnavailable(e.to_string())
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(store_err)
}

/// Open `name`, creating it empty with `schema` when it does not exist yet.
pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<Table> {
    let names = conn.table_names().execute().await.map_err(store_err)?;
    if !names.iter().any(|n| n == name) {
        let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
        conn.create_table(name, Box::new(iter)).execute().await.map_err(store_err)?;
    }
    conn.open_table(name).execute().await.map_err(store_err)
}
