//! Vector index abstraction with Qdrant and in-memory backends.

pub mod in_memory_store;
pub mod qdrant_ops;
pub mod vector_store;

pub use in_memory_store::InMemoryVectorStore;
pub use qdrant_ops::{ID_FIELD, QdrantOps, point_uuid};
pub use vector_store::{
    FieldCondition, FieldValue, ScoredVectorPoint, ScrollResult, VectorFilter, VectorPoint,
    VectorStore, VectorStoreError,
};
