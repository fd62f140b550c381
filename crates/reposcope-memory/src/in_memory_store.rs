use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::vector_store::{
    BoxFuture, FieldValue, ScoredVectorPoint, ScrollResult, VectorFilter, VectorPoint,
    VectorStore, VectorStoreError,
};

struct StoredPoint {
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

struct InMemoryCollection {
    points: HashMap<String, StoredPoint>,
}

/// Process-local vector index with cosine similarity search.
///
/// Also counts `upsert` calls so callers can assert on batching behavior.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
    upsert_calls: AtomicUsize,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            upsert_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `upsert` calls received so far.
    #[must_use]
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Number of points stored in `collection` (0 if it does not exist).
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|cols| cols.get(collection).map_or(0, |c| c.points.len()))
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Ids stored in `collection`, sorted.
    #[must_use]
    pub fn ids(&self, collection: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .collections
            .read()
            .map(|cols| {
                cols.get(collection)
                    .map(|c| c.points.keys().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .field("upsert_calls", &self.upsert_calls())
            .finish_non_exhaustive()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn matches_filter(payload: &HashMap<String, serde_json::Value>, filter: &VectorFilter) -> bool {
    for cond in &filter.must {
        let Some(val) = payload.get(&cond.field) else {
            return false;
        };
        if !field_matches(val, &cond.value) {
            return false;
        }
    }
    for cond in &filter.must_not {
        if let Some(val) = payload.get(&cond.field)
            && field_matches(val, &cond.value)
        {
            return false;
        }
    }
    true
}

fn field_matches(val: &serde_json::Value, expected: &FieldValue) -> bool {
    match expected {
        FieldValue::Integer(i) => val.as_i64() == Some(*i),
        FieldValue::Text(s) => val.as_str() == Some(s.as_str()),
    }
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        _vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            cols.entry(collection)
                .or_insert_with(|| InMemoryCollection {
                    points: HashMap::new(),
                });
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(cols.contains_key(&collection))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.upsert_calls.fetch_add(1, Ordering::SeqCst);
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            let col = cols.get_mut(&collection).ok_or_else(|| {
                VectorStoreError::Upsert(format!("collection {collection} not found"))
            })?;
            for p in points {
                col.points.insert(
                    p.id,
                    StoredPoint {
                        vector: p.vector,
                        payload: p.payload,
                    },
                );
            }
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            let col = cols.get(&collection).ok_or_else(|| {
                VectorStoreError::Search(format!("collection {collection} not found"))
            })?;

            let empty_filter = VectorFilter::default();
            let f = filter.as_ref().unwrap_or(&empty_filter);

            let mut scored: Vec<ScoredVectorPoint> = col
                .points
                .iter()
                .filter(|(_, sp)| matches_filter(&sp.payload, f))
                .map(|(id, sp)| ScoredVectorPoint {
                    id: id.clone(),
                    score: cosine_similarity(&vector, &sp.vector),
                    payload: sp.payload.clone(),
                })
                .collect();

            scored.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });
            scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(scored)
        })
    }

    fn delete_by_ids(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(());
            }
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            let col = cols.get_mut(&collection).ok_or_else(|| {
                VectorStoreError::Delete(format!("collection {collection} not found"))
            })?;
            for id in &ids {
                col.points.remove(id);
            }
            Ok(())
        })
    }

    fn scroll_all(
        &self,
        collection: &str,
        key_field: &str,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<ScrollResult, VectorStoreError>> {
        let collection = collection.to_owned();
        let key_field = key_field.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Scroll(e.to_string()))?;
            let Some(col) = cols.get(&collection) else {
                return Ok(ScrollResult::new());
            };

            let empty_filter = VectorFilter::default();
            let f = filter.as_ref().unwrap_or(&empty_filter);

            let mut result = HashMap::new();
            for sp in col.points.values().filter(|sp| matches_filter(&sp.payload, f)) {
                let Some(key_val) = sp.payload.get(&key_field).and_then(|v| v.as_str()) else {
                    continue;
                };
                let mut fields = HashMap::new();
                for (k, v) in &sp.payload {
                    if let Some(s) = v.as_str() {
                        fields.insert(k.clone(), s.to_owned());
                    }
                }
                result.insert(key_val.to_owned(), fields);
            }
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::FieldCondition;

    fn point(id: &str, vector: Vec<f32>, repo: &str) -> VectorPoint {
        VectorPoint {
            id: id.into(),
            vector,
            payload: HashMap::from([
                ("chunk_id".into(), serde_json::json!(id)),
                ("repo_key".into(), serde_json::json!(repo)),
                ("count".into(), serde_json::json!(42)),
            ]),
        }
    }

    #[tokio::test]
    async fn ensure_collection_and_exists() {
        let store = InMemoryVectorStore::new();
        assert!(!store.collection_exists("test").await.unwrap());
        store.ensure_collection("test", 3).await.unwrap();
        store.ensure_collection("test", 3).await.unwrap();
        assert!(store.collection_exists("test").await.unwrap());
    }

    #[tokio::test]
    async fn upsert_overwrites_same_id() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("test", 3).await.unwrap();
        store
            .upsert("test", vec![point("a", vec![1.0, 0.0, 0.0], "r")])
            .await
            .unwrap();
        store
            .upsert("test", vec![point("a", vec![0.0, 1.0, 0.0], "r")])
            .await
            .unwrap();

        assert_eq!(store.len("test"), 1);
        assert_eq!(store.upsert_calls(), 2);
        let hits = store
            .search("test", vec![0.0, 1.0, 0.0], 1, None)
            .await
            .unwrap();
        assert!((hits[0].score - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn upsert_into_missing_collection_fails() {
        let store = InMemoryVectorStore::new();
        let err = store
            .upsert("missing", vec![point("a", vec![1.0], "r")])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::Upsert(_)));
    }

    #[tokio::test]
    async fn search_ranks_by_similarity_and_limits() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("test", 3).await.unwrap();
        store
            .upsert(
                "test",
                vec![
                    point("far", vec![0.0, 0.0, 1.0], "r"),
                    point("near", vec![1.0, 0.1, 0.0], "r"),
                    point("exact", vec![1.0, 0.0, 0.0], "r"),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search("test", vec![1.0, 0.0, 0.0], 2, None)
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["exact", "near"]);
    }

    #[tokio::test]
    async fn search_with_filter() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("test", 3).await.unwrap();
        store
            .upsert(
                "test",
                vec![
                    point("a", vec![1.0, 0.0, 0.0], "acme/api"),
                    point("b", vec![1.0, 0.0, 0.0], "acme/web"),
                ],
            )
            .await
            .unwrap();

        let filter = VectorFilter {
            must: vec![FieldCondition {
                field: "repo_key".into(),
                value: FieldValue::Text("acme/web".into()),
            }],
            must_not: vec![],
        };
        let hits = store
            .search("test", vec![1.0, 0.0, 0.0], 10, Some(filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn delete_by_ids_removes_points() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("test", 3).await.unwrap();
        store
            .upsert("test", vec![point("a", vec![1.0, 0.0, 0.0], "r")])
            .await
            .unwrap();
        store.delete_by_ids("test", vec!["a".into()]).await.unwrap();
        assert!(store.is_empty("test"));
    }

    #[tokio::test]
    async fn scroll_all_filters_and_extracts_strings() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("test", 3).await.unwrap();
        store
            .upsert(
                "test",
                vec![
                    point("a", vec![1.0, 0.0, 0.0], "acme/api"),
                    point("b", vec![1.0, 0.0, 0.0], "acme/web"),
                ],
            )
            .await
            .unwrap();

        let result = store
            .scroll_all(
                "test",
                "chunk_id",
                Some(VectorFilter::text_equals("repo_key", "acme/api")),
            )
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        let fields = &result["a"];
        assert_eq!(fields["repo_key"], "acme/api");
        assert!(!fields.contains_key("count"));
    }

    #[tokio::test]
    async fn scroll_missing_collection_is_empty() {
        let store = InMemoryVectorStore::new();
        assert!(store.scroll_all("nope", "chunk_id", None).await.unwrap().is_empty());
    }

    #[test]
    fn cosine_similarity_orthogonal_and_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn debug_format() {
        let dbg = format!("{:?}", InMemoryVectorStore::default());
        assert!(dbg.contains("InMemoryVectorStore"));
    }
}
