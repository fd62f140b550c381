//! Qdrant-backed [`VectorStore`].
//!
//! Qdrant only accepts UUID or integer point ids, so caller ids are mapped to a
//! UUIDv5 and the original id is kept in the `chunk_id` payload field. Search
//! and scroll results report the original id.

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId,
    PointStruct, PointsIdsList, ScoredPoint, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder, point_id::PointIdOptions, value::Kind,
};
use uuid::Uuid;

use crate::vector_store::{
    BoxFuture, FieldCondition, FieldValue, ScoredVectorPoint, ScrollResult, VectorFilter,
    VectorPoint, VectorStore, VectorStoreError,
};

type QdrantResult<T> = Result<T, Box<qdrant_client::QdrantError>>;

/// Payload field holding the caller-supplied point id.
pub const ID_FIELD: &str = "chunk_id";

const POINT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b7e_0a4d_5e39_9c11_84d2_7f3a_b560);
const SCROLL_PAGE: u32 = 100;

/// Maps a caller id to the UUID used as the Qdrant point id. Ids that are
/// already UUIDs pass through unchanged.
#[must_use]
pub fn point_uuid(id: &str) -> Uuid {
    Uuid::parse_str(id).unwrap_or_else(|_| Uuid::new_v5(&POINT_NAMESPACE, id.as_bytes()))
}

#[derive(Clone)]
pub struct QdrantOps {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantOps").finish_non_exhaustive()
    }
}

impl QdrantOps {
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(url: &str) -> QdrantResult<Self> {
        let client = Qdrant::from_url(url).build().map_err(Box::new)?;
        Ok(Self { client })
    }

    /// Idempotent: no-op if the collection already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if Qdrant cannot be reached or collection creation fails.
    pub async fn create_if_missing(&self, collection: &str, vector_size: u64) -> QdrantResult<()> {
        if self
            .client
            .collection_exists(collection)
            .await
            .map_err(Box::new)?
        {
            return Ok(());
        }
        tracing::info!(collection, vector_size, "creating qdrant collection");
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    async fn search_points(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<Filter>,
    ) -> QdrantResult<Vec<ScoredPoint>> {
        let mut builder = SearchPointsBuilder::new(collection, vector, limit).with_payload(true);
        if let Some(f) = filter {
            builder = builder.filter(f);
        }
        let results = self.client.search_points(builder).await.map_err(Box::new)?;
        Ok(results.result)
    }

    async fn scroll_payloads(
        &self,
        collection: &str,
        key_field: &str,
        filter: Option<Filter>,
    ) -> QdrantResult<ScrollResult> {
        let mut result = HashMap::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(collection)
                .with_payload(true)
                .with_vectors(false)
                .limit(SCROLL_PAGE);
            if let Some(ref f) = filter {
                builder = builder.filter(f.clone());
            }
            if let Some(ref off) = offset {
                builder = builder.offset(off.clone());
            }

            let response = self.client.scroll(builder).await.map_err(Box::new)?;

            for point in &response.result {
                let Some(key_val) = point.payload.get(key_field) else {
                    continue;
                };
                let Some(Kind::StringValue(key)) = &key_val.kind else {
                    continue;
                };

                let mut fields = HashMap::new();
                for (k, val) in &point.payload {
                    if let Some(Kind::StringValue(s)) = &val.kind {
                        fields.insert(k.clone(), s.clone());
                    }
                }
                result.insert(key.clone(), fields);
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(result)
    }
}

fn point_to_qdrant(point: VectorPoint) -> Result<PointStruct, VectorStoreError> {
    let mut payload = point.payload;
    payload.insert(ID_FIELD.into(), serde_json::Value::String(point.id.clone()));
    let payload: HashMap<String, qdrant_client::qdrant::Value> =
        serde_json::from_value(serde_json::Value::Object(payload.into_iter().collect()))
            .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
    Ok(PointStruct::new(
        point_uuid(&point.id).to_string(),
        point.vector,
        payload,
    ))
}

impl VectorStore for QdrantOps {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.create_if_missing(&collection, vector_size)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.client
                .collection_exists(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let qdrant_points = points
                .into_iter()
                .map(point_to_qdrant)
                .collect::<Result<Vec<_>, _>>()?;
            self.client
                .upsert_points(UpsertPointsBuilder::new(&collection, qdrant_points).wait(true))
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
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
            let qdrant_filter = filter.map(vector_filter_to_qdrant);
            let results = self
                .search_points(&collection, vector, limit, qdrant_filter)
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(results.into_iter().map(scored_point_to_vector).collect())
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
            let point_ids: Vec<PointId> = ids
                .iter()
                .map(|id| PointId::from(point_uuid(id).to_string()))
                .collect();
            self.client
                .delete_points(
                    DeletePointsBuilder::new(&collection)
                        .points(PointsIdsList { ids: point_ids })
                        .wait(true),
                )
                .await
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
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
            self.scroll_payloads(&collection, &key_field, filter.map(vector_filter_to_qdrant))
                .await
                .map_err(|e| VectorStoreError::Scroll(e.to_string()))
        })
    }
}

fn vector_filter_to_qdrant(filter: VectorFilter) -> Filter {
    Filter {
        must: filter
            .must
            .into_iter()
            .map(field_condition_to_qdrant)
            .collect(),
        must_not: filter
            .must_not
            .into_iter()
            .map(field_condition_to_qdrant)
            .collect(),
        ..Filter::default()
    }
}

fn field_condition_to_qdrant(cond: FieldCondition) -> Condition {
    match cond.value {
        FieldValue::Integer(v) => Condition::matches(cond.field, v),
        FieldValue::Text(v) => Condition::matches(cond.field, v),
    }
}

fn scored_point_to_vector(point: ScoredPoint) -> ScoredVectorPoint {
    let payload: HashMap<String, serde_json::Value> = point
        .payload
        .into_iter()
        .filter_map(|(k, v)| {
            let json_val = match v.kind? {
                Kind::StringValue(s) => serde_json::Value::String(s),
                Kind::IntegerValue(i) => serde_json::Value::Number(i.into()),
                Kind::DoubleValue(d) => {
                    serde_json::Number::from_f64(d).map(serde_json::Value::Number)?
                }
                Kind::BoolValue(b) => serde_json::Value::Bool(b),
                _ => return None,
            };
            Some((k, json_val))
        })
        .collect();

    let id = match payload.get(ID_FIELD).and_then(serde_json::Value::as_str) {
        Some(original) => original.to_owned(),
        None => match point.id.and_then(|pid| pid.point_id_options) {
            Some(PointIdOptions::Uuid(u)) => u,
            Some(PointIdOptions::Num(n)) => n.to_string(),
            None => String::new(),
        },
    };

    ScoredVectorPoint {
        id,
        score: point.score,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_valid_url() {
        assert!(QdrantOps::new("http://localhost:6334").is_ok());
    }

    #[test]
    fn new_invalid_url() {
        assert!(QdrantOps::new("not a valid url").is_err());
    }

    #[test]
    fn debug_format() {
        let ops = QdrantOps::new("http://localhost:6334").unwrap();
        assert!(format!("{ops:?}").contains("QdrantOps"));
    }

    #[test]
    fn point_uuid_is_stable_and_distinct() {
        let a = point_uuid("acme/api-src_main.rs-0");
        assert_eq!(a, point_uuid("acme/api-src_main.rs-0"));
        assert_ne!(a, point_uuid("acme/api-src_main.rs-1"));
        assert_eq!(a.get_version_num(), 5);
    }

    #[test]
    fn point_uuid_passes_through_uuids() {
        let u = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(point_uuid(u).to_string(), u);
    }

    #[test]
    fn point_to_qdrant_records_original_id() {
        let point = VectorPoint {
            id: "acme/api-README.md-0".into(),
            vector: vec![0.1, 0.2],
            payload: HashMap::from([("path".into(), serde_json::json!("README.md"))]),
        };
        let ps = point_to_qdrant(point).unwrap();
        let Some(Kind::StringValue(id)) = &ps.payload[ID_FIELD].kind else {
            panic!("chunk_id missing");
        };
        assert_eq!(id, "acme/api-README.md-0");
        assert!(ps.payload.contains_key("path"));
    }

    #[test]
    fn scored_point_prefers_payload_id() {
        let mut payload = HashMap::new();
        payload.insert(
            ID_FIELD.to_owned(),
            qdrant_client::qdrant::Value::from("acme/api-a.rs-0"),
        );
        payload.insert(
            "content".to_owned(),
            qdrant_client::qdrant::Value::from("fn main() {}"),
        );
        let sp = ScoredPoint {
            id: Some(PointId::from(point_uuid("acme/api-a.rs-0").to_string())),
            payload,
            score: 0.75,
            ..ScoredPoint::default()
        };
        let v = scored_point_to_vector(sp);
        assert_eq!(v.id, "acme/api-a.rs-0");
        assert_eq!(v.payload["content"], "fn main() {}");
    }

    #[test]
    fn filter_conversion_keeps_conditions() {
        let f = vector_filter_to_qdrant(VectorFilter::text_equals("repo_key", "acme/api"));
        assert_eq!(f.must.len(), 1);
        assert!(f.must_not.is_empty());
    }
}
