//! In-process stores with the same semantics as the Redis, Postgres and Neo4j
//! clients. Used by tests and for running the workflows without the services.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use travesia_core::graph::{RelationshipQuery, RelationshipRow};
use travesia_core::reservation::{Attributes, Reservation};
use travesia_core::{
    keys, DocumentStore, GraphStore, MergePolicy, NodeLabel, NodeSpec, PropertyKey, PropertyValue, RelationSpec,
    RelationshipType, SessionCache, StoreError, StoreResult,
};

#[derive(Default)]
struct CacheState {
    strings: HashMap<String, (String, Option<Instant>)>,
    sets: HashMap<String, BTreeSet<String>>,
    lists: HashMap<String, VecDeque<String>>,
}

impl CacheState {
    fn get(&mut self, key: &str) -> Option<String> {
        let expired = match self.strings.get(key) {
            Some((_, Some(deadline))) => Instant::now() >= *deadline,
            Some((_, None)) => false,
            None => return None,
        };
        if expired {
            self.strings.remove(key);
            return None;
        }
        self.strings.get(key).map(|(payload, _)| payload.clone())
    }
}

/// Session cache kept in a process-local map. Expiry follows the tokio clock.
#[derive(Default)]
pub struct InMemoryCache {
    state: Mutex<CacheState>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionCache for InMemoryCache {
    async fn add_connected_user(&self, user_id: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state
            .sets
            .entry(keys::CONNECTED_USERS.to_string())
            .or_default()
            .insert(user_id.to_string());
        Ok(())
    }

    async fn remove_connected_user(&self, user_id: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let Some(users) = state.sets.get_mut(keys::CONNECTED_USERS) {
            users.remove(user_id);
        }
        Ok(())
    }

    async fn connected_users(&self) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .sets
            .get(keys::CONNECTED_USERS)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn push_recent_search(&self, user_id: &str, term: &str, max_items: usize) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let list = state.lists.entry(keys::recent_search(user_id)).or_default();
        list.push_front(term.to_string());
        list.truncate(max_items);
        Ok(())
    }

    async fn recent_searches(&self, user_id: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .lists
            .get(&keys::recent_search(user_id))
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_temp_reservation(&self, reservation_id: &str, attributes: &Attributes) -> StoreResult<()> {
        let payload = serde_json::to_string(attributes)?;
        let mut state = self.state.lock().await;
        state
            .strings
            .insert(keys::temp_reservation(reservation_id), (payload, None));
        Ok(())
    }

    async fn temp_reservation(&self, reservation_id: &str) -> StoreResult<Option<Attributes>> {
        let mut state = self.state.lock().await;
        state
            .get(&keys::temp_reservation(reservation_id))
            .map(|payload| Reservation::from_payload(reservation_id, &payload).map(|r| r.attributes))
            .transpose()
    }

    async fn delete_temp_reservation(&self, reservation_id: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        Ok(state.strings.remove(&keys::temp_reservation(reservation_id)).is_some())
    }

    async fn all_temp_reservations(&self) -> StoreResult<Vec<Reservation>> {
        let mut state = self.state.lock().await;
        let found: Vec<String> = state
            .strings
            .keys()
            .filter(|key| key.starts_with(keys::TEMP_RESERVATION_PREFIX))
            .cloned()
            .collect();

        let mut reservations = Vec::with_capacity(found.len());
        for key in found {
            if let (Some(id), Some(payload)) = (keys::reservation_id_from_key(&key), state.get(&key)) {
                reservations.push(Reservation::from_payload(id, &payload)?);
            }
        }
        Ok(reservations)
    }

    async fn cache_query_result(&self, key: &str, data: &Value, ttl_seconds: Option<u64>) -> StoreResult<()> {
        let payload = serde_json::to_string(data)?;
        let deadline = match ttl_seconds.filter(|ttl| *ttl > 0) {
            Some(ttl) => Some(
                Instant::now()
                    .checked_add(Duration::from_secs(ttl))
                    .ok_or_else(|| StoreError::InvalidRecord(format!("ttl of {} seconds is out of range", ttl)))?,
            ),
            None => None,
        };
        let mut state = self.state.lock().await;
        state.strings.insert(key.to_string(), (payload, deadline));
        Ok(())
    }

    async fn cached_query(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut state = self.state.lock().await;
        Ok(state
            .get(key)
            .map(|payload| serde_json::from_str(&payload))
            .transpose()?)
    }

    async fn flush_all(&self) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        *state = CacheState::default();
        Ok(())
    }
}

/// Document store keyed by `(collection, id)`. Can be switched offline to
/// exercise failure paths.
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<(String, String), Value>>,
    online: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub async fn count(&self, collection: &str) -> usize {
        let documents = self.documents.lock().await;
        documents.keys().filter(|(c, _)| c == collection).count()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("document store offline".to_string()))
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_document(&self, collection: &str, id: &str, document: &Value) -> StoreResult<()> {
        self.check_online()?;
        let mut documents = self.documents.lock().await;
        let slot = (collection.to_string(), id.to_string());
        if documents.contains_key(&slot) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        documents.insert(slot, document.clone());
        Ok(())
    }

    async fn find_document(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        self.check_online()?;
        let documents = self.documents.lock().await;
        Ok(documents.get(&(collection.to_string(), id.to_string())).cloned())
    }
}

#[derive(Debug, Clone)]
struct StoredNode {
    label: NodeLabel,
    properties: BTreeMap<String, PropertyValue>,
}

impl StoredNode {
    fn matches(&self, label: NodeLabel, key: &PropertyKey, value: &PropertyValue) -> bool {
        self.label == label && self.properties.get(key.as_str()) == Some(value)
    }

    fn value(&self, key: &PropertyKey) -> Option<&PropertyValue> {
        self.properties.get(key.as_str())
    }

    fn display(&self, key: &PropertyKey) -> String {
        self.value(key).map(ToString::to_string).unwrap_or_default()
    }
}

/// Cypher's ascending order: strings, then booleans, then numbers, then missing.
fn cypher_order(a: Option<&PropertyValue>, b: Option<&PropertyValue>) -> CmpOrdering {
    fn rank(value: Option<&PropertyValue>) -> u8 {
        match value {
            Some(PropertyValue::String(_)) => 0,
            Some(PropertyValue::Boolean(_)) => 1,
            Some(PropertyValue::Integer(_) | PropertyValue::Float(_)) => 2,
            None => 3,
        }
    }

    match (a, b) {
        (Some(PropertyValue::String(x)), Some(PropertyValue::String(y))) => x.cmp(y),
        (Some(PropertyValue::Boolean(x)), Some(PropertyValue::Boolean(y))) => x.cmp(y),
        (Some(PropertyValue::Integer(x)), Some(PropertyValue::Integer(y))) => x.cmp(y),
        (Some(x), Some(y)) if rank(a) == 2 && rank(b) == 2 => {
            as_f64(x).partial_cmp(&as_f64(y)).unwrap_or(CmpOrdering::Equal)
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn as_f64(value: &PropertyValue) -> f64 {
    match value {
        PropertyValue::Integer(n) => *n as f64,
        PropertyValue::Float(n) => *n,
        _ => f64::NAN,
    }
}

#[derive(Default)]
struct GraphState {
    nodes: Vec<StoredNode>,
    relationships: BTreeSet<(usize, RelationshipType, usize)>,
    constraints: HashSet<(NodeLabel, PropertyKey)>,
}

impl GraphState {
    fn find(&self, label: NodeLabel, key: &PropertyKey, value: &PropertyValue) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.matches(label, key, value))
            .map(|(index, _)| index)
            .collect()
    }

    fn remove_where(&mut self, doomed: impl Fn(&StoredNode) -> bool) {
        let mut remap = Vec::with_capacity(self.nodes.len());
        let mut kept = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            if doomed(&node) {
                remap.push(None);
            } else {
                remap.push(Some(kept.len()));
                kept.push(node);
            }
        }
        self.nodes = kept;
        self.relationships = std::mem::take(&mut self.relationships)
            .into_iter()
            .filter_map(|(a, kind, b)| Some((remap[a]?, kind, remap[b]?)))
            .collect();
    }
}

/// Labeled-property graph with MERGE semantics.
#[derive(Default)]
pub struct InMemoryGraph {
    state: Mutex<GraphState>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn node_count(&self, label: NodeLabel) -> usize {
        let state = self.state.lock().await;
        state.nodes.iter().filter(|node| node.label == label).count()
    }

    pub async fn relationship_count(&self) -> usize {
        self.state.lock().await.relationships.len()
    }

    /// Properties of the node matching `key = value`, if any.
    pub async fn node(
        &self,
        label: NodeLabel,
        key: &PropertyKey,
        value: &PropertyValue,
    ) -> Option<BTreeMap<String, PropertyValue>> {
        let state = self.state.lock().await;
        state
            .nodes
            .iter()
            .find(|node| node.matches(label, key, value))
            .map(|node| node.properties.clone())
    }

    pub async fn has_constraint(&self, label: NodeLabel, key: &PropertyKey) -> bool {
        self.state.lock().await.constraints.contains(&(label, key.clone()))
    }
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn ensure_unique_constraint(&self, label: NodeLabel, property: &PropertyKey) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.constraints.insert((label, property.clone()));
        Ok(())
    }

    async fn merge_node(&self, label: NodeLabel, node: &NodeSpec, policy: MergePolicy) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let existing = state.find(label, &node.key, &node.value).first().copied();

        match existing {
            Some(index) => {
                if policy == MergePolicy::Always {
                    let stored = &mut state.nodes[index];
                    for (key, value) in &node.properties {
                        stored.properties.insert(key.to_string(), value.clone());
                    }
                }
            }
            None => {
                let mut properties = BTreeMap::new();
                properties.insert(node.key.to_string(), node.value.clone());
                if policy != MergePolicy::IdentityOnly {
                    for (key, value) in &node.properties {
                        properties.insert(key.to_string(), value.clone());
                    }
                }
                state.nodes.push(StoredNode { label, properties });
            }
        }
        Ok(())
    }

    async fn merge_relationship(&self, relation: &RelationSpec) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let sources = state.find(relation.from_label, &relation.from_key, &relation.from_value);
        let targets = state.find(relation.to_label, &relation.to_key, &relation.to_value);

        let mut linked = 0;
        for &a in &sources {
            for &b in &targets {
                state.relationships.insert((a, relation.kind, b));
                linked += 1;
            }
        }
        Ok(linked)
    }

    async fn delete_all(&self) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.nodes.clear();
        state.relationships.clear();
        Ok(())
    }

    async fn delete_label(&self, label: NodeLabel) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.remove_where(|node| node.label == label);
        Ok(())
    }

    async fn relationships(&self, query: &RelationshipQuery) -> StoreResult<Vec<RelationshipRow>> {
        let state = self.state.lock().await;
        let mut matched: Vec<(&StoredNode, RelationshipType, &StoredNode)> = state
            .relationships
            .iter()
            .filter(|(a, kind, b)| {
                state.nodes[*a].label == query.from_label
                    && state.nodes[*b].label == query.to_label
                    && query.kind.map_or(true, |wanted| wanted == *kind)
            })
            .map(|(a, kind, b)| (&state.nodes[*a], *kind, &state.nodes[*b]))
            .collect();
        matched.sort_by(|(a1, _, b1), (a2, _, b2)| {
            cypher_order(a1.value(&query.from_key), a2.value(&query.from_key))
                .then_with(|| cypher_order(b1.value(&query.to_key), b2.value(&query.to_key)))
        });
        Ok(matched
            .into_iter()
            .map(|(a, kind, b)| RelationshipRow {
                origin: a.display(&query.from_key),
                relation: kind.to_string(),
                destination: b.display(&query.to_key),
            })
            .collect())
    }
}
