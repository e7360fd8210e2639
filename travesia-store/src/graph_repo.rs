use async_trait::async_trait;
use neo4rs::{query, BoltMap, BoltString, BoltType, ConfigBuilder, Graph, Query};
use tracing::{debug, info};
use travesia_core::graph::{RelationshipQuery, RelationshipRow};
use travesia_core::{
    GraphStore, MergePolicy, NodeLabel, NodeSpec, PropertyKey, PropertyValue, RelationSpec, StoreError,
    StoreResult,
};

use crate::app_config::GraphConfig;

/// Neo4j client. Labels, relationship types and property names reach the
/// query text only as validated `travesia_core::graph` values.
#[derive(Clone)]
pub struct Neo4jClient {
    graph: Graph,
}

impl Neo4jClient {
    pub async fn connect(config: &GraphConfig) -> StoreResult<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections);
        if let Some(db) = config.database.as_deref() {
            builder = builder.db(db);
        }
        let neo_config = builder.build().map_err(graph_err)?;
        let graph = Graph::connect(neo_config).await.map_err(graph_err)?;
        info!("Connected to Neo4j at {}", config.uri);
        Ok(Self { graph })
    }

    /// Releases this handle; the pool closes when the last clone is dropped.
    pub fn close(self) {
        drop(self.graph);
        info!("Neo4j connection closed");
    }
}

fn graph_err(err: neo4rs::Error) -> StoreError {
    StoreError::Backend(Box::new(err))
}

fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Boolean(b) => BoltType::from(*b),
        PropertyValue::Integer(i) => BoltType::from(*i),
        PropertyValue::Float(f) => BoltType::from(*f),
        PropertyValue::String(s) => BoltType::from(s.clone()),
    }
}

fn properties_map(node: &NodeSpec) -> BoltType {
    let mut map = BoltMap::new();
    for (key, value) in &node.properties {
        map.put(BoltString::from(key.as_str()), to_bolt(value));
    }
    BoltType::Map(map)
}

pub(crate) fn unique_constraint_cypher(label: NodeLabel, property: &PropertyKey) -> String {
    format!(
        "CREATE CONSTRAINT IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
        label, property
    )
}

pub(crate) fn merge_node_cypher(label: NodeLabel, key: &PropertyKey, policy: MergePolicy) -> String {
    let merge = format!("MERGE (n:{} {{{}: $identity}})", label, key);
    match policy {
        MergePolicy::IdentityOnly => merge,
        MergePolicy::OnCreate => format!("{} ON CREATE SET n += $props", merge),
        MergePolicy::Always => format!("{} SET n += $props", merge),
    }
}

pub(crate) fn merge_relationship_cypher(relation: &RelationSpec) -> String {
    format!(
        "MATCH (a:{} {{{}: $from_value}}), (b:{} {{{}: $to_value}}) \
         MERGE (a)-[r:{}]->(b) RETURN count(r) AS linked",
        relation.from_label, relation.from_key, relation.to_label, relation.to_key, relation.kind
    )
}

pub(crate) fn relationships_cypher(q: &RelationshipQuery) -> String {
    let rel = match q.kind {
        Some(kind) => format!("[r:{}]", kind),
        None => "[r]".to_string(),
    };
    format!(
        "MATCH (a:{})-{}->(b:{}) \
         RETURN coalesce(toString(a.{}), '') AS origin, type(r) AS relation, coalesce(toString(b.{}), '') AS destination \
         ORDER BY a.{}, b.{}",
        q.from_label, rel, q.to_label, q.from_key, q.to_key, q.from_key, q.to_key
    )
}

impl Neo4jClient {
    async fn run(&self, q: Query) -> StoreResult<()> {
        self.graph.run(q).await.map_err(graph_err)
    }
}

#[async_trait]
impl GraphStore for Neo4jClient {
    async fn ensure_unique_constraint(&self, label: NodeLabel, property: &PropertyKey) -> StoreResult<()> {
        self.run(query(&unique_constraint_cypher(label, property))).await?;
        info!("Unique constraint ensured: ({}.{})", label, property);
        Ok(())
    }

    async fn merge_node(&self, label: NodeLabel, node: &NodeSpec, policy: MergePolicy) -> StoreResult<()> {
        let mut q = query(&merge_node_cypher(label, &node.key, policy)).param("identity", to_bolt(&node.value));
        if policy != MergePolicy::IdentityOnly {
            q = q.param("props", properties_map(node));
        }
        self.run(q).await
    }

    async fn merge_relationship(&self, relation: &RelationSpec) -> StoreResult<u64> {
        let q = query(&merge_relationship_cypher(relation))
            .param("from_value", to_bolt(&relation.from_value))
            .param("to_value", to_bolt(&relation.to_value));

        let mut rows = self.graph.execute(q).await.map_err(graph_err)?;
        let mut linked = 0u64;
        while let Some(row) = rows.next().await.map_err(graph_err)? {
            let count: i64 = row.get("linked").map_err(|e| StoreError::Backend(Box::new(e)))?;
            linked += count.max(0) as u64;
        }
        debug!(
            "{} -[{}]-> {}: {} linked",
            relation.from_value, relation.kind, relation.to_value, linked
        );
        Ok(linked)
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.run(query("MATCH (n) DETACH DELETE n")).await?;
        info!("Graph cleared");
        Ok(())
    }

    async fn delete_label(&self, label: NodeLabel) -> StoreResult<()> {
        self.run(query(&format!("MATCH (n:{}) DETACH DELETE n", label))).await?;
        info!("All '{}' nodes deleted", label);
        Ok(())
    }

    async fn relationships(&self, q: &RelationshipQuery) -> StoreResult<Vec<RelationshipRow>> {
        let mut rows = self.graph.execute(query(&relationships_cypher(q))).await.map_err(graph_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(graph_err)? {
            let field = |name: &str| -> StoreResult<String> {
                row.get::<String>(name).map_err(|e| StoreError::Backend(Box::new(e)))
            };
            out.push(RelationshipRow {
                origin: field("origin")?,
                relation: field("relation")?,
                destination: field("destination")?,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use travesia_core::RelationshipType;

    fn key(name: &str) -> PropertyKey {
        PropertyKey::parse(name).unwrap()
    }

    #[test]
    fn test_constraint_cypher() {
        assert_eq!(
            unique_constraint_cypher(NodeLabel::User, &key("usuario_id")),
            "CREATE CONSTRAINT IF NOT EXISTS FOR (n:Usuario) REQUIRE n.usuario_id IS UNIQUE"
        );
    }

    #[test]
    fn test_merge_node_cypher_per_policy() {
        let k = key("destino_id");
        assert_eq!(
            merge_node_cypher(NodeLabel::Destination, &k, MergePolicy::IdentityOnly),
            "MERGE (n:Destino {destino_id: $identity})"
        );
        assert_eq!(
            merge_node_cypher(NodeLabel::Destination, &k, MergePolicy::OnCreate),
            "MERGE (n:Destino {destino_id: $identity}) ON CREATE SET n += $props"
        );
        assert_eq!(
            merge_node_cypher(NodeLabel::Destination, &k, MergePolicy::Always),
            "MERGE (n:Destino {destino_id: $identity}) SET n += $props"
        );
    }

    #[test]
    fn test_merge_relationship_cypher() {
        let rel = RelationSpec {
            from_label: NodeLabel::User,
            from_key: key("usuario_id"),
            from_value: PropertyValue::Integer(1),
            to_label: NodeLabel::Destination,
            to_key: key("destino_id"),
            to_value: PropertyValue::Integer(3),
            kind: RelationshipType::Visited,
        };
        assert_eq!(
            merge_relationship_cypher(&rel),
            "MATCH (a:Usuario {usuario_id: $from_value}), (b:Destino {destino_id: $to_value}) \
             MERGE (a)-[r:VISITO]->(b) RETURN count(r) AS linked"
        );
    }

    #[test]
    fn test_relationships_cypher() {
        let social = relationships_cypher(&RelationshipQuery::social());
        assert!(social.starts_with("MATCH (a:Usuario)-[r]->(b:Usuario)"));
        // raw values, so integer ids sort numerically
        assert!(social.ends_with("ORDER BY a.usuario_id, b.usuario_id"));

        let visits = relationships_cypher(&RelationshipQuery::visits());
        assert!(visits.contains("-[r:VISITO]->(b:Destino)"));
        assert!(visits.contains("coalesce(toString(b.destino_id), '') AS destination"));
        assert!(visits.ends_with("ORDER BY a.usuario_id, b.destino_id"));
    }
}
