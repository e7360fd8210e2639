use std::sync::Arc;
use tracing::{info, warn};
use travesia_core::graph::{RelationshipQuery, RelationshipReport};
use travesia_core::{GraphStore, MergePolicy, NodeLabel, NodeSpec, PropertyKey, RelationSpec, StoreError, StoreResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationSummary {
    pub requested: usize,
    /// Relationships matched or created; relations whose endpoints are
    /// missing contribute nothing.
    pub linked: u64,
}

/// Bulk loading, reset and reporting on top of a [`GraphStore`].
/// Store errors propagate unchanged.
pub struct GraphLoader {
    store: Arc<dyn GraphStore>,
    policy: MergePolicy,
}

impl GraphLoader {
    pub fn new(store: Arc<dyn GraphStore>, policy: MergePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub async fn ensure_unique_constraint(&self, label: NodeLabel, property: &PropertyKey) -> StoreResult<()> {
        self.store.ensure_unique_constraint(label, property).await
    }

    /// Merges `nodes` under `label`, returning how many were merged.
    ///
    /// Every node must use the identity property of the first one; the
    /// uniqueness constraint is ensured on it before any node is written.
    pub async fn insert_nodes(&self, label: NodeLabel, nodes: &[NodeSpec]) -> StoreResult<usize> {
        let Some(first) = nodes.first() else {
            warn!("No nodes to insert into '{}'", label);
            return Ok(0);
        };

        if let Some(odd) = nodes.iter().find(|node| node.key != first.key) {
            return Err(StoreError::InvalidRecord(format!(
                "'{}' nodes must all be identified by '{}', found '{}'",
                label, first.key, odd.key
            )));
        }

        self.store.ensure_unique_constraint(label, &first.key).await?;

        for node in nodes {
            self.store.merge_node(label, node, self.policy).await?;
        }
        info!("Merged {} nodes into '{}' ({:?})", nodes.len(), label, self.policy);
        Ok(nodes.len())
    }

    pub async fn insert_relations(&self, relations: &[RelationSpec]) -> StoreResult<RelationSummary> {
        if relations.is_empty() {
            warn!("Empty relation list: nothing inserted");
            return Ok(RelationSummary::default());
        }

        let mut summary = RelationSummary {
            requested: relations.len(),
            linked: 0,
        };
        for relation in relations {
            summary.linked += self.store.merge_relationship(relation).await?;
        }
        info!("Processed {} relations, {} linked", summary.requested, summary.linked);
        Ok(summary)
    }

    /// Deletes every node and relationship. Development only.
    pub async fn clear_graph(&self) -> StoreResult<()> {
        self.store.delete_all().await
    }

    pub async fn delete_label(&self, label: NodeLabel) -> StoreResult<()> {
        self.store.delete_label(label).await
    }

    /// User-to-user and user-to-destination relationships, for diagnostics.
    pub async fn show_relationships(&self) -> StoreResult<RelationshipReport> {
        let report = RelationshipReport {
            social: self.store.relationships(&RelationshipQuery::social()).await?,
            visits: self.store.relationships(&RelationshipQuery::visits()).await?,
        };
        info!("Graph relationships:\n{}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use travesia_core::{PropertyValue, RelationshipType};
    use travesia_store::InMemoryGraph;

    fn key(name: &str) -> PropertyKey {
        PropertyKey::parse(name).unwrap()
    }

    fn user(id: i64, name: &str) -> NodeSpec {
        NodeSpec::new(key("usuario_id"), id).with_property(key("nombre"), name)
    }

    fn destination(id: i64) -> NodeSpec {
        NodeSpec::new(key("destino_id"), id).with_property(key("ciudad"), "Ushuaia")
    }

    fn visit(user_id: i64, destination_id: i64) -> RelationSpec {
        RelationSpec {
            from_label: NodeLabel::User,
            from_key: key("usuario_id"),
            from_value: user_id.into(),
            to_label: NodeLabel::Destination,
            to_key: key("destino_id"),
            to_value: destination_id.into(),
            kind: RelationshipType::Visited,
        }
    }

    fn friends(a: i64, b: i64) -> RelationSpec {
        RelationSpec {
            from_label: NodeLabel::User,
            from_key: key("usuario_id"),
            from_value: a.into(),
            to_label: NodeLabel::User,
            to_key: key("usuario_id"),
            to_value: b.into(),
            kind: RelationshipType::FriendOf,
        }
    }

    async fn seeded(policy: MergePolicy) -> (Arc<InMemoryGraph>, GraphLoader) {
        let graph = Arc::new(InMemoryGraph::new());
        let loader = GraphLoader::new(graph.clone(), policy);
        loader
            .insert_nodes(NodeLabel::User, &[user(1, "Ana"), user(2, "Beto"), user(3, "Caro")])
            .await
            .unwrap();
        loader
            .insert_nodes(NodeLabel::Destination, &[destination(10)])
            .await
            .unwrap();
        (graph, loader)
    }

    #[tokio::test]
    async fn test_insert_nodes_is_idempotent_and_constrained() {
        let (graph, loader) = seeded(MergePolicy::IdentityOnly).await;

        let merged = loader
            .insert_nodes(NodeLabel::User, &[user(1, "Ana"), user(4, "Dani")])
            .await
            .unwrap();
        assert_eq!(merged, 2);
        assert_eq!(graph.node_count(NodeLabel::User).await, 4);
        assert!(graph.has_constraint(NodeLabel::User, &key("usuario_id")).await);
    }

    #[tokio::test]
    async fn test_identity_only_stores_just_the_identity() {
        let (graph, _loader) = seeded(MergePolicy::IdentityOnly).await;

        let stored = graph
            .node(NodeLabel::User, &key("usuario_id"), &PropertyValue::Integer(1))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored.contains_key("nombre"));
    }

    #[tokio::test]
    async fn test_on_create_does_not_overwrite() {
        let (graph, loader) = seeded(MergePolicy::OnCreate).await;
        loader.insert_nodes(NodeLabel::User, &[user(1, "Anita")]).await.unwrap();

        let stored = graph
            .node(NodeLabel::User, &key("usuario_id"), &PropertyValue::Integer(1))
            .await
            .unwrap();
        assert_eq!(stored.get("nombre"), Some(&PropertyValue::from("Ana")));
    }

    #[tokio::test]
    async fn test_always_overwrites() {
        let (graph, loader) = seeded(MergePolicy::Always).await;
        loader.insert_nodes(NodeLabel::User, &[user(1, "Anita")]).await.unwrap();

        let stored = graph
            .node(NodeLabel::User, &key("usuario_id"), &PropertyValue::Integer(1))
            .await
            .unwrap();
        assert_eq!(stored.get("nombre"), Some(&PropertyValue::from("Anita")));
    }

    #[tokio::test]
    async fn test_empty_inputs_are_noops() {
        let graph = Arc::new(InMemoryGraph::new());
        let loader = GraphLoader::new(graph.clone(), MergePolicy::default());

        assert_eq!(loader.insert_nodes(NodeLabel::Hotel, &[]).await.unwrap(), 0);
        assert_eq!(loader.insert_relations(&[]).await.unwrap(), RelationSummary::default());
        assert!(!graph.has_constraint(NodeLabel::Hotel, &key("hotel_id")).await);
    }

    #[tokio::test]
    async fn test_mixed_identity_keys_are_rejected_before_writing() {
        let graph = Arc::new(InMemoryGraph::new());
        let loader = GraphLoader::new(graph.clone(), MergePolicy::default());

        let nodes = vec![
            NodeSpec::new(key("hotel_id"), "H1"),
            NodeSpec::new(key("nombre"), "Llao Llao"),
        ];
        let err = loader.insert_nodes(NodeLabel::Hotel, &nodes).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert_eq!(graph.node_count(NodeLabel::Hotel).await, 0);
    }

    #[tokio::test]
    async fn test_missing_endpoint_links_nothing() {
        let (graph, loader) = seeded(MergePolicy::IdentityOnly).await;

        let summary = loader.insert_relations(&[visit(1, 99)]).await.unwrap();
        assert_eq!(summary, RelationSummary { requested: 1, linked: 0 });
        assert_eq!(graph.relationship_count().await, 0);
    }

    #[tokio::test]
    async fn test_relations_merge_and_report_sorted() {
        let (graph, loader) = seeded(MergePolicy::IdentityOnly).await;

        let summary = loader
            .insert_relations(&[friends(2, 1), friends(1, 3), visit(3, 10), visit(1, 10), friends(1, 3)])
            .await
            .unwrap();
        assert_eq!(summary.requested, 5);
        assert_eq!(summary.linked, 5);
        assert_eq!(graph.relationship_count().await, 4);

        let report = loader.show_relationships().await.unwrap();
        let social: Vec<(&str, &str)> = report
            .social
            .iter()
            .map(|r| (r.origin.as_str(), r.destination.as_str()))
            .collect();
        assert_eq!(social, vec![("1", "3"), ("2", "1")]);

        let visits: Vec<&str> = report.visits.iter().map(|r| r.origin.as_str()).collect();
        assert_eq!(visits, vec!["1", "3"]);
        assert!(report.visits.iter().all(|r| r.relation == "VISITO"));
    }

    #[tokio::test]
    async fn test_clear_and_delete_label() {
        let (graph, loader) = seeded(MergePolicy::IdentityOnly).await;
        loader.insert_relations(&[visit(1, 10)]).await.unwrap();

        loader.delete_label(NodeLabel::Destination).await.unwrap();
        assert_eq!(graph.node_count(NodeLabel::Destination).await, 0);
        assert_eq!(graph.node_count(NodeLabel::User).await, 3);
        assert_eq!(graph.relationship_count().await, 0);

        loader.clear_graph().await.unwrap();
        assert_eq!(graph.node_count(NodeLabel::User).await, 0);
    }

    #[tokio::test]
    async fn test_nodes_from_seed_objects() {
        let graph = Arc::new(InMemoryGraph::new());
        let loader = GraphLoader::new(graph.clone(), MergePolicy::OnCreate);
        let raw = json!([
            {"actividad_id": "A1", "nombre": "Trekking", "duracion_horas": 6},
            {"actividad_id": "A2", "nombre": "Kayak"}
        ]);
        let nodes: Vec<NodeSpec> = raw
            .as_array()
            .unwrap()
            .iter()
            .map(|v| NodeSpec::from_json(v.as_object().unwrap()).unwrap())
            .collect();

        assert_eq!(loader.insert_nodes(NodeLabel::Activity, &nodes).await.unwrap(), 2);
        let stored = graph
            .node(NodeLabel::Activity, &key("actividad_id"), &PropertyValue::from("A1"))
            .await
            .unwrap();
        assert_eq!(stored.get("duracion_horas"), Some(&PropertyValue::Integer(6)));
    }
}
