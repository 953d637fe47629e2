//! Read-only skill catalog snapshots.
//!
//! Skill registration lives outside this crate. The engine asks a
//! [`SkillRegistry`] for one [`SkillCatalog`] per round and never writes back.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::info;

use crate::domain::{QuorumResult, SkillDescriptor, SkillId};
use crate::skill_client::SkillClient;

/// Immutable snapshot of registered skills keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillCatalog {
    skills: BTreeMap<SkillId, SkillDescriptor>,
}

impl SkillCatalog {
    pub fn new(descriptors: impl IntoIterator<Item = SkillDescriptor>) -> Self {
        Self {
            skills: descriptors
                .into_iter()
                .map(|d| (d.id.clone(), d))
                .collect(),
        }
    }

    pub fn get(&self, id: &SkillId) -> Option<&SkillDescriptor> {
        self.skills.get(id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Ids flagged available, ascending.
    pub fn available_ids(&self) -> Vec<SkillId> {
        self.skills
            .values()
            .filter(|d| d.available)
            .map(|d| d.id.clone())
            .collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &SkillDescriptor> {
        self.skills.values()
    }
}

/// Source of catalog snapshots.
#[async_trait]
pub trait SkillRegistry: Send + Sync {
    async fn snapshot(&self) -> QuorumResult<SkillCatalog>;
}

/// Registry over a fixed set of descriptors.
#[derive(Debug, Clone, Default)]
pub struct StaticSkillRegistry {
    catalog: SkillCatalog,
}

impl StaticSkillRegistry {
    pub fn new(descriptors: impl IntoIterator<Item = SkillDescriptor>) -> Self {
        Self {
            catalog: SkillCatalog::new(descriptors),
        }
    }
}

#[async_trait]
impl SkillRegistry for StaticSkillRegistry {
    async fn snapshot(&self) -> QuorumResult<SkillCatalog> {
        Ok(self.catalog.clone())
    }
}

/// Probe every available skill's heartbeat concurrently and return a catalog
/// where unreachable skills are flagged unavailable.
pub async fn refresh_availability(
    client: Arc<dyn SkillClient>,
    catalog: &SkillCatalog,
    deadline: Instant,
) -> SkillCatalog {
    let probes = catalog.descriptors().map(|skill| {
        let client = Arc::clone(&client);
        let mut skill = skill.clone();
        async move {
            if skill.available && !client.heartbeat(&skill, deadline).await {
                info!(skill_id = %skill.id, "skill failed heartbeat, marking unavailable");
                skill.available = false;
            }
            skill
        }
    });
    SkillCatalog::new(join_all(probes).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_registry_snapshot_lists_available_ids() {
        let registry = StaticSkillRegistry::new(vec![
            SkillDescriptor::new("b", "http://b"),
            SkillDescriptor::new("a", "http://a"),
            SkillDescriptor::new("c", "http://c").unavailable(),
        ]);
        let catalog = registry.snapshot().await.unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.available_ids(),
            vec![SkillId::new("a"), SkillId::new("b")]
        );
        assert!(catalog.get(&SkillId::new("c")).is_some());
    }
}
