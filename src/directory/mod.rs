use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Partner / Agent Directory
// ============================================================================
//
// Display lookups used to enrich published events. Lookups are best effort:
// the lifecycle degrades missing or failed lookups to empty strings and the
// transition still commits.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PartnerInfo {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentInfo {
    pub name: String,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory lookup failed: {0}")]
    Lookup(String),
}

#[async_trait]
pub trait PartnerDirectory: Send + Sync {
    async fn partner(&self, partner_id: Uuid) -> Result<Option<PartnerInfo>, DirectoryError>;
}

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn agent(&self, agent_id: Uuid) -> Result<Option<AgentInfo>, DirectoryError>;
}

/// Fixed in-process directory. Serves the demo wiring and tests; a deployment
/// backs these traits with the partner/agent services instead.
#[derive(Default)]
pub struct StaticDirectory {
    partners: HashMap<Uuid, PartnerInfo>,
    agents: HashMap<Uuid, AgentInfo>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partner(mut self, partner_id: Uuid, name: &str, address: &str) -> Self {
        self.partners.insert(
            partner_id,
            PartnerInfo {
                name: name.to_string(),
                address: address.to_string(),
            },
        );
        self
    }

    pub fn with_agent(mut self, agent_id: Uuid, name: &str) -> Self {
        self.agents.insert(
            agent_id,
            AgentInfo {
                name: name.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl PartnerDirectory for StaticDirectory {
    async fn partner(&self, partner_id: Uuid) -> Result<Option<PartnerInfo>, DirectoryError> {
        Ok(self.partners.get(&partner_id).cloned())
    }
}

#[async_trait]
impl AgentDirectory for StaticDirectory {
    async fn agent(&self, agent_id: Uuid) -> Result<Option<AgentInfo>, DirectoryError> {
        Ok(self.agents.get(&agent_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory_lookups() {
        let partner_id = Uuid::new_v4();
        let agent_id = Uuid::new_v4();
        let directory = StaticDirectory::new()
            .with_partner(partner_id, "Golden Wok", "3 Market Square")
            .with_agent(agent_id, "Sam Rider");

        let partner = directory.partner(partner_id).await.unwrap().unwrap();
        assert_eq!(partner.name, "Golden Wok");
        assert_eq!(partner.address, "3 Market Square");

        let agent = directory.agent(agent_id).await.unwrap().unwrap();
        assert_eq!(agent.name, "Sam Rider");

        assert!(directory.partner(Uuid::new_v4()).await.unwrap().is_none());
        assert!(directory.agent(Uuid::new_v4()).await.unwrap().is_none());
    }
}
