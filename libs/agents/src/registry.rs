//! Agent Registry
//!
//! Agent identity and the name-keyed component registry a system resolves
//! its wiring against.

use crate::agent::Agent;
use crate::error::{AgentError, Result};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique agent identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId {
    id: Uuid,
}

impl AgentId {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self { id }
    }

    pub fn uuid(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.id.simple())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Components of a system in declaration order, addressable by name
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    agents: Vec<Agent>,
    index: HashMap<String, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component. Names must be unique within a system.
    pub fn register(&mut self, agent: Agent) -> Result<()> {
        if self.index.contains_key(agent.name()) {
            return Err(AgentError::DuplicateComponent(agent.name().to_string()));
        }
        tracing::debug!(agent = %agent.name(), agent_id = %agent.id(), "Registering component");
        self.index.insert(agent.name().to_string(), self.agents.len());
        self.agents.push(agent);
        Ok(())
    }

    /// Look up a component that has already been declared
    pub fn get(&self, name: &str) -> Result<&Agent> {
        self.index
            .get(name)
            .map(|&idx| &self.agents[idx])
            .ok_or_else(|| AgentError::UnknownComponent(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Components in declaration order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentBuilder;
    use crate::policy::PolicyKind;

    struct Idle;

    fn agent(name: &str) -> Agent {
        AgentBuilder::new(name, Idle, PolicyKind::Synchronous).build()
    }

    #[test]
    fn test_agent_id_creation() {
        let id1 = AgentId::new();
        let id2 = AgentId::new();
        assert_ne!(id1, id2);
        assert_ne!(id1.uuid(), id2.uuid());
        assert_eq!(AgentId::from_uuid(id1.uuid()), id1);
    }

    #[test]
    fn test_agent_id_display() {
        let id = AgentId::new();
        assert!(id.to_string().starts_with("agent-"));
    }

    #[test]
    fn test_registry_preserves_order() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.is_empty());
        registry.register(agent("b")).unwrap();
        registry.register(agent("a")).unwrap();
        registry.register(agent("c")).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["b", "a", "c"]);
        assert!(registry.contains("a"));
        assert_eq!(registry.get("c").unwrap().name(), "c");
    }

    #[test]
    fn test_registry_rejects_duplicates_and_unknowns() {
        let mut registry = ComponentRegistry::new();
        registry.register(agent("a")).unwrap();
        assert!(matches!(
            registry.register(agent("a")),
            Err(AgentError::DuplicateComponent(name)) if name == "a"
        ));
        assert!(matches!(
            registry.get("missing"),
            Err(AgentError::UnknownComponent(name)) if name == "missing"
        ));
    }
}
