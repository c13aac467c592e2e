//! Error types for agents, policies and system graphs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent '{agent}' has no default target bound for {message_type}")]
    UnboundTarget {
        agent: String,
        message_type: &'static str,
    },

    #[error("Default target of agent '{agent}' for {message_type} has been dropped")]
    TargetDropped {
        agent: String,
        message_type: &'static str,
    },

    #[error("Agent '{agent}' already has a default target bound for {message_type}")]
    AlreadyBound {
        agent: String,
        message_type: &'static str,
    },

    #[error("Agent '{agent}' does not declare {direction} of {message_type}")]
    NotDeclared {
        agent: String,
        direction: &'static str,
        message_type: &'static str,
    },

    #[error("Component '{0}' is not declared before it is referenced")]
    UnknownComponent(String),

    #[error("Component '{0}' is declared more than once")]
    DuplicateComponent(String),

    #[error("System input for {0} is declared more than once")]
    DuplicateInput(&'static str),

    #[error("System output for {0} is declared more than once")]
    DuplicateOutput(&'static str),

    #[error("System has no input for {0}")]
    NoInput(&'static str),

    #[error("System has no output for {0}")]
    NoOutput(&'static str),

    #[error("'{0}' is already running")]
    AlreadyRunning(String),

    #[error("Worker thread of agent '{0}' panicked")]
    WorkerPanicked(String),

    #[error("Failed to spawn worker thread for agent '{agent}': {source}")]
    Spawn {
        agent: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Handler failed: {0}")]
    Handler(#[from] anyhow::Error),
}

impl AgentError {
    /// Create an unbound-target error
    pub fn unbound(agent: impl Into<String>, message_type: &'static str) -> Self {
        AgentError::UnboundTarget {
            agent: agent.into(),
            message_type,
        }
    }

    /// Create a not-declared error for the given direction
    pub fn not_declared(
        agent: impl Into<String>,
        direction: &'static str,
        message_type: &'static str,
    ) -> Self {
        AgentError::NotDeclared {
            agent: agent.into(),
            direction,
            message_type,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        AgentError::Config(msg.into())
    }

    /// Create a handler fault from a plain message
    pub fn handler(msg: impl std::fmt::Display) -> Self {
        AgentError::Handler(anyhow::anyhow!("{}", msg))
    }

    /// Errors raised while a system graph is being built
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            AgentError::UnknownComponent(_)
                | AgentError::DuplicateComponent(_)
                | AgentError::DuplicateInput(_)
                | AgentError::DuplicateOutput(_)
                | AgentError::AlreadyBound { .. }
                | AgentError::NotDeclared { .. }
        )
    }

    /// Errors that indicate misuse of the API rather than a runtime condition
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            AgentError::UnboundTarget { .. }
                | AgentError::NotDeclared { .. }
                | AgentError::NoInput(_)
                | AgentError::NoOutput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::unbound("adder", "Sum");
        assert_eq!(
            err.to_string(),
            "Agent 'adder' has no default target bound for Sum"
        );

        let err = AgentError::UnknownComponent("doubler".to_string());
        assert!(err.to_string().contains("doubler"));
    }

    #[test]
    fn test_error_classification() {
        assert!(AgentError::unbound("a", "M").is_programming_error());
        assert!(!AgentError::unbound("a", "M").is_construction_error());
        assert!(AgentError::DuplicateComponent("a".into()).is_construction_error());
        assert!(AgentError::not_declared("a", "send", "M").is_construction_error());
        assert!(!AgentError::handler("boom").is_programming_error());
    }

    #[test]
    fn test_anyhow_conversion() {
        fn faulty() -> Result<()> {
            Err(anyhow::anyhow!("overflow"))?;
            Ok(())
        }
        match faulty() {
            Err(AgentError::Handler(e)) => assert_eq!(e.to_string(), "overflow"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
