//! Identity & scope: the `(user, agent, session)` partition key.
//!
//! Every ingest and retrieval call operates strictly within the scope its
//! caller supplies. The core treats scope components as opaque strings —
//! no case-folding, no length limit, only whitespace trimmed at both ends.

use std::collections::BTreeMap;
use std::fmt;

/// An ordered triple identifying the principal(s) a fact belongs to.
///
/// At least one component must be non-empty. Construct through
/// [`Scope::compose`] rather than the struct literal so that invariant is
/// enforced in one place.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scope {
    user: Option<String>,
    agent: Option<String>,
    session: Option<String>,
}

/// Error returned when a caller supplies an empty scope triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidScope;

impl fmt::Display for InvalidScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scope must contain at least one of user, agent, or session")
    }
}

impl std::error::Error for InvalidScope {}

fn normalize(value: Option<impl Into<String>>) -> Option<String> {
    let value = value?.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Scope {
    /// Composes a scope from optional user/agent/session components.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidScope`] if all three components are empty (after
    /// trimming whitespace).
    pub fn compose(
        user: Option<impl Into<String>>,
        agent: Option<impl Into<String>>,
        session: Option<impl Into<String>>,
    ) -> Result<Self, InvalidScope> {
        let scope = Self {
            user: normalize(user),
            agent: normalize(agent),
            session: normalize(session),
        };
        if scope.is_empty() {
            Err(InvalidScope)
        } else {
            Ok(scope)
        }
    }

    /// Creates a scope bound only to a user. Convenience for the common case.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidScope`] if `user` is empty after trimming.
    pub fn for_user(user: impl Into<String>) -> Result<Self, InvalidScope> {
        Self::compose(Some(user), None::<String>, None::<String>)
    }

    const fn is_empty(&self) -> bool {
        self.user.is_none() && self.agent.is_none() && self.session.is_none()
    }

    /// Returns the user component, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns the agent component, if any.
    #[must_use]
    pub fn agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    /// Returns the session component, if any.
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Emits an equality filter map containing only the non-empty
    /// components, keyed `"user_id"`/`"agent_id"`/`"session_id"`.
    ///
    /// This filter is injected into every `VectorStore` and `HistoryLog`
    /// call so no operation can escape its principal's partition.
    #[must_use]
    pub fn filter(&self) -> Filter {
        let mut filter = BTreeMap::new();
        if let Some(user) = &self.user {
            filter.insert("user_id".to_string(), user.clone());
        }
        if let Some(agent) = &self.agent {
            filter.insert("agent_id".to_string(), agent.clone());
        }
        if let Some(session) = &self.session {
            filter.insert("session_id".to_string(), session.clone());
        }
        filter
    }

    /// Returns the principal identifier used to partition the graph store.
    ///
    /// The graph layer keys entities/relations by a single principal
    /// string rather than the full triple. The most specific
    /// non-empty component wins: session, then agent, then user.
    #[must_use]
    pub fn principal(&self) -> &str {
        self.session
            .as_deref()
            .or(self.agent.as_deref())
            .or(self.user.as_deref())
            .unwrap_or_default()
    }
}

/// An equality filter map injected into store calls to scope them to one partition.
pub type Filter = BTreeMap<String, String>;

/// Merges a caller-supplied filter on top of a scope filter.
///
/// Scope components always win on key collision — a caller-supplied
/// filter can never be used to escape its own scope.
#[must_use]
pub fn merge_filters(scope_filter: &Filter, extra: Option<&Filter>) -> Filter {
    let mut merged = extra.cloned().unwrap_or_default();
    for (key, value) in scope_filter {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
