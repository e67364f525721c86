use serde::{Deserialize, Serialize};

/// Connection state of the binding to the printer service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No binding and no attempt in progress
    Unbound,
    /// First bind attempt in progress
    Binding,
    /// Bound to the service and accepting calls
    Bound,
    /// Binding was lost, a rebind attempt is scheduled or running
    Reconnecting,
    /// Retry budget exhausted (requires a fresh attach)
    Failed,
}

impl ConnectionState {
    /// Check if state allows starting a new attach
    pub fn can_attach(&self) -> bool {
        matches!(self, Self::Unbound | Self::Failed)
    }

    /// Check if calls may be dispatched right now
    pub fn can_dispatch(&self) -> bool {
        matches!(self, Self::Bound)
    }

    /// Check if currently bound
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound)
    }

    /// Check if in a transitional state
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Binding | Self::Reconnecting)
    }

    /// Transition to binding state
    pub fn to_binding(&self) -> Result<Self, &'static str> {
        match self {
            Self::Unbound | Self::Failed => Ok(Self::Binding),
            _ => Err("Can only start binding from Unbound or Failed state"),
        }
    }

    /// Transition to bound state
    pub fn to_bound(&self) -> Result<Self, &'static str> {
        match self {
            Self::Binding | Self::Reconnecting => Ok(Self::Bound),
            _ => Err("Can only complete binding from Binding or Reconnecting state"),
        }
    }

    /// Transition to reconnecting state
    pub fn to_reconnecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Binding | Self::Bound | Self::Reconnecting => Ok(Self::Reconnecting),
            _ => Err("Can only reconnect after a binding existed or was attempted"),
        }
    }

    /// Transition to unbound state
    pub fn to_unbound(&self) -> Self {
        Self::Unbound
    }

    /// Transition to failed state
    pub fn to_failed(&self) -> Self {
        Self::Failed
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Unbound
    }
}
