use serde::{Deserialize, Serialize};

use thermosync_api::Id;

/// Who created or is acting on an event. Stored as TEXT in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Tenant,
    SubTenant,
}

impl ActorRole {
    /// Tenant events take precedence over sub-tenant events on the same
    /// device; peers do not outrank each other.
    pub fn outranks(&self, other: ActorRole) -> bool {
        matches!((self, other), (ActorRole::Tenant, ActorRole::SubTenant))
    }
}

/// A caller of the orchestration service, carrying just enough identity to
/// scope ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Tenant { id: Id },
    SubTenant { id: Id, tenant_id: Id },
}

impl Actor {
    pub fn role(&self) -> ActorRole {
        match self {
            Actor::Tenant { .. } => ActorRole::Tenant,
            Actor::SubTenant { .. } => ActorRole::SubTenant,
        }
    }

    /// Identifier of the acting account itself.
    pub fn actor_id(&self) -> Id {
        match self {
            Actor::Tenant { id } => *id,
            Actor::SubTenant { id, .. } => *id,
        }
    }

    /// Tenant the actor operates under (self for tenants).
    pub fn tenant_id(&self) -> Id {
        match self {
            Actor::Tenant { id } => *id,
            Actor::SubTenant { tenant_id, .. } => *tenant_id,
        }
    }

    pub fn sub_tenant_id(&self) -> Option<Id> {
        match self {
            Actor::Tenant { .. } => None,
            Actor::SubTenant { id, .. } => Some(*id),
        }
    }
}
