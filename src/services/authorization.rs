use serde::Serialize;
use uuid::Uuid;

use crate::models::user::{Identity, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_destructive(self) -> bool {
        matches!(self, Action::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Customer,
    Lead,
    Task,
    Interaction,
    User,
}

/// What a request wants to touch. `owner_id` is the owning user for CRM
/// records and the account itself for `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub owner_id: Option<Uuid>,
}

impl Resource {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            owner_id: None,
        }
    }

    pub fn owned_by(kind: ResourceKind, owner_id: Uuid) -> Self {
        Self {
            kind,
            owner_id: Some(owner_id),
        }
    }

    pub fn user_account(user_id: Uuid) -> Self {
        Self::owned_by(ResourceKind::User, user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    PrivilegedRole,
    Owner,
    NotOwner,
    InsufficientRole,
    SelfProtection,
}

impl DecisionReason {
    pub fn message(self) -> &'static str {
        match self {
            DecisionReason::PrivilegedRole | DecisionReason::Owner => "Allowed",
            DecisionReason::NotOwner => "You can only access your own records",
            DecisionReason::InsufficientRole => "Insufficient permissions",
            DecisionReason::SelfProtection => "You cannot delete your own account",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    pub allow: bool,
    pub reason: DecisionReason,
}

impl AuthorizationDecision {
    fn allow(reason: DecisionReason) -> Self {
        Self {
            allow: true,
            reason,
        }
    }

    fn deny(reason: DecisionReason) -> Self {
        Self {
            allow: false,
            reason,
        }
    }
}

/// Decides whether `identity` may perform `action` on `resource`.
///
/// Pure: the role comes from the token snapshot, nothing is looked up.
/// Deleting one's own account is refused before any role logic runs.
pub fn decide(identity: &Identity, action: Action, resource: Resource) -> AuthorizationDecision {
    let is_self = resource.owner_id == Some(identity.subject_id);

    if resource.kind == ResourceKind::User && action.is_destructive() && is_self {
        return AuthorizationDecision::deny(DecisionReason::SelfProtection);
    }

    match resource.kind {
        ResourceKind::User => decide_account(identity.role, action, is_self),
        ResourceKind::Customer
        | ResourceKind::Lead
        | ResourceKind::Task
        | ResourceKind::Interaction => {
            if identity.role.is_privileged() {
                AuthorizationDecision::allow(DecisionReason::PrivilegedRole)
            } else if resource.owner_id.is_none() || is_self {
                AuthorizationDecision::allow(DecisionReason::Owner)
            } else {
                AuthorizationDecision::deny(DecisionReason::NotOwner)
            }
        }
    }
}

fn decide_account(role: UserRole, action: Action, is_self: bool) -> AuthorizationDecision {
    match role {
        UserRole::Admin => AuthorizationDecision::allow(DecisionReason::PrivilegedRole),
        UserRole::Manager if action == Action::View => {
            AuthorizationDecision::allow(DecisionReason::PrivilegedRole)
        }
        UserRole::Manager => AuthorizationDecision::deny(DecisionReason::InsufficientRole),
        UserRole::User => match action {
            Action::View | Action::Update if is_self => {
                AuthorizationDecision::allow(DecisionReason::Owner)
            }
            Action::View | Action::Update => AuthorizationDecision::deny(DecisionReason::NotOwner),
            Action::Create | Action::Delete => {
                AuthorizationDecision::deny(DecisionReason::InsufficientRole)
            }
        },
    }
}

/// Route-level gate, e.g. reports are manager-and-above.
pub fn require_role(identity: &Identity, minimum: UserRole) -> AuthorizationDecision {
    if identity.role >= minimum {
        AuthorizationDecision::allow(DecisionReason::PrivilegedRole)
    } else {
        AuthorizationDecision::deny(DecisionReason::InsufficientRole)
    }
}
