//! Capability checks for mutating operations.
//!
//! Every mutating command names a capability and asks an [`AccessGate`]
//! whether the acting [`Principal`] holds it, before any data is touched.
//! The principal is always an explicit argument; there is no ambient
//! "current user" state.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Capability strings consulted before mutations.
pub mod capability {
    pub const TICKET_CREATE: &str = "ticket.create";
    pub const TICKET_UPDATE_ANY: &str = "ticket.update.any";
    pub const TICKET_UPDATE_ASSIGNED: &str = "ticket.update.assigned";
    pub const TICKET_ASSIGN: &str = "ticket.assign";
    pub const TICKET_DELETE: &str = "ticket.delete.own";
    pub const TICKET_PROMOTE: &str = "ticket.promote";
    pub const BOARD_MANAGE: &str = "board.manage";
    pub const TASK_MANAGE: &str = "task.manage";
    pub const PROJECT_MANAGE: &str = "project.manage";
    pub const USER_MANAGE: &str = "user.manage";
}

/// A role granting a fixed capability set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Requesters: open and maintain their own tickets.
    User,
    /// Developers: work assigned tickets and the board.
    Dev,
    /// Administrators: everything.
    #[default]
    Admin,
}

impl Role {
    fn capabilities(&self) -> &'static [&'static str] {
        use capability::*;
        match self {
            Role::User => &[TICKET_CREATE, TICKET_UPDATE_ASSIGNED, TICKET_DELETE],
            Role::Dev => &[
                TICKET_CREATE,
                TICKET_UPDATE_ASSIGNED,
                TICKET_PROMOTE,
                BOARD_MANAGE,
                TASK_MANAGE,
            ],
            Role::Admin => &[
                TICKET_CREATE,
                TICKET_UPDATE_ANY,
                TICKET_UPDATE_ASSIGNED,
                TICKET_ASSIGN,
                TICKET_DELETE,
                TICKET_PROMOTE,
                BOARD_MANAGE,
                TASK_MANAGE,
                PROJECT_MANAGE,
                USER_MANAGE,
            ],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Dev => "dev",
            Role::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

/// The acting identity for a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self { name: name.into(), role }
    }
}

/// Supplies the caller's permission set.
pub trait AccessGate {
    /// Whether `principal` holds `capability`.
    fn allows(&self, principal: &Principal, capability: &str) -> bool;
}

/// Built-in gate mapping the three roles to fixed capability sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleGate;

impl AccessGate for RoleGate {
    fn allows(&self, principal: &Principal, capability: &str) -> bool {
        principal.role.capabilities().contains(&capability)
    }
}

/// Fail with `Forbidden` unless the gate allows the capability.
pub fn require(gate: &dyn AccessGate, principal: &Principal, capability: &str) -> Result<()> {
    if gate.allows(principal, capability) {
        Ok(())
    } else {
        Err(Error::Forbidden {
            actor: principal.name.clone(),
            capability: capability.to_string(),
        })
    }
}
