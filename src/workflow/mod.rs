//! Application routing and status-transition workflow
//!
//! The multi-office approval pipeline for chainsaw purchase permits:
//! technical staff review, RPS Chief, TSD Chief, PENRO, LPDD/FUS, ARD-TS,
//! and finally the Regional Executive Director, who issues the permit
//! number. Each reviewing role can receive, endorse, or return an
//! application; every handoff is recorded in the routing log.

pub mod engine;
pub mod error;
pub mod permit;
pub mod routing;
pub mod status;

pub use engine::{endorse, receive, resubmit, return_application, WorkflowOutcome};
pub use error::WorkflowError;

use serde::Serialize;

/// Reviewing roles, carrying the role ids from the user directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum Role {
    TechnicalStaff = 1,
    CenroChief = 2,
    Penro = 3,
    Fus = 4,
    ArdTs = 6,
    Red = 7,
    ChiefRps = 8,
    ChiefTsd = 10,
}

impl Role {
    pub fn from_id(role_id: i32) -> Option<Role> {
        match role_id {
            1 => Some(Role::TechnicalStaff),
            2 => Some(Role::CenroChief),
            3 => Some(Role::Penro),
            4 => Some(Role::Fus),
            6 => Some(Role::ArdTs),
            7 => Some(Role::Red),
            8 => Some(Role::ChiefRps),
            10 => Some(Role::ChiefTsd),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn title(self) -> &'static str {
        match self {
            Role::TechnicalStaff => "Technical Staff",
            Role::CenroChief => "CENRO Chief",
            Role::Penro => "PENRO",
            Role::Fus => "LPDD/FUS",
            Role::ArdTs => "ARD TS",
            Role::Red => "Regional Executive Director",
            Role::ChiefRps => "Chief RPS",
            Role::ChiefTsd => "Chief TSD",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Workflow operations, used in transition lookups and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operation {
    Receive,
    Endorse,
    Return,
    Resubmit,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Receive => "receive",
            Operation::Endorse => "endorse",
            Operation::Return => "return",
            Operation::Resubmit => "resubmit",
        };
        f.write_str(s)
    }
}

/// The authenticated actor invoking a workflow operation.
///
/// Supplied by the session middleware; the engine trusts these fields and
/// performs its own role/office eligibility checks against them.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: i64,
    pub office_id: i32,
    pub role_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ids_round_trip() {
        for role in [
            Role::TechnicalStaff,
            Role::CenroChief,
            Role::Penro,
            Role::Fus,
            Role::ArdTs,
            Role::Red,
            Role::ChiefRps,
            Role::ChiefTsd,
        ] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
    }

    #[test]
    fn test_unknown_role_id() {
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(5), None);
        assert_eq!(Role::from_id(99), None);
    }
}
