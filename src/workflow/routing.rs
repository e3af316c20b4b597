//! Office routing table and return-destination map
//!
//! Static configuration consolidated from the per-role controllers so the
//! whole engine shares one copy. Endorsements consult `next_office` before
//! any mutation; a missing entry halts the operation.

use crate::workflow::error::WorkflowError;
use crate::workflow::status::ApplicationStatus;
use crate::workflow::Role;

/// Office identifiers used by the routing table.
pub mod offices {
    pub const PENRO_LAGUNA: i32 = 2;
    pub const PENRO_BATANGAS: i32 = 3;
    pub const PENRO_QUEZON: i32 = 5;
    pub const CENRO_STA_CRUZ: i32 = 6;
    pub const CENRO_LIPA: i32 = 7;
    pub const CENRO_CALACA: i32 = 8;
    pub const CENRO_CALAUAG: i32 = 9;
    pub const CENRO_CATANAUAN: i32 = 10;
    pub const CENRO_TAYABAS: i32 = 11;
    pub const CENRO_REAL: i32 = 12;
    pub const REGIONAL_OFFICE: i32 = 13;
}

/// Sending office -> next-stage office. CENROs route to their province's
/// PENRO, PENROs to the Regional Office, and the Regional Office stages
/// hand off within office 13.
const OFFICE_ROUTING: &[(i32, i32)] = &[
    (offices::CENRO_STA_CRUZ, offices::PENRO_LAGUNA),
    (offices::CENRO_LIPA, offices::PENRO_BATANGAS),
    (offices::CENRO_CALACA, offices::PENRO_BATANGAS),
    (offices::CENRO_CALAUAG, offices::PENRO_QUEZON),
    (offices::CENRO_CATANAUAN, offices::PENRO_QUEZON),
    (offices::CENRO_TAYABAS, offices::PENRO_QUEZON),
    (offices::CENRO_REAL, offices::PENRO_QUEZON),
    (offices::PENRO_LAGUNA, offices::REGIONAL_OFFICE),
    (offices::PENRO_BATANGAS, offices::REGIONAL_OFFICE),
    (offices::PENRO_QUEZON, offices::REGIONAL_OFFICE),
    (offices::REGIONAL_OFFICE, offices::REGIONAL_OFFICE),
];

/// Next-stage office for a sending office.
pub fn next_office(office_id: i32) -> Result<i32, WorkflowError> {
    OFFICE_ROUTING
        .iter()
        .find(|(from, _)| *from == office_id)
        .map(|(_, to)| *to)
        .ok_or(WorkflowError::RoutingNotDefined { office_id })
}

/// Return-destination map: one return status per upstream role. Unknown
/// role ids are rejected by `Role::from_id` before this lookup.
pub fn return_status(return_to: Role) -> ApplicationStatus {
    match return_to {
        Role::TechnicalStaff => ApplicationStatus::ReturnToTechnicalStaff,
        Role::CenroChief => ApplicationStatus::ReturnToCenroChief,
        Role::ChiefRps => ApplicationStatus::ReturnToRpsChief,
        Role::ChiefTsd => ApplicationStatus::ReturnToTsdChief,
        Role::Penro => ApplicationStatus::ReturnToPenro,
        Role::Fus => ApplicationStatus::ReturnToFus,
        Role::ArdTs => ApplicationStatus::ReturnToArdTs,
        Role::Red => ApplicationStatus::ReturnToRed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cenro_routes_to_own_penro() {
        assert_eq!(
            next_office(offices::CENRO_STA_CRUZ).unwrap(),
            offices::PENRO_LAGUNA
        );
        assert_eq!(
            next_office(offices::CENRO_LIPA).unwrap(),
            offices::PENRO_BATANGAS
        );
        assert_eq!(
            next_office(offices::CENRO_CALACA).unwrap(),
            offices::PENRO_BATANGAS
        );
        for cenro in [
            offices::CENRO_CALAUAG,
            offices::CENRO_CATANAUAN,
            offices::CENRO_TAYABAS,
            offices::CENRO_REAL,
        ] {
            assert_eq!(next_office(cenro).unwrap(), offices::PENRO_QUEZON);
        }
    }

    #[test]
    fn test_penro_routes_to_regional_office() {
        for penro in [
            offices::PENRO_LAGUNA,
            offices::PENRO_BATANGAS,
            offices::PENRO_QUEZON,
        ] {
            assert_eq!(next_office(penro).unwrap(), offices::REGIONAL_OFFICE);
        }
    }

    #[test]
    fn test_regional_office_routes_to_itself() {
        assert_eq!(
            next_office(offices::REGIONAL_OFFICE).unwrap(),
            offices::REGIONAL_OFFICE
        );
    }

    #[test]
    fn test_unmapped_office_fails() {
        assert!(matches!(
            next_office(99),
            Err(WorkflowError::RoutingNotDefined { office_id: 99 })
        ));
    }

    #[test]
    fn test_return_status_per_role() {
        assert_eq!(
            return_status(Role::ChiefRps),
            ApplicationStatus::ReturnToRpsChief
        );
        assert_eq!(
            return_status(Role::TechnicalStaff),
            ApplicationStatus::ReturnToTechnicalStaff
        );
        assert_eq!(return_status(Role::Red), ApplicationStatus::ReturnToRed);
    }

    #[test]
    fn test_return_statuses_are_distinct() {
        let roles = [
            Role::TechnicalStaff,
            Role::CenroChief,
            Role::Penro,
            Role::Fus,
            Role::ArdTs,
            Role::Red,
            Role::ChiefRps,
            Role::ChiefTsd,
        ];
        let mut codes: Vec<i32> = roles.iter().map(|r| return_status(*r).code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), roles.len());
    }
}
