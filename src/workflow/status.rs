//! Status registry
//!
//! One canonical numbering for the application lifecycle. Codes are stored
//! as plain integers in the database; unknown codes label as
//! "Unknown Status" so reporting stays usable if the schema drifts.

use serde::Serialize;

/// Application lifecycle states.
///
/// Codes 1-24 follow the status table of the permitting division; 25 was
/// added so the ARD-TS endorsement to the Regional Executive Director has
/// its own code (the table already carried received- and return-codes for
/// the RED but no endorsed-code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum ApplicationStatus {
    Draft = 1,
    ForReviewEvaluation = 2,
    EndorsedToCenroChief = 3,
    EndorsedToRpsChief = 4,
    EndorsedToTsdChief = 5,
    EndorsedToPenro = 6,
    EndorsedToFus = 7,
    EndorsedToArdTs = 8,
    ApprovedByRed = 9,
    ReceivedByCenroChief = 10,
    ReceivedByRpsChief = 11,
    ReceivedByTsdChief = 12,
    ReceivedByPenro = 13,
    ReceivedByFus = 14,
    ReceivedByArdTs = 15,
    ReceivedByRed = 16,
    ReturnToCenroChief = 17,
    ReturnToRpsChief = 18,
    ReturnToTsdChief = 19,
    ReturnToPenro = 20,
    ReturnToFus = 21,
    ReturnToArdTs = 22,
    ReturnToRed = 23,
    ReturnToTechnicalStaff = 24,
    EndorsedToRed = 25,
}

/// Status families, used for reporting and transition guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFamily {
    Forward,
    Return,
    Terminal,
}

/// The forward approval chain in order. Codes 3/10 (CENRO Chief) exist in
/// the registry but are not on the active chain.
pub const FORWARD_CHAIN: &[ApplicationStatus] = &[
    ApplicationStatus::Draft,
    ApplicationStatus::ForReviewEvaluation,
    ApplicationStatus::EndorsedToRpsChief,
    ApplicationStatus::ReceivedByRpsChief,
    ApplicationStatus::EndorsedToTsdChief,
    ApplicationStatus::ReceivedByTsdChief,
    ApplicationStatus::EndorsedToPenro,
    ApplicationStatus::ReceivedByPenro,
    ApplicationStatus::EndorsedToFus,
    ApplicationStatus::ReceivedByFus,
    ApplicationStatus::EndorsedToArdTs,
    ApplicationStatus::ReceivedByArdTs,
    ApplicationStatus::EndorsedToRed,
    ApplicationStatus::ApprovedByRed,
];

pub const RETURN_STATUSES: &[ApplicationStatus] = &[
    ApplicationStatus::ReturnToCenroChief,
    ApplicationStatus::ReturnToRpsChief,
    ApplicationStatus::ReturnToTsdChief,
    ApplicationStatus::ReturnToPenro,
    ApplicationStatus::ReturnToFus,
    ApplicationStatus::ReturnToArdTs,
    ApplicationStatus::ReturnToRed,
    ApplicationStatus::ReturnToTechnicalStaff,
];

pub const TERMINAL_STATUSES: &[ApplicationStatus] = &[ApplicationStatus::ApprovedByRed];

/// Every code in the registry, for status summaries.
pub const ALL_STATUSES: &[ApplicationStatus] = &[
    ApplicationStatus::Draft,
    ApplicationStatus::ForReviewEvaluation,
    ApplicationStatus::EndorsedToCenroChief,
    ApplicationStatus::EndorsedToRpsChief,
    ApplicationStatus::EndorsedToTsdChief,
    ApplicationStatus::EndorsedToPenro,
    ApplicationStatus::EndorsedToFus,
    ApplicationStatus::EndorsedToArdTs,
    ApplicationStatus::ApprovedByRed,
    ApplicationStatus::ReceivedByCenroChief,
    ApplicationStatus::ReceivedByRpsChief,
    ApplicationStatus::ReceivedByTsdChief,
    ApplicationStatus::ReceivedByPenro,
    ApplicationStatus::ReceivedByFus,
    ApplicationStatus::ReceivedByArdTs,
    ApplicationStatus::ReceivedByRed,
    ApplicationStatus::ReturnToCenroChief,
    ApplicationStatus::ReturnToRpsChief,
    ApplicationStatus::ReturnToTsdChief,
    ApplicationStatus::ReturnToPenro,
    ApplicationStatus::ReturnToFus,
    ApplicationStatus::ReturnToArdTs,
    ApplicationStatus::ReturnToRed,
    ApplicationStatus::ReturnToTechnicalStaff,
    ApplicationStatus::EndorsedToRed,
];

impl ApplicationStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<ApplicationStatus> {
        ALL_STATUSES.iter().copied().find(|s| s.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "Draft Application",
            ApplicationStatus::ForReviewEvaluation => "For Review / Evaluation",
            ApplicationStatus::EndorsedToCenroChief => "Endorsed to CENRO Chief",
            ApplicationStatus::EndorsedToRpsChief => "Endorsed to RPS Chief",
            ApplicationStatus::EndorsedToTsdChief => "Endorsed to Chief TSD",
            ApplicationStatus::EndorsedToPenro => "Endorsed to PENRO",
            ApplicationStatus::EndorsedToFus => "Endorsed to LPDD/FUS",
            ApplicationStatus::EndorsedToArdTs => "Endorsed to ARD TS",
            ApplicationStatus::ApprovedByRed => "Approved by RED",
            ApplicationStatus::ReceivedByCenroChief => "Received by CENRO Chief",
            ApplicationStatus::ReceivedByRpsChief => "Received by Chief RPS",
            ApplicationStatus::ReceivedByTsdChief => "Received by Chief TSD",
            ApplicationStatus::ReceivedByPenro => "Received by PENRO",
            ApplicationStatus::ReceivedByFus => "Received by LPDD/FUS",
            ApplicationStatus::ReceivedByArdTs => "Received by ARD TS",
            ApplicationStatus::ReceivedByRed => "Received by RED",
            ApplicationStatus::ReturnToCenroChief => "Return to CENRO Chief",
            ApplicationStatus::ReturnToRpsChief => "Return to RPS Chief",
            ApplicationStatus::ReturnToTsdChief => "Return to TSD Chief",
            ApplicationStatus::ReturnToPenro => "Return to PENRO",
            ApplicationStatus::ReturnToFus => "Return to LPDD/FUS",
            ApplicationStatus::ReturnToArdTs => "Return to ARD TS",
            ApplicationStatus::ReturnToRed => "Return to RED",
            ApplicationStatus::ReturnToTechnicalStaff => "Return to Technical Staff",
            ApplicationStatus::EndorsedToRed => "Endorsed to RED",
        }
    }

    pub fn family(self) -> StatusFamily {
        if RETURN_STATUSES.contains(&self) {
            StatusFamily::Return
        } else if TERMINAL_STATUSES.contains(&self) {
            StatusFamily::Terminal
        } else {
            StatusFamily::Forward
        }
    }

    pub fn is_return(self) -> bool {
        self.family() == StatusFamily::Return
    }

    pub fn is_terminal(self) -> bool {
        TERMINAL_STATUSES.contains(&self)
    }
}

/// Label for a raw status code; unknown codes do not fail.
pub fn label_for(code: i32) -> &'static str {
    ApplicationStatus::from_code(code)
        .map(ApplicationStatus::label)
        .unwrap_or("Unknown Status")
}

/// Ordered codes of one family.
pub fn family_codes(family: StatusFamily) -> &'static [ApplicationStatus] {
    match family {
        StatusFamily::Forward => FORWARD_CHAIN,
        StatusFamily::Return => RETURN_STATUSES,
        StatusFamily::Terminal => TERMINAL_STATUSES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for status in ALL_STATUSES {
            assert_eq!(ApplicationStatus::from_code(status.code()), Some(*status));
        }
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<i32> = ALL_STATUSES.iter().map(|s| s.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ALL_STATUSES.len());
    }

    #[test]
    fn test_unknown_code_labels_as_unknown() {
        assert_eq!(label_for(0), "Unknown Status");
        assert_eq!(label_for(-1), "Unknown Status");
        assert_eq!(label_for(99), "Unknown Status");
    }

    #[test]
    fn test_known_labels() {
        assert_eq!(label_for(4), "Endorsed to RPS Chief");
        assert_eq!(label_for(9), "Approved by RED");
        assert_eq!(label_for(18), "Return to RPS Chief");
    }

    #[test]
    fn test_forward_chain_starts_and_ends() {
        assert_eq!(FORWARD_CHAIN.first(), Some(&ApplicationStatus::Draft));
        assert_eq!(FORWARD_CHAIN.last(), Some(&ApplicationStatus::ApprovedByRed));
    }

    #[test]
    fn test_families_partition() {
        for status in ALL_STATUSES {
            match status.family() {
                StatusFamily::Return => assert!(RETURN_STATUSES.contains(status)),
                StatusFamily::Terminal => assert!(TERMINAL_STATUSES.contains(status)),
                StatusFamily::Forward => {
                    assert!(!RETURN_STATUSES.contains(status));
                    assert!(!TERMINAL_STATUSES.contains(status));
                }
            }
        }
    }

    #[test]
    fn test_terminal_is_approved_only() {
        assert!(ApplicationStatus::ApprovedByRed.is_terminal());
        assert!(!ApplicationStatus::ReceivedByRed.is_terminal());
        assert!(!ApplicationStatus::ReturnToRed.is_terminal());
    }
}
