//! Booking lifecycle states and the legality table for transitions.
//!
//! These functions contain NO side effects - the store implementations
//! enforce the same rules atomically against persisted documents.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a booking.
///
/// `DiagnosisSubmitted` is a pass-through: the diagnosis transition lands
/// directly on `WaitingForUserApproval`, but the state remains legal as an
/// intermediate hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "booking_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    Created,
    Dispatching,
    VendorAssigned,
    VendorEnRoute,
    InspectionInProgress,
    DiagnosisSubmitted,
    WaitingForUserApproval,
    ServiceInProgress,
    Completed,
    Cancelled,
}

impl BookingState {
    /// Terminal states absorb: no transition ever leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingState::Completed | BookingState::Cancelled)
    }

    /// An ongoing booking blocks the customer from creating another one.
    pub fn is_ongoing(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether a transition from `self` to `next` is legal.
    pub fn can_transition_to(&self, next: BookingState) -> bool {
        use BookingState::*;

        // Cancellation is reachable from every non-terminal state
        if next == Cancelled {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Created, Dispatching)
                | (Dispatching, VendorAssigned)
                | (VendorAssigned, VendorEnRoute)
                | (VendorAssigned, InspectionInProgress)
                | (VendorEnRoute, InspectionInProgress)
                | (InspectionInProgress, DiagnosisSubmitted)
                | (InspectionInProgress, WaitingForUserApproval)
                | (DiagnosisSubmitted, WaitingForUserApproval)
                | (WaitingForUserApproval, ServiceInProgress)
                | (ServiceInProgress, Completed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::BookingState::*;
    use super::*;

    const ALL: [BookingState; 10] = [
        Created,
        Dispatching,
        VendorAssigned,
        VendorEnRoute,
        InspectionInProgress,
        DiagnosisSubmitted,
        WaitingForUserApproval,
        ServiceInProgress,
        Completed,
        Cancelled,
    ];

    #[test]
    fn test_happy_path_is_legal() {
        assert!(Created.can_transition_to(Dispatching));
        assert!(Dispatching.can_transition_to(VendorAssigned));
        assert!(VendorAssigned.can_transition_to(VendorEnRoute));
        assert!(VendorEnRoute.can_transition_to(InspectionInProgress));
        assert!(InspectionInProgress.can_transition_to(WaitingForUserApproval));
        assert!(WaitingForUserApproval.can_transition_to(ServiceInProgress));
        assert!(ServiceInProgress.can_transition_to(Completed));
    }

    #[test]
    fn test_inspection_may_skip_en_route() {
        assert!(VendorAssigned.can_transition_to(InspectionInProgress));
    }

    #[test]
    fn test_cancel_reachable_from_every_non_terminal_state() {
        for state in ALL {
            assert_eq!(
                state.can_transition_to(Cancelled),
                !state.is_terminal(),
                "cancel from {state:?}"
            );
        }
    }

    #[test]
    fn test_terminal_states_absorb() {
        for state in ALL {
            assert!(!Completed.can_transition_to(state));
            assert!(!Cancelled.can_transition_to(state));
        }
    }

    #[test]
    fn test_no_backwards_transitions() {
        assert!(!Dispatching.can_transition_to(Created));
        assert!(!VendorAssigned.can_transition_to(Dispatching));
        assert!(!ServiceInProgress.can_transition_to(WaitingForUserApproval));
        assert!(!Completed.can_transition_to(ServiceInProgress));
    }

    #[test]
    fn test_acceptance_only_from_dispatching() {
        for state in ALL {
            assert_eq!(
                state.can_transition_to(VendorAssigned),
                state == Dispatching,
                "accept from {state:?}"
            );
        }
    }

    #[test]
    fn test_ongoing_is_complement_of_terminal() {
        for state in ALL {
            assert_eq!(state.is_ongoing(), !state.is_terminal());
        }
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&WaitingForUserApproval).unwrap();
        assert_eq!(json, "\"WAITING_FOR_USER_APPROVAL\"");
    }
}
