// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, info, warn};

use crate::models::{AppointmentStatus, AppointmentError};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {:?} to {:?}", current_status, new_status);

        let valid_transitions = self.get_valid_transitions(current_status);

        if !valid_transitions.contains(new_status) {
            warn!("Invalid status transition attempted: {:?} -> {:?}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition(current_status.clone()));
        }

        info!("Status transition validated: {:?} -> {:?}", current_status, new_status);
        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Rejected,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Rescheduled,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // An approved reschedule of an already-rescheduled appointment
            // lands on Rescheduled again.
            AppointmentStatus::Rescheduled => vec![
                AppointmentStatus::Rescheduled,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::Rejected => vec![],
        }
    }

    pub fn is_terminal(&self, status: &AppointmentStatus) -> bool {
        self.get_valid_transitions(status).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn pending_can_be_confirmed_rejected_or_cancelled() {
        let service = AppointmentLifecycleService::new();

        assert!(service
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Confirmed)
            .is_ok());
        assert!(service
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Rejected)
            .is_ok());
        assert!(service
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Cancelled)
            .is_ok());
    }

    #[test]
    fn pending_cannot_be_completed() {
        let service = AppointmentLifecycleService::new();

        let result = service
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Completed);
        assert_matches!(
            result,
            Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Pending))
        );
    }

    #[test]
    fn confirmed_can_move_to_rescheduled_completed_or_cancelled() {
        let service = AppointmentLifecycleService::new();

        for target in [
            AppointmentStatus::Rescheduled,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            assert!(service
                .validate_status_transition(&AppointmentStatus::Confirmed, &target)
                .is_ok());
        }
    }

    #[test]
    fn rescheduled_can_be_rescheduled_again() {
        let service = AppointmentLifecycleService::new();

        assert!(service
            .validate_status_transition(
                &AppointmentStatus::Rescheduled,
                &AppointmentStatus::Rescheduled
            )
            .is_ok());
    }

    #[test]
    fn confirmed_cannot_return_to_pending() {
        let service = AppointmentLifecycleService::new();

        let result = service
            .validate_status_transition(&AppointmentStatus::Confirmed, &AppointmentStatus::Pending);
        assert!(result.is_err());
    }

    #[test]
    fn terminal_states_allow_no_transitions() {
        let service = AppointmentLifecycleService::new();

        for terminal in [
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rejected,
        ] {
            assert!(service.is_terminal(&terminal));
            assert!(service.get_valid_transitions(&terminal).is_empty());
            assert!(service
                .validate_status_transition(&terminal, &AppointmentStatus::Confirmed)
                .is_err());
        }
    }

    #[test]
    fn live_states_are_not_terminal() {
        let service = AppointmentLifecycleService::new();

        for live in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Rescheduled,
        ] {
            assert!(!service.is_terminal(&live));
        }
    }
}
