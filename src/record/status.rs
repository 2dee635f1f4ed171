//! Status resolver: the reconciliation decision table.
//!
//! The computed state is a pure function of the destination's two status
//! signals plus person-identifier presence. Rows are evaluated in order and
//! the first match wins; anything off the table is `Unrecognized`.

use crate::record::ComputedState;

/// Resolve the reconciliation state for one application.
///
/// `origin_status` is the destination's relationship-acknowledgement signal,
/// `application_status` its intake-completeness signal.
pub fn resolve_state(
	origin_status: Option<i32>,
	application_status: Option<i32>,
	person_code: Option<&str>,
) -> ComputedState {
	let acknowledged = matches!(origin_status, Some(0) | Some(3) | Some(4));
	let person_assigned = person_code.is_some();

	if acknowledged && application_status == Some(2) && person_assigned {
		ComputedState::Active
	} else if acknowledged && application_status == Some(3) && !person_assigned {
		ComputedState::Declined
	} else if acknowledged && application_status == Some(1) && !person_assigned {
		ComputedState::Pending
	} else if origin_status == Some(1) && application_status.is_none() && !person_assigned {
		ComputedState::MissingRequiredField
	} else if origin_status == Some(2) && application_status.is_none() && !person_assigned {
		ComputedState::MissingFieldMapping
	} else {
		ComputedState::Unrecognized(origin_status.unwrap_or(-1))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn acknowledged_complete_with_person_is_active() {
		for ra in [0, 3, 4] {
			assert_eq!(
				resolve_state(Some(ra), Some(2), Some("P000000001")),
				ComputedState::Active,
				"ra {}",
				ra
			);
		}
	}

	#[test]
	fn acknowledged_rejected_without_person_is_declined() {
		for ra in [0, 3, 4] {
			assert_eq!(
				resolve_state(Some(ra), Some(3), None),
				ComputedState::Declined
			);
		}
	}

	#[test]
	fn acknowledged_incomplete_without_person_is_pending() {
		for ra in [0, 3, 4] {
			assert_eq!(resolve_state(Some(ra), Some(1), None), ComputedState::Pending);
		}
	}

	#[test]
	fn stalled_statuses_map_to_missing_conditions() {
		assert_eq!(
			resolve_state(Some(1), None, None),
			ComputedState::MissingRequiredField
		);
		assert_eq!(
			resolve_state(Some(2), None, None),
			ComputedState::MissingFieldMapping
		);
	}

	#[test]
	fn off_table_combinations_are_unrecognized() {
		// Active row but no person assigned.
		assert_eq!(
			resolve_state(Some(0), Some(2), None),
			ComputedState::Unrecognized(0)
		);
		// Declined row but person assigned.
		assert_eq!(
			resolve_state(Some(3), Some(3), Some("P000000001")),
			ComputedState::Unrecognized(3)
		);
		// Stalled row with a person already assigned.
		assert_eq!(
			resolve_state(Some(1), None, Some("P000000001")),
			ComputedState::Unrecognized(1)
		);
		// Unknown relationship status.
		assert_eq!(
			resolve_state(Some(9), Some(2), Some("P000000001")),
			ComputedState::Unrecognized(9)
		);
	}
}
