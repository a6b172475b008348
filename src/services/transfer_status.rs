use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::errors::ServiceError;

/// Lifecycle of a transfer order.
///
/// `Received`, `ReceivedWithIssue` and `Canceled` are terminal: once one of
/// them is reached no further mutation is permitted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Drafted,
    Approved,
    Shipped,
    Received,
    ReceivedWithIssue,
    Canceled,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Received | TransferStatus::ReceivedWithIssue | TransferStatus::Canceled
        )
    }

    /// Parses a persisted status string, rejecting unknown values.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        Self::from_str(raw)
            .map_err(|_| ServiceError::InvalidStatus(format!("unknown transfer status: {}", raw)))
    }
}

/// Per-line status, mirroring a subset of the parent order lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferItemStatus {
    Pending,
    OnProgress,
    Shipped,
    Received,
    ReceivedWithIssue,
    Canceled,
}

/// Requested transition on an existing order. `create` is not listed because
/// it has no pre-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransferAction {
    Update,
    Approve,
    Cancel,
    Ship,
    Receive,
}

/// Which of the two parties must be acting for a transition to be legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRole {
    Source,
    Destination,
}

/// Explicit `(current status, action) -> (required role, next status)` table.
///
/// `None` means the transition is illegal from that status. For `Receive` the
/// returned target is `Received`; the handler substitutes
/// `ReceivedWithIssue` when the receiver reports a discrepancy.
pub fn transition(
    current: TransferStatus,
    action: TransferAction,
) -> Option<(StoreRole, TransferStatus)> {
    use TransferAction::*;
    use TransferStatus::*;

    match (current, action) {
        (Drafted, Update) => Some((StoreRole::Source, Drafted)),
        (Approved, Update) => Some((StoreRole::Destination, Approved)),
        (Drafted, Approve) => Some((StoreRole::Source, Approved)),
        (Drafted, Cancel) | (Approved, Cancel) => Some((StoreRole::Source, Canceled)),
        (Approved, Ship) => Some((StoreRole::Source, Shipped)),
        (Shipped, Receive) => Some((StoreRole::Destination, Received)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TransferStatus::Drafted,
            TransferStatus::Approved,
            TransferStatus::Shipped,
            TransferStatus::Received,
            TransferStatus::ReceivedWithIssue,
            TransferStatus::Canceled,
        ] {
            let raw = status.to_string();
            assert_eq!(TransferStatus::parse(&raw).unwrap(), status);
        }
        assert_eq!(
            TransferStatus::ReceivedWithIssue.to_string(),
            "received_with_issue"
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(TransferStatus::parse("delivered").is_err());
    }

    #[test_case(TransferStatus::Drafted, TransferAction::Approve, StoreRole::Source, TransferStatus::Approved)]
    #[test_case(TransferStatus::Drafted, TransferAction::Update, StoreRole::Source, TransferStatus::Drafted)]
    #[test_case(TransferStatus::Approved, TransferAction::Update, StoreRole::Destination, TransferStatus::Approved)]
    #[test_case(TransferStatus::Approved, TransferAction::Ship, StoreRole::Source, TransferStatus::Shipped)]
    #[test_case(TransferStatus::Shipped, TransferAction::Receive, StoreRole::Destination, TransferStatus::Received)]
    #[test_case(TransferStatus::Drafted, TransferAction::Cancel, StoreRole::Source, TransferStatus::Canceled)]
    #[test_case(TransferStatus::Approved, TransferAction::Cancel, StoreRole::Source, TransferStatus::Canceled)]
    fn legal_transitions(
        from: TransferStatus,
        action: TransferAction,
        role: StoreRole,
        to: TransferStatus,
    ) {
        assert_eq!(transition(from, action), Some((role, to)));
    }

    #[test_case(TransferStatus::Drafted, TransferAction::Ship)]
    #[test_case(TransferStatus::Drafted, TransferAction::Receive)]
    #[test_case(TransferStatus::Approved, TransferAction::Approve)]
    #[test_case(TransferStatus::Shipped, TransferAction::Cancel)]
    #[test_case(TransferStatus::Shipped, TransferAction::Ship)]
    #[test_case(TransferStatus::Received, TransferAction::Receive)]
    #[test_case(TransferStatus::ReceivedWithIssue, TransferAction::Update)]
    #[test_case(TransferStatus::Canceled, TransferAction::Approve)]
    fn illegal_transitions(from: TransferStatus, action: TransferAction) {
        assert_eq!(transition(from, action), None);
    }

    #[test]
    fn terminal_states_admit_no_action() {
        for status in [
            TransferStatus::Received,
            TransferStatus::ReceivedWithIssue,
            TransferStatus::Canceled,
        ] {
            assert!(status.is_terminal());
            for action in [
                TransferAction::Update,
                TransferAction::Approve,
                TransferAction::Cancel,
                TransferAction::Ship,
                TransferAction::Receive,
            ] {
                assert_eq!(transition(status, action), None);
            }
        }
    }
}
