use crate::error::AppError;
use crate::models::order::OrderStatus;

/// The delivery path moves strictly forward; `cancelled` and `failed` are
/// reachable from every non-terminal state.
pub fn allowed(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    match (from, to) {
        (Pending, Assigned) => true,
        (Assigned, PickedUp) => true,
        (PickedUp, InTransit) => true,
        (InTransit, Delivered) => true,
        (from, Cancelled | Failed) => !from.is_terminal(),
        _ => false,
    }
}

pub fn ensure_edge(from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const ALL: [OrderStatus; 7] = [
        Pending, Assigned, PickedUp, InTransit, Delivered, Cancelled, Failed,
    ];

    #[test]
    fn forward_path_edges_are_allowed() {
        assert!(allowed(Pending, Assigned));
        assert!(allowed(Assigned, PickedUp));
        assert!(allowed(PickedUp, InTransit));
        assert!(allowed(InTransit, Delivered));
    }

    #[test]
    fn no_skipping_ahead() {
        assert!(!allowed(Pending, Delivered));
        assert!(!allowed(Pending, PickedUp));
        assert!(!allowed(Pending, InTransit));
        assert!(!allowed(Assigned, InTransit));
        assert!(!allowed(Assigned, Delivered));
        assert!(!allowed(PickedUp, Delivered));
    }

    #[test]
    fn no_moving_backwards() {
        assert!(!allowed(Assigned, Pending));
        assert!(!allowed(PickedUp, Assigned));
        assert!(!allowed(InTransit, PickedUp));
        assert!(!allowed(Delivered, InTransit));
    }

    #[test]
    fn cancel_and_fail_reachable_from_every_non_terminal_state() {
        for from in [Pending, Assigned, PickedUp, InTransit] {
            assert!(allowed(from, Cancelled), "{from} -> cancelled");
            assert!(allowed(from, Failed), "{from} -> failed");
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in [Delivered, Cancelled, Failed] {
            for to in ALL {
                assert!(!allowed(from, to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn ensure_edge_reports_both_endpoints() {
        let err = ensure_edge(Delivered, Assigned).unwrap_err();
        assert_eq!(err.to_string(), "cannot transition from delivered to assigned");
        match err {
            AppError::InvalidTransition { from, to } => {
                assert_eq!(from, Delivered);
                assert_eq!(to, Assigned);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
