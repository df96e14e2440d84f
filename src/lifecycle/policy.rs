use crate::auth::{Actor, Role};
use crate::models::order::{Order, OrderFilter, OrderStatus};

/// Internal ingestion and terminal side effects run as `System`, which
/// bypasses role checks.
#[derive(Debug, Clone, Copy)]
pub enum Authority {
    Actor(Actor),
    System,
}

impl Authority {
    pub fn describe(&self) -> String {
        match self {
            Authority::Actor(actor) => format!("{} {}", actor.role.as_str(), actor.id),
            Authority::System => "system".to_string(),
        }
    }
}

pub fn may_transition(authority: &Authority, order: &Order, to: OrderStatus) -> bool {
    match authority {
        Authority::System => true,
        Authority::Actor(actor) => match actor.role {
            Role::Operator => true,
            Role::Customer => {
                to == OrderStatus::Cancelled
                    && order.status == OrderStatus::Pending
                    && order.customer_id == Some(actor.id)
            }
            Role::Driver => false,
        },
    }
}

pub fn may_assign(authority: &Authority) -> bool {
    match authority {
        Authority::System => true,
        Authority::Actor(actor) => actor.role == Role::Operator,
    }
}

/// Gate in front of anything order-specific: an authority without standing
/// gets the same refusal a read would give it.
pub fn has_standing(authority: &Authority, order: &Order) -> bool {
    match authority {
        Authority::System => true,
        Authority::Actor(actor) => may_view(actor, order),
    }
}

pub fn may_view(actor: &Actor, order: &Order) -> bool {
    match actor.role {
        Role::Operator => true,
        Role::Customer => order.customer_id == Some(actor.id),
        Role::Driver => order.driver_id == Some(actor.id),
    }
}

/// Location reads are for the party being delivered to and for dispatch.
pub fn may_view_location(actor: &Actor, order: &Order) -> bool {
    match actor.role {
        Role::Operator => true,
        Role::Customer => order.customer_id == Some(actor.id),
        Role::Driver => false,
    }
}

pub fn may_create_direct(actor: &Actor) -> bool {
    actor.role == Role::Customer
}

pub fn may_edit_notes(actor: &Actor) -> bool {
    actor.role == Role::Operator
}

pub fn may_ingest_internal(actor: &Actor) -> bool {
    actor.role == Role::Operator
}

pub fn may_manage_fleet(actor: &Actor) -> bool {
    actor.role == Role::Operator
}

pub fn may_record_ping(actor: &Actor) -> bool {
    actor.role == Role::Driver
}

pub fn may_stream_events(actor: &Actor) -> bool {
    actor.role == Role::Operator
}

pub fn scope_filter(actor: &Actor, mut filter: OrderFilter) -> OrderFilter {
    match actor.role {
        Role::Operator => {}
        Role::Customer => {
            filter.customer_id = Some(actor.id);
            filter.driver_id = None;
        }
        Role::Driver => {
            filter.driver_id = Some(actor.id);
            filter.customer_id = None;
        }
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{Address, Order, OrderKind, Schedule};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn actor(role: Role) -> Actor {
        Actor { id: Uuid::new_v4(), role }
    }

    fn order_for(customer: Option<Uuid>, status: OrderStatus) -> Order {
        let now = Utc::now();
        let mut order = Order::new(
            OrderKind::Direct,
            customer,
            None,
            Address {
                street: "1 Quarry Rd".into(),
                city: "Gravelton".into(),
                postal_code: "21073".into(),
                site_note: None,
            },
            Address {
                street: "8 Site Way".into(),
                city: "Gravelton".into(),
                postal_code: "21079".into(),
                site_note: None,
            },
            Schedule {
                pickup_at: now + Duration::hours(1),
                delivery_at: now + Duration::hours(3),
            },
            Vec::new(),
            None,
        );
        order.status = status;
        order
    }

    #[test]
    fn customer_may_cancel_own_pending_order_only() {
        let customer = actor(Role::Customer);
        let authority = Authority::Actor(customer);
        let own = order_for(Some(customer.id), OrderStatus::Pending);
        let foreign = order_for(Some(Uuid::new_v4()), OrderStatus::Pending);
        let own_assigned = order_for(Some(customer.id), OrderStatus::Assigned);

        assert!(may_transition(&authority, &own, OrderStatus::Cancelled));
        assert!(!may_transition(&authority, &foreign, OrderStatus::Cancelled));
        assert!(!may_transition(&authority, &own_assigned, OrderStatus::Cancelled));
        assert!(!may_transition(&authority, &own, OrderStatus::Assigned));
    }

    #[test]
    fn drivers_never_change_status_directly() {
        let authority = Authority::Actor(actor(Role::Driver));
        let order = order_for(Some(Uuid::new_v4()), OrderStatus::Assigned);
        assert!(!may_transition(&authority, &order, OrderStatus::PickedUp));
        assert!(!may_transition(&authority, &order, OrderStatus::Cancelled));
    }

    #[test]
    fn operator_and_system_may_drive_any_edge() {
        let order = order_for(None, OrderStatus::InTransit);
        let operator = Authority::Actor(actor(Role::Operator));
        assert!(may_transition(&operator, &order, OrderStatus::Delivered));
        assert!(may_transition(&Authority::System, &order, OrderStatus::Failed));
    }

    #[test]
    fn visibility_follows_ownership_and_assignment() {
        let customer = actor(Role::Customer);
        let driver = actor(Role::Driver);
        let mut order = order_for(Some(customer.id), OrderStatus::Assigned);
        order.driver_id = Some(driver.id);

        assert!(may_view(&customer, &order));
        assert!(may_view(&driver, &order));
        assert!(may_view(&actor(Role::Operator), &order));
        assert!(!may_view(&actor(Role::Customer), &order));
        assert!(!may_view(&actor(Role::Driver), &order));

        assert!(may_view_location(&customer, &order));
        assert!(!may_view_location(&driver, &order));
    }

    #[test]
    fn standing_follows_view_rights() {
        let customer = actor(Role::Customer);
        let own = order_for(Some(customer.id), OrderStatus::Pending);
        let foreign = order_for(Some(Uuid::new_v4()), OrderStatus::Pending);

        assert!(has_standing(&Authority::Actor(customer), &own));
        assert!(!has_standing(&Authority::Actor(customer), &foreign));
        assert!(has_standing(&Authority::System, &foreign));
    }

    #[test]
    fn listing_scope_pins_the_actor_column() {
        let driver = actor(Role::Driver);
        let scoped = scope_filter(&driver, OrderFilter::default());
        assert_eq!(scoped.driver_id, Some(driver.id));
        assert_eq!(scoped.customer_id, None);

        let operator = actor(Role::Operator);
        let open = scope_filter(&operator, OrderFilter::default());
        assert_eq!(open.driver_id, None);
        assert_eq!(open.customer_id, None);
    }
}
