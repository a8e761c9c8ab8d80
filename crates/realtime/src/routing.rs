//! Static routing of event kinds to roles.

use common::Role;
use domain::EventKind;

/// Returns whether events of `kind` are delivered to subscribers in `role`.
///
/// Per-order filtering is applied separately by the gateway.
pub fn routes_to(kind: EventKind, role: Role) -> bool {
    use EventKind::*;

    match role {
        Role::Admin | Role::Manager => true,
        Role::KitchenStaff => matches!(
            kind,
            KotCreated | KotLineStatusChanged | KotCompleted | OrderStatusChanged
        ),
        Role::Waiter => matches!(
            kind,
            OrderCreated | OrderStatusChanged | OrderItemsChanged | TableStatusChanged | KotCompleted
        ),
        Role::Cashier => matches!(
            kind,
            OrderCreated | OrderStatusChanged | OrderItemsChanged | PaymentStatusChanged
        ),
        // Always narrowed to the one order the customer follows
        Role::Customer => matches!(
            kind,
            OrderCreated | OrderStatusChanged | OrderItemsChanged | PaymentStatusChanged
        ),
    }
}
