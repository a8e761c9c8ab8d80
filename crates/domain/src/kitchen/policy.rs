use crate::Order;

use super::Priority;

/// Decides the initial priority of a kitchen ticket.
pub trait PriorityPolicy: Send + Sync {
    fn priority(&self, order: &Order) -> Priority;
}

/// `High` for flagged orders, VIP guests and large parties; `Normal` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct PartySizePolicy {
    pub large_party_size: u32,
}

impl PartySizePolicy {
    pub fn new(large_party_size: u32) -> Self {
        Self { large_party_size }
    }
}

impl Default for PartySizePolicy {
    fn default() -> Self {
        Self::new(8)
    }
}

impl PriorityPolicy for PartySizePolicy {
    fn priority(&self, order: &Order) -> Priority {
        let customer = order.customer();
        let large_party = customer
            .party_size
            .is_some_and(|size| size >= self.large_party_size);

        if order.high_priority() || customer.vip || large_party {
            Priority::High
        } else {
            Priority::Normal
        }
    }
}
