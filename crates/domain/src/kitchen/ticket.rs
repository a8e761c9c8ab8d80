//! Kitchen ticket aggregate.

use chrono::{DateTime, Duration, Utc};
use common::{KotId, MenuItemId, OrderId, RestaurantId};
use serde::{Deserialize, Serialize};

use crate::{Aggregate, Order};

use super::{
    KitchenError, KitchenEvent, KotCompletedData, KotCreatedData, KotLineStatusChangedData,
    LineStatus, Priority,
};

/// One preparable line of a ticket, mapped to one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketLine {
    /// Index of the order line this ticket line prepares.
    pub line_index: usize,
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: u32,
    pub station: String,
    pub preparation_minutes: u32,
    #[serde(default)]
    pub special_instructions: Option<String>,
    pub status: LineStatus,
}

/// Kitchen order ticket derived from a confirmed order.
///
/// Lines are grouped by station. The order id and number are denormalized so
/// the kitchen display never needs the order itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenTicket {
    id: KotId,
    kot_number: String,
    restaurant_id: RestaurantId,
    order_id: OrderId,
    order_number: String,
    table_number: Option<u32>,
    priority: Priority,
    lines: Vec<TicketLine>,
    created_at: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
    completed_time: Option<DateTime<Utc>>,
    estimated_completion_time: DateTime<Utc>,
}

impl Aggregate for KitchenTicket {
    type Event = KitchenEvent;
    type Error = KitchenError;

    fn aggregate_type() -> &'static str {
        "kot"
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            KitchenEvent::KotCreated(data) => *self = data.ticket.clone(),
            KitchenEvent::KotLineStatusChanged(data) => {
                if let Some(line) = self
                    .lines
                    .iter_mut()
                    .find(|line| line.line_index == data.line_index)
                {
                    line.status = data.to;
                }
                if data.to == LineStatus::Preparing && self.start_time.is_none() {
                    self.start_time = Some(data.changed_at);
                }
            }
            KitchenEvent::KotCompleted(data) => {
                self.completed_time = Some(data.completed_at);
            }
        }
    }
}

// Query methods
impl KitchenTicket {
    pub fn id(&self) -> KotId {
        self.id
    }

    pub fn kot_number(&self) -> &str {
        &self.kot_number
    }

    pub fn restaurant_id(&self) -> RestaurantId {
        self.restaurant_id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn table_number(&self) -> Option<u32> {
        self.table_number
    }

    /// Priority assigned at creation.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn lines(&self) -> &[TicketLine] {
        &self.lines
    }

    /// Returns the ticket line preparing order line `line_index`.
    pub fn line(&self, line_index: usize) -> Option<&TicketLine> {
        self.lines.iter().find(|line| line.line_index == line_index)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn completed_time(&self) -> Option<DateTime<Utc>> {
        self.completed_time
    }

    pub fn estimated_completion_time(&self) -> DateTime<Utc> {
        self.estimated_completion_time
    }

    /// Returns true when every line is ready or served.
    pub fn is_complete(&self) -> bool {
        self.lines.iter().all(|line| line.status.is_done())
    }

    /// Returns true once any line has left `pending`.
    pub fn has_started(&self) -> bool {
        self.lines
            .iter()
            .any(|line| line.status != LineStatus::Pending)
    }

    /// Returns true if the kitchen is past its estimate and not done.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_complete() && now > self.estimated_completion_time
    }

    /// Priority after wait-based escalation.
    ///
    /// An open ticket gains one level for every `escalate_after` it has waited.
    pub fn effective_priority(&self, now: DateTime<Utc>, escalate_after: Duration) -> Priority {
        if self.is_complete() || escalate_after <= Duration::zero() {
            return self.priority;
        }
        let waited = now - self.created_at;
        let steps = waited.num_seconds().max(0) / escalate_after.num_seconds().max(1);

        let mut priority = self.priority;
        for _ in 0..steps.min(2) {
            priority = priority.escalate();
        }
        priority
    }
}

// Command methods (return events)
impl KitchenTicket {
    /// Derives the ticket for a confirmed order.
    ///
    /// Lines are sorted by station, keeping order-line order within a station.
    pub fn generate(
        id: KotId,
        kot_number: impl Into<String>,
        order: &Order,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> (KitchenTicket, KitchenEvent) {
        let mut lines: Vec<TicketLine> = order
            .items()
            .iter()
            .enumerate()
            .map(|(line_index, item)| TicketLine {
                line_index,
                menu_item_id: item.menu_item_id.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                station: item.station.clone(),
                preparation_minutes: item.preparation_minutes,
                special_instructions: item.special_instructions.clone(),
                status: LineStatus::Pending,
            })
            .collect();
        lines.sort_by(|a, b| {
            a.station
                .cmp(&b.station)
                .then(a.line_index.cmp(&b.line_index))
        });

        let longest = lines
            .iter()
            .map(|line| line.preparation_minutes.saturating_mul(line.quantity))
            .max()
            .unwrap_or(0);

        let ticket = KitchenTicket {
            id,
            kot_number: kot_number.into(),
            restaurant_id: order.restaurant_id(),
            order_id: order.id(),
            order_number: order.order_number().to_string(),
            table_number: order.table_number(),
            priority,
            lines,
            created_at: now,
            start_time: None,
            completed_time: None,
            estimated_completion_time: now + Duration::minutes(i64::from(longest)),
        };

        let event = KitchenEvent::KotCreated(KotCreatedData {
            ticket: ticket.clone(),
        });
        (ticket, event)
    }

    /// Moves one line a single step forward.
    ///
    /// Emits `KotCompleted` after the line change when it closes the last open line.
    pub fn update_line(
        &self,
        line_index: usize,
        to: LineStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<KitchenEvent>, KitchenError> {
        let line = self
            .line(line_index)
            .ok_or(KitchenError::LineNotFound { line_index })?;

        if !line.status.can_advance_to(to) {
            return Err(KitchenError::InvalidLineTransition {
                line_index,
                from: line.status,
                to,
            });
        }

        let changed = KitchenEvent::KotLineStatusChanged(KotLineStatusChangedData {
            kot_id: self.id,
            kot_number: self.kot_number.clone(),
            order_id: self.order_id,
            line_index,
            from: line.status,
            to,
            changed_at: now,
        });

        let mut after = self.clone();
        after.apply(&changed);

        let mut events = vec![changed];
        if self.completed_time.is_none() && after.is_complete() {
            events.push(KitchenEvent::KotCompleted(KotCompletedData {
                kot_id: self.id,
                kot_number: self.kot_number.clone(),
                order_id: self.order_id,
                completed_at: now,
            }));
        }
        Ok(events)
    }

    /// Walks every open line to `ready`, one step per event.
    ///
    /// Returns no events if the ticket is already complete.
    pub fn complete_all(&self, now: DateTime<Utc>) -> Vec<KitchenEvent> {
        let mut draft = self.clone();
        let mut events = Vec::new();

        let indexes: Vec<usize> = self.lines.iter().map(|line| line.line_index).collect();
        for line_index in indexes {
            while let Some(status) = draft.line(line_index).map(|line| line.status)
                && !status.is_done()
            {
                let Some(next) = status.next() else { break };
                let Ok(step) = draft.update_line(line_index, next, now) else {
                    break;
                };
                draft.apply_events(&step);
                events.extend(step);
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CustomerSnapshot, Money, NewOrder, OrderItem, OrderType, PartySizePolicy,
        PriorityPolicy,
    };
    use common::{TableId, UserId};

    fn order_with(items: Vec<OrderItem>) -> Order {
        Order::place(
            NewOrder {
                id: OrderId::new(),
                restaurant_id: RestaurantId::new(),
                order_number: "20250101-0007".into(),
                order_type: OrderType::DineIn,
                table_id: Some(TableId::new()),
                table_number: Some(5),
                customer: CustomerSnapshot::default(),
                waiter_id: UserId::new("waiter-1"),
                items,
                notes: None,
                high_priority: false,
                payment_method: None,
                tax_rate_bps: 0,
            },
            Utc::now(),
        )
        .unwrap()
        .0
    }

    fn burger_and_drink() -> Order {
        order_with(vec![
            OrderItem::new("burger", "Burger", "grill", Money::from_cents(800), 2)
                .with_preparation_minutes(10),
            OrderItem::new("lemonade", "Lemonade", "bar", Money::from_cents(300), 1)
                .with_preparation_minutes(2),
        ])
    }

    fn ticket_for(order: &Order) -> KitchenTicket {
        KitchenTicket::generate(KotId::new(), "K-20250101-0001", order, Priority::Normal, Utc::now())
            .0
    }

    fn advance(ticket: &mut KitchenTicket, line_index: usize, to: LineStatus) -> Vec<KitchenEvent> {
        let events = ticket.update_line(line_index, to, Utc::now()).unwrap();
        ticket.apply_events(&events);
        events
    }

    #[test]
    fn test_generate_groups_by_station() {
        let order = burger_and_drink();
        let now = Utc::now();
        let (ticket, event) =
            KitchenTicket::generate(KotId::new(), "K-20250101-0001", &order, Priority::High, now);

        assert_eq!(ticket.order_id(), order.id());
        assert_eq!(ticket.order_number(), "20250101-0007");
        assert_eq!(ticket.table_number(), Some(5));
        assert_eq!(ticket.priority(), Priority::High);
        let stations: Vec<_> = ticket.lines().iter().map(|l| l.station.as_str()).collect();
        assert_eq!(stations, vec!["bar", "grill"]);
        assert_eq!(ticket.lines()[1].line_index, 0);
        assert_eq!(ticket.lines()[1].quantity, 2);
        assert_eq!(ticket.estimated_completion_time(), now + Duration::minutes(20));
        assert!(matches!(event, KitchenEvent::KotCreated(_)));
        assert!(!ticket.has_started());
    }

    #[test]
    fn test_first_preparing_stamps_start_time() {
        let order = burger_and_drink();
        let mut ticket = ticket_for(&order);

        let events = advance(&mut ticket, 0, LineStatus::Preparing);
        assert_eq!(events.len(), 1);
        assert!(ticket.start_time().is_some());
        assert!(ticket.has_started());

        let started = ticket.start_time();
        advance(&mut ticket, 1, LineStatus::Preparing);
        assert_eq!(ticket.start_time(), started);
    }

    #[test]
    fn test_skipping_is_rejected() {
        let order = burger_and_drink();
        let ticket = ticket_for(&order);

        let result = ticket.update_line(0, LineStatus::Ready, Utc::now());
        assert_eq!(
            result,
            Err(KitchenError::InvalidLineTransition {
                line_index: 0,
                from: LineStatus::Pending,
                to: LineStatus::Ready,
            })
        );
        assert_eq!(
            ticket.update_line(7, LineStatus::Preparing, Utc::now()),
            Err(KitchenError::LineNotFound { line_index: 7 })
        );
    }

    #[test]
    fn test_lines_never_regress() {
        let order = burger_and_drink();
        let mut ticket = ticket_for(&order);
        advance(&mut ticket, 0, LineStatus::Preparing);
        advance(&mut ticket, 0, LineStatus::Ready);

        assert!(
            ticket
                .update_line(0, LineStatus::Pending, Utc::now())
                .is_err()
        );
        assert!(
            ticket
                .update_line(0, LineStatus::Preparing, Utc::now())
                .is_err()
        );
    }

    #[test]
    fn test_last_ready_line_completes_once() {
        let order = burger_and_drink();
        let mut ticket = ticket_for(&order);

        advance(&mut ticket, 0, LineStatus::Preparing);
        advance(&mut ticket, 1, LineStatus::Preparing);
        let events = advance(&mut ticket, 0, LineStatus::Ready);
        assert_eq!(events.len(), 1);
        assert!(!ticket.is_complete());

        let events = advance(&mut ticket, 1, LineStatus::Ready);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], KitchenEvent::KotCompleted(_)));
        assert!(ticket.is_complete());
        assert!(ticket.completed_time().is_some());

        // Serving afterwards does not complete the ticket again
        let events = advance(&mut ticket, 1, LineStatus::Served);
        assert_eq!(events.len(), 1);
        assert!(ticket.is_complete());
    }

    #[test]
    fn test_complete_all_walks_each_step() {
        let order = burger_and_drink();
        let mut ticket = ticket_for(&order);
        advance(&mut ticket, 1, LineStatus::Preparing);

        let events = ticket.complete_all(Utc::now());
        // bar line 1: preparing→ready; grill line 0: pending→preparing→ready; then completed
        assert_eq!(events.len(), 4);
        assert!(matches!(events.last(), Some(KitchenEvent::KotCompleted(_))));

        ticket.apply_events(&events);
        assert!(ticket.is_complete());
        assert!(ticket.complete_all(Utc::now()).is_empty());
    }

    #[test]
    fn test_overdue_and_escalation() {
        let order = burger_and_drink();
        let now = Utc::now();
        let (mut ticket, _) =
            KitchenTicket::generate(KotId::new(), "K-20250101-0001", &order, Priority::Low, now);

        assert!(!ticket.is_overdue(now));
        assert!(ticket.is_overdue(now + Duration::minutes(21)));

        let escalate_after = Duration::minutes(20);
        assert_eq!(ticket.effective_priority(now, escalate_after), Priority::Low);
        assert_eq!(
            ticket.effective_priority(now + Duration::minutes(20), escalate_after),
            Priority::Normal
        );
        assert_eq!(
            ticket.effective_priority(now + Duration::minutes(90), escalate_after),
            Priority::High
        );

        let events = ticket.complete_all(now);
        ticket.apply_events(&events);
        assert!(!ticket.is_overdue(now + Duration::minutes(60)));
        assert_eq!(
            ticket.effective_priority(now + Duration::minutes(90), escalate_after),
            Priority::Low
        );
    }

    #[test]
    fn test_party_size_policy() {
        let policy = PartySizePolicy::default();
        let mut order = burger_and_drink();
        assert_eq!(policy.priority(&order), Priority::Normal);

        let mut new = NewOrder {
            id: OrderId::new(),
            restaurant_id: order.restaurant_id(),
            order_number: "20250101-0008".into(),
            order_type: OrderType::Takeaway,
            table_id: None,
            table_number: None,
            customer: CustomerSnapshot {
                party_size: Some(8),
                ..Default::default()
            },
            waiter_id: UserId::new("waiter-1"),
            items: order.items().to_vec(),
            notes: None,
            high_priority: false,
            payment_method: None,
            tax_rate_bps: 0,
        };
        order = Order::place(new.clone(), Utc::now()).unwrap().0;
        assert_eq!(policy.priority(&order), Priority::High);

        new.customer = CustomerSnapshot {
            vip: true,
            ..Default::default()
        };
        order = Order::place(new.clone(), Utc::now()).unwrap().0;
        assert_eq!(policy.priority(&order), Priority::High);

        new.customer = CustomerSnapshot::default();
        new.high_priority = true;
        order = Order::place(new, Utc::now()).unwrap().0;
        assert_eq!(policy.priority(&order), Priority::High);

        assert_eq!(
            PartySizePolicy::new(12).priority(&burger_and_drink()),
            Priority::Normal
        );
    }
}
