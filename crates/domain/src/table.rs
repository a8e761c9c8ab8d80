//! Dining tables and reservations.

use chrono::{DateTime, Duration, Utc};
use common::{OrderId, RestaurantId, TableId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Aggregate, DomainEvent, EventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
    Cleaning,
    OutOfOrder,
}

impl TableStatus {
    pub const ALL: [TableStatus; 5] = [
        TableStatus::Available,
        TableStatus::Occupied,
        TableStatus::Reserved,
        TableStatus::Cleaning,
        TableStatus::OutOfOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "available",
            TableStatus::Occupied => "occupied",
            TableStatus::Reserved => "reserved",
            TableStatus::Cleaning => "cleaning",
            TableStatus::OutOfOrder => "out_of_order",
        }
    }
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How long a table is held for a late party.
pub const RESERVATION_HOLD_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub guest_name: String,
    pub party_size: u32,
    pub reserved_for: DateTime<Utc>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Reservation {
    /// The hold window after `reserved_for` has passed.
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.reserved_for + Duration::minutes(RESERVATION_HOLD_MINUTES) <= now
    }

    /// Close enough to its time that seating a party consumes it.
    fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.reserved_for <= now + Duration::minutes(RESERVATION_HOLD_MINUTES)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Table {number} is {status}")]
    Unavailable { number: u32, status: TableStatus },

    #[error("Table {number} is occupied by an open order")]
    Occupied { number: u32 },

    #[error("Tables become occupied only through a dine-in order")]
    ManualOccupy,

    #[error("Invalid party size {party_size} for table of {capacity}")]
    InvalidPartySize { party_size: u32, capacity: u32 },

    #[error("Reservation for {reserved_for} has already lapsed")]
    ReservationLapsed { reserved_for: DateTime<Utc> },
}

/// A dining table.
///
/// Invariant: `occupied` if and only if `current_order` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    id: TableId,
    restaurant_id: RestaurantId,
    number: u32,
    name: String,
    capacity: u32,
    location: Option<String>,
    status: TableStatus,
    current_order: Option<OrderId>,
    reservations: Vec<Reservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TableEvent {
    TableStatusChanged(TableStatusChangedData),
}

/// Absolute table state after the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStatusChangedData {
    pub table_id: TableId,
    pub table_number: u32,
    /// `None` when the table was just added.
    pub from: Option<TableStatus>,
    pub to: TableStatus,
    pub current_order: Option<OrderId>,
    pub reservations: Vec<Reservation>,
}

impl TableEvent {
    pub fn table_id(&self) -> TableId {
        match self {
            TableEvent::TableStatusChanged(data) => data.table_id,
        }
    }

    pub fn current_order(&self) -> Option<OrderId> {
        match self {
            TableEvent::TableStatusChanged(data) => data.current_order,
        }
    }
}

impl DomainEvent for TableEvent {
    fn kind(&self) -> EventKind {
        EventKind::TableStatusChanged
    }

    fn aggregate_type(&self) -> &'static str {
        "table"
    }

    fn aggregate_id(&self) -> String {
        self.table_id().to_string()
    }
}

impl Aggregate for Table {
    type Event = TableEvent;
    type Error = TableError;

    fn aggregate_type() -> &'static str {
        "table"
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TableEvent::TableStatusChanged(data) => {
                self.status = data.to;
                self.current_order = data.current_order;
                self.reservations = data.reservations.clone();
            }
        }
    }
}

impl Table {
    /// Creates an available table and the event announcing it.
    pub fn create(
        id: TableId,
        restaurant_id: RestaurantId,
        number: u32,
        name: impl Into<String>,
        capacity: u32,
        location: Option<String>,
    ) -> (Table, TableEvent) {
        let table = Table {
            id,
            restaurant_id,
            number,
            name: name.into(),
            capacity,
            location,
            status: TableStatus::Available,
            current_order: None,
            reservations: Vec::new(),
        };
        let event = TableEvent::TableStatusChanged(TableStatusChangedData {
            table_id: id,
            table_number: number,
            from: None,
            to: TableStatus::Available,
            current_order: None,
            reservations: Vec::new(),
        });
        (table, event)
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn restaurant_id(&self) -> RestaurantId {
        self.restaurant_id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn status(&self) -> TableStatus {
        self.status
    }

    pub fn current_order(&self) -> Option<OrderId> {
        self.current_order
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Seats a dine-in order. Only available tables can be occupied.
    ///
    /// The earliest reservation that is due is taken to be the party being
    /// seated and is removed.
    pub fn occupy(
        &self,
        order_id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<Vec<TableEvent>, TableError> {
        if self.status != TableStatus::Available {
            return Err(TableError::Unavailable {
                number: self.number,
                status: self.status,
            });
        }
        let mut reservations = self.open_reservations(now);
        if reservations.first().is_some_and(|r| r.is_due(now)) {
            reservations.remove(0);
        }
        Ok(vec![self.changed_with(
            TableStatus::Occupied,
            Some(order_id),
            reservations,
        )])
    }

    /// Frees the table if `order_id` is the order seated there.
    ///
    /// Releasing for any other order is a no-op.
    pub fn release(&self, order_id: OrderId, now: DateTime<Utc>) -> Vec<TableEvent> {
        if self.current_order != Some(order_id) {
            return vec![];
        }
        vec![self.changed(TableStatus::Available, None, now)]
    }

    /// Sets the status by hand (cleaning, out of order, ...).
    ///
    /// Occupancy is owned by orders: an occupied table cannot be changed here
    /// and no table can be set to occupied here.
    pub fn set_status(
        &self,
        status: TableStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<TableEvent>, TableError> {
        if status == TableStatus::Occupied {
            return Err(TableError::ManualOccupy);
        }
        if self.status == TableStatus::Occupied {
            return Err(TableError::Occupied {
                number: self.number,
            });
        }
        if self.status == status {
            return Ok(vec![]);
        }
        Ok(vec![self.changed(status, None, now)])
    }

    /// Adds a reservation. An available table becomes reserved.
    pub fn add_reservation(
        &self,
        reservation: Reservation,
        now: DateTime<Utc>,
    ) -> Result<Vec<TableEvent>, TableError> {
        if reservation.party_size == 0 || reservation.party_size > self.capacity {
            return Err(TableError::InvalidPartySize {
                party_size: reservation.party_size,
                capacity: self.capacity,
            });
        }
        if reservation.has_lapsed(now) {
            return Err(TableError::ReservationLapsed {
                reserved_for: reservation.reserved_for,
            });
        }

        let status = match self.status {
            TableStatus::Available => TableStatus::Reserved,
            other => other,
        };
        let mut reservations = self.open_reservations(now);
        reservations.push(reservation);
        reservations.sort_by_key(|r| r.reserved_for);

        Ok(vec![TableEvent::TableStatusChanged(
            TableStatusChangedData {
                table_id: self.id,
                table_number: self.number,
                from: Some(self.status),
                to: status,
                current_order: self.current_order,
                reservations,
            },
        )])
    }

    /// Reservations still within their hold window, earliest first.
    fn open_reservations(&self, now: DateTime<Utc>) -> Vec<Reservation> {
        self.reservations
            .iter()
            .filter(|r| !r.has_lapsed(now))
            .cloned()
            .collect()
    }

    fn changed(
        &self,
        to: TableStatus,
        current_order: Option<OrderId>,
        now: DateTime<Utc>,
    ) -> TableEvent {
        self.changed_with(to, current_order, self.open_reservations(now))
    }

    fn changed_with(
        &self,
        to: TableStatus,
        current_order: Option<OrderId>,
        reservations: Vec<Reservation>,
    ) -> TableEvent {
        TableEvent::TableStatusChanged(TableStatusChangedData {
            table_id: self.id,
            table_number: self.number,
            from: Some(self.status),
            to,
            current_order,
            reservations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::create(TableId::new(), RestaurantId::new(), 5, "T5", 4, None).0
    }

    fn reservation(party_size: u32) -> Reservation {
        Reservation {
            guest_name: "Ada".into(),
            party_size,
            reserved_for: Utc::now(),
            phone: None,
        }
    }

    #[test]
    fn test_occupy_and_release() {
        let mut table = table();
        let order_id = OrderId::new();

        let events = table.occupy(order_id, Utc::now()).unwrap();
        table.apply_events(&events);
        assert_eq!(table.status(), TableStatus::Occupied);
        assert_eq!(table.current_order(), Some(order_id));

        assert!(table.release(OrderId::new(), Utc::now()).is_empty());

        let events = table.release(order_id, Utc::now());
        table.apply_events(&events);
        assert_eq!(table.status(), TableStatus::Available);
        assert_eq!(table.current_order(), None);
    }

    #[test]
    fn test_only_available_tables_can_be_occupied() {
        let mut table = table();
        let events = table.set_status(TableStatus::Cleaning, Utc::now()).unwrap();
        table.apply_events(&events);

        assert_eq!(
            table.occupy(OrderId::new(), Utc::now()),
            Err(TableError::Unavailable {
                number: 5,
                status: TableStatus::Cleaning
            })
        );
    }

    #[test]
    fn test_manual_status_cannot_touch_occupancy() {
        let mut table = table();
        assert_eq!(
            table.set_status(TableStatus::Occupied, Utc::now()),
            Err(TableError::ManualOccupy)
        );

        let events = table.occupy(OrderId::new(), Utc::now()).unwrap();
        table.apply_events(&events);
        assert_eq!(
            table.set_status(TableStatus::Available, Utc::now()),
            Err(TableError::Occupied { number: 5 })
        );
    }

    #[test]
    fn test_reservation_marks_table_reserved() {
        let mut table = table();
        let events = table.add_reservation(reservation(2), Utc::now()).unwrap();
        table.apply_events(&events);

        assert_eq!(table.status(), TableStatus::Reserved);
        assert_eq!(table.reservations().len(), 1);

        assert!(matches!(
            table.add_reservation(reservation(9), Utc::now()),
            Err(TableError::InvalidPartySize { .. })
        ));
        assert!(matches!(
            table.add_reservation(reservation(0), Utc::now()),
            Err(TableError::InvalidPartySize { .. })
        ));
    }

    fn reservation_at(reserved_for: DateTime<Utc>) -> Reservation {
        Reservation {
            reserved_for,
            ..reservation(2)
        }
    }

    #[test]
    fn test_lapsed_reservations_are_dropped() {
        let now = Utc::now();
        let mut table = table();
        let events = table
            .add_reservation(reservation_at(now - Duration::minutes(10)), now)
            .unwrap();
        table.apply_events(&events);

        // An hour later the first party is long past its hold
        let later = reservation_at(now + Duration::hours(3));
        let events = table
            .add_reservation(later.clone(), now + Duration::hours(1))
            .unwrap();
        table.apply_events(&events);
        assert_eq!(table.reservations(), std::slice::from_ref(&later));

        assert!(matches!(
            table.add_reservation(reservation_at(now - Duration::hours(1)), now),
            Err(TableError::ReservationLapsed { .. })
        ));
    }

    #[test]
    fn test_seating_consumes_the_due_reservation() {
        let now = Utc::now();
        let mut table = table();
        let dinner = reservation_at(now + Duration::hours(4));
        for r in [reservation_at(now + Duration::minutes(10)), dinner.clone()] {
            let events = table.add_reservation(r, now).unwrap();
            table.apply_events(&events);
        }
        let events = table.set_status(TableStatus::Available, now).unwrap();
        table.apply_events(&events);

        let events = table.occupy(OrderId::new(), now).unwrap();
        table.apply_events(&events);
        assert_eq!(table.reservations(), std::slice::from_ref(&dinner));

        // Releasing does not bring the seated party back
        let order_id = table.current_order().unwrap();
        let events = table.release(order_id, now + Duration::hours(1));
        table.apply_events(&events);
        assert_eq!(table.reservations(), std::slice::from_ref(&dinner));
    }

    #[test]
    fn test_status_event_is_absolute() {
        let table = table();
        let events = table.occupy(OrderId::new(), Utc::now()).unwrap();
        let json = serde_json::to_value(&events[0]).unwrap();

        assert_eq!(json["kind"], "table_status_changed");
        assert_eq!(json["data"]["from"], "available");
        assert_eq!(json["data"]["to"], "occupied");
        assert_eq!(json["data"]["table_number"], 5);
    }
}
