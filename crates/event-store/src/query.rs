use crate::{RestaurantId, Sequence};

/// Filter over one restaurant's journal.
///
/// Results are always ordered by ascending sequence.
#[derive(Debug, Clone)]
pub struct EventQuery {
    /// Restaurant whose stream is read. Journals are never read across restaurants.
    pub restaurant_id: RestaurantId,

    /// Only events strictly after this sequence.
    pub after: Option<Sequence>,

    /// Only events of these types (any of them).
    pub event_types: Option<Vec<String>>,

    /// Only events about this aggregate.
    pub aggregate_id: Option<String>,

    /// Maximum number of events to return.
    pub limit: Option<usize>,
}

impl EventQuery {
    /// Creates a query returning the whole stream of a restaurant.
    pub fn for_restaurant(restaurant_id: RestaurantId) -> Self {
        Self {
            restaurant_id,
            after: None,
            event_types: None,
            aggregate_id: None,
            limit: None,
        }
    }

    /// Only returns events published after `sequence`.
    pub fn after(mut self, sequence: Sequence) -> Self {
        self.after = Some(sequence);
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types = Some(vec![event_type.into()]);
        self
    }

    pub fn event_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    pub fn aggregate_id(mut self, id: impl ToString) -> Self {
        self.aggregate_id = Some(id.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
