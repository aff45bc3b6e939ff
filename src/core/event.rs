//! Events flowing through the engine.
//!
//! An event carries an identifier, a payload, where it came from and, optionally,
//! the application it is addressed to. Identifiers live in a 28-bit user range;
//! the upper bits are reserved for predefined engine events.

use crate::engine::AppId;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// Identifier of an event.
///
/// User identifiers occupy the low 28 bits. The top bit marks predefined
/// engine events such as [`EventId::TIMER`] or [`EventId::SET_FOCUS`].
///
/// # Example
///
/// ```rust
/// use statewright::core::EventId;
///
/// let power = EventId::new(7);
/// assert_eq!(power.raw(), 7);
/// assert!(!power.is_predefined());
/// assert!(EventId::user(0x1000_0000).is_none());
/// assert!(EventId::TIMER.is_predefined());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u32);

impl EventId {
    /// Largest identifier available to applications.
    pub const MAX_USER: u32 = 0x0FFF_FFFF;

    const PREDEFINED: u32 = 0x8000_0000;

    pub const INVALID: EventId = EventId(Self::PREDEFINED | 1);
    pub const KILL_FOCUS: EventId = EventId(Self::PREDEFINED | 2);
    pub const SET_FOCUS: EventId = EventId(Self::PREDEFINED | 3);
    /// Regular timer expiry, posted by timers started from handlers.
    pub const TIMER: EventId = EventId(Self::PREDEFINED | 4);
    /// Built-in state timeout expiry. The sequence number is the timer handle.
    pub const STATE_TIMER: EventId = EventId(Self::PREDEFINED | 5);
    /// Asks a run loop to return. Never dispatched to applications.
    pub const EXIT_LOOP: EventId = EventId(Self::PREDEFINED | 7);

    /// Creates a user identifier, masking it to the 28-bit user range.
    pub const fn new(raw: u32) -> Self {
        EventId(raw & Self::MAX_USER)
    }

    /// Creates a user identifier, rejecting values outside the user range.
    pub const fn user(raw: u32) -> Option<Self> {
        if raw <= Self::MAX_USER {
            Some(EventId(raw))
        } else {
            None
        }
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_predefined(self) -> bool {
        self.0 & Self::PREDEFINED != 0
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => f.write_str("INVALID"),
            Self::KILL_FOCUS => f.write_str("KILL_FOCUS"),
            Self::SET_FOCUS => f.write_str("SET_FOCUS"),
            Self::TIMER => f.write_str("TIMER"),
            Self::STATE_TIMER => f.write_str("STATE_TIMER"),
            Self::EXIT_LOOP => f.write_str("EXIT_LOOP"),
            id if id.is_predefined() => write!(f, "PREDEFINED({:#x})", id.0),
            id => write!(f, "{}", id.0),
        }
    }
}

/// Data carried by an event.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Payload {
    Int { param1: u32, param2: u32 },
    /// Owned buffer. Cross-thread posts copy the bytes into the message.
    Bytes(Vec<u8>),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Int {
            param1: 0,
            param2: 0,
        }
    }
}

/// Where an event entered the engine.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Origin {
    /// Posted by a handler onto the thread's internal queue.
    Internal,
    /// Received from the thread's external event source.
    External,
}

/// Delivery category when no destination application is named.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Category {
    /// Broadcast to active applications until one consumes it.
    #[default]
    Normal,
    /// Routed to the focused application only.
    Ui,
}

/// An event instance.
///
/// The consumed flag is interior so handlers holding a shared reference
/// can stop a broadcast with [`Event::consume`].
///
/// # Example
///
/// ```rust
/// use statewright::core::{Category, Event, EventId};
///
/// let key = Event::int(EventId::new(3), 65, 0).with_category(Category::Ui);
/// assert_eq!(key.id(), EventId::new(3));
/// assert!(!key.is_consumed());
/// key.consume();
/// assert!(key.is_consumed());
/// ```
#[derive(Clone, Debug)]
pub struct Event {
    id: EventId,
    payload: Payload,
    origin: Origin,
    category: Category,
    dest: Option<AppId>,
    sequence: u64,
    consumed: Cell<bool>,
}

impl Event {
    pub fn new(id: EventId, payload: Payload) -> Self {
        Self {
            id,
            payload,
            origin: Origin::Internal,
            category: Category::Normal,
            dest: None,
            sequence: 0,
            consumed: Cell::new(false),
        }
    }

    pub fn int(id: EventId, param1: u32, param2: u32) -> Self {
        Self::new(id, Payload::Int { param1, param2 })
    }

    pub fn bytes(id: EventId, data: impl Into<Vec<u8>>) -> Self {
        Self::new(id, Payload::Bytes(data.into()))
    }

    /// Addresses the event to a single application.
    pub fn to_app(mut self, app: AppId) -> Self {
        self.dest = Some(app);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub(crate) fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn dest(&self) -> Option<AppId> {
        self.dest
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Integer parameters, if the payload is an integer pair.
    pub fn params(&self) -> Option<(u32, u32)> {
        match self.payload {
            Payload::Int { param1, param2 } => Some((param1, param2)),
            Payload::Bytes(_) => None,
        }
    }

    /// Marks the event consumed, ending broadcast delivery.
    pub fn consume(&self) {
        self.consumed.set(true);
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_masks_to_user_range() {
        assert_eq!(EventId::new(0xF000_0001).raw(), 1);
        assert_eq!(EventId::new(EventId::MAX_USER).raw(), EventId::MAX_USER);
    }

    #[test]
    fn user_rejects_tag_bits() {
        assert!(EventId::user(EventId::MAX_USER).is_some());
        assert!(EventId::user(0x2000_0000).is_none());
        assert!(EventId::user(0x8000_0004).is_none());
    }

    #[test]
    fn predefined_ids_are_distinct_from_user_ids() {
        let predefined = [
            EventId::INVALID,
            EventId::KILL_FOCUS,
            EventId::SET_FOCUS,
            EventId::TIMER,
            EventId::STATE_TIMER,
            EventId::EXIT_LOOP,
        ];
        for id in predefined {
            assert!(id.is_predefined());
            assert!(EventId::user(id.raw()).is_none());
        }
        assert!(!EventId::INVALID.is_valid());
        assert!(EventId::TIMER.is_valid());
    }

    #[test]
    fn display_names_predefined_events() {
        assert_eq!(EventId::STATE_TIMER.to_string(), "STATE_TIMER");
        assert_eq!(EventId::new(42).to_string(), "42");
    }

    #[test]
    fn params_only_for_int_payload() {
        assert_eq!(Event::int(EventId::new(1), 4, 5).params(), Some((4, 5)));
        assert_eq!(Event::bytes(EventId::new(1), vec![1, 2]).params(), None);
    }

    #[test]
    fn clone_keeps_consumed_flag() {
        let event = Event::int(EventId::new(1), 0, 0).with_sequence(9);
        event.consume();
        let copy = event.clone();
        assert!(copy.is_consumed());
        assert_eq!(copy.sequence(), 9);
    }
}
