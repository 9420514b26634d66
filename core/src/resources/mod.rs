//! The concrete resources: messages, events and calendars, plus the records
//! nested inside them.

mod calendar;
mod event;
mod message;
mod nested;

pub use calendar::Calendar;
pub use event::Event;
pub use message::Message;
pub use nested::{File, Folder, FreeBusy, Label, Participant, TimeSlot, Timespan};

use crate::attributes::TypeRegistry;
use crate::model::Attributable;

/// The standard registry plus every record type of this crate, for schemas
/// declared with type names.
pub fn type_registry() -> TypeRegistry {
    TypeRegistry::standard()
        .register("participant", Participant::schema)
        .register("folder", Folder::schema)
        .register("label", Label::schema)
        .register("file", File::schema)
        .register("timespan", Timespan::schema)
        .register("free_busy", FreeBusy::schema)
        .register("time_slot", TimeSlot::schema)
        .register("event", Event::schema)
        .register("message", Message::schema)
        .register("calendar", Calendar::schema)
}
