//! Records that only appear inside other resources.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;

use crate::attributes::{AttrValue, AttributeBag, Schema, TypeName};
use crate::model::{attributable, nested_list, Attributable};

static PARTICIPANT: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("participant")
        .attribute("email", TypeName::String)
        .attribute("name", TypeName::String)
        .attribute("status", TypeName::String)
        .attribute("comment", TypeName::String)
        .build()
});

static FOLDER: Lazy<Schema> = Lazy::new(|| label_like("folder"));

static LABEL: Lazy<Schema> = Lazy::new(|| label_like("label"));

static FILE: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("file")
        .attribute("id", TypeName::String)
        .read_only()
        .attribute("object", TypeName::String)
        .read_only()
        .attribute("filename", TypeName::String)
        .attribute("content_type", TypeName::String)
        .attribute("size", TypeName::Integer)
        .build()
});

static TIMESPAN: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("timespan")
        .attribute("object", TypeName::String)
        .read_only()
        .attribute("start_time", TypeName::UnixTimestamp)
        .attribute("end_time", TypeName::UnixTimestamp)
        .attribute("date", TypeName::Date)
        .attribute("start_date", TypeName::Date)
        .attribute("end_date", TypeName::Date)
        .build()
});

static FREE_BUSY: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("free_busy")
        .attribute("object", TypeName::String)
        .attribute("email", TypeName::String)
        .has_n_of("time_slots", TypeName::Model(TimeSlot::schema))
        .build()
});

// Slot bounds stay plain integers, the way the free-busy endpoint sends them.
static TIME_SLOT: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("time_slot")
        .attribute("object", TypeName::String)
        .attribute("status", TypeName::String)
        .attribute("start_time", TypeName::Integer)
        .attribute("end_time", TypeName::Integer)
        .build()
});

fn label_like(name: &'static str) -> Schema {
    Schema::builder(name)
        .attribute("id", TypeName::String)
        .read_only()
        .attribute("object", TypeName::String)
        .read_only()
        .attribute("name", TypeName::String)
        .attribute("display_name", TypeName::String)
        .build()
}

fn string_attr<'a, A: Attributable>(record: &'a A, name: &str) -> Option<&'a str> {
    record.get(name).and_then(AttrValue::as_str)
}

/// Someone invited to an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    attributes: AttributeBag,
}

attributable!(Participant, PARTICIPANT);

impl Participant {
    pub fn email(&self) -> Option<&str> {
        string_attr(self, "email")
    }

    pub fn name(&self) -> Option<&str> {
        string_attr(self, "name")
    }

    /// RSVP status: `yes`, `no`, `maybe` or `noreply`.
    pub fn status(&self) -> Option<&str> {
        string_attr(self, "status")
    }

    pub fn comment(&self) -> Option<&str> {
        string_attr(self, "comment")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    attributes: AttributeBag,
}

attributable!(Folder, FOLDER);

impl Folder {
    pub fn id(&self) -> Option<&str> {
        string_attr(self, "id")
    }

    pub fn name(&self) -> Option<&str> {
        string_attr(self, "name")
    }

    pub fn display_name(&self) -> Option<&str> {
        string_attr(self, "display_name")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    attributes: AttributeBag,
}

attributable!(Label, LABEL);

impl Label {
    pub fn id(&self) -> Option<&str> {
        string_attr(self, "id")
    }

    pub fn name(&self) -> Option<&str> {
        string_attr(self, "name")
    }

    pub fn display_name(&self) -> Option<&str> {
        string_attr(self, "display_name")
    }
}

/// Attachment metadata. Content is not downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    attributes: AttributeBag,
}

attributable!(File, FILE);

impl File {
    pub fn id(&self) -> Option<&str> {
        string_attr(self, "id")
    }

    pub fn filename(&self) -> Option<&str> {
        string_attr(self, "filename")
    }

    pub fn content_type(&self) -> Option<&str> {
        string_attr(self, "content_type")
    }

    pub fn size(&self) -> Option<i64> {
        self.get("size").and_then(AttrValue::as_i64)
    }
}

/// When an event happens: a time range, a single day or a range of days.
#[derive(Debug, Clone, PartialEq)]
pub struct Timespan {
    attributes: AttributeBag,
}

attributable!(Timespan, TIMESPAN);

impl Timespan {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.get("start_time").and_then(AttrValue::as_timestamp)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.get("end_time").and_then(AttrValue::as_timestamp)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.get("date").and_then(AttrValue::as_date)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.get("start_date").and_then(AttrValue::as_date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.get("end_date").and_then(AttrValue::as_date)
    }
}

/// Busy slots for one address, as answered by `Calendar::free_busy`.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeBusy {
    attributes: AttributeBag,
}

attributable!(FreeBusy, FREE_BUSY);

impl FreeBusy {
    pub fn email(&self) -> Option<&str> {
        string_attr(self, "email")
    }

    pub fn time_slots(&self) -> Vec<TimeSlot> {
        nested_list(self.attributes(), "time_slots")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlot {
    attributes: AttributeBag,
}

attributable!(TimeSlot, TIME_SLOT);

impl TimeSlot {
    pub fn status(&self) -> Option<&str> {
        string_attr(self, "status")
    }

    pub fn start_time(&self) -> Option<i64> {
        self.get("start_time").and_then(AttrValue::as_i64)
    }

    pub fn end_time(&self) -> Option<i64> {
        self.get("end_time").and_then(AttrValue::as_i64)
    }
}
