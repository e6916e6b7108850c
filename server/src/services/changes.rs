use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::Event;
use crate::utils::datetime::format_event_start;
use crate::utils::validation::normalize_optional;

/// Rendered in place of an address when the location was cleared.
const NO_LOCATION: &str = "no location";

/// What changed about an event in a way attendees need to hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum EventChange {
    Location {
        location: Option<String>,
    },
    Date {
        starts_at: DateTime<Utc>,
    },
    DateAndLocation {
        starts_at: DateTime<Utc>,
        location: Option<String>,
    },
}

/// Compares the persisted event with the values it is being updated to.
///
/// Blank addresses count as "no location", so clearing a location that was
/// never set is not a change, while setting or clearing a real address is.
/// The start instant is compared exactly.
pub fn detect_changes(
    old: &Event,
    new_location: Option<&str>,
    new_start: DateTime<Utc>,
) -> Option<EventChange> {
    let old_location = normalize_optional(old.location_address.as_deref());
    let new_location = normalize_optional(new_location);

    let location_changed = old_location != new_location;
    let date_changed = old.date_from != new_start;

    match (location_changed, date_changed) {
        (false, false) => None,
        (true, false) => Some(EventChange::Location {
            location: new_location,
        }),
        (false, true) => Some(EventChange::Date {
            starts_at: new_start,
        }),
        (true, true) => Some(EventChange::DateAndLocation {
            starts_at: new_start,
            location: new_location,
        }),
    }
}

impl EventChange {
    /// Body of the automatic post announcing this change.
    pub fn message(&self, tz: Tz, now: DateTime<Utc>) -> String {
        fn place(location: &Option<String>) -> &str {
            location.as_deref().unwrap_or(NO_LOCATION)
        }

        match self {
            EventChange::Location { location } => {
                format!("Location was changed to {}", place(location))
            }
            EventChange::Date { starts_at } => {
                format!(
                    "Date was changed to {}",
                    format_event_start(*starts_at, tz, now)
                )
            }
            EventChange::DateAndLocation {
                starts_at,
                location,
            } => format!(
                "Date was changed to {} and location was changed to {}",
                format_event_start(*starts_at, tz, now),
                place(location)
            ),
        }
    }
}
