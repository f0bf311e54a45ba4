//! Typed UUID identifiers for events, users, and reminder jobs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// v5 namespace under which reminder job ids are derived from event ids.
const REMINDER_JOB_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a0e_93b4_4d1f_a5e2_71c8_0b3d_9e47);

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// A queued reminder job.
    JobId
);

uuid_id!(
    /// A stored event.
    EventId
);

uuid_id!(
    /// The owner of events, taken from the session token subject.
    UserId
);

impl JobId {
    /// The reminder job id belonging to `event`.
    ///
    /// Stable across calls, so re-scheduling the same event lands on the
    /// existing job row instead of creating a second one.
    pub fn for_event(event: EventId) -> Self {
        Self(Uuid::new_v5(&REMINDER_JOB_NAMESPACE, event.0.as_bytes()))
    }
}
