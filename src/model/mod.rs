// File: ./src/model/mod.rs
pub mod observance;
pub mod occurrence;
pub mod role;

pub use observance::{Observance, ObservanceIndex, ObservanceKind, UpcomingObservance};
pub use occurrence::{
    AnchorDate, LeapDayPolicy, Occurrence, OccurrenceCalculator, QueryWindow, next_occurrence,
    parse_iso_date,
};
pub use role::{NO_ROLES_LABEL, RoleSet, RoleTag};
