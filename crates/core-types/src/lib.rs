pub mod enums;
pub mod error;
pub mod lenient;
pub mod search;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{CharityColumn, ColumnKind, ComparisonOp, Connector};
pub use error::CoreError;
pub use search::{BoundValue, CharityFilter, Condition, ConditionValue, RawCondition, SearchRequest};
pub use structs::{
    AgeCount, Charity, CharityKey, CharityPatch, DonationEvent, DonorKey, EventAgeSummary,
    EventAverageAge, EveryEventContact, FoodDonor, FoodReceived, FoodRecipient, NewCharity,
    ProjectionRequest, Recipient, RecipientPatch,
};
