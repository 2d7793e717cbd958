use crate::error::DbError;
use async_trait::async_trait;
use core_types::{
    AgeCount, Charity, CharityColumn, CharityFilter, CharityPatch, DonationEvent,
    EventAgeSummary, EventAverageAge, EveryEventContact, FoodDonor, FoodRecipient, Recipient,
    RecipientPatch,
};
use serde_json::Value as JsonValue;

/// Every data-access operation the HTTP layer needs.
///
/// Handlers receive an `Arc<dyn DonationStore>` through their state instead of
/// reaching for a global pool, so the same router runs against PostgreSQL
/// ([`crate::DbRepository`]) or the in-memory [`crate::MemoryStore`].
#[async_trait]
pub trait DonationStore: Send + Sync {
    /// Succeeds when a connection could be acquired and used.
    async fn ping(&self) -> Result<(), DbError>;

    // --- Charities ---
    async fn list_charities(&self) -> Result<Vec<Charity>, DbError>;
    async fn count_charities(&self) -> Result<i64, DbError>;
    async fn insert_charity(&self, charity: &Charity) -> Result<(), DbError>;
    /// Writes the supplied fields only. A patch without changes is a no-op.
    async fn update_charity(&self, charity_id: i32, patch: &CharityPatch) -> Result<(), DbError>;
    async fn delete_charity(&self, charity_id: i32) -> Result<(), DbError>;
    async fn search_charities(&self, filter: &CharityFilter) -> Result<Vec<Charity>, DbError>;
    /// One JSON array per charity, values in `columns` order.
    async fn project_charities(
        &self,
        columns: &[CharityColumn],
    ) -> Result<Vec<Vec<JsonValue>>, DbError>;

    // --- Recipients ---
    async fn insert_recipient(&self, recipient: &Recipient) -> Result<(), DbError>;
    async fn list_recipients(&self) -> Result<Vec<Recipient>, DbError>;
    async fn get_recipient(&self, sin_num: i32) -> Result<Recipient, DbError>;
    /// Writes the supplied fields only. A patch without changes is a no-op.
    async fn update_recipient(&self, sin_num: i32, patch: &RecipientPatch) -> Result<(), DbError>;

    // --- Events and donors ---
    async fn list_donation_events(&self) -> Result<Vec<DonationEvent>, DbError>;
    async fn list_food_donors(&self) -> Result<Vec<FoodDonor>, DbError>;
    async fn delete_food_donor(&self, donor_id: i32) -> Result<(), DbError>;

    // --- Analytical reads ---
    async fn recipients_for_food(&self, food_id: i32) -> Result<Vec<FoodRecipient>, DbError>;
    async fn event_age_summaries(&self) -> Result<Vec<EventAgeSummary>, DbError>;
    async fn age_histogram(&self) -> Result<Vec<AgeCount>, DbError>;
    async fn lowest_average_age_events(&self) -> Result<Vec<EventAverageAge>, DbError>;
    async fn contacts_at_every_event(&self) -> Result<Vec<EveryEventContact>, DbError>;

    /// Drops all tables and recreates them with their sample data.
    async fn reinitialize(&self) -> Result<(), DbError>;

    /// Releases pooled resources. Later calls fail with a connectivity error.
    async fn close(&self);
}
