//! A process-local [`DonationStore`] with the same observable behavior as the
//! PostgreSQL schema: primary keys, the Recipient → DonationEvent foreign key,
//! cascading donor deletes and SQL's rounding of averages.

use crate::error::DbError;
use crate::store::DonationStore;
use async_trait::async_trait;
use core_types::{
    AgeCount, Charity, CharityColumn, CharityFilter, CharityPatch, DonationEvent,
    EventAgeSummary, EventAverageAge, EveryEventContact, FoodDonor, FoodReceived, FoodRecipient,
    Recipient, RecipientPatch,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// The full contents of the five tables.
#[derive(Debug, Clone, Default)]
pub struct Seed {
    pub charities: Vec<Charity>,
    pub events: Vec<DonationEvent>,
    pub recipients: Vec<Recipient>,
    pub donors: Vec<FoodDonor>,
    pub food_received: Vec<FoodReceived>,
}

impl Seed {
    /// The sample data set, identical to the rows inserted by the bundled script.
    pub fn sample() -> Self {
        let charity = |id, name: &str, address: &str| Charity {
            charity_id: id,
            name: name.to_string(),
            address: address.to_string(),
        };
        let event = |id, name: &str| DonationEvent {
            event_id: id,
            event_name: name.to_string(),
        };
        let recipient = |sin, event_id, age, contact: &str, gender: Option<&str>| Recipient {
            sin_num: sin,
            event_id,
            age,
            contact_num: contact.to_string(),
            gender: gender.map(str::to_string),
        };
        let donor = |id, name: &str, kind: &str, receipt| FoodDonor {
            donor_id: id,
            name: Some(name.to_string()),
            donor_type: Some(kind.to_string()),
            receipt_num: Some(receipt),
        };
        let received = |food_id, sin_num, donor_id| FoodReceived {
            food_id,
            sin_num,
            donor_id,
        };

        Self {
            charities: vec![
                charity(1, "RedCross", "123 Main St"),
                charity(2, "Food Bank Society", "45 Granville St"),
                charity(3, "Salvation Army", "900 Hastings St"),
                charity(4, "United Way", "12 Broadway"),
                charity(5, "RedCross", "77 Kingsway"),
            ],
            events: vec![
                event(1, "Winter Food Drive"),
                event(2, "Spring Pantry"),
                event(3, "Summer Harvest"),
                event(4, "Autumn Potluck"),
            ],
            recipients: vec![
                recipient(100000001, 1, 34, "604-555-0101", Some("F")),
                recipient(100000002, 2, 34, "604-555-0101", Some("F")),
                recipient(100000003, 3, 35, "604-555-0101", Some("F")),
                recipient(100000004, 1, 22, "604-555-0102", Some("M")),
                recipient(100000005, 2, 41, "604-555-0102", Some("M")),
                recipient(100000006, 1, 67, "604-555-0103", None),
                recipient(100000007, 3, 19, "778-555-0104", Some("M")),
                recipient(100000008, 2, 28, "778-555-0105", Some("F")),
            ],
            donors: vec![
                donor(1, "Safeway", "Grocery", 5001),
                donor(2, "Local Farm Co-op", "Farm", 5002),
                donor(3, "Jane Doe", "Individual", 5003),
                donor(4, "Bakery Bros", "Bakery", 5004),
            ],
            food_received: vec![
                received(10, 100000001, 1),
                received(10, 100000004, 1),
                received(11, 100000002, 2),
                received(12, 100000003, 3),
                received(12, 100000007, 3),
                received(13, 100000005, 1),
                received(14, 100000008, 4),
            ],
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    charities: BTreeMap<i32, Charity>,
    events: BTreeMap<i32, DonationEvent>,
    recipients: BTreeMap<i32, Recipient>,
    donors: BTreeMap<i32, FoodDonor>,
    food_received: Vec<FoodReceived>,
}

impl From<&Seed> for Tables {
    fn from(seed: &Seed) -> Self {
        Self {
            charities: seed.charities.iter().map(|c| (c.charity_id, c.clone())).collect(),
            events: seed.events.iter().map(|e| (e.event_id, e.clone())).collect(),
            recipients: seed.recipients.iter().map(|r| (r.sin_num, r.clone())).collect(),
            donors: seed.donors.iter().map(|d| (d.donor_id, d.clone())).collect(),
            food_received: seed.food_received.clone(),
        }
    }
}

impl Tables {
    fn check_event_exists(&self, event_id: i32) -> Result<(), DbError> {
        if self.events.contains_key(&event_id) {
            Ok(())
        } else {
            Err(DbError::ConstraintViolation(format!(
                "Key (eventid)=({event_id}) is not present in table \"donationevent\""
            )))
        }
    }

    /// `(sum, count)` of recipient ages per event.
    fn age_totals(&self) -> BTreeMap<i32, (i64, i64)> {
        let mut totals: BTreeMap<i32, (i64, i64)> = BTreeMap::new();
        for recipient in self.recipients.values() {
            let entry = totals.entry(recipient.event_id).or_default();
            entry.0 += i64::from(recipient.age);
            entry.1 += 1;
        }
        totals
    }
}

/// `ROUND(AVG(x), 2)` as PostgreSQL computes it (half away from zero).
fn rounded_average(sum: i64, count: i64) -> Decimal {
    (Decimal::from(sum) / Decimal::from(count))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn check_age(age: i32) -> Result<(), DbError> {
    if age >= 0 {
        Ok(())
    } else {
        Err(DbError::ConstraintViolation(
            "new row for relation \"recipients\" violates check constraint \"recipients_age_check\""
                .to_string(),
        ))
    }
}

fn duplicate_key(table: &str, column: &str, key: i32) -> DbError {
    DbError::ConstraintViolation(format!(
        "duplicate key value violates unique constraint \"{table}_pkey\": Key ({column})=({key}) already exists"
    ))
}

fn column_value(charity: &Charity, column: CharityColumn) -> JsonValue {
    match column {
        CharityColumn::CharityId => JsonValue::from(charity.charity_id),
        CharityColumn::Name => JsonValue::from(charity.name.clone()),
        CharityColumn::Address => JsonValue::from(charity.address.clone()),
    }
}

/// An in-memory store. Used by tests and by the `memory` backend.
///
/// Text comparisons in searches use byte order, not a database collation, so
/// mixed-case `<`/`>` conditions can rank rows differently than PostgreSQL.
#[derive(Debug)]
pub struct MemoryStore {
    seed: Seed,
    tables: RwLock<Tables>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new(seed: Seed) -> Self {
        let tables = Tables::from(&seed);
        Self {
            seed,
            tables: RwLock::new(tables),
            closed: AtomicBool::new(false),
        }
    }

    /// A store holding [`Seed::sample`].
    pub fn sample() -> Self {
        Self::new(Seed::sample())
    }

    fn ensure_open(&self) -> Result<(), DbError> {
        if self.closed.load(Ordering::Acquire) {
            Err(DbError::from(sqlx::Error::PoolClosed))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Seed::default())
    }
}

#[async_trait]
impl DonationStore for MemoryStore {
    async fn ping(&self) -> Result<(), DbError> {
        self.ensure_open()
    }

    async fn list_charities(&self) -> Result<Vec<Charity>, DbError> {
        self.ensure_open()?;
        Ok(self.tables.read().await.charities.values().cloned().collect())
    }

    async fn count_charities(&self) -> Result<i64, DbError> {
        self.ensure_open()?;
        Ok(self.tables.read().await.charities.len() as i64)
    }

    async fn insert_charity(&self, charity: &Charity) -> Result<(), DbError> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        if tables.charities.contains_key(&charity.charity_id) {
            return Err(duplicate_key("charities", "charityid", charity.charity_id));
        }
        tables.charities.insert(charity.charity_id, charity.clone());
        Ok(())
    }

    async fn update_charity(&self, charity_id: i32, patch: &CharityPatch) -> Result<(), DbError> {
        self.ensure_open()?;
        if !patch.has_changes() {
            return Ok(());
        }
        let mut tables = self.tables.write().await;
        let charity = tables
            .charities
            .get_mut(&charity_id)
            .ok_or_else(|| DbError::not_found("Charity", charity_id))?;
        if let Some(name) = &patch.name {
            charity.name = name.clone();
        }
        if let Some(address) = &patch.address {
            charity.address = address.clone();
        }
        Ok(())
    }

    async fn delete_charity(&self, charity_id: i32) -> Result<(), DbError> {
        self.ensure_open()?;
        self.tables
            .write()
            .await
            .charities
            .remove(&charity_id)
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Charity", charity_id))
    }

    async fn search_charities(&self, filter: &CharityFilter) -> Result<Vec<Charity>, DbError> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        Ok(tables
            .charities
            .values()
            .filter(|charity| filter.matches(charity))
            .cloned()
            .collect())
    }

    async fn project_charities(
        &self,
        columns: &[CharityColumn],
    ) -> Result<Vec<Vec<JsonValue>>, DbError> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        Ok(tables
            .charities
            .values()
            .map(|charity| columns.iter().map(|c| column_value(charity, *c)).collect())
            .collect())
    }

    async fn insert_recipient(&self, recipient: &Recipient) -> Result<(), DbError> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        if tables.recipients.contains_key(&recipient.sin_num) {
            return Err(duplicate_key("recipients", "sinnum", recipient.sin_num));
        }
        check_age(recipient.age)?;
        tables.check_event_exists(recipient.event_id)?;
        tables.recipients.insert(recipient.sin_num, recipient.clone());
        Ok(())
    }

    async fn list_recipients(&self) -> Result<Vec<Recipient>, DbError> {
        self.ensure_open()?;
        Ok(self.tables.read().await.recipients.values().cloned().collect())
    }

    async fn get_recipient(&self, sin_num: i32) -> Result<Recipient, DbError> {
        self.ensure_open()?;
        self.tables
            .read()
            .await
            .recipients
            .get(&sin_num)
            .cloned()
            .ok_or_else(|| DbError::not_found("Recipient", sin_num))
    }

    async fn update_recipient(&self, sin_num: i32, patch: &RecipientPatch) -> Result<(), DbError> {
        self.ensure_open()?;
        if !patch.has_changes() {
            return Ok(());
        }
        let mut tables = self.tables.write().await;
        if !tables.recipients.contains_key(&sin_num) {
            return Err(DbError::not_found("Recipient", sin_num));
        }
        if let Some(age) = patch.age {
            check_age(age)?;
        }
        if let Some(event_id) = patch.event_id {
            tables.check_event_exists(event_id)?;
        }
        if let Some(recipient) = tables.recipients.get_mut(&sin_num) {
            patch.apply_to(recipient);
        }
        Ok(())
    }

    async fn list_donation_events(&self) -> Result<Vec<DonationEvent>, DbError> {
        self.ensure_open()?;
        Ok(self.tables.read().await.events.values().cloned().collect())
    }

    async fn list_food_donors(&self) -> Result<Vec<FoodDonor>, DbError> {
        self.ensure_open()?;
        Ok(self.tables.read().await.donors.values().cloned().collect())
    }

    async fn delete_food_donor(&self, donor_id: i32) -> Result<(), DbError> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        if tables.donors.remove(&donor_id).is_none() {
            return Err(DbError::not_found("FoodDonor", donor_id));
        }
        tables.food_received.retain(|row| row.donor_id != donor_id);
        Ok(())
    }

    async fn recipients_for_food(&self, food_id: i32) -> Result<Vec<FoodRecipient>, DbError> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        let mut recipients: Vec<FoodRecipient> = tables
            .food_received
            .iter()
            .filter(|row| row.food_id == food_id)
            .filter_map(|row| tables.recipients.get(&row.sin_num))
            .map(|r| FoodRecipient {
                sin_num: r.sin_num,
                contact_num: r.contact_num.clone(),
            })
            .collect();
        recipients.sort_by_key(|r| r.sin_num);
        Ok(recipients)
    }

    async fn event_age_summaries(&self) -> Result<Vec<EventAgeSummary>, DbError> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        Ok(tables
            .age_totals()
            .into_iter()
            .filter(|(_, (_, count))| *count >= 2)
            .map(|(event_id, (sum, count))| EventAgeSummary {
                event_id,
                avg_age: rounded_average(sum, count),
                recipient_count: count,
            })
            .collect())
    }

    async fn age_histogram(&self) -> Result<Vec<AgeCount>, DbError> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        let mut counts: BTreeMap<i32, i64> = BTreeMap::new();
        for recipient in tables.recipients.values() {
            *counts.entry(recipient.age).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(age, age_count)| AgeCount { age, age_count })
            .collect())
    }

    async fn lowest_average_age_events(&self) -> Result<Vec<EventAverageAge>, DbError> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        let totals = tables.age_totals();

        // Compare sum_a / count_a <= sum_b / count_b without division.
        let is_lowest = |sum: i64, count: i64| {
            totals
                .values()
                .all(|&(other_sum, other_count)| sum * other_count <= other_sum * count)
        };

        Ok(totals
            .iter()
            .filter(|(_, (sum, count))| is_lowest(*sum, *count))
            .filter_map(|(event_id, (sum, count))| {
                tables.events.get(event_id).map(|event| EventAverageAge {
                    event_id: *event_id,
                    event_name: event.event_name.clone(),
                    avg_event_age: rounded_average(*sum, *count),
                })
            })
            .collect())
    }

    async fn contacts_at_every_event(&self) -> Result<Vec<EveryEventContact>, DbError> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        let all_events: BTreeSet<i32> = tables.recipients.values().map(|r| r.event_id).collect();

        let mut attended: BTreeMap<&str, BTreeSet<i32>> = BTreeMap::new();
        for recipient in tables.recipients.values() {
            attended
                .entry(recipient.contact_num.as_str())
                .or_default()
                .insert(recipient.event_id);
        }

        Ok(attended
            .into_iter()
            .filter(|(_, events)| all_events.is_subset(events))
            .map(|(contact, _)| EveryEventContact {
                contact_num: contact.to_string(),
            })
            .collect())
    }

    async fn reinitialize(&self) -> Result<(), DbError> {
        self.ensure_open()?;
        *self.tables.write().await = Tables::from(&self.seed);
        tracing::info!("In-memory tables restored from seed.");
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
