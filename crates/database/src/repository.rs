use crate::error::DbError;
use crate::schema;
use crate::search::{charity_search_query, projection_sql};
use crate::store::DonationStore;
use async_trait::async_trait;
use core_types::{
    AgeCount, Charity, CharityColumn, CharityFilter, CharityPatch, ColumnKind, DonationEvent,
    EventAgeSummary, EventAverageAge, EveryEventContact, FoodDonor, FoodRecipient, Recipient,
    RecipientPatch,
};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};

const RECIPIENT_SELECT: &str = "SELECT SinNum AS sin_num, EventID AS event_id, Age AS age, \
     ContactNum AS contact_num, Gender AS gender FROM Recipients";

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
///
/// Every method runs a single auto-committed statement on a pooled connection,
/// except [`DonationStore::reinitialize`], which runs in one transaction.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
    schema_script: String,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool, schema_script: String) -> Self {
        Self {
            pool,
            schema_script,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn projection_row(row: &PgRow, columns: &[CharityColumn]) -> Result<Vec<JsonValue>, sqlx::Error> {
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            Ok(match column.kind() {
                ColumnKind::Integer => JsonValue::from(row.try_get::<i32, _>(index)?),
                ColumnKind::Text => JsonValue::from(row.try_get::<String, _>(index)?),
            })
        })
        .collect()
}

#[async_trait]
impl DonationStore for DbRepository {
    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_charities(&self) -> Result<Vec<Charity>, DbError> {
        let charities = sqlx::query_as::<_, Charity>(
            "SELECT CharityID AS charity_id, Name AS name, Address AS address FROM Charities ORDER BY CharityID",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(charities)
    }

    async fn count_charities(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM Charities")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_charity(&self, charity: &Charity) -> Result<(), DbError> {
        sqlx::query("INSERT INTO Charities (CharityID, Name, Address) VALUES ($1, $2, $3)")
            .bind(charity.charity_id)
            .bind(&charity.name)
            .bind(&charity.address)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_charity(&self, charity_id: i32, patch: &CharityPatch) -> Result<(), DbError> {
        if !patch.has_changes() {
            return Ok(());
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE Charities SET ");
        let mut fields = query.separated(", ");
        if let Some(name) = &patch.name {
            fields.push("Name = ").push_bind_unseparated(name.clone());
        }
        if let Some(address) = &patch.address {
            fields.push("Address = ").push_bind_unseparated(address.clone());
        }
        query.push(" WHERE CharityID = ").push_bind(charity_id);

        let result = query.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Charity", charity_id));
        }
        Ok(())
    }

    async fn delete_charity(&self, charity_id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM Charities WHERE CharityID = $1")
            .bind(charity_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Charity", charity_id));
        }
        Ok(())
    }

    async fn search_charities(&self, filter: &CharityFilter) -> Result<Vec<Charity>, DbError> {
        let mut query = charity_search_query(filter);
        tracing::debug!(
            sql = %query.sql(),
            binds = filter.conditions().len(),
            "Executing charity search."
        );
        let charities = query
            .build_query_as::<Charity>()
            .fetch_all(&self.pool)
            .await?;
        Ok(charities)
    }

    async fn project_charities(
        &self,
        columns: &[CharityColumn],
    ) -> Result<Vec<Vec<JsonValue>>, DbError> {
        let sql = projection_sql(columns);
        tracing::debug!(sql = %sql, "Executing charity projection.");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let projected = rows
            .iter()
            .map(|row| projection_row(row, columns))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projected)
    }

    async fn insert_recipient(&self, recipient: &Recipient) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO Recipients (SinNum, EventID, Age, ContactNum, Gender)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(recipient.sin_num)
        .bind(recipient.event_id)
        .bind(recipient.age)
        .bind(&recipient.contact_num)
        .bind(recipient.gender.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_recipients(&self) -> Result<Vec<Recipient>, DbError> {
        let recipients = sqlx::query_as::<_, Recipient>(&format!("{RECIPIENT_SELECT} ORDER BY SinNum"))
            .fetch_all(&self.pool)
            .await?;
        Ok(recipients)
    }

    async fn get_recipient(&self, sin_num: i32) -> Result<Recipient, DbError> {
        sqlx::query_as::<_, Recipient>(&format!("{RECIPIENT_SELECT} WHERE SinNum = $1"))
            .bind(sin_num)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Recipient", sin_num))
    }

    async fn update_recipient(&self, sin_num: i32, patch: &RecipientPatch) -> Result<(), DbError> {
        if !patch.has_changes() {
            return Ok(());
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE Recipients SET ");
        let mut fields = query.separated(", ");
        if let Some(event_id) = patch.event_id {
            fields.push("EventID = ").push_bind_unseparated(event_id);
        }
        if let Some(age) = patch.age {
            fields.push("Age = ").push_bind_unseparated(age);
        }
        if let Some(contact_num) = &patch.contact_num {
            fields.push("ContactNum = ").push_bind_unseparated(contact_num.clone());
        }
        if let Some(gender) = &patch.gender {
            fields.push("Gender = ").push_bind_unseparated(gender.clone());
        }
        query.push(" WHERE SinNum = ").push_bind(sin_num);

        let result = query.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Recipient", sin_num));
        }
        Ok(())
    }

    async fn list_donation_events(&self) -> Result<Vec<DonationEvent>, DbError> {
        let events = sqlx::query_as::<_, DonationEvent>(
            "SELECT EventID AS event_id, EventName AS event_name FROM DonationEvent ORDER BY EventID",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn list_food_donors(&self) -> Result<Vec<FoodDonor>, DbError> {
        let donors = sqlx::query_as::<_, FoodDonor>(
            r#"
            SELECT DonorID AS donor_id, Name AS name, Type AS donor_type, ReceiptNum AS receipt_num
            FROM FoodDonors
            ORDER BY DonorID
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(donors)
    }

    async fn delete_food_donor(&self, donor_id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM FoodDonors WHERE DonorID = $1")
            .bind(donor_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("FoodDonor", donor_id));
        }
        Ok(())
    }

    async fn recipients_for_food(&self, food_id: i32) -> Result<Vec<FoodRecipient>, DbError> {
        let recipients = sqlx::query_as::<_, FoodRecipient>(
            r#"
            SELECT
                FR.SinNum AS sin_num,
                R.ContactNum AS contact_num
            FROM
                FoodReceived FR
            JOIN
                Recipients R ON FR.SinNum = R.SinNum
            WHERE
                FR.FoodID = $1
            ORDER BY
                FR.SinNum
            "#,
        )
        .bind(food_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(recipients)
    }

    async fn event_age_summaries(&self) -> Result<Vec<EventAgeSummary>, DbError> {
        let summaries = sqlx::query_as::<_, EventAgeSummary>(
            r#"
            SELECT
                R.EventID AS event_id,
                ROUND(AVG(R.Age), 2) AS avg_age,
                COUNT(*) AS recipient_count
            FROM
                Recipients R
            GROUP BY
                R.EventID
            HAVING
                COUNT(*) >= 2
            ORDER BY
                R.EventID
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    async fn age_histogram(&self) -> Result<Vec<AgeCount>, DbError> {
        let counts = sqlx::query_as::<_, AgeCount>(
            "SELECT Age AS age, COUNT(*) AS age_count FROM Recipients GROUP BY Age ORDER BY Age",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn lowest_average_age_events(&self) -> Result<Vec<EventAverageAge>, DbError> {
        let events = sqlx::query_as::<_, EventAverageAge>(
            r#"
            SELECT
                E.EventID AS event_id,
                E.EventName AS event_name,
                ROUND(AVG(R.Age), 2) AS avg_event_age
            FROM
                DonationEvent E
            JOIN
                Recipients R ON E.EventID = R.EventID
            GROUP BY
                E.EventID, E.EventName
            HAVING
                AVG(R.Age) <= ALL (
                    SELECT AVG(R2.Age)
                    FROM Recipients R2
                    GROUP BY R2.EventID
                )
            ORDER BY
                E.EventID
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn contacts_at_every_event(&self) -> Result<Vec<EveryEventContact>, DbError> {
        // Relational division: no event in Recipients lacks a row for this contact.
        let contacts = sqlx::query_as::<_, EveryEventContact>(
            r#"
            SELECT DISTINCT
                R.ContactNum AS contact_num
            FROM
                Recipients R
            WHERE NOT EXISTS (
                SELECT E.EventID
                FROM (SELECT DISTINCT EventID FROM Recipients) E
                WHERE NOT EXISTS (
                    SELECT 1
                    FROM Recipients R2
                    WHERE R2.ContactNum = R.ContactNum
                      AND R2.EventID = E.EventID
                )
            )
            ORDER BY
                contact_num
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn reinitialize(&self) -> Result<(), DbError> {
        schema::replay(&self.pool, &self.schema_script).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
