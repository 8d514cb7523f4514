/// Database operations for the flower journal
use log::info;
use tokio_postgres::Row;

use crate::database::connection::execute_with_retry;
use crate::database::store::ReadingStore;
use crate::models::FlowerEntry;

const CREATE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS flower_journal (
    time BIGINT NOT NULL,
    temperature INTEGER,
    moisture INTEGER,
    conductivity INTEGER,
    light INTEGER,
    battery INTEGER,
    PRIMARY KEY (time)
)";

const UPSERT_ENTRY: &str = "INSERT INTO flower_journal(time, temperature, moisture, conductivity, light, battery)
     VALUES ($1, $2, $3, $4, $5, $6)
     ON CONFLICT (time) DO UPDATE SET
        temperature = EXCLUDED.temperature,
        moisture = EXCLUDED.moisture,
        conductivity = EXCLUDED.conductivity,
        light = EXCLUDED.light,
        battery = EXCLUDED.battery";

const SELECT_LATEST: &str = "SELECT time, temperature, moisture, conductivity, light, battery
     FROM flower_journal ORDER BY time DESC LIMIT $1";

const SELECT_ALL: &str = "SELECT time, temperature, moisture, conductivity, light, battery
     FROM flower_journal ORDER BY time DESC";

fn entry_from_row(row: &Row) -> Result<FlowerEntry, tokio_postgres::Error> {
    Ok(FlowerEntry {
        time: row.try_get("time")?,
        temperature: row.try_get("temperature")?,
        moisture: row.try_get("moisture")?,
        conductivity: row.try_get("conductivity")?,
        light: row.try_get("light")?,
        battery: row.try_get("battery")?,
    })
}

/// Rows come back newest first; callers get them oldest first
fn rows_to_entries(rows: &[Row]) -> Result<Vec<FlowerEntry>, tokio_postgres::Error> {
    rows.iter().rev().map(entry_from_row).collect()
}

/// Flower journal in PostgreSQL
pub struct PostgresStore {
    database_url: String,
}

impl PostgresStore {
    /// Create the store and make sure the journal table exists
    pub async fn connect(database_url: &str) -> Result<Self, String> {
        let store = PostgresStore {
            database_url: database_url.to_string(),
        };
        store.create_schema().await?;
        Ok(store)
    }

    async fn create_schema(&self) -> Result<(), String> {
        execute_with_retry(&self.database_url, |client| async move {
            client.batch_execute(CREATE_SCHEMA).await
        })
        .await?;
        info!("Flower journal schema ready");
        Ok(())
    }
}

impl ReadingStore for PostgresStore {
    /// Store one entry, replacing an existing row with the same timestamp
    async fn store(&self, entry: &FlowerEntry) -> Result<(), String> {
        // Clone data for move into async closure
        let entry = entry.clone();

        execute_with_retry(&self.database_url, move |client| {
            let entry = entry.clone();
            async move {
                client
                    .execute(
                        UPSERT_ENTRY,
                        &[
                            &entry.time,
                            &entry.temperature,
                            &entry.moisture,
                            &entry.conductivity,
                            &entry.light,
                            &entry.battery,
                        ],
                    )
                    .await
            }
        })
        .await?;
        Ok(())
    }

    /// Load the last `count` entries, or every entry for `None`
    async fn load(&self, count: Option<i64>) -> Result<Vec<FlowerEntry>, String> {
        execute_with_retry(&self.database_url, move |client| async move {
            let rows = match count {
                Some(count) => client.query(SELECT_LATEST, &[&count]).await?,
                None => client.query(SELECT_ALL, &[]).await?,
            };
            rows_to_entries(&rows)
        })
        .await
    }
}
