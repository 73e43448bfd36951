//! MongoDB document adapter

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::options::{ClientOptions, FindOptions, ReplaceOptions};
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::*;
use crate::error::{ErrorKind, Result, StorageError};

const REFEREE_PANELS: &str = "referee_panels";
const TEAM_SCORERS: &str = "team_scorers";

/// Stored shape of [`TeamScorersDoc`]; `updatedAt` is a native BSON date.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamScorersRecord {
    edition: String,
    country: String,
    players: Vec<ScorerEntry>,
    updated_at: bson::DateTime,
}

impl From<&TeamScorersDoc> for TeamScorersRecord {
    fn from(doc: &TeamScorersDoc) -> Self {
        Self {
            edition: doc.edition.clone(),
            country: doc.country.clone(),
            players: doc.players.clone(),
            updated_at: bson::DateTime::from_millis(doc.updated_at.timestamp_millis()),
        }
    }
}

impl TryFrom<TeamScorersRecord> for TeamScorersDoc {
    type Error = StorageError;

    fn try_from(record: TeamScorersRecord) -> Result<Self> {
        let millis = record.updated_at.timestamp_millis();
        let updated_at = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
            StorageError::decode(format!("{}: updatedAt out of range: {}", TEAM_SCORERS, millis))
        })?;
        Ok(Self {
            edition: record.edition,
            country: record.country,
            players: record.players,
            updated_at,
        })
    }
}

pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, connect_timeout: Duration) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Config, "MongoDB URI", e))?;
        options.server_selection_timeout = Some(connect_timeout);
        options.connect_timeout = Some(connect_timeout);

        let client = Client::with_options(options)
            .map_err(|e| StorageError::from_driver(ErrorKind::Connection, "MongoDB client", e))?;
        let db = client.database(database);

        // Client construction is lazy; force a round-trip so bad hosts fail here
        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Connection, "MongoDB ping", e))?;

        debug!(database, "MongoDB client ready");
        Ok(Self { client, db })
    }

    fn panels(&self) -> Collection<RefereePanel> {
        self.db.collection(REFEREE_PANELS)
    }

    fn scorers(&self) -> Collection<TeamScorersRecord> {
        self.db.collection(TEAM_SCORERS)
    }
}

#[async_trait]
impl BackingStore for MongoStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Document
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Connection, "MongoDB ping", e))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn delete_referee_panels(&self, edition: &str) -> Result<u64> {
        let result = self
            .panels()
            .delete_many(doc! { "edition": edition }, None)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Write, REFEREE_PANELS, e))?;
        Ok(result.deleted_count)
    }

    async fn insert_referee_panels(&self, panels: &[RefereePanel]) -> Result<u64> {
        if panels.is_empty() {
            return Ok(0);
        }
        let result = self
            .panels()
            .insert_many(panels, None)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Write, REFEREE_PANELS, e))?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn read_referee_panels(&self, edition: &str) -> Result<Vec<RefereePanel>> {
        let options = FindOptions::builder()
            .sort(doc! { "phase": 1, "matchId": 1 })
            .projection(doc! { "_id": 0 })
            .build();
        let cursor = self
            .panels()
            .find(doc! { "edition": edition }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace_team_scorers(&self, doc: &TeamScorersDoc) -> Result<()> {
        let record = TeamScorersRecord::from(doc);
        let options = ReplaceOptions::builder().upsert(true).build();
        self.scorers()
            .replace_one(
                doc! { "edition": doc.edition.as_str(), "country": doc.country.as_str() },
                record,
                options,
            )
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Write, TEAM_SCORERS, e))?;
        Ok(())
    }

    async fn read_team_scorers(
        &self,
        edition: &str,
        country: &str,
    ) -> Result<Option<TeamScorersDoc>> {
        let found = self
            .scorers()
            .find_one(doc! { "edition": edition, "country": country }, None)
            .await?;
        found.map(TeamScorersDoc::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trips_timestamp_to_millis() {
        let doc = TeamScorersDoc {
            edition: "Mundial 2030".to_string(),
            country: "Spain".to_string(),
            players: vec![],
            updated_at: Utc.with_ymd_and_hms(2030, 7, 21, 20, 0, 0).unwrap(),
        };

        let record = TeamScorersRecord::from(&doc);
        let stored = bson::to_document(&record).unwrap();
        assert!(stored.get_datetime("updatedAt").is_ok());

        let back = TeamScorersDoc::try_from(record).unwrap();
        assert_eq!(back, doc);
    }
}
