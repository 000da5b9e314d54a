//! PostgREST (Supabase) backed [`Store`].
//!
//! Filters use PostgREST's `column=eq.value` query syntax; upserts POST with
//! `Prefer: resolution=merge-duplicates` and an explicit `on_conflict`.
//! Partial merges are resolved client-side (read, merge, write the full
//! row) so inserting a brand-new row never depends on server defaults.
//! There is no transaction across requests: the daily snapshot is two
//! independent writes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use url::Url;

use super::store::Store;
use crate::error::StoreError;
use crate::model::{
    HabitRecord, MindsetNote, ProgressLog, ProgressPatch, UserId, UserPatch, UserSummary,
};

/// Connection settings for the remote store.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public anon key sent as both `apikey` and bearer token.
    pub anon_key: String,
    pub timeout: Duration,
}

/// Client for the remote tabular store.
#[derive(Clone)]
pub struct RestStore {
    base: Url,
    anon_key: String,
    http_client: Client,
}

impl RestStore {
    /// Build a client. Fails if the URL or key is missing or malformed.
    pub fn new(config: RestConfig) -> Result<Self, StoreError> {
        if config.url.trim().is_empty() {
            return Err(StoreError::NotConfigured("store.rest_url is empty".into()));
        }
        if config.anon_key.trim().is_empty() {
            return Err(StoreError::NotConfigured("store.rest_anon_key is empty".into()));
        }

        let mut base = Url::parse(config.url.trim())
            .map_err(|e| StoreError::NotConfigured(format!("invalid store.rest_url: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base = base
            .join("rest/v1/")
            .map_err(|e| StoreError::NotConfigured(format!("invalid store.rest_url: {e}")))?;

        let http_client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base,
            anon_key: config.anon_key,
            http_client,
        })
    }

    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut url = self
            .base
            .join(table)
            .map_err(|e| StoreError::NotConfigured(e.to_string()))?;
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), %body, "remote store rejected request");
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table, filters)?;
        tracing::debug!(table, "select");
        let resp = self.send(self.request(Method::GET, url)).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn insert<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> Result<(), StoreError> {
        let url = self.table_url(table, &[])?;
        tracing::debug!(table, "insert");
        self.send(
            self.request(Method::POST, url)
                .header("Prefer", "return=minimal")
                .json(body),
        )
        .await?;
        Ok(())
    }

    async fn upsert<B: Serialize + ?Sized>(
        &self,
        table: &str,
        on_conflict: &str,
        body: &B,
    ) -> Result<(), StoreError> {
        let url = self.table_url(table, &[("on_conflict", on_conflict.to_string())])?;
        tracing::debug!(table, on_conflict, "upsert");
        self.send(
            self.request(Method::POST, url)
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(body),
        )
        .await?;
        Ok(())
    }

    /// PATCH or DELETE with `return=representation` so the affected row
    /// count can be reported.
    async fn mutate(
        &self,
        method: Method,
        table: &str,
        filters: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<usize, StoreError> {
        let url = self.table_url(table, filters)?;
        tracing::debug!(table, %method, "mutate");
        let mut builder = self
            .request(method, url)
            .header("Prefer", "return=representation");
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let resp = self.send(builder).await?;
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(0);
        }
        let rows: Vec<serde_json::Value> = serde_json::from_str(&text)?;
        Ok(rows.len())
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(serde::Deserialize)]
struct NameRow {
    name: String,
}

#[async_trait]
impl Store for RestStore {
    async fn get_user(&self, user: &UserId) -> Result<Option<UserSummary>, StoreError> {
        let rows: Vec<UserSummary> = self
            .select("users", &[("select", "*".into()), ("id", eq(user))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_user(&self, summary: &UserSummary) -> Result<(), StoreError> {
        self.insert("users", summary).await
    }

    async fn upsert_user(
        &self,
        user: &UserId,
        patch: &UserPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut summary = self
            .get_user(user)
            .await?
            .unwrap_or_else(|| UserSummary::new_for(user, at));
        patch.apply_to(&mut summary);
        summary.updated_at = Some(at);
        self.upsert("users", "id", &summary).await
    }

    async fn habits_on(&self, user: &UserId, date: NaiveDate) -> Result<Vec<HabitRecord>, StoreError> {
        self.select(
            "habits",
            &[
                ("select", "*".into()),
                ("user_id", eq(user)),
                ("date", eq(day(date))),
                ("order", "created_at.asc".into()),
            ],
        )
        .await
    }

    async fn find_habit(
        &self,
        user: &UserId,
        name: &str,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, StoreError> {
        let rows: Vec<HabitRecord> = self
            .select(
                "habits",
                &[
                    ("select", "*".into()),
                    ("user_id", eq(user)),
                    ("name", eq(name)),
                    ("date", eq(day(date))),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_habit(&self, record: &HabitRecord) -> Result<(), StoreError> {
        self.insert("habits", record).await
    }

    async fn update_habit(&self, id: &str, completed: bool) -> Result<usize, StoreError> {
        self.mutate(
            Method::PATCH,
            "habits",
            &[("id", eq(id))],
            Some(json!({ "completed": completed })),
        )
        .await
    }

    async fn delete_habits_named(&self, user: &UserId, name: &str) -> Result<usize, StoreError> {
        self.mutate(
            Method::DELETE,
            "habits",
            &[("user_id", eq(user)), ("name", eq(name))],
            None,
        )
        .await
    }

    async fn removed_habits(&self, user: &UserId) -> Result<Vec<String>, StoreError> {
        let rows: Vec<NameRow> = self
            .select(
                "removed_habits",
                &[
                    ("select", "name".into()),
                    ("user_id", eq(user)),
                    ("order", "removed_at.asc".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }

    async fn set_habit_removed(
        &self,
        user: &UserId,
        name: &str,
        removed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if removed {
            let body = json!({
                "user_id": user.as_str(),
                "name": name,
                "removed_at": at,
            });
            self.upsert("removed_habits", "user_id,name", &body).await
        } else {
            self.mutate(
                Method::DELETE,
                "removed_habits",
                &[("user_id", eq(user)), ("name", eq(name))],
                None,
            )
            .await
            .map(|_| ())
        }
    }

    async fn progress_on(&self, user: &UserId, date: NaiveDate) -> Result<Option<ProgressLog>, StoreError> {
        let rows: Vec<ProgressLog> = self
            .select(
                "progress_logs",
                &[
                    ("select", "*".into()),
                    ("user_id", eq(user)),
                    ("date", eq(day(date))),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn recent_progress(&self, user: &UserId, limit: usize) -> Result<Vec<ProgressLog>, StoreError> {
        self.select(
            "progress_logs",
            &[
                ("select", "*".into()),
                ("user_id", eq(user)),
                ("order", "date.desc".into()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn upsert_progress(
        &self,
        user: &UserId,
        date: NaiveDate,
        patch: &ProgressPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut log = self
            .progress_on(user, date)
            .await?
            .unwrap_or_else(|| ProgressLog::empty(user, date, at));
        patch.apply_to(&mut log);
        self.upsert("progress_logs", "user_id,date", &log).await
    }

    async fn insert_note(&self, note: &MindsetNote) -> Result<(), StoreError> {
        self.insert("mindset_notes", note).await
    }

    async fn list_notes(&self, user: &UserId) -> Result<Vec<MindsetNote>, StoreError> {
        self.select(
            "mindset_notes",
            &[
                ("select", "*".into()),
                ("user_id", eq(user)),
                ("order", "created_at.desc".into()),
            ],
        )
        .await
    }

    async fn delete_note(&self, user: &UserId, id: &str) -> Result<usize, StoreError> {
        self.mutate(
            Method::DELETE,
            "mindset_notes",
            &[("id", eq(id)), ("user_id", eq(user))],
            None,
        )
        .await
    }
}
