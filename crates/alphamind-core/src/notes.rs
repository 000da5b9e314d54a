//! Mindset notes: append-only reflections, listed newest first.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{CoreError, StoreError, ValidationError};
use crate::model::{MindsetNote, UserId};
use crate::storage::Store;

/// Cached note list for one user. Every write is followed by a full reload,
/// which is not atomic with the write.
pub struct NotesManager<S> {
    store: Arc<S>,
    user: UserId,
    clock: Arc<dyn Clock>,
    notes: Vec<MindsetNote>,
}

impl<S: Store> NotesManager<S> {
    pub fn new(store: Arc<S>, user: UserId, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            user,
            clock,
            notes: Vec::new(),
        }
    }

    pub fn notes(&self) -> &[MindsetNote] {
        &self.notes
    }

    pub async fn load(&mut self) -> Result<&[MindsetNote], StoreError> {
        self.notes = self.store.list_notes(&self.user).await?;
        Ok(&self.notes)
    }

    pub async fn save(&mut self, content: &str) -> Result<&[MindsetNote], CoreError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::Empty { field: "note" }.into());
        }
        let note = MindsetNote::new(&self.user, content, self.clock.now());
        self.store
            .insert_note(&note)
            .await
            .inspect_err(|e| tracing::warn!(user_id = %self.user, error = %e, "note insert failed"))?;
        Ok(self.load().await?)
    }

    pub async fn delete(&mut self, id: &str) -> Result<&[MindsetNote], CoreError> {
        let deleted = self
            .store
            .delete_note(&self.user, id)
            .await
            .inspect_err(|e| tracing::warn!(user_id = %self.user, error = %e, "note delete failed"))?;
        if deleted == 0 {
            tracing::debug!(user_id = %self.user, note_id = id, "no note to delete");
        }
        Ok(self.load().await?)
    }
}
