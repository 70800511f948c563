use std::sync::Arc;

use uuid::Uuid;

use super::{Session, WorkspaceResult};
use crate::clock::Clock;
use crate::domain::{search_notes, CreateNote, Note, UpdateNote};
use crate::store::{NoteRepository, StoreResult};

pub struct NoteWorkspace {
    repo: Arc<dyn NoteRepository>,
    clock: Arc<dyn Clock>,
}

impl NoteWorkspace {
    pub fn new(repo: Arc<dyn NoteRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub(crate) async fn load(&self, user_id: Uuid) -> StoreResult<Vec<Note>> {
        self.repo.list_notes(user_id).await
    }

    /// Newest first, optionally narrowed by a search term
    pub async fn list(&self, session: &Session, search: Option<&str>) -> WorkspaceResult<Vec<Note>> {
        let Some(user_id) = session.user_id() else {
            return Ok(Vec::new());
        };

        let notes = self.load(user_id).await?;
        Ok(search_notes(&notes, search.unwrap_or_default())
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn get(&self, session: &Session, id: Uuid) -> WorkspaceResult<Option<Note>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        Ok(self.repo.get_note(user_id, id).await?)
    }

    pub async fn create(&self, session: &Session, input: CreateNote) -> WorkspaceResult<Option<Note>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        input.validate()?;

        let note = Note::new(user_id, input, self.clock.now());
        Ok(Some(self.repo.insert_note(&note).await?))
    }

    pub async fn update(
        &self,
        session: &Session,
        id: Uuid,
        patch: UpdateNote,
    ) -> WorkspaceResult<Option<Note>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        patch.validate()?;

        Ok(self.repo.update_note(user_id, id, &patch).await?)
    }

    pub async fn delete(&self, session: &Session, id: Uuid) -> WorkspaceResult<bool> {
        let Some(user_id) = session.user_id() else {
            return Ok(false);
        };
        Ok(self.repo.delete_note(user_id, id).await?)
    }
}
