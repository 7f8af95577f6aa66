//! Persistence/auth collaborator: the calls the host makes against the
//! backend, plus an in-memory implementation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sheetwise_core::{Sheet, Workbook};
use tracing::debug;
use uuid::Uuid;

use crate::error::PersistenceError;

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// A signed-in user and the bearer token sent with every call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
}

/// One sheet's cells, optionally with a new workbook title.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub workbook_id: Uuid,
    pub sheet_id: Uuid,
    pub data: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

pub trait PersistenceService {
    /// The current session, if any.
    fn session(&self) -> Option<Session>;

    /// Create a workbook owned by the session's user, holding sheet 1.
    fn create_workbook(&mut self, session: &Session, title: &str) -> Result<Workbook>;

    fn fetch_workbook(&self, session: &Session, id: Uuid) -> Result<Workbook>;

    /// Create the next sheet (max sheet number + 1) in a workbook.
    fn create_sheet(&mut self, session: &Session, workbook_id: Uuid) -> Result<Sheet>;

    fn save_sheet(&mut self, session: &Session, request: SaveRequest) -> Result<()>;

    /// Soft delete: the workbook is kept but no longer fetchable.
    fn delete_workbook(&mut self, session: &Session, id: Uuid) -> Result<()>;
}

#[derive(Debug)]
struct StoredWorkbook {
    workbook: Workbook,
    deleted_at: Option<DateTime<Utc>>,
}

/// In-memory backend. Sessions are issued by [`MemoryStore::sign_in`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: Option<Session>,
    tokens: HashMap<String, String>,
    workbooks: HashMap<Uuid, StoredWorkbook>,
    unavailable: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, user_id: &str) -> Session {
        let session = Session {
            user_id: user_id.to_string(),
            access_token: Uuid::new_v4().to_string(),
        };
        self.tokens
            .insert(session.access_token.clone(), session.user_id.clone());
        self.current = Some(session.clone());
        session
    }

    /// Drop the current session and revoke its token.
    pub fn sign_out(&mut self) {
        if let Some(session) = self.current.take() {
            self.tokens.remove(&session.access_token);
        }
    }

    /// Make every authorized call fail with `Unavailable(reason)`, or
    /// restore service with `None`.
    pub fn set_unavailable(&mut self, reason: Option<&str>) {
        self.unavailable = reason.map(str::to_string);
    }

    /// A stored workbook regardless of owner or deletion.
    pub fn stored(&self, id: Uuid) -> Option<&Workbook> {
        self.workbooks.get(&id).map(|s| &s.workbook)
    }

    pub fn deleted_at(&self, id: Uuid) -> Option<DateTime<Utc>> {
        self.workbooks.get(&id).and_then(|s| s.deleted_at)
    }

    fn authorize(&self, session: &Session) -> Result<()> {
        match self.tokens.get(&session.access_token) {
            Some(user) if *user == session.user_id => {}
            _ => return Err(PersistenceError::NotAuthenticated),
        }
        match &self.unavailable {
            Some(reason) => Err(PersistenceError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn visible(stored: &StoredWorkbook, session: &Session) -> bool {
        stored.deleted_at.is_none()
            && stored.workbook.user_id.as_deref() == Some(session.user_id.as_str())
    }

    fn owned(&self, session: &Session, id: Uuid) -> Result<&StoredWorkbook> {
        self.authorize(session)?;
        self.workbooks
            .get(&id)
            .filter(|s| Self::visible(s, session))
            .ok_or(PersistenceError::WorkbookNotFound(id))
    }

    fn owned_mut(&mut self, session: &Session, id: Uuid) -> Result<&mut StoredWorkbook> {
        self.authorize(session)?;
        self.workbooks
            .get_mut(&id)
            .filter(|s| Self::visible(s, session))
            .ok_or(PersistenceError::WorkbookNotFound(id))
    }
}

impl PersistenceService for MemoryStore {
    fn session(&self) -> Option<Session> {
        self.current.clone()
    }

    fn create_workbook(&mut self, session: &Session, title: &str) -> Result<Workbook> {
        self.authorize(session)?;
        let mut workbook = Workbook::new(title);
        workbook.user_id = Some(session.user_id.clone());
        debug!(workbook = %workbook.id, "workbook created");
        self.workbooks.insert(
            workbook.id,
            StoredWorkbook {
                workbook: workbook.clone(),
                deleted_at: None,
            },
        );
        Ok(workbook)
    }

    fn fetch_workbook(&self, session: &Session, id: Uuid) -> Result<Workbook> {
        Ok(self.owned(session, id)?.workbook.clone())
    }

    fn create_sheet(&mut self, session: &Session, workbook_id: Uuid) -> Result<Sheet> {
        let stored = self.owned_mut(session, workbook_id)?;
        let number = stored.workbook.add_sheet(Uuid::new_v4());
        let sheet = stored
            .workbook
            .sheet(number)
            .cloned()
            .ok_or(PersistenceError::WorkbookNotFound(workbook_id))?;
        debug!(workbook = %workbook_id, sheet = number, "sheet created");
        Ok(sheet)
    }

    fn save_sheet(&mut self, session: &Session, request: SaveRequest) -> Result<()> {
        let stored = self.owned_mut(session, request.workbook_id)?;
        let number = stored
            .workbook
            .sheets()
            .iter()
            .find(|s| s.id == request.sheet_id)
            .map(|s| s.sheet_number)
            .ok_or(PersistenceError::SheetNotFound(request.sheet_id))?;
        let sheet = stored
            .workbook
            .sheet_mut(number)
            .ok_or(PersistenceError::SheetNotFound(request.sheet_id))?;
        sheet.load_data(&request.data)?;
        sheet.updated_at = Utc::now();
        if let Some(title) = request.title {
            stored.workbook.title = title;
        }
        Ok(())
    }

    fn delete_workbook(&mut self, session: &Session, id: Uuid) -> Result<()> {
        let stored = self.owned_mut(session, id)?;
        stored.deleted_at = Some(Utc::now());
        debug!(workbook = %id, "workbook deleted");
        Ok(())
    }
}
