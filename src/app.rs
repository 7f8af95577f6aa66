//! The host shell: owns the open [`Document`] and talks to the
//! persistence service on its behalf.

use std::time::Instant;

use sheetwise_core::workbook::DEFAULT_TITLE;
use sheetwise_core::{ClearMode, Document, KeyInput};
use tracing::{info, warn};
use uuid::Uuid;

use crate::debounce::Debouncer;
use crate::error::{AppError, PersistenceError, Result};
use crate::keymap::{HostAction, Keymap};
use crate::notify::{Notification, Notifier};
use crate::persistence::{PersistenceService, SaveRequest, Session};
use crate::settings::Settings;

/// Navigation the embedding UI has to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppSignal {
    RedirectToLogin,
    ReturnToDashboard,
}

pub struct App<S> {
    service: S,
    document: Document,
    keymap: Keymap,
    title_debounce: Debouncer<String>,
    notifier: Notifier,
    signals: Vec<AppSignal>,
}

impl<S: PersistenceService> App<S> {
    /// Build the host from loaded settings. Keymap warnings are returned
    /// for display; they never stop startup.
    pub fn new(service: S, settings: &Settings) -> (Self, Vec<String>) {
        let (keymap, warnings) = Keymap::with_overrides(&settings.bindings);
        let mut document = Document::with_dims(settings.dims());
        document.set_error_duration(settings.error_flash());
        let app = App {
            service,
            document,
            keymap,
            title_debounce: Debouncer::new(settings.title_debounce()),
            notifier: Notifier::new(settings.notification_duration()),
            signals: Vec::new(),
        };
        (app, warnings)
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn notification(&self, now: Instant) -> Option<&Notification> {
        self.notifier.current(now)
    }

    /// Drain pending navigation signals.
    pub fn take_signals(&mut self) -> Vec<AppSignal> {
        std::mem::take(&mut self.signals)
    }

    /// Host bindings first, then the document. Returns whether the key was
    /// consumed.
    pub fn handle_key(&mut self, input: KeyInput, now: Instant) -> Result<bool> {
        if let Some(action) = self.keymap.action_for(&input) {
            self.perform(action, now)?;
            return Ok(true);
        }
        Ok(self.document.key(input)?)
    }

    pub fn perform(&mut self, action: HostAction, now: Instant) -> Result<()> {
        match action {
            HostAction::Save => {
                self.save(now)?;
            }
            HostAction::ClearSelection => self.document.clear_selection(ClearMode::All)?,
            toggle => {
                if let Some(key) = toggle.style_key() {
                    self.document.toggle_style_on_selection(key)?;
                }
            }
        }
        Ok(())
    }

    /// Save the active sheet and the workbook title as they are now. A failed
    /// save leaves the edits in place and shows a notification; returns
    /// whether the save went through.
    pub fn save(&mut self, now: Instant) -> Result<bool> {
        self.document.commit_edit()?;
        let request = self.save_request(Some(self.document.title().to_string()))?;
        self.submit(request, now)
    }

    /// Rename the workbook locally; the service hears about it once the
    /// title has been quiet for the debounce delay.
    pub fn set_title(&mut self, title: &str, now: Instant) {
        self.document.set_title(title);
        self.title_debounce.schedule(title.to_string(), now);
    }

    /// Drive time-based work. Returns whether a debounced title save ran.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        let Some(title) = self.title_debounce.poll(now) else {
            return Ok(false);
        };
        let request = self.save_request(Some(title))?;
        self.submit(request, now)?;
        Ok(true)
    }

    pub fn open(&mut self, id: Uuid, now: Instant) -> Result<()> {
        let workbook = self.call(now, |service, session| {
            service.fetch_workbook(session, id)
        })?;
        self.title_debounce.cancel();
        self.document.load_workbook(workbook)?;
        Ok(())
    }

    /// Create a workbook on the service and open it.
    pub fn new_workbook(&mut self, now: Instant) -> Result<Uuid> {
        let workbook = self.call(now, |service, session| {
            service.create_workbook(session, DEFAULT_TITLE)
        })?;
        let id = workbook.id;
        self.title_debounce.cancel();
        self.document.load_workbook(workbook)?;
        Ok(id)
    }

    /// Create the next sheet on the service and switch to it.
    pub fn add_sheet(&mut self, now: Instant) -> Result<u32> {
        let workbook_id = self.document.workbook().id;
        let sheet = self.call(now, |service, session| {
            service.create_sheet(session, workbook_id)
        })?;
        Ok(self.document.insert_sheet(sheet)?)
    }

    pub fn delete_workbook(&mut self, now: Instant) -> Result<()> {
        let id = self.document.workbook().id;
        self.call(now, |service, session| service.delete_workbook(session, id))?;
        self.title_debounce.cancel();
        self.signals.push(AppSignal::ReturnToDashboard);
        Ok(())
    }

    fn save_request(&self, title: Option<String>) -> Result<SaveRequest> {
        let sheet = self.document.active_sheet()?;
        Ok(SaveRequest {
            workbook_id: self.document.workbook().id,
            sheet_id: sheet.id,
            data: self.document.snapshot_active_sheet()?,
            title,
        })
    }

    fn submit(&mut self, request: SaveRequest, now: Instant) -> Result<bool> {
        let workbook = request.workbook_id;
        let sheet = request.sheet_id;
        match self.call(now, |service, session| service.save_sheet(session, request)) {
            Ok(()) => {
                info!(%workbook, %sheet, "saved");
                self.document.mark_saved();
                self.notifier.saved(now);
                Ok(true)
            }
            Err(AppError::Persistence(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Run a service call under the current session, reporting failures:
    /// not-authenticated becomes a redirect, anything else a notification.
    fn call<T>(
        &mut self,
        now: Instant,
        f: impl FnOnce(&mut S, &Session) -> std::result::Result<T, PersistenceError>,
    ) -> Result<T> {
        let result = match self.service.session() {
            Some(session) => f(&mut self.service, &session),
            None => Err(PersistenceError::NotAuthenticated),
        };
        result.map_err(|err| {
            self.report(&err, now);
            AppError::from(err)
        })
    }

    fn report(&mut self, err: &PersistenceError, now: Instant) {
        match err {
            PersistenceError::NotAuthenticated => {
                warn!("not authenticated; redirecting to login");
                if !self.signals.contains(&AppSignal::RedirectToLogin) {
                    self.signals.push(AppSignal::RedirectToLogin);
                }
            }
            other => {
                warn!(error = %other, "persistence call failed");
                self.notifier.error(other.to_string(), now);
            }
        }
    }
}
