//! Fetch/mutate/re-sync loop for one paginated remote collection.

use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{Draft, RecordId, Resource},
    error::ValidationError,
    protocol::PageQuery,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    api::CollectionApi,
    error::{ApiFailure, ControllerError},
    normalize::normalize,
    notify::{Notification, NotificationSink},
    paging::{ApplyOutcome, CollectionPage, FetchTicket, PageSnapshot},
};

/// Hook the surrounding UI uses to close its create/edit dialog.
pub type DialogCloser = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Success,
    Failure(String),
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Applied,
    /// A newer request took over before this one finished.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }

    fn failure_verb(self) -> &'static str {
        match self {
            Self::Create | Self::Update => "saving",
            Self::Delete => "deleting",
        }
    }
}

pub struct ResourceController<R: Resource> {
    api: Arc<dyn CollectionApi>,
    sink: Arc<dyn NotificationSink>,
    dialog_closer: Option<DialogCloser>,
    state: Mutex<CollectionPage<R>>,
}

impl<R: Resource> ResourceController<R> {
    pub fn new(
        api: Arc<dyn CollectionApi>,
        sink: Arc<dyn NotificationSink>,
        page_size: u32,
    ) -> Result<Self, ControllerError> {
        Ok(Self {
            api,
            sink,
            dialog_closer: None,
            state: Mutex::new(CollectionPage::new(page_size)?),
        })
    }

    pub fn with_dialog_closer(mut self, closer: DialogCloser) -> Self {
        self.dialog_closer = Some(closer);
        self
    }

    pub async fn snapshot(&self) -> PageSnapshot<R> {
        self.state.lock().await.snapshot()
    }

    /// Loads page `page`. Pages outside `1..=total_pages` are rejected without
    /// touching the state.
    pub async fn request_page(&self, page: u32) -> Result<FetchStatus, ControllerError> {
        let ticket = self.state.lock().await.begin_fetch(page)?;
        self.run_fetch(ticket).await
    }

    /// Reloads whatever page is current.
    pub async fn refresh(&self) -> Result<FetchStatus, ControllerError> {
        let ticket = {
            let mut state = self.state.lock().await;
            let current = state.current_page();
            state.begin_fetch(current)?
        };
        self.run_fetch(ticket).await
    }

    async fn run_fetch(&self, mut ticket: FetchTicket) -> Result<FetchStatus, ControllerError> {
        // Each step back lands on a strictly lower page, and page 1 never overshoots.
        loop {
            let page_size = self.state.lock().await.page_size();
            let query = PageQuery {
                page: ticket.page(),
                limit: page_size,
            };

            match self.api.list(query).await {
                Ok(raw) => {
                    let response = normalize::<R>(raw);
                    let mut state = self.state.lock().await;
                    match state.apply_success(ticket, response) {
                        ApplyOutcome::Applied => {
                            debug!(
                                resource = R::KIND.path(),
                                page = ticket.page(),
                                total_count = state.total_count(),
                                "page loaded"
                            );
                            return Ok(FetchStatus::Applied);
                        }
                        ApplyOutcome::Stale => {
                            debug!(resource = R::KIND.path(), page = ticket.page(), "discarding stale page");
                            return Ok(FetchStatus::Superseded);
                        }
                        ApplyOutcome::Overshot { last_page } => {
                            info!(
                                resource = R::KIND.path(),
                                requested = ticket.page(),
                                last_page,
                                "collection shrank below requested page; stepping back"
                            );
                            ticket = state.begin_fetch(last_page)?;
                        }
                    }
                }
                Err(failure) => {
                    let applied = self.state.lock().await.apply_failure(ticket);
                    if !applied {
                        return Ok(FetchStatus::Superseded);
                    }
                    error!(
                        resource = R::KIND.path(),
                        page = ticket.page(),
                        error = %failure,
                        "failed to fetch collection page"
                    );
                    self.sink.notify(Notification::error(format!(
                        "Error fetching {}",
                        R::KIND.plural()
                    )));
                    return Err(failure.into());
                }
            }
        }
    }

    pub async fn create(&self, draft: R::Draft) -> MutationOutcome {
        let payload = match self.prepare_payload(draft) {
            Ok(payload) => payload,
            Err(message) => return self.fail(message),
        };
        let result = self.api.create(payload).await;
        self.finish(MutationKind::Create, result, None).await
    }

    pub async fn update(&self, id: Option<RecordId>, draft: R::Draft) -> MutationOutcome {
        let Some(id) = RecordId::usable(id) else {
            return self.fail(missing_id::<R>().to_string());
        };
        let payload = match self.prepare_payload(draft) {
            Ok(payload) => payload,
            Err(message) => return self.fail(message),
        };
        let result = self.api.update(id, payload).await;
        self.finish(MutationKind::Update, result, None).await
    }

    pub async fn delete(&self, id: Option<RecordId>) -> MutationOutcome {
        let Some(id) = RecordId::usable(id) else {
            return self.fail(missing_id::<R>().to_string());
        };
        let result = self.api.delete(id).await;
        self.finish(MutationKind::Delete, result, Some(id)).await
    }

    fn prepare_payload(&self, draft: R::Draft) -> Result<Value, String> {
        let draft = draft.prepare().map_err(|err| err.to_string())?;
        serde_json::to_value(&draft).map_err(|err| {
            error!(resource = R::KIND.path(), error = %err, "failed to encode draft");
            format!("failed to encode {}: {err}", R::KIND.singular())
        })
    }

    fn fail(&self, message: String) -> MutationOutcome {
        self.sink.notify(Notification::error(message.clone()));
        MutationOutcome::Failure(message)
    }

    async fn finish(
        &self,
        kind: MutationKind,
        result: Result<Value, ApiFailure>,
        deleted: Option<RecordId>,
    ) -> MutationOutcome {
        if let Err(failure) = result {
            error!(
                resource = R::KIND.path(),
                operation = kind.past_tense(),
                error = %failure,
                "collection mutation failed"
            );
            return self.fail(format!(
                "Error {} {}: {}",
                kind.failure_verb(),
                R::KIND.singular(),
                failure.user_message()
            ));
        }

        self.sink.notify(Notification::success(format!(
            "{} {} successfully",
            capitalize(R::KIND.singular()),
            kind.past_tense()
        )));
        if let Some(closer) = &self.dialog_closer {
            closer();
        }

        let target_page = {
            let state = self.state.lock().await;
            match deleted {
                Some(_) => state.page_after_delete(),
                None => state.current_page(),
            }
        };
        if let Some(id) = deleted {
            debug!(resource = R::KIND.path(), id = id.0, target_page, "reloading after delete");
        }
        // Fetch failures are already reported through the sink.
        let _ = self.request_page(target_page).await;

        MutationOutcome::Success
    }
}

fn missing_id<R: Resource>() -> ValidationError {
    ValidationError::MissingId {
        resource: R::KIND.singular(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
