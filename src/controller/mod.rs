//! The resource list controller: one cached collection per resource type,
//! kept in step with the server through load and mutation operations.

pub mod state;


use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use crate::api::client::{ApiError, ResourceApi};
use crate::auth::{Anonymous, AuthContext};
use crate::capabilities::{ConfirmPrompt, Confirmer};
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::error::ControllerError;
use crate::identity::{decode_record, RecordId};
use crate::models::parse_datetime;
use crate::query::{self, ListQuery};
use crate::resource::Resource;

pub use state::{ListState, Mode, OperationKey, OperationKind, OperationStatus, Phase};

/// Result of a confirmed-delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// The user declined; nothing was sent.
    Declined,
}

pub struct ControllerBuilder<R: Resource> {
    api: Arc<dyn ResourceApi>,
    auth: Arc<dyn AuthContext>,
    timeout: Duration,
    fallback: Option<Vec<Value>>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ControllerBuilder<R> {
    pub fn auth(mut self, auth: Arc<dyn AuthContext>) -> Self {
        self.auth = auth;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Raw records to show when a load fails with a network error.
    pub fn offline_fallback(mut self, records: Vec<Value>) -> Self {
        self.fallback = Some(records);
        self
    }

    pub fn build(self) -> ResourceController<R> {
        let (state, _) = watch::channel(ListState::default());
        ResourceController {
            api: self.api,
            auth: self.auth,
            state,
            timeout: self.timeout,
            fallback: self.fallback,
            load_generation: AtomicU64::new(0),
            create_seq: AtomicU64::new(0),
            journal: Mutex::new(Journal {
                epoch: 0,
                loads_in_flight: 0,
                changes: Vec::new(),
            }),
            detached: AtomicBool::new(false),
        }
    }
}

/// Owns the cached collection for resource `R`.
///
/// The cache is only ever changed by the operations below. Views read it via
/// [`snapshot`](Self::snapshot), [`view`](Self::view) or a
/// [`subscribe`](Self::subscribe)d receiver that changes on every update.
pub struct ResourceController<R: Resource> {
    api: Arc<dyn ResourceApi>,
    auth: Arc<dyn AuthContext>,
    state: watch::Sender<ListState<R>>,
    timeout: Duration,
    fallback: Option<Vec<Value>>,
    load_generation: AtomicU64,
    create_seq: AtomicU64,
    journal: Mutex<Journal<R>>,
    detached: AtomicBool,
}

impl<R: Resource> ResourceController<R> {
    pub fn builder(api: Arc<dyn ResourceApi>) -> ControllerBuilder<R> {
        ControllerBuilder {
            api,
            auth: Arc::new(Anonymous),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fallback: None,
            _resource: PhantomData,
        }
    }

    /// HTTP-backed controller configured from `config`.
    #[cfg(feature = "http")]
    pub fn from_config(
        config: &crate::config::ClientConfig,
        client: reqwest::Client,
        auth: Arc<dyn AuthContext>,
    ) -> Result<Self, ControllerError> {
        let base_url = config
            .base_url()
            .map_err(|e| ControllerError::Config(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ControllerError::Config(format!(
                "base_url '{base_url}' cannot hold a path"
            )));
        }
        let api = crate::api::http::HttpResourceApi::for_resource::<R>(client, &base_url, auth.clone())?;

        let mut builder = Self::builder(Arc::new(api))
            .auth(auth)
            .timeout(Duration::from_secs(config.request_timeout_secs));
        if config.offline_fallback {
            if let Some(records) = R::offline_fallback() {
                builder = builder.offline_fallback(records);
            }
        }
        Ok(builder.build())
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<R>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ListState<R> {
        self.state.borrow().clone()
    }

    pub fn records(&self) -> Vec<R> {
        self.state.borrow().records.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn mode(&self) -> Mode {
        self.state.borrow().mode
    }

    pub fn is_pending(&self, id: &RecordId) -> bool {
        self.state.borrow().is_pending(id)
    }

    /// Filtered and sorted copy of the cache.
    pub fn view(&self, query: &ListQuery) -> Vec<R> {
        let state = self.state.borrow();
        query::apply(&state.records, query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Clear an operation banner. Pending operations cannot be dismissed.
    pub fn dismiss(&self, key: &OperationKey) {
        self.state.send_if_modified(|s| match s.operations.get(key) {
            Some(OperationStatus::Pending) | None => false,
            Some(_) => {
                s.operations.remove(key);
                true
            }
        });
    }

    /// The consuming view is gone: responses still in flight are dropped
    /// without touching state.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Fetch the collection and replace the cache with the server's copy.
    ///
    /// On failure the previous records stay in place. With an offline
    /// fallback configured, a network failure switches to [`Mode::Offline`]
    /// instead of erroring.
    ///
    /// Mutations that settle while the request is in flight are replayed onto
    /// the fetched records, so a response read before them cannot undo them.
    pub async fn load(&self) -> Result<Mode, ControllerError> {
        if self.is_detached() {
            return Err(ControllerError::Detached);
        }
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let ticket = LoadTicket::issue(self);
        self.state.send_modify(|s| s.phase = Phase::Loading);

        let result = self.call(self.api.list()).await;

        if self.is_detached() {
            return Err(ControllerError::Detached);
        }
        if self.load_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(resource = R::NAME, "Discarding superseded load response");
            return Ok(self.mode());
        }

        match result {
            Ok(raw) => {
                let mut records = decode_collection::<R>(raw);
                let journal = self.journal();
                let replayed = journal.replay_since(ticket.epoch, &mut records);
                if replayed > 0 {
                    tracing::debug!(resource = R::NAME, replayed, "Re-applied mutations settled during load");
                }
                tracing::info!(resource = R::NAME, count = records.len(), "Collection loaded");
                self.state.send_modify(|s| {
                    s.records = records;
                    s.phase = Phase::Ready;
                    s.mode = Mode::Online;
                    s.load_error = None;
                });
                drop(journal);
                Ok(Mode::Online)
            }
            Err(err @ ControllerError::Network(_)) if self.fallback.is_some() => {
                tracing::warn!(resource = R::NAME, "API unreachable, showing offline data: {err}");
                let fallback = self.fallback.clone().unwrap_or_default();
                self.state.send_modify(|s| {
                    if s.records.is_empty() {
                        s.records = decode_collection::<R>(fallback);
                    }
                    s.phase = Phase::Ready;
                    s.mode = Mode::Offline;
                    s.load_error = Some(err);
                });
                Ok(Mode::Offline)
            }
            Err(err) => {
                tracing::warn!(resource = R::NAME, "Failed to load collection: {err}");
                self.state.send_modify(|s| {
                    s.phase = Phase::Errored;
                    s.load_error = Some(err.clone());
                });
                Err(err)
            }
        }
    }

    /// Validate locally, POST, and append the record the server returns.
    pub async fn create(&self, draft: R::Draft) -> Result<R, ControllerError> {
        R::validate(&draft).map_err(ControllerError::Validation)?;
        self.check_mutable()?;
        let body = encode_draft::<R>(&draft)?;

        let seq = self.create_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = self.begin(OperationKey::create(seq))?;
        let result = self
            .call(self.api.create(body))
            .await
            .and_then(decode_record::<R>);

        if self.is_detached() {
            guard.abandon();
            return Err(ControllerError::Detached);
        }
        match result {
            Ok(record) => {
                tracing::info!(resource = R::NAME, id = %record.id(), "Record created");
                guard.settle(OperationStatus::Applied, Some(Change::Upsert(record.clone())));
                Ok(record)
            }
            Err(err) => Err(guard.fail(err)),
        }
    }

    /// PUT the draft and replace the cached record with the server's version.
    pub async fn update(&self, id: &RecordId, draft: R::Draft) -> Result<R, ControllerError> {
        self.require_known(id)?;
        R::validate(&draft).map_err(ControllerError::Validation)?;
        self.check_mutable()?;
        let body = encode_draft::<R>(&draft)?;

        let guard = self.begin(OperationKey::on(OperationKind::Update, id))?;
        let result = self
            .call(self.api.update(id, body))
            .await
            .and_then(decode_record::<R>);

        if self.is_detached() {
            guard.abandon();
            return Err(ControllerError::Detached);
        }
        match result {
            Ok(record) => {
                if record.id() != id {
                    tracing::warn!(
                        resource = R::NAME,
                        requested = %id,
                        returned = %record.id(),
                        "Server returned a different identity for update"
                    );
                }
                tracing::info!(resource = R::NAME, %id, "Record updated");
                guard.settle(
                    OperationStatus::Applied,
                    Some(Change::Replace {
                        id: id.clone(),
                        record: record.clone(),
                    }),
                );
                Ok(record)
            }
            Err(err) => Err(guard.fail(err)),
        }
    }

    /// PATCH the toggle route and copy the server's flag and `updatedAt`
    /// into the cached record.
    pub async fn toggle_flag(&self, id: &RecordId) -> Result<R, ControllerError> {
        self.require_known(id)?;
        self.check_mutable()?;

        let guard = self.begin(OperationKey::on(OperationKind::Toggle, id))?;
        let result = self
            .call(self.api.toggle(id))
            .await
            .and_then(toggled_fields);

        if self.is_detached() {
            guard.abandon();
            return Err(ControllerError::Detached);
        }
        match result {
            Ok((active, updated_at)) => {
                tracing::info!(resource = R::NAME, %id, active, "Record toggled");
                guard.settle(
                    OperationStatus::Applied,
                    Some(Change::Flag {
                        id: id.clone(),
                        active,
                        updated_at,
                    }),
                );
                let toggled = self.state.borrow().find(id).cloned();
                toggled.ok_or_else(|| {
                    ControllerError::MissingIdentity(format!(
                        "{} record {id} disappeared while toggling",
                        R::NAME
                    ))
                })
            }
            Err(err) => Err(guard.fail(err)),
        }
    }

    /// Ask for confirmation, DELETE, and drop the record once the server
    /// acknowledges.
    pub async fn remove(
        &self,
        id: &RecordId,
        confirmer: &dyn Confirmer,
    ) -> Result<Removal, ControllerError> {
        self.require_known(id)?;
        self.check_mutable()?;

        let guard = self.begin(OperationKey::on(OperationKind::Remove, id))?;
        let prompt = {
            let state = self.state.borrow();
            let name = state.find(id).map(|r| r.display_name().to_string());
            ConfirmPrompt::delete(R::NAME, name.as_deref().unwrap_or(id.as_str()))
        };
        if !confirmer.confirm(&prompt).await {
            tracing::debug!(resource = R::NAME, %id, "Delete declined");
            guard.abandon();
            return Ok(Removal::Declined);
        }

        let result = self.call(self.api.delete(id)).await;

        if self.is_detached() {
            guard.abandon();
            return Err(ControllerError::Detached);
        }
        match result {
            Ok(()) => {
                tracing::info!(resource = R::NAME, %id, "Record deleted");
                guard.settle(OperationStatus::Applied, Some(Change::Remove(id.clone())));
                Ok(Removal::Removed)
            }
            Err(err) => Err(guard.fail(err)),
        }
    }

    fn journal(&self) -> MutexGuard<'_, Journal<R>> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ControllerError> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result.map_err(ControllerError::from),
            Err(_) => Err(ControllerError::Network(format!(
                "request timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Identity must be resolvable and present in the cache before any
    /// network call.
    fn require_known(&self, id: &RecordId) -> Result<(), ControllerError> {
        if id.as_str().trim().is_empty() {
            tracing::error!(resource = R::NAME, "Mutation requested with a blank identity");
            return Err(ControllerError::MissingIdentity(format!(
                "blank identity for {}",
                R::NAME
            )));
        }
        if !self.state.borrow().contains(id) {
            tracing::error!(resource = R::NAME, %id, "Mutation requested for an unknown identity");
            return Err(ControllerError::MissingIdentity(format!(
                "{} has no record {id}",
                R::NAME
            )));
        }
        Ok(())
    }

    fn check_mutable(&self) -> Result<(), ControllerError> {
        if self.is_detached() {
            return Err(ControllerError::Detached);
        }
        if !self.auth.is_authenticated() {
            return Err(ControllerError::Unauthenticated);
        }
        if self.mode() == Mode::Offline {
            return Err(ControllerError::Offline);
        }
        Ok(())
    }

    /// Mark an operation pending, refusing a second one on the same identity.
    fn begin(&self, key: OperationKey) -> Result<PendingGuard<'_, R>, ControllerError> {
        let mut busy = false;
        self.state.send_if_modified(|s| {
            if let Some(target) = &key.target {
                if s.is_pending(target) {
                    busy = true;
                    return false;
                }
            }
            s.operations.insert(key.clone(), OperationStatus::Pending);
            true
        });

        match (busy, &key.target) {
            (true, Some(target)) => {
                tracing::debug!(resource = R::NAME, id = %target, "Operation already pending");
                Err(ControllerError::Busy(target.to_string()))
            }
            _ => Ok(PendingGuard {
                controller: self,
                key,
                settled: false,
            }),
        }
    }
}

/// Releases an operation's pending mark, also when the operation's future is
/// dropped mid-flight.
struct PendingGuard<'a, R: Resource> {
    controller: &'a ResourceController<R>,
    key: OperationKey,
    settled: bool,
}

impl<R: Resource> PendingGuard<'_, R> {
    /// Apply a change to the cache and record the operation outcome in a
    /// single state update. The change is journaled for loads in flight.
    fn settle(mut self, status: OperationStatus, change: Option<Change<R>>) {
        self.settled = true;
        let key = self.key.clone();
        let mut journal = self.controller.journal();
        if let Some(change) = &change {
            journal.record(change);
        }
        self.controller.state.send_modify(|s| {
            if let Some(change) = &change {
                change.apply(&mut s.records);
            }
            s.operations.insert(key, status);
        });
    }

    fn fail(self, err: ControllerError) -> ControllerError {
        match &err {
            ControllerError::MissingIdentity(msg) => {
                tracing::error!(resource = R::NAME, "Server response lacks identity: {msg}")
            }
            other => tracing::warn!(resource = R::NAME, kind = ?self.key.kind, "Operation failed: {other}"),
        }
        self.settle(OperationStatus::Failed(err.clone()), None);
        err
    }

    /// Forget the operation without recording an outcome.
    fn abandon(self) {}
}

impl<R: Resource> Drop for PendingGuard<'_, R> {
    fn drop(&mut self) {
        if self.settled || self.controller.is_detached() {
            return;
        }
        let key = &self.key;
        self.controller.state.send_if_modified(|s| {
            if s.operations.get(key) == Some(&OperationStatus::Pending) {
                s.operations.remove(key);
                true
            } else {
                false
            }
        });
    }
}

/// A settled mutation's effect on the cached records.
#[derive(Debug, Clone)]
enum Change<R> {
    /// Insert, or replace the record with the same identity.
    Upsert(R),
    /// Put `record` in the slot of `id`. Any other entry carrying the
    /// record's identity is dropped, so identities stay unique.
    Replace { id: RecordId, record: R },
    Flag {
        id: RecordId,
        active: bool,
        updated_at: Option<DateTime<Utc>>,
    },
    Remove(RecordId),
}

impl<R: Resource> Change<R> {
    fn apply(&self, records: &mut Vec<R>) {
        match self {
            Change::Upsert(record) => match records.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            },
            Change::Replace { id, record } => {
                let Some(slot) = records.iter().position(|r| r.id() == id) else {
                    return;
                };
                records[slot] = record.clone();
                let mut index = 0;
                records.retain(|r| {
                    let keep = index == slot || r.id() != record.id();
                    index += 1;
                    keep
                });
            }
            Change::Flag {
                id,
                active,
                updated_at,
            } => {
                if let Some(slot) = records.iter_mut().find(|r| r.id() == id) {
                    slot.set_active(*active);
                    if updated_at.is_some() {
                        slot.set_updated_at(*updated_at);
                    }
                }
            }
            Change::Remove(id) => records.retain(|r| r.id() != id),
        }
    }
}

/// Changes settled while at least one load is in flight, tagged with the
/// epoch they settled in.
struct Journal<R> {
    epoch: u64,
    loads_in_flight: usize,
    changes: Vec<(u64, Change<R>)>,
}

impl<R: Resource> Journal<R> {
    fn record(&mut self, change: &Change<R>) {
        self.epoch += 1;
        if self.loads_in_flight > 0 {
            self.changes.push((self.epoch, change.clone()));
        }
    }

    /// Apply every change newer than `epoch`, oldest first.
    fn replay_since(&self, epoch: u64, records: &mut Vec<R>) -> usize {
        let mut replayed = 0;
        for (_, change) in self.changes.iter().filter(|(at, _)| *at > epoch) {
            change.apply(records);
            replayed += 1;
        }
        replayed
    }
}

/// Registers a load with the journal for as long as its request is alive.
struct LoadTicket<'a, R: Resource> {
    controller: &'a ResourceController<R>,
    epoch: u64,
}

impl<'a, R: Resource> LoadTicket<'a, R> {
    fn issue(controller: &'a ResourceController<R>) -> Self {
        let mut journal = controller.journal();
        journal.loads_in_flight += 1;
        let epoch = journal.epoch;
        drop(journal);
        Self { controller, epoch }
    }
}

impl<R: Resource> Drop for LoadTicket<'_, R> {
    fn drop(&mut self) {
        let mut journal = self.controller.journal();
        journal.loads_in_flight = journal.loads_in_flight.saturating_sub(1);
        if journal.loads_in_flight == 0 {
            journal.changes.clear();
        }
    }
}

fn encode_draft<R: Resource>(draft: &R::Draft) -> Result<Value, ControllerError> {
    serde_json::to_value(draft)
        .map_err(|e| ControllerError::Decode(format!("could not encode {} draft: {e}", R::NAME)))
}

/// Decode a listed collection, skipping records without a usable identity.
fn decode_collection<R: Resource>(raw: Vec<Value>) -> Vec<R> {
    let mut records: Vec<R> = Vec::with_capacity(raw.len());
    for item in raw {
        match decode_record::<R>(item) {
            Ok(record) => {
                if records.iter().any(|r| r.id() == record.id()) {
                    tracing::warn!(resource = R::NAME, id = %record.id(), "Skipping duplicate identity");
                    continue;
                }
                records.push(record);
            }
            Err(err) => tracing::warn!(resource = R::NAME, "Skipping unusable record: {err}"),
        }
    }
    records
}

/// The active flag and `updatedAt` from a toggle response.
///
/// Only those two fields are read, so partial responses such as
/// `{"isActive": false}` are accepted.
fn toggled_fields(raw: Value) -> Result<(bool, Option<DateTime<Utc>>), ControllerError> {
    let fields = raw
        .as_object()
        .ok_or_else(|| ControllerError::Decode("toggle response is not an object".into()))?;

    let active = fields
        .get("isActive")
        .or_else(|| fields.get("is_active"))
        .and_then(Value::as_bool)
        .or_else(|| {
            fields
                .get("status")
                .and_then(Value::as_str)
                .map(|status| status.eq_ignore_ascii_case("active"))
        })
        .ok_or_else(|| ControllerError::Decode("toggle response has no active flag".into()))?;

    let updated_at = fields
        .get("updatedAt")
        .and_then(Value::as_str)
        .and_then(parse_datetime);

    Ok((active, updated_at))
}
