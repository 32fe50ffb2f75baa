use std::collections::BTreeMap;

use crate::error::ControllerError;
use crate::identity::RecordId;
use crate::resource::Resource;

/// Top-level lifecycle of a controller's collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Errored,
}

/// Whether the cache mirrors the server or canned offline data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Toggle,
    Remove,
}

/// Identifies one operation-scoped banner.
///
/// Creates have no target; each one carries its own sequence number instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationKey {
    pub kind: OperationKind,
    pub target: Option<RecordId>,
    pub seq: u64,
}

impl OperationKey {
    pub fn create(seq: u64) -> Self {
        Self {
            kind: OperationKind::Create,
            target: None,
            seq,
        }
    }

    pub fn on(kind: OperationKind, id: &RecordId) -> Self {
        Self {
            kind,
            target: Some(id.clone()),
            seq: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus {
    Pending,
    Applied,
    Failed(ControllerError),
}

/// Everything a list view renders from.
#[derive(Debug, Clone)]
pub struct ListState<R> {
    pub phase: Phase,
    pub mode: Mode,
    /// Normalized cache, in server order plus local appends.
    pub records: Vec<R>,
    /// Error of the most recent load, cleared by the next successful one.
    pub load_error: Option<ControllerError>,
    pub operations: BTreeMap<OperationKey, OperationStatus>,
}

impl<R> Default for ListState<R> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            mode: Mode::Online,
            records: Vec::new(),
            load_error: None,
            operations: BTreeMap::new(),
        }
    }
}

impl<R: Resource> ListState<R> {
    pub fn find(&self, id: &RecordId) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.find(id).is_some()
    }

    /// `true` while any mutation targeting `id` is in flight; views disable
    /// that record's controls.
    pub fn is_pending(&self, id: &RecordId) -> bool {
        self.operations.iter().any(|(key, status)| {
            key.target.as_ref() == Some(id) && *status == OperationStatus::Pending
        })
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// Statuses of every create still on record, oldest first.
    pub fn creates(&self) -> impl Iterator<Item = (&OperationKey, &OperationStatus)> {
        self.operations
            .iter()
            .filter(|(key, _)| key.kind == OperationKind::Create)
    }

    /// Failed operations, for dismissible banners.
    pub fn failures(&self) -> impl Iterator<Item = (&OperationKey, &ControllerError)> {
        self.operations.iter().filter_map(|(key, status)| match status {
            OperationStatus::Failed(err) => Some((key, err)),
            _ => None,
        })
    }
}
