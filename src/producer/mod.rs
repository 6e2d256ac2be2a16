//! Producers
//!
//! A producer turns one kind of raw host notification into event records.
//! The set of producers is fixed: [`PRODUCERS`] lists every variant, and
//! [`subscribe_all`] wires each of them to a notification source.
//!
//! On every notification a producer checks the telemetry gate, drops
//! resources whose scheme is not tracked, resolves resource identities,
//! builds the records and publishes them. Batch notifications yield one
//! independently gated record per item.

use std::sync::Arc;

use crate::event::EventRecord;
use crate::host::{NotificationKind, NotificationSource, RawNotification, Subscription};
use crate::registry::{ResourceId, ResourceRegistry};
use crate::routing::Publish;
use crate::session::SessionContext;

mod records;
mod uri;

pub use uri::canonical_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Producer {
    OpenTextDocument,
    ChangeTextDocument,
    CloseTextDocument,
    SaveTextDocument,
    ChangeActiveTextEditor,
    ChangeVisibleTextEditors,
    ChangeTextEditorSelection,
    ChangeTextEditorViewColumn,
    ChangeWindowState,
    ChangeWorkspaceFolders,
    FileSystemCreate,
    FileSystemChange,
    FileSystemDelete,
    RenameFiles,
    CreateFiles,
    DeleteFiles,
    OpenPreview,
}

/// Every producer, in registration order
pub const PRODUCERS: &[Producer] = &[
    Producer::OpenTextDocument,
    Producer::ChangeTextDocument,
    Producer::CloseTextDocument,
    Producer::SaveTextDocument,
    Producer::ChangeActiveTextEditor,
    Producer::ChangeVisibleTextEditors,
    Producer::ChangeTextEditorSelection,
    Producer::ChangeTextEditorViewColumn,
    Producer::ChangeWindowState,
    Producer::ChangeWorkspaceFolders,
    Producer::FileSystemCreate,
    Producer::FileSystemChange,
    Producer::FileSystemDelete,
    Producer::RenameFiles,
    Producer::CreateFiles,
    Producer::DeleteFiles,
    Producer::OpenPreview,
];

impl Producer {
    /// Event kind name carried by every record this producer emits
    pub fn event_name(self) -> &'static str {
        match self {
            Producer::OpenTextDocument => "openTextDocument",
            Producer::ChangeTextDocument => "changeTextDocument",
            Producer::CloseTextDocument => "closeTextDocument",
            Producer::SaveTextDocument => "saveTextDocument",
            Producer::ChangeActiveTextEditor => "changeActiveTextEditor",
            Producer::ChangeVisibleTextEditors => "changeVisibleTextEditors",
            Producer::ChangeTextEditorSelection => "changeTextEditorSelection",
            Producer::ChangeTextEditorViewColumn => "changeTextEditorViewColumn",
            Producer::ChangeWindowState => "changeWindowState",
            Producer::ChangeWorkspaceFolders => "changeWorkspaceFolders",
            Producer::FileSystemCreate => "fileSystemCreate",
            Producer::FileSystemChange => "fileSystemChange",
            Producer::FileSystemDelete => "fileSystemDelete",
            Producer::RenameFiles => "renameFiles",
            Producer::CreateFiles => "createFiles",
            Producer::DeleteFiles => "deleteFiles",
            Producer::OpenPreview => "openPreview",
        }
    }

    /// The single raw notification kind this producer listens to
    pub fn notification_kind(self) -> NotificationKind {
        match self {
            Producer::OpenTextDocument => NotificationKind::DocumentOpened,
            Producer::ChangeTextDocument => NotificationKind::DocumentChanged,
            Producer::CloseTextDocument => NotificationKind::DocumentClosed,
            Producer::SaveTextDocument => NotificationKind::DocumentSaved,
            Producer::ChangeActiveTextEditor => NotificationKind::ActiveEditorChanged,
            Producer::ChangeVisibleTextEditors => NotificationKind::VisibleEditorsChanged,
            Producer::ChangeTextEditorSelection => NotificationKind::SelectionChanged,
            Producer::ChangeTextEditorViewColumn => NotificationKind::ViewColumnChanged,
            Producer::ChangeWindowState => NotificationKind::WindowStateChanged,
            Producer::ChangeWorkspaceFolders => NotificationKind::WorkspaceFoldersChanged,
            Producer::FileSystemCreate => NotificationKind::FsCreated,
            Producer::FileSystemChange => NotificationKind::FsChanged,
            Producer::FileSystemDelete => NotificationKind::FsDeleted,
            Producer::RenameFiles => NotificationKind::FilesRenamed,
            Producer::CreateFiles => NotificationKind::FilesCreated,
            Producer::DeleteFiles => NotificationKind::FilesDeleted,
            Producer::OpenPreview => NotificationKind::PreviewOpened,
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        PRODUCERS.iter().copied().find(|p| p.event_name() == name)
    }

    /// Short description for listings
    pub fn description(self) -> &'static str {
        match self {
            Producer::OpenTextDocument => "Document opened",
            Producer::ChangeTextDocument => "Document edited (add, delete, replace)",
            Producer::CloseTextDocument => "Document closed",
            Producer::SaveTextDocument => "Document saved",
            Producer::ChangeActiveTextEditor => "Editor gained focus",
            Producer::ChangeVisibleTextEditors => "Editors became visible",
            Producer::ChangeTextEditorSelection => "Selection changed",
            Producer::ChangeTextEditorViewColumn => "Editor moved to another column",
            Producer::ChangeWindowState => "Window focused or blurred",
            Producer::ChangeWorkspaceFolders => "Workspace folders added or removed",
            Producer::FileSystemCreate => "File created on disk",
            Producer::FileSystemChange => "File changed on disk",
            Producer::FileSystemDelete => "File deleted on disk",
            Producer::RenameFiles => "Files renamed",
            Producer::CreateFiles => "Files created",
            Producer::DeleteFiles => "Files deleted",
            Producer::OpenPreview => "Preview opened",
        }
    }

    /// Subscribe this producer to `source`, publishing into `context`'s target
    pub fn subscribe(self, source: &dyn NotificationSource, context: Arc<ProducerContext>) -> Subscription {
        source.subscribe(
            self.notification_kind(),
            Box::new(move |notification| {
                context.emit(self, notification);
            }),
        )
    }
}

/// Subscribe every producer in [`PRODUCERS`]
pub fn subscribe_all(source: &dyn NotificationSource, context: &Arc<ProducerContext>) -> Vec<Subscription> {
    PRODUCERS
        .iter()
        .map(|p| p.subscribe(source, Arc::clone(context)))
        .collect()
}

/// What a producer needs besides the notification itself
pub struct ProducerContext {
    session: Arc<SessionContext>,
    registry: Arc<ResourceRegistry>,
    target: Arc<dyn Publish>,
}

impl ProducerContext {
    pub fn new(session: Arc<SessionContext>, registry: Arc<ResourceRegistry>, target: Arc<dyn Publish>) -> Self {
        Self {
            session,
            registry,
            target,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Gate, build and publish the records for one notification.
    /// Returns how many records were published.
    pub fn emit(&self, producer: Producer, notification: &RawNotification) -> usize {
        if !self.session.telemetry_enabled() {
            log::trace!("Telemetry disabled, dropping {}", producer.event_name());
            return 0;
        }

        let records = self.records(producer, notification);
        let count = records.len();
        for record in records {
            self.target.publish(record);
        }
        count
    }

    /// Build the records a notification yields, without publishing them
    pub fn records(&self, producer: Producer, notification: &RawNotification) -> Vec<EventRecord> {
        if notification.kind() != producer.notification_kind() {
            return Vec::new();
        }
        records::build(producer, notification, self)
    }

    /// Canonical address and identity for a tracked resource, or `None`
    /// when the address is not a real, persisted file
    pub fn resolve(&self, address: &str) -> Option<(String, ResourceId)> {
        let Some(url) = canonical_address(address) else {
            log::trace!("Ignoring unaddressable resource {}", address);
            return None;
        };

        if !self.session.is_tracked_scheme(url.scheme()) {
            log::trace!("Ignoring {} resource {}", url.scheme(), address);
            return None;
        }

        let id = self.registry.identity_for(url.as_str());
        Some((url.to_string(), id))
    }
}
