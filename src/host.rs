//! Host notification model
//!
//! Raw notifications are what a host application (or one of the adapters in
//! this crate) reports. Producers subscribe to them by kind through a
//! [`NotificationSource`] and get back a [`Subscription`] that unsubscribes
//! when cancelled or dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::event::TextRange;

/// A document as the host reports it
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub uri: String,
    #[serde(default)]
    pub text: String,
}

/// An editor showing a document
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSnapshot {
    pub uri: String,
    #[serde(default)]
    pub view_column: Option<u32>,
}

/// A single contiguous content change inside a document
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChange {
    #[serde(default)]
    pub range: TextRange,
    #[serde(default)]
    pub range_offset: u64,
    #[serde(default)]
    pub range_length: u64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamedFile {
    pub old_uri: String,
    pub new_uri: String,
}

/// One notification delivered by the host
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RawNotification {
    DocumentOpened {
        document: DocumentSnapshot,
    },
    DocumentChanged {
        document: DocumentSnapshot,
        #[serde(default)]
        changes: Vec<ContentChange>,
    },
    DocumentClosed {
        document: DocumentSnapshot,
    },
    DocumentSaved {
        document: DocumentSnapshot,
    },
    ActiveEditorChanged {
        #[serde(default)]
        editor: Option<EditorSnapshot>,
    },
    VisibleEditorsChanged {
        #[serde(default)]
        editors: Vec<EditorSnapshot>,
    },
    SelectionChanged {
        editor: EditorSnapshot,
        #[serde(default)]
        selections: Vec<TextRange>,
        #[serde(default)]
        selected_text: Option<String>,
    },
    ViewColumnChanged {
        editor: EditorSnapshot,
    },
    WindowStateChanged {
        focused: bool,
    },
    WorkspaceFoldersChanged {
        #[serde(default)]
        added: Vec<String>,
        #[serde(default)]
        removed: Vec<String>,
    },
    FsCreated {
        uri: String,
    },
    FsChanged {
        uri: String,
    },
    FsDeleted {
        uri: String,
    },
    FilesRenamed {
        files: Vec<RenamedFile>,
    },
    FilesCreated {
        files: Vec<String>,
    },
    FilesDeleted {
        files: Vec<String>,
    },
    PreviewOpened {
        uri: String,
    },
}

/// Discriminant of [`RawNotification`], used as the subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    DocumentOpened,
    DocumentChanged,
    DocumentClosed,
    DocumentSaved,
    ActiveEditorChanged,
    VisibleEditorsChanged,
    SelectionChanged,
    ViewColumnChanged,
    WindowStateChanged,
    WorkspaceFoldersChanged,
    FsCreated,
    FsChanged,
    FsDeleted,
    FilesRenamed,
    FilesCreated,
    FilesDeleted,
    PreviewOpened,
}

impl RawNotification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            RawNotification::DocumentOpened { .. } => NotificationKind::DocumentOpened,
            RawNotification::DocumentChanged { .. } => NotificationKind::DocumentChanged,
            RawNotification::DocumentClosed { .. } => NotificationKind::DocumentClosed,
            RawNotification::DocumentSaved { .. } => NotificationKind::DocumentSaved,
            RawNotification::ActiveEditorChanged { .. } => NotificationKind::ActiveEditorChanged,
            RawNotification::VisibleEditorsChanged { .. } => NotificationKind::VisibleEditorsChanged,
            RawNotification::SelectionChanged { .. } => NotificationKind::SelectionChanged,
            RawNotification::ViewColumnChanged { .. } => NotificationKind::ViewColumnChanged,
            RawNotification::WindowStateChanged { .. } => NotificationKind::WindowStateChanged,
            RawNotification::WorkspaceFoldersChanged { .. } => NotificationKind::WorkspaceFoldersChanged,
            RawNotification::FsCreated { .. } => NotificationKind::FsCreated,
            RawNotification::FsChanged { .. } => NotificationKind::FsChanged,
            RawNotification::FsDeleted { .. } => NotificationKind::FsDeleted,
            RawNotification::FilesRenamed { .. } => NotificationKind::FilesRenamed,
            RawNotification::FilesCreated { .. } => NotificationKind::FilesCreated,
            RawNotification::FilesDeleted { .. } => NotificationKind::FilesDeleted,
            RawNotification::PreviewOpened { .. } => NotificationKind::PreviewOpened,
        }
    }
}

/// Callback invoked for every notification of the subscribed kind
pub type Handler = Box<dyn Fn(&RawNotification) + Send + Sync>;

/// Anything producers can subscribe to
pub trait NotificationSource {
    fn subscribe(&self, kind: NotificationKind, handler: Handler) -> Subscription;
}

type SharedHandler = Arc<dyn Fn(&RawNotification) + Send + Sync>;

struct Registration {
    id: u64,
    kind: NotificationKind,
    handler: SharedHandler,
}

#[derive(Default)]
struct BusState {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl BusState {
    fn remove(&self, id: u64) {
        let mut registrations = self.registrations.write().unwrap_or_else(PoisonError::into_inner);
        registrations.retain(|r| r.id != id);
    }
}

/// In-process notification source fed by the replay and watch adapters
#[derive(Clone, Default)]
pub struct HostBus {
    state: Arc<BusState>,
}

impl HostBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand a notification to every handler subscribed to its kind.
    ///
    /// Returns the number of handlers invoked. Handlers run outside the
    /// registration lock so they may subscribe or cancel freely.
    pub fn deliver(&self, notification: &RawNotification) -> usize {
        let kind = notification.kind();
        let handlers: Vec<SharedHandler> = {
            let registrations = self.state.registrations.read().unwrap_or_else(PoisonError::into_inner);
            registrations
                .iter()
                .filter(|r| r.kind == kind)
                .map(|r| Arc::clone(&r.handler))
                .collect()
        };

        for handler in &handlers {
            handler(notification);
        }

        handlers.len()
    }

    /// Number of live subscriptions
    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.state.registrations.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl NotificationSource for HostBus {
    fn subscribe(&self, kind: NotificationKind, handler: Handler) -> Subscription {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        let mut registrations = self.state.registrations.write().unwrap_or_else(PoisonError::into_inner);
        registrations.push(Registration {
            id,
            kind,
            handler: Arc::from(handler),
        });

        Subscription {
            id,
            bus: Arc::downgrade(&self.state),
        }
    }
}

/// Cancellable handle for a subscription; dropping it unsubscribes
pub struct Subscription {
    id: u64,
    bus: Weak<BusState>,
}

impl Subscription {
    /// Unsubscribe now
    pub fn cancel(self) {
        drop(self);
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        match self.bus.upgrade() {
            Some(state) => state
                .registrations
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .any(|r| r.id == self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.bus.upgrade() {
            state.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> Handler {
        let counter = Arc::clone(counter);
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_parse_document_changed() {
        let line = r#"{"kind":"documentChanged","document":{"uri":"file:///a.rs"},"changes":[{"range":{"startLine":0,"startCharacter":0,"endLine":0,"endCharacter":3},"rangeOffset":0,"rangeLength":3,"text":""}]}"#;
        let raw: RawNotification = serde_json::from_str(line).unwrap();

        assert_eq!(raw.kind(), NotificationKind::DocumentChanged);
        match raw {
            RawNotification::DocumentChanged { document, changes } => {
                assert_eq!(document.uri, "file:///a.rs");
                assert_eq!(document.text, "");
                assert_eq!(changes[0].range.end_character, 3);
                assert_eq!(changes[0].range_length, 3);
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[test]
    fn test_parse_selection_with_selected_text() {
        let line = r#"{"kind":"selectionChanged","editor":{"uri":"file:///a.rs","viewColumn":1},"selections":[],"selectedText":"abc"}"#;
        let raw: RawNotification = serde_json::from_str(line).unwrap();
        assert_eq!(
            raw,
            RawNotification::SelectionChanged {
                editor: EditorSnapshot {
                    uri: "file:///a.rs".to_string(),
                    view_column: Some(1),
                },
                selections: vec![],
                selected_text: Some("abc".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = serde_json::from_str::<RawNotification>(r#"{"kind":"terminalOpened"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deliver_only_matching_kind() {
        let bus = HostBus::new();
        let focus = Arc::new(AtomicUsize::new(0));
        let fs = Arc::new(AtomicUsize::new(0));
        let _a = bus.subscribe(NotificationKind::WindowStateChanged, counting_handler(&focus));
        let _b = bus.subscribe(NotificationKind::FsCreated, counting_handler(&fs));

        let invoked = bus.deliver(&RawNotification::WindowStateChanged { focused: true });

        assert_eq!(invoked, 1);
        assert_eq!(focus.load(Ordering::SeqCst), 1);
        assert_eq!(fs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_unsubscribes() {
        let bus = HostBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let subscription = bus.subscribe(NotificationKind::WindowStateChanged, counting_handler(&counter));
        assert!(subscription.is_active());
        assert_eq!(bus.subscriber_count(), 1);

        subscription.cancel();
        bus.deliver(&RawNotification::WindowStateChanged { focused: false });

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = HostBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let _subscription = bus.subscribe(NotificationKind::FsChanged, counting_handler(&counter));
        }
        bus.deliver(&RawNotification::FsChanged {
            uri: "file:///a".to_string(),
        });
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let bus = HostBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let subscription = bus.subscribe(NotificationKind::FsChanged, counting_handler(&counter));
        drop(bus);
        assert!(!subscription.is_active());
        drop(subscription);
    }
}
