//! Record construction for each producer

use super::{Producer, ProducerContext};
use crate::event::{EventRecord, Operation};
use crate::host::{EditorSnapshot, RawNotification};

pub(super) fn build(producer: Producer, notification: &RawNotification, ctx: &ProducerContext) -> Vec<EventRecord> {
    let name = producer.event_name();

    match notification {
        RawNotification::DocumentOpened { document } => {
            resource_record(ctx, name, Operation::Open, &document.uri, |r| r.with_content(&document.text))
        }
        RawNotification::DocumentChanged { document, changes } => {
            // Only the first change is classified; hosts that batch several
            // ranges into one notification report the leading edit.
            let Some(change) = changes.first() else {
                return Vec::new();
            };
            let operation = Operation::from_edit(&change.range, &change.text);
            resource_record(ctx, name, operation, &document.uri, |r| {
                r.with_content(&change.text)
                    .with_range(change.range)
                    .with_offset(change.range_offset, change.range_length)
            })
        }
        RawNotification::DocumentClosed { document } => resource_record(ctx, name, Operation::Close, &document.uri, |r| r),
        RawNotification::DocumentSaved { document } => {
            resource_record(ctx, name, Operation::Save, &document.uri, |r| r.with_content(&document.text))
        }
        RawNotification::ActiveEditorChanged { editor } => match editor {
            Some(editor) => editor_record(ctx, name, Operation::Focus, editor),
            None => Vec::new(),
        },
        RawNotification::VisibleEditorsChanged { editors } => editors
            .iter()
            .flat_map(|editor| editor_record(ctx, name, Operation::Visible, editor))
            .collect(),
        RawNotification::SelectionChanged {
            editor,
            selections,
            selected_text,
        } => {
            let range = selections.first().copied().unwrap_or_default();
            resource_record(ctx, name, Operation::SelectionChange, &editor.uri, |r| {
                let r = r.with_range(range);
                match selected_text {
                    Some(text) => r.with_content(text),
                    None => r,
                }
            })
        }
        RawNotification::ViewColumnChanged { editor } => editor_record(ctx, name, Operation::ViewColumnChange, editor),
        RawNotification::WindowStateChanged { focused } => {
            let operation = if *focused {
                Operation::WindowFocused
            } else {
                Operation::WindowBlurred
            };
            vec![EventRecord::new(name, operation, ctx.session())]
        }
        RawNotification::WorkspaceFoldersChanged { added, removed } => added
            .iter()
            .chain(removed.iter())
            .flat_map(|folder| resource_record(ctx, name, Operation::WorkspaceFoldersChange, folder, |r| r))
            .collect(),
        RawNotification::FsCreated { uri } => resource_record(ctx, name, Operation::FsCreate, uri, |r| r),
        RawNotification::FsChanged { uri } => resource_record(ctx, name, Operation::FsChange, uri, |r| r),
        RawNotification::FsDeleted { uri } => resource_record(ctx, name, Operation::FsDelete, uri, |r| r),
        RawNotification::FilesRenamed { files } => files
            .iter()
            .flat_map(|file| {
                resource_record(ctx, name, Operation::Rename, &file.new_uri, |r| r.with_content(&file.old_uri))
            })
            .collect(),
        RawNotification::FilesCreated { files } => files
            .iter()
            .flat_map(|uri| resource_record(ctx, name, Operation::Create, uri, |r| r))
            .collect(),
        RawNotification::FilesDeleted { files } => files
            .iter()
            .flat_map(|uri| resource_record(ctx, name, Operation::DeleteFile, uri, |r| r))
            .collect(),
        RawNotification::PreviewOpened { uri } => resource_record(ctx, name, Operation::Preview, uri, |r| r),
    }
}

/// Zero or one record about a resource, depending on whether it is tracked
fn resource_record(
    ctx: &ProducerContext,
    name: &str,
    operation: Operation,
    address: &str,
    finish: impl FnOnce(EventRecord) -> EventRecord,
) -> Vec<EventRecord> {
    match ctx.resolve(address) {
        Some((uri, id)) => {
            let record = EventRecord::new(name, operation, ctx.session()).with_resource(uri, id);
            vec![finish(record)]
        }
        None => Vec::new(),
    }
}

fn editor_record(ctx: &ProducerContext, name: &str, operation: Operation, editor: &EditorSnapshot) -> Vec<EventRecord> {
    resource_record(ctx, name, operation, &editor.uri, |r| r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TextRange;
    use crate::host::{ContentChange, DocumentSnapshot, RenamedFile};
    use crate::registry::{NO_RESOURCE, ResourceRegistry};
    use crate::routing::Publish;
    use crate::session::SessionContext;
    use std::sync::Arc;

    struct Discard;

    impl Publish for Discard {
        fn publish(&self, _record: EventRecord) {}
    }

    fn ctx() -> ProducerContext {
        let session = Arc::new(SessionContext::new("m", "remote-ssh", true, vec!["file".to_string()]));
        ProducerContext::new(session, Arc::new(ResourceRegistry::new()), Arc::new(Discard))
    }

    fn doc(uri: &str, text: &str) -> DocumentSnapshot {
        DocumentSnapshot {
            uri: uri.to_string(),
            text: text.to_string(),
        }
    }

    fn editor(uri: &str) -> EditorSnapshot {
        EditorSnapshot {
            uri: uri.to_string(),
            view_column: Some(1),
        }
    }

    fn change(range: TextRange, text: &str) -> RawNotification {
        RawNotification::DocumentChanged {
            document: doc("file:///a.rs", "ignored"),
            changes: vec![ContentChange {
                range,
                range_offset: 4,
                range_length: 3,
                text: text.to_string(),
            }],
        }
    }

    #[test]
    fn test_open_carries_document_text() {
        let ctx = ctx();
        let records = ctx.records(
            Producer::OpenTextDocument,
            &RawNotification::DocumentOpened {
                document: doc("file:///a.rs", "fn main() {}"),
            },
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content.as_deref(), Some("fn main() {}"));
        assert_eq!(records[0].environment, "remote-ssh");
    }

    #[test]
    fn test_change_derives_operation() {
        let ctx = ctx();
        let add = ctx.records(Producer::ChangeTextDocument, &change(TextRange::new(0, 0, 0, 0), "x"));
        let del = ctx.records(Producer::ChangeTextDocument, &change(TextRange::new(0, 0, 0, 3), ""));
        let rep = ctx.records(Producer::ChangeTextDocument, &change(TextRange::new(0, 0, 0, 3), "ab"));

        assert_eq!(add[0].operation, Operation::Add);
        assert_eq!(del[0].operation, Operation::Delete);
        assert_eq!(rep[0].operation, Operation::Replace);
        assert_eq!(rep[0].range, TextRange::new(0, 0, 0, 3));
        assert_eq!(rep[0].range_offset, 4);
        assert_eq!(rep[0].range_length, 3);
        assert_eq!(rep[0].content.as_deref(), Some("ab"));
    }

    #[test]
    fn test_change_uses_first_range_only() {
        let ctx = ctx();
        let notification = RawNotification::DocumentChanged {
            document: doc("file:///a.rs", ""),
            changes: vec![
                ContentChange {
                    range: TextRange::new(1, 0, 1, 0),
                    range_offset: 10,
                    range_length: 0,
                    text: "a".to_string(),
                },
                ContentChange {
                    range: TextRange::new(5, 0, 5, 4),
                    range_offset: 50,
                    range_length: 4,
                    text: String::new(),
                },
            ],
        };
        let records = ctx.records(Producer::ChangeTextDocument, &notification);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation, Operation::Add);
        assert_eq!(records[0].range_offset, 10);
    }

    #[test]
    fn test_change_without_changes_yields_nothing() {
        let ctx = ctx();
        let notification = RawNotification::DocumentChanged {
            document: doc("file:///a.rs", ""),
            changes: vec![],
        };
        assert!(ctx.records(Producer::ChangeTextDocument, &notification).is_empty());
    }

    #[test]
    fn test_close_has_no_content() {
        let ctx = ctx();
        let records = ctx.records(
            Producer::CloseTextDocument,
            &RawNotification::DocumentClosed {
                document: doc("file:///a.rs", "text"),
            },
        );
        assert_eq!(records[0].operation, Operation::Close);
        assert!(records[0].content.is_none());
    }

    #[test]
    fn test_window_state_is_resourceless() {
        let ctx = ctx();
        let focused = ctx.records(Producer::ChangeWindowState, &RawNotification::WindowStateChanged { focused: true });
        let blurred = ctx.records(Producer::ChangeWindowState, &RawNotification::WindowStateChanged { focused: false });

        assert_eq!(focused[0].operation, Operation::WindowFocused);
        assert_eq!(blurred[0].operation, Operation::WindowBlurred);
        assert_eq!(focused[0].uri, "");
        assert_eq!(focused[0].file_id, NO_RESOURCE);
    }

    #[test]
    fn test_created_batch_yields_one_record_per_file() {
        let ctx = ctx();
        let notification = RawNotification::FilesCreated {
            files: vec![
                "file:///p/a.rs".to_string(),
                "file:///p/b.rs".to_string(),
                "file:///p/c.rs".to_string(),
            ],
        };
        let records = ctx.records(Producer::CreateFiles, &notification);

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.operation == Operation::Create));
        let ids: Vec<u64> = records.iter().map(|r| r.file_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_batch_items_are_gated_individually() {
        let ctx = ctx();
        let notification = RawNotification::FilesDeleted {
            files: vec![
                "file:///p/a.rs".to_string(),
                "untitled:Untitled-2".to_string(),
                "file:///p/c.rs".to_string(),
            ],
        };
        let records = ctx.records(Producer::DeleteFiles, &notification);

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.operation == Operation::DeleteFile));
    }

    #[test]
    fn test_visible_editors_batch() {
        let ctx = ctx();
        let notification = RawNotification::VisibleEditorsChanged {
            editors: vec![editor("file:///a.rs"), editor("output:extension-log"), editor("file:///b.rs")],
        };
        let records = ctx.records(Producer::ChangeVisibleTextEditors, &notification);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.operation == Operation::Visible));
    }

    #[test]
    fn test_active_editor_cleared_yields_nothing() {
        let ctx = ctx();
        let records = ctx.records(
            Producer::ChangeActiveTextEditor,
            &RawNotification::ActiveEditorChanged { editor: None },
        );
        assert!(records.is_empty());

        let records = ctx.records(
            Producer::ChangeActiveTextEditor,
            &RawNotification::ActiveEditorChanged {
                editor: Some(editor("file:///a.rs")),
            },
        );
        assert_eq!(records[0].operation, Operation::Focus);
    }

    #[test]
    fn test_selection_takes_first_range_and_text() {
        let ctx = ctx();
        let notification = RawNotification::SelectionChanged {
            editor: editor("file:///a.rs"),
            selections: vec![TextRange::new(2, 1, 2, 6), TextRange::new(9, 0, 9, 1)],
            selected_text: Some("hello".to_string()),
        };
        let records = ctx.records(Producer::ChangeTextEditorSelection, &notification);
        assert_eq!(records[0].operation, Operation::SelectionChange);
        assert_eq!(records[0].range, TextRange::new(2, 1, 2, 6));
        assert_eq!(records[0].content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_rename_keeps_previous_address_as_content() {
        let ctx = ctx();
        let notification = RawNotification::FilesRenamed {
            files: vec![RenamedFile {
                old_uri: "file:///p/old.rs".to_string(),
                new_uri: "file:///p/new.rs".to_string(),
            }],
        };
        let records = ctx.records(Producer::RenameFiles, &notification);
        assert_eq!(records[0].operation, Operation::Rename);
        assert_eq!(records[0].uri, "file:///p/new.rs");
        assert_eq!(records[0].content.as_deref(), Some("file:///p/old.rs"));
    }

    #[test]
    fn test_workspace_folders_added_and_removed() {
        let ctx = ctx();
        let notification = RawNotification::WorkspaceFoldersChanged {
            added: vec!["file:///work/a".to_string()],
            removed: vec!["file:///work/b".to_string()],
        };
        let records = ctx.records(Producer::ChangeWorkspaceFolders, &notification);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.operation == Operation::WorkspaceFoldersChange));
    }

    #[test]
    fn test_fs_and_preview_operations() {
        let ctx = ctx();
        let uri = "file:///p/a.rs".to_string();
        let cases = [
            (Producer::FileSystemCreate, RawNotification::FsCreated { uri: uri.clone() }, Operation::FsCreate),
            (Producer::FileSystemChange, RawNotification::FsChanged { uri: uri.clone() }, Operation::FsChange),
            (Producer::FileSystemDelete, RawNotification::FsDeleted { uri: uri.clone() }, Operation::FsDelete),
            (Producer::OpenPreview, RawNotification::PreviewOpened { uri: uri.clone() }, Operation::Preview),
            (
                Producer::ChangeTextEditorViewColumn,
                RawNotification::ViewColumnChanged { editor: editor(&uri) },
                Operation::ViewColumnChange,
            ),
        ];

        for (producer, notification, operation) in cases {
            let records = ctx.records(producer, &notification);
            assert_eq!(records.len(), 1, "{:?}", producer);
            assert_eq!(records[0].operation, operation);
            assert_eq!(records[0].event_name, producer.event_name());
            assert_eq!(records[0].file_id, 1);
        }
    }
}
