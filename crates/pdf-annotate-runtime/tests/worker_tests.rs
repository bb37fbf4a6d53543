use lopdf::{Dictionary, Document, Object, Stream};
use pdf_annotate_runtime::*;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

fn write_test_pdf(dir: &Path, num_pages: usize) -> PathBuf {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..num_pages)
        .map(|i| {
            let content = format!("% source page {}\n", i + 1);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
            ]);
            Object::Reference(doc.add_object(page))
        })
        .collect();

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(num_pages as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let path = dir.join("input.pdf");
    doc.save(&path).unwrap();
    path
}

async fn run(commands: Vec<EditorCommand>) -> Vec<EditorUpdate> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    for command in commands {
        command_tx.send(command).unwrap();
    }
    drop(command_tx);

    worker_task::<BlankSource>(EditorOptions::default(), command_rx, update_tx).await;

    let mut updates = Vec::new();
    while let Ok(update) = update_rx.try_recv() {
        updates.push(update);
    }
    updates
}

fn displayed_positions(updates: &[EditorUpdate]) -> Vec<usize> {
    updates
        .iter()
        .filter_map(|u| match u {
            EditorUpdate::PageDisplayed { position, .. } => Some(*position),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_edit_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path(), 3);

    let updates = run(vec![
        EditorCommand::Open { path: input },
        EditorCommand::AddTool {
            tool: Tool::Rectangle,
        },
        EditorCommand::RotateRight,
        EditorCommand::MovePage { from: 0, to: 2 },
        EditorCommand::Export {
            dir: dir.path().to_path_buf(),
        },
        EditorCommand::Close,
    ])
    .await;

    assert!(matches!(updates[0], EditorUpdate::Loaded { page_count: 3 }));
    assert!(updates.iter().any(|u| matches!(
        u,
        EditorUpdate::SceneChanged {
            position: 0,
            object_count: 1
        }
    )));
    assert!(updates.iter().any(|u| matches!(
        u,
        EditorUpdate::PagesChanged { order } if order == &vec![2, 3, 1]
    )));

    let exported = updates.iter().find_map(|u| match u {
        EditorUpdate::Exported { path } => Some(path.clone()),
        _ => None,
    });
    let exported = exported.unwrap();
    assert_eq!(exported.file_name().unwrap(), "PdfAnnotate_Edited.pdf");
    assert_eq!(Document::load(&exported).unwrap().get_pages().len(), 3);
    assert!(matches!(updates.last(), Some(EditorUpdate::Closed)));
}

#[tokio::test]
async fn test_queued_navigation_is_coalesced() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path(), 4);

    let updates = run(vec![
        EditorCommand::Open { path: input },
        EditorCommand::Navigate { position: 1 },
        EditorCommand::Navigate { position: 2 },
        EditorCommand::Navigate { position: 3 },
    ])
    .await;

    assert_eq!(displayed_positions(&updates), vec![0, 3]);
}

#[tokio::test]
async fn test_commands_after_navigation_address_new_page() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path(), 3);

    let updates = run(vec![
        EditorCommand::Open { path: input },
        EditorCommand::Navigate { position: 2 },
        EditorCommand::DeleteCurrent,
        EditorCommand::Export {
            dir: dir.path().to_path_buf(),
        },
        EditorCommand::Close,
    ])
    .await;

    assert!(
        !updates
            .iter()
            .any(|u| matches!(u, EditorUpdate::Error { .. })),
        "{:?}",
        updates
    );
    assert!(updates.iter().any(|u| matches!(
        u,
        EditorUpdate::PagesChanged { order } if order == &vec![1, 2]
    )));
    let exported = updates
        .iter()
        .find_map(|u| match u {
            EditorUpdate::Exported { path } => Some(path.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(Document::load(&exported).unwrap().get_pages().len(), 2);
    assert!(matches!(updates.last(), Some(EditorUpdate::Closed)));
}

#[tokio::test]
async fn test_navigation_runs_split_by_other_commands() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path(), 4);

    let updates = run(vec![
        EditorCommand::Open { path: input },
        EditorCommand::Navigate { position: 1 },
        EditorCommand::AddTool {
            tool: Tool::Rectangle,
        },
        EditorCommand::Navigate { position: 2 },
        EditorCommand::Navigate { position: 3 },
    ])
    .await;

    assert_eq!(displayed_positions(&updates), vec![0, 1, 3]);
    assert!(updates.iter().any(|u| matches!(
        u,
        EditorUpdate::SceneChanged {
            position: 1,
            object_count: 1
        }
    )));
}

#[tokio::test]
async fn test_commands_without_document_report_error() {
    let updates = run(vec![EditorCommand::NextPage]).await;
    assert!(matches!(
        &updates[..],
        [EditorUpdate::Error { message }] if message == "No document loaded"
    ));
}

#[tokio::test]
async fn test_rejected_and_missing_input_notices() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path(), 1);

    let updates = run(vec![
        EditorCommand::Open {
            path: dir.path().join("missing.pdf"),
        },
        EditorCommand::Open { path: input },
        EditorCommand::DeleteCurrent,
    ])
    .await;

    let errors: Vec<&str> = updates
        .iter()
        .filter_map(|u| match u {
            EditorUpdate::Error { message } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("Missing input"));
    assert!(errors[1].starts_with("Not allowed"));
}

#[tokio::test]
async fn test_drawing_mode_and_stroke() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path(), 1);

    let updates = run(vec![
        EditorCommand::Open { path: input },
        EditorCommand::CompleteStroke {
            points: vec![Point::new(1.0, 1.0), Point::new(5.0, 5.0)],
        },
        EditorCommand::SetDrawing { enabled: true },
        EditorCommand::CompleteStroke {
            points: vec![Point::new(1.0, 1.0), Point::new(5.0, 5.0)],
        },
    ])
    .await;

    let added = updates
        .iter()
        .filter(|u| matches!(u, EditorUpdate::ObjectAdded { .. }))
        .count();
    assert_eq!(added, 1);
    assert!(updates
        .iter()
        .any(|u| matches!(u, EditorUpdate::DrawingMode { enabled: true })));
}

#[test]
fn test_script_commands_deserialize() {
    let script = r#"[
        {"op": "navigate", "position": 1},
        {"op": "add_tool", "tool": "highlight"},
        {"op": "update_style", "change": {"attribute": "stroke_width", "value": 4.0}},
        {"op": "rotate_left"}
    ]"#;
    let commands: Vec<EditorCommand> = serde_json::from_str(script).unwrap();

    assert_eq!(
        commands,
        vec![
            EditorCommand::Navigate { position: 1 },
            EditorCommand::AddTool {
                tool: Tool::Highlight
            },
            EditorCommand::UpdateStyle {
                change: StyleChange::StrokeWidth(4.0)
            },
            EditorCommand::RotateLeft,
        ]
    );
}
