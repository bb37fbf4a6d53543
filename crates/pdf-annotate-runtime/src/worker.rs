use crate::{EditorCommand, EditorUpdate};
use pdf_annotate::{
    DocumentSource, Editor, EditorOptions, RenderOutcome, Result, SceneSurface, UserNotice,
};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

type Session<S> = Editor<S, SceneSurface>;

/// Async worker task that drives one editor from a command stream.
///
/// The editor is not `Send`; run this on the same thread as whoever feeds it,
/// e.g. joined with the producer on a current-thread runtime.
pub async fn worker_task<S: DocumentSource>(
    options: EditorOptions,
    mut command_rx: mpsc::UnboundedReceiver<EditorCommand>,
    update_tx: mpsc::UnboundedSender<EditorUpdate>,
) {
    let mut session: Option<Session<S>> = None;
    // Command read past the end of a navigation run, handled next
    let mut pending: Option<EditorCommand> = None;

    loop {
        let cmd = match pending.take() {
            Some(cmd) => cmd,
            None => match command_rx.recv().await {
                Some(cmd) => cmd,
                None => break,
            },
        };

        let cmd = match cmd {
            EditorCommand::Navigate { position } => {
                let (position, next) = coalesce_navigation(position, &mut command_rx);
                pending = next;
                EditorCommand::Navigate { position }
            }
            cmd => cmd,
        };
        process_command(cmd, &options, &mut session, &update_tx).await;
    }

    if let Some(editor) = session.take() {
        editor.close();
    }
}

/// Collapse a run of queued navigations into the newest one.
///
/// Returns the target position and the first non-navigation command that
/// ended the run, which must run after the navigation.
fn coalesce_navigation(
    mut position: usize,
    command_rx: &mut mpsc::UnboundedReceiver<EditorCommand>,
) -> (usize, Option<EditorCommand>) {
    while let Ok(next_cmd) = command_rx.try_recv() {
        match next_cmd {
            EditorCommand::Navigate {
                position: new_position,
            } => {
                log::debug!("Discarding queued navigation, using newer request");
                position = new_position;
            }
            other => return (position, Some(other)),
        }
    }
    (position, None)
}

async fn process_command<S: DocumentSource>(
    cmd: EditorCommand,
    options: &EditorOptions,
    session: &mut Option<Session<S>>,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
) {
    match cmd {
        EditorCommand::Open { path } => {
            handle_open(path, options, session, update_tx).await;
        }
        EditorCommand::Close => {
            if let Some(editor) = session.take() {
                editor.close();
            }
            let _ = update_tx.send(EditorUpdate::Closed);
        }
        EditorCommand::Navigate { position } => {
            with_editor(session, update_tx, |editor| {
                handle_navigate(position, editor, update_tx)
            })
            .await;
        }
        cmd => {
            with_editor(session, update_tx, |editor| {
                handle_edit(cmd, editor, update_tx)
            })
            .await;
        }
    }
}

async fn with_editor<'a, S, F, Fut>(
    session: &'a Option<Session<S>>,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
    run: F,
) where
    S: DocumentSource,
    F: FnOnce(&'a Session<S>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let Some(editor) = session.as_ref() else {
        let _ = update_tx.send(EditorUpdate::Error {
            message: "No document loaded".to_string(),
        });
        return;
    };

    if let Err(e) = run(editor).await {
        let notice = UserNotice::from_error(&e);
        log::warn!("{}", notice);
        let _ = update_tx.send(EditorUpdate::Error {
            message: notice.to_string(),
        });
    }
}

async fn handle_open<S: DocumentSource>(
    path: PathBuf,
    options: &EditorOptions,
    session: &mut Option<Session<S>>,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
) {
    if let Some(previous) = session.take() {
        previous.close();
    }

    match open_session::<S>(&path, options).await {
        Ok(editor) => {
            log::info!("Opened {}", path.display());
            let _ = update_tx.send(EditorUpdate::Loaded {
                page_count: editor.page_count(),
            });
            send_displayed(&editor, update_tx);
            *session = Some(editor);
        }
        Err(e) => {
            let _ = update_tx.send(EditorUpdate::Error {
                message: UserNotice::from_error(&e).to_string(),
            });
        }
    }
}

async fn open_session<S: DocumentSource>(
    path: &Path,
    options: &EditorOptions,
) -> Result<Session<S>> {
    let bytes = tokio::fs::read(path).await?;
    Editor::open(bytes, SceneSurface::new(), options.clone()).await
}

async fn handle_navigate<S: DocumentSource>(
    position: usize,
    editor: &Session<S>,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
) -> Result<()> {
    let outcome = editor.navigate(position).await?;
    report_outcome(editor, outcome, update_tx);
    Ok(())
}

async fn handle_edit<S: DocumentSource>(
    cmd: EditorCommand,
    editor: &Session<S>,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
) -> Result<()> {
    match cmd {
        EditorCommand::NextPage => report_outcome(editor, editor.next_page().await?, update_tx),
        EditorCommand::PreviousPage => {
            report_outcome(editor, editor.previous_page().await?, update_tx)
        }
        EditorCommand::ZoomIn => report_outcome(editor, editor.zoom_in().await?, update_tx),
        EditorCommand::ZoomOut => report_outcome(editor, editor.zoom_out().await?, update_tx),
        EditorCommand::RotateRight => {
            report_outcome(editor, editor.rotate_right().await?, update_tx)
        }
        EditorCommand::RotateLeft => report_outcome(editor, editor.rotate_left().await?, update_tx),
        EditorCommand::DeleteCurrent => {
            let outcome = editor.delete_current().await?;
            send_order(editor, update_tx);
            report_outcome(editor, outcome, update_tx);
        }
        EditorCommand::MovePage { from, to } => {
            let outcome = editor.move_page(from, to).await?;
            send_order(editor, update_tx);
            report_outcome(editor, outcome, update_tx);
        }
        EditorCommand::AddTool { tool } => {
            let id = editor.add_tool(tool).await?;
            send_added(editor, id, update_tx).await;
        }
        EditorCommand::AddImage { path } => {
            let bytes = tokio::fs::read(&path).await?;
            let id = editor.add_image(&bytes).await?;
            send_added(editor, id, update_tx).await;
        }
        EditorCommand::SetDrawing { enabled } => {
            editor.set_drawing(enabled);
            let _ = update_tx.send(EditorUpdate::DrawingMode { enabled });
        }
        EditorCommand::CompleteStroke { points } => {
            if let Some(id) = editor.complete_stroke(&points).await? {
                send_added(editor, id, update_tx).await;
            }
        }
        EditorCommand::Select { id } => editor.select(id).await?,
        EditorCommand::MoveObject { id, left, top } => {
            let changed = editor.move_object(id, left, top).await?;
            send_scene_if(changed, editor, update_tx).await;
        }
        EditorCommand::EditText { id, text } => {
            let changed = editor.edit_text(id, &text).await?;
            send_scene_if(changed, editor, update_tx).await;
        }
        EditorCommand::UpdateStyle { change } => {
            let changed = editor.update_style(change).await?;
            send_scene_if(changed, editor, update_tx).await;
        }
        EditorCommand::DeleteSelected => {
            let changed = editor.delete_selected().await?;
            send_scene_if(changed, editor, update_tx).await;
        }
        EditorCommand::Thumbnails => {
            let thumbnails = editor.thumbnails().await;
            let _ = update_tx.send(EditorUpdate::ThumbnailsReady { thumbnails });
        }
        EditorCommand::Export { dir } => {
            let path = editor.export_to(&dir).await?;
            let _ = update_tx.send(EditorUpdate::Exported { path });
        }
        EditorCommand::Open { .. } | EditorCommand::Close | EditorCommand::Navigate { .. } => {
            log::debug!("Session command reached the edit handler: {:?}", cmd);
        }
    }
    Ok(())
}

fn report_outcome<S: DocumentSource>(
    editor: &Session<S>,
    outcome: RenderOutcome,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
) {
    if let RenderOutcome::Rendered { .. } = outcome {
        send_displayed(editor, update_tx);
    }
}

fn send_displayed<S: DocumentSource>(
    editor: &Session<S>,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
) {
    if let Some(displayed) = editor.displayed() {
        let _ = update_tx.send(EditorUpdate::PageDisplayed {
            position: displayed.position,
            original_index: displayed.original_index,
            rotation: displayed.rotation,
            width: displayed.raster.width,
            height: displayed.raster.height,
        });
    }
}

fn send_order<S: DocumentSource>(
    editor: &Session<S>,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
) {
    let order = editor.entries().iter().map(|e| e.original_index).collect();
    let _ = update_tx.send(EditorUpdate::PagesChanged { order });
}

async fn send_added<S: DocumentSource>(
    editor: &Session<S>,
    id: pdf_annotate::ObjectId,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
) {
    let _ = update_tx.send(EditorUpdate::ObjectAdded { id });
    send_scene_if(true, editor, update_tx).await;
}

async fn send_scene_if<S: DocumentSource>(
    changed: bool,
    editor: &Session<S>,
    update_tx: &mpsc::UnboundedSender<EditorUpdate>,
) {
    if changed {
        let _ = update_tx.send(EditorUpdate::SceneChanged {
            position: editor.current_position(),
            object_count: editor.scene().await.objects.len(),
        });
    }
}
