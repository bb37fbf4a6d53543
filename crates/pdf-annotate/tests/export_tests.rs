mod common;

use common::*;
use lopdf::{Document, Object};
use pdf_annotate::*;
use std::sync::Arc;

fn page_ids(doc: &Document) -> Vec<lopdf::ObjectId> {
    doc.get_pages().values().copied().collect()
}

fn image_alpha(doc: &Document, image_id: lopdf::ObjectId) -> (i64, i64, Vec<u8>) {
    let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
    let width = image.dict.get(b"Width").unwrap().as_i64().unwrap();
    let height = image.dict.get(b"Height").unwrap().as_i64().unwrap();
    let smask_id = image.dict.get(b"SMask").unwrap().as_reference().unwrap();
    let smask = doc.get_object(smask_id).unwrap().as_stream().unwrap();
    (width, height, smask.decompressed_content().unwrap())
}

#[tokio::test]
async fn test_no_edit_round_trip() {
    let pages = vec![TestPage::letter(), TestPage::rotated(270), TestPage::sized(300, 400)];
    let editor = open_editor(create_test_pdf_with(&pages)).await;

    let bytes = editor.export().await.unwrap();
    let doc = Document::load_mem(&bytes).unwrap();

    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(page_markers(&doc), vec![1, 2, 3]);
    assert_eq!(page_rotations(&doc), vec![0, 270, 0]);
    for page in page_ids(&doc) {
        assert!(page_images(&doc, page).is_empty());
    }
}

#[tokio::test]
async fn test_rotation_composition_in_export() {
    let pages = vec![TestPage::rotated(90), TestPage::letter()];
    let editor = open_editor(create_test_pdf_with(&pages)).await;

    editor.rotate_right().await.unwrap();
    editor.rotate_right().await.unwrap();
    editor.rotate_left().await.unwrap();
    editor.navigate(1).await.unwrap();
    editor.rotate_left().await.unwrap();

    let doc = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    assert_eq!(page_rotations(&doc), vec![180, 270]);
}

#[tokio::test]
async fn test_scenario_a_rotated_page_with_rectangle() {
    let editor = open_editor(create_test_pdf(3)).await;
    editor.rotate_right().await.unwrap();
    editor.add_tool(Tool::Rectangle).await.unwrap();

    let doc = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    let pages = page_ids(&doc);

    assert_eq!(page_markers(&doc), vec![1, 2, 3]);
    assert_eq!(page_rotations(&doc), vec![90, 0, 0]);

    let images = page_images(&doc, pages[0]);
    assert_eq!(images.len(), 1);
    let (width, height, alpha) = image_alpha(&doc, images[0]);
    assert_eq!((width, height), (612, 792));

    // The rectangle's left edge, drawn on the rotated view at x = 100,
    // ends up at page pixel (150, 691)
    assert!(alpha[691 * 612 + 150] > 0);
    // Its interior and the rest of the page stay transparent
    assert_eq!(alpha[641 * 612 + 150], 0);
    assert_eq!(alpha[10 * 612 + 10], 0);

    let content = String::from_utf8_lossy(&doc.get_page_content(pages[0]).unwrap()).to_string();
    assert!(content.contains("612 0 0 792 0 0 cm /PdfaOverlay Do"));

    assert!(page_images(&doc, pages[1]).is_empty());
    assert!(page_images(&doc, pages[2]).is_empty());
}

#[tokio::test]
async fn test_scenario_b_single_page_delete_rejected() {
    let editor = open_editor(create_test_pdf(1)).await;
    assert!(matches!(
        editor.delete_current().await,
        Err(AnnotateError::DeleteRejected)
    ));

    let doc = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test]
async fn test_scenario_c_deleted_pages_are_skipped() {
    let editor = open_editor(create_test_pdf(5)).await;
    editor.navigate(2).await.unwrap();
    editor.delete_current().await.unwrap();
    assert_eq!(editor.displayed().unwrap().original_index, 4);
    editor.delete_current().await.unwrap();

    let order: Vec<u32> = editor.entries().iter().map(|e| e.original_index).collect();
    assert_eq!(order, vec![1, 2, 5]);

    let doc = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    assert_eq!(page_markers(&doc), vec![1, 2, 5]);
}

#[tokio::test]
async fn test_reordered_pages_export_in_entry_order() {
    let editor = open_editor(create_test_pdf(3)).await;
    editor.move_page(2, 0).await.unwrap();

    let doc = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    assert_eq!(page_markers(&doc), vec![3, 1, 2]);
}

#[tokio::test]
async fn test_annotations_follow_their_page_after_delete() {
    let editor = open_editor(create_test_pdf(3)).await;
    editor.navigate(2).await.unwrap();
    editor.add_tool(Tool::Eraser).await.unwrap();
    editor.navigate(0).await.unwrap();
    editor.delete_current().await.unwrap();

    let doc = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    let pages = page_ids(&doc);
    assert_eq!(page_markers(&doc), vec![2, 3]);
    assert!(page_images(&doc, pages[0]).is_empty());
    assert_eq!(page_images(&doc, pages[1]).len(), 1);
}

#[tokio::test]
async fn test_export_determinism() {
    let editor = open_editor(create_test_pdf(2)).await;
    editor.add_tool(Tool::Highlight).await.unwrap();
    editor.rotate_left().await.unwrap();

    let first = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    let second = Document::load_mem(&editor.export().await.unwrap()).unwrap();

    assert_eq!(page_markers(&first), page_markers(&second));
    assert_eq!(page_rotations(&first), page_rotations(&second));
    let first_image = page_images(&first, page_ids(&first)[0]);
    let second_image = page_images(&second, page_ids(&second)[0]);
    assert_eq!(
        image_alpha(&first, first_image[0]),
        image_alpha(&second, second_image[0])
    );
}

#[tokio::test]
async fn test_inherited_attributes_are_resolved() {
    let editor = open_editor(create_inherited_pdf()).await;
    assert_eq!(editor.displayed().unwrap().raster.dimensions(), (400, 300));

    let doc = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    assert_eq!(page_rotations(&doc), vec![180, 180]);

    for page in page_ids(&doc) {
        let dict = doc.get_dictionary(page).unwrap();
        let media_box = dict.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), 400);

        let resources = match dict.get(b"Resources").unwrap() {
            Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
            other => other.as_dict().unwrap(),
        };
        assert!(resources.get(b"Font").is_ok());
    }
}

#[tokio::test]
async fn test_overlay_keeps_existing_resources() {
    let editor = open_editor(create_inherited_pdf()).await;
    editor.add_tool(Tool::Rectangle).await.unwrap();

    let doc = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    let page = page_ids(&doc)[0];
    let dict = doc.get_dictionary(page).unwrap();
    let resources = dict.get(b"Resources").unwrap().as_dict().unwrap();
    assert!(resources.get(b"Font").is_ok());
    assert_eq!(page_images(&doc, page).len(), 1);

    let content = String::from_utf8_lossy(&doc.get_page_content(page).unwrap()).to_string();
    assert!(content.starts_with("q\n"));
    assert!(content.contains("BT /F1 12 Tf"));
}

#[tokio::test]
async fn test_export_can_repeat_and_is_not_concurrent() {
    let editor = open_editor(create_test_pdf(2)).await;

    let (first, second) = tokio::join!(editor.export(), editor.export());
    assert!(first.is_ok());
    assert!(matches!(second, Err(AnnotateError::Busy)));
    assert!(!editor.is_exporting());

    assert!(editor.export().await.is_ok());
}

#[tokio::test]
async fn test_missing_font_aborts_export() {
    let mut options = EditorOptions::default();
    options.overlay.font_path = Some("/nonexistent/font.ttf".into());
    let editor: Editor<FakeSource, SceneSurface> =
        Editor::open(pdf_bytes(create_test_pdf(1)), SceneSurface::new(), options)
            .await
            .unwrap();
    editor.add_tool(Tool::Text).await.unwrap();

    let result = editor.export().await;
    assert!(matches!(result, Err(AnnotateError::FontUnavailable(_))));
    assert!(!editor.is_exporting());
}

#[tokio::test]
async fn test_text_is_burned_in_with_system_font() {
    let Some(font) = pdf_annotate::constants::FALLBACK_FONT_PATHS
        .iter()
        .find(|p| std::path::Path::new(p).exists())
    else {
        return;
    };
    let mut options = EditorOptions::default();
    options.overlay.font_path = Some(font.into());
    let editor: Editor<FakeSource, SceneSurface> =
        Editor::open(pdf_bytes(create_test_pdf(1)), SceneSurface::new(), options)
            .await
            .unwrap();
    editor.add_tool(Tool::Text).await.unwrap();

    let doc = Document::load_mem(&editor.export().await.unwrap()).unwrap();
    let images = page_images(&doc, page_ids(&doc)[0]);
    let (_, _, alpha) = image_alpha(&doc, images[0]);
    assert!(alpha.iter().any(|&a| a > 0));
}

#[tokio::test]
async fn test_export_failure_names_position() {
    let bytes: Arc<[u8]> = pdf_bytes(create_test_pdf(2)).into();
    let broken = Snapshot::new(
        612.0,
        792.0,
        vec![AnnotationObject::new(
            ObjectId(0),
            0.0,
            0.0,
            AnnotationKind::Image {
                width: 10.0,
                height: 10.0,
                png: b"garbage".to_vec(),
            },
        )],
    );
    let view = vec![
        ExportEntry {
            original_index: 1,
            rotation: Rotation::NONE,
            snapshot: None,
        },
        ExportEntry {
            original_index: 2,
            rotation: Rotation::NONE,
            snapshot: Some(broken),
        },
    ];

    let engine = ExportEngine::new(&EditorOptions::default());
    let result = engine.export(bytes.clone(), view).await;
    assert!(matches!(
        result,
        Err(AnnotateError::ExportAbort { position: 1, .. })
    ));

    let missing = vec![ExportEntry {
        original_index: 9,
        rotation: Rotation::NONE,
        snapshot: None,
    }];
    let result = engine.export(bytes, missing).await;
    assert!(matches!(
        result,
        Err(AnnotateError::ExportAbort { position: 0, .. })
    ));
}

#[tokio::test]
async fn test_export_to_uses_product_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = EditorOptions::default();
    options.output.product_name = "Acme".to_string();
    let editor: Editor<FakeSource, SceneSurface> =
        Editor::open(pdf_bytes(create_test_pdf(2)), SceneSurface::new(), options)
            .await
            .unwrap();

    let path = editor.export_to(dir.path()).await.unwrap();

    assert_eq!(path.file_name().unwrap(), "Acme_Edited.pdf");
    let doc = Document::load(&path).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}
