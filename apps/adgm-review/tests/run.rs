use adgm_review::{run, RunConfig, REPORTS_DIR, REPORT_FILE, REVIEWED_DIR};
use corpus_core::CorpusConfig;
use pretty_assertions::assert_eq;
use shared_docx::{ClauseExtractor, DocxBuilder};
use shared_types::{BlockKind, ProcessCategory};
use std::fs;

fn resolution() -> Vec<u8> {
    DocxBuilder::new()
        .heading("Board Resolution")
        .paragraph("Dated 3 March 2025")
        .paragraph("It is resolved that the Company opens a bank account.")
        .paragraph("Any dispute shall be referred to the Dubai Courts.")
        .build()
        .unwrap()
}

fn block_content(bytes: &[u8]) -> Vec<(String, BlockKind, String)> {
    ClauseExtractor::extract_bytes(bytes)
        .unwrap()
        .into_iter()
        .map(|b| (b.anchor_id.to_string(), b.kind, b.text))
        .collect()
}

#[tokio::test]
async fn test_run_writes_report_and_reviewed_copy() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let references = tempfile::tempdir().unwrap();

    let doc_path = input.path().join("Board Resolution.docx");
    fs::write(&doc_path, resolution()).unwrap();
    fs::write(
        references.path().join("ADGM Courts Regulations.txt"),
        "Jurisdiction of the ADGM Courts. The Courts have exclusive jurisdiction over disputes.",
    )
    .unwrap();

    let config = RunConfig {
        files: vec![doc_path],
        policy: None,
        process: None,
        out_dir: out.path().to_path_buf(),
        corpus: CorpusConfig::with_reference_dir(references.path()),
    };
    let (review, outputs) = run(&config).await.unwrap();

    assert_eq!(review.report.process, ProcessCategory::Resolution);
    assert_eq!(outputs.report, out.path().join(REPORTS_DIR).join(REPORT_FILE));
    assert_eq!(
        outputs.reviewed,
        vec![out.path().join(REVIEWED_DIR).join("Board Resolution_REVIEWED.docx")]
    );

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&outputs.report).unwrap()).unwrap();
    assert_eq!(json["process"], "Resolution");
    assert_eq!(json["documents"][0]["document_type"], "Board Resolution");
    let forum = json["documents"][0]["findings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["id"] == "jurisdiction-clause")
        .unwrap();
    assert_eq!(forum["citation"], "ADGM Courts Regulations.txt");

    let reviewed = fs::read(&outputs.reviewed[0]).unwrap();
    assert_eq!(block_content(&reviewed), block_content(&resolution()));
}

#[tokio::test]
async fn test_unreadable_input_file_is_an_error() {
    let out = tempfile::tempdir().unwrap();
    let config = RunConfig {
        files: vec![out.path().join("missing.docx")],
        policy: None,
        process: Some(ProcessCategory::Resolution),
        out_dir: out.path().to_path_buf(),
        corpus: CorpusConfig::default(),
    };
    let err = run(&config).await.unwrap_err();
    assert!(format!("{:#}", err).contains("missing.docx"));
}

#[tokio::test]
async fn test_same_file_name_from_two_folders_keeps_both_outputs() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let files = vec![
        first.path().join("Board Resolution.docx"),
        second.path().join("Board Resolution.docx"),
    ];
    for path in &files {
        fs::write(path, resolution()).unwrap();
    }

    let config = RunConfig {
        files,
        policy: None,
        process: Some(ProcessCategory::Resolution),
        out_dir: out.path().to_path_buf(),
        corpus: CorpusConfig::default(),
    };
    let (_, outputs) = run(&config).await.unwrap();

    let reviewed = out.path().join(REVIEWED_DIR);
    assert_eq!(
        outputs.reviewed,
        vec![
            reviewed.join("Board Resolution_REVIEWED.docx"),
            reviewed.join("Board Resolution_REVIEWED_2.docx"),
        ]
    );
    assert!(outputs.reviewed.iter().all(|p| p.exists()));
}
