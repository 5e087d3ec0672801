//! Generation cycles against a scripted backend.

mod common;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use aifun::{CycleOptions, Part, Role};
use common::{FILE_URI, FixedUploader, Reply, ScriptedBackend, coordinator};

fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut chunks = Vec::new();
    while let Ok(chunk) = rx.try_recv() {
        chunks.push(chunk);
    }
    chunks
}

#[tokio::test]
async fn every_successful_message_adds_two_turns() {
    let backend = ScriptedBackend::new([
        Reply::Chunks(vec!["one"]),
        Reply::Chunks(vec!["two"]),
        Reply::Chunks(vec!["three"]),
    ]);
    let (mut coordinator, _) = coordinator(backend.clone(), FixedUploader::ok());
    let (tx, _rx) = mpsc::unbounded_channel();
    for (i, prompt) in ["a", "b", "c"].iter().enumerate() {
        coordinator
            .send_message(prompt, &tx, &CycleOptions::new())
            .await
            .unwrap();
        assert_eq!(coordinator.session().len(), 2 * (i + 1));
    }
    let history = coordinator.session().history();
    assert_eq!(history[4].role(), Role::User);
    assert_eq!(history[4].text(), Some("c"));
    assert_eq!(history[5].role(), Role::Model);
    assert_eq!(history[5].text(), Some("three"));
    // Each request carries the history committed before it.
    let requests = backend.requests();
    assert_eq!(requests[2].history.len(), 4);
}

#[tokio::test]
async fn chunks_arrive_in_order() {
    let backend = ScriptedBackend::new([Reply::Chunks(vec!["Hello, ", "world", "!"])]);
    let (mut coordinator, _) = coordinator(backend, FixedUploader::ok());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let text = coordinator
        .send_message("greet me", &tx, &CycleOptions::new())
        .await
        .unwrap();
    assert_eq!(text, "Hello, world!");
    assert_eq!(drain(&mut rx), vec!["Hello, ", "world", "!"]);
    assert_eq!(
        coordinator.session().history()[1].text(),
        Some("Hello, world!")
    );
}

#[tokio::test]
async fn mid_stream_failure_commits_nothing() {
    let backend = ScriptedBackend::new([
        Reply::Chunks(vec!["fine"]),
        Reply::FailAfter(vec!["par", "tial"]),
    ]);
    let (mut coordinator, _) = coordinator(backend, FixedUploader::ok());
    let (tx, mut rx) = mpsc::unbounded_channel();
    coordinator
        .send_message("first", &tx, &CycleOptions::new())
        .await
        .unwrap();
    drain(&mut rx);

    let err = coordinator
        .send_message("second", &tx, &CycleOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_streaming());
    assert_eq!(drain(&mut rx), vec!["par", "tial"]);
    assert_eq!(coordinator.session().len(), 2);
}

#[tokio::test]
async fn refused_generation_commits_nothing() {
    let backend = ScriptedBackend::new([Reply::Refuse, Reply::Chunks(vec!["back"])]);
    let (mut coordinator, _) = coordinator(backend, FixedUploader::ok());
    let (tx, _rx) = mpsc::unbounded_channel();
    let err = coordinator
        .send_message("hi", &tx, &CycleOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert!(coordinator.session().is_empty());

    // The session stays usable.
    coordinator
        .send_message("hi again", &tx, &CycleOptions::new())
        .await
        .unwrap();
    assert_eq!(coordinator.session().len(), 2);
}

#[tokio::test]
async fn empty_stream_commits_an_empty_model_turn() {
    let backend = ScriptedBackend::new([Reply::Chunks(vec![])]);
    let (mut coordinator, _) = coordinator(backend, FixedUploader::ok());
    let (tx, _rx) = mpsc::unbounded_channel();
    let text = coordinator
        .send_message("say nothing", &tx, &CycleOptions::new())
        .await
        .unwrap();
    assert_eq!(text, "");
    let history = coordinator.session().history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].text(), Some(""));
}

#[tokio::test]
async fn review_mentions_the_uri_once_and_saves_the_result() {
    let backend = ScriptedBackend::new([Reply::Chunks(vec!["## Review\n", "Looks good."])]);
    let uploader = FixedUploader::ok();
    let (coordinator, writer) = coordinator(backend.clone(), uploader.clone());
    let mut coordinator = coordinator.with_review_output("review.md");
    let (tx, _rx) = mpsc::unbounded_channel();

    let text = coordinator
        .review_attachment(None, &tx, &CycleOptions::new())
        .await
        .unwrap();
    assert_eq!(text, "## Review\nLooks good.");
    assert_eq!(
        uploader.paths.lock().unwrap().as_slice(),
        &[PathBuf::from("gitdiff.txt")]
    );

    let requests = backend.requests();
    let request = &requests[0];
    assert_eq!(request.new_parts.len(), 2);
    assert_eq!(
        request.new_parts[0].as_attachment().map(|r| r.uri()),
        Some(FILE_URI)
    );
    let command = request.new_parts[1].as_text().unwrap();
    assert_eq!(command.matches(FILE_URI).count(), 1);

    let history = coordinator.session().history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].text(), Some(command));
    assert_eq!(history[1].text(), Some("## Review\nLooks good."));

    let writes = writer.writes.lock().unwrap();
    assert_eq!(
        writes.as_slice(),
        &[("## Review\nLooks good.".to_string(), PathBuf::from("review.md"))]
    );
}

#[tokio::test]
async fn review_of_an_explicit_path() {
    let backend = ScriptedBackend::new([Reply::Chunks(vec!["ok"])]);
    let uploader = FixedUploader::ok();
    let (mut coordinator, _) = coordinator(backend, uploader.clone());
    let (tx, _rx) = mpsc::unbounded_channel();
    coordinator
        .review_attachment(Some(Path::new("changes.diff")), &tx, &CycleOptions::new())
        .await
        .unwrap();
    assert_eq!(
        uploader.paths.lock().unwrap().as_slice(),
        &[PathBuf::from("changes.diff")]
    );
}

#[tokio::test]
async fn failed_upload_leaves_the_session_usable() {
    let backend = ScriptedBackend::new([Reply::Chunks(vec!["still here"])]);
    let (mut coordinator, writer) = coordinator(backend.clone(), FixedUploader::failing());
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = coordinator
        .review_attachment(None, &tx, &CycleOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_attachment());
    assert!(backend.requests().is_empty());
    assert!(coordinator.session().is_empty());
    assert!(writer.writes.lock().unwrap().is_empty());

    let text = coordinator
        .send_message("hello?", &tx, &CycleOptions::new())
        .await
        .unwrap();
    assert_eq!(text, "still here");
}

#[tokio::test]
async fn failed_review_saves_nothing() {
    let backend = ScriptedBackend::new([Reply::FailAfter(vec!["half a review"])]);
    let (mut coordinator, writer) = coordinator(backend, FixedUploader::ok());
    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(
        coordinator
            .review_attachment(None, &tx, &CycleOptions::new())
            .await
            .is_err()
    );
    assert!(coordinator.session().is_empty());
    assert!(writer.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn changing_the_instruction_keeps_past_turns() {
    let backend = ScriptedBackend::new([Reply::Chunks(vec!["A"]), Reply::Chunks(vec!["B"])]);
    let (mut coordinator, _) = coordinator(backend.clone(), FixedUploader::ok());
    let (tx, _rx) = mpsc::unbounded_channel();
    coordinator.set_system_instruction("first persona");
    coordinator
        .send_message("one", &tx, &CycleOptions::new())
        .await
        .unwrap();
    let before = coordinator.session().history();

    coordinator.set_system_instruction("second persona");
    assert_eq!(coordinator.session().history(), before);

    coordinator
        .send_message("two", &tx, &CycleOptions::new())
        .await
        .unwrap();
    assert_eq!(&coordinator.session().history()[..2], before.as_slice());
    let requests = backend.requests();
    assert_eq!(requests[0].system_instruction, "first persona");
    assert_eq!(requests[1].system_instruction, "second persona");
    assert_eq!(requests[1].history, before);
}

#[tokio::test]
async fn introduction_uses_history_and_commits_the_reply() {
    let backend = ScriptedBackend::new([Reply::Chunks(vec!["hi"]), Reply::Chunks(vec!["I am"])]);
    let (mut coordinator, _) = coordinator(backend.clone(), FixedUploader::ok());
    let (tx, _rx) = mpsc::unbounded_channel();
    coordinator
        .send_message("hello", &tx, &CycleOptions::new())
        .await
        .unwrap();
    coordinator
        .send_system_prompt(&tx, &CycleOptions::new())
        .await
        .unwrap();
    let history = coordinator.session().history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].role(), Role::Model);
    assert_eq!(backend.requests()[1].history.len(), 2);
    assert!(matches!(backend.requests()[1].new_parts[0], Part::Text(_)));
}

#[tokio::test]
async fn cancellation_mid_stream_commits_nothing() {
    let backend = ScriptedBackend::new([Reply::Stall(vec!["thinking"])]);
    let (mut coordinator, _) = coordinator(backend, FixedUploader::ok());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let options = CycleOptions::new();
    let cancel = options.cancel.clone();

    let (result, first) = tokio::join!(coordinator.send_message("go", &tx, &options), async {
        let first = rx.recv().await;
        cancel.cancel();
        first
    });
    assert_eq!(first.as_deref(), Some("thinking"));
    assert!(result.unwrap_err().is_cancelled());
    assert!(coordinator.session().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deadline_aborts_a_stalled_stream() {
    let backend = ScriptedBackend::new([Reply::Stall(vec!["slow"]), Reply::Chunks(vec!["fast"])]);
    let (mut coordinator, _) = coordinator(backend, FixedUploader::ok());
    let (tx, _rx) = mpsc::unbounded_channel();
    let options = CycleOptions::new().with_deadline(Some(Duration::from_secs(30)));

    let err = coordinator
        .send_message("go", &tx, &options)
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(coordinator.session().is_empty());

    coordinator.send_message("again", &tx, &options).await.unwrap();
    assert_eq!(coordinator.session().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn review_deadline_covers_upload_and_stream() {
    let backend = ScriptedBackend::new([Reply::Stall(vec!["partial"])]);
    let uploader = FixedUploader::slow(Duration::from_secs(25));
    let (mut coordinator, writer) = coordinator(backend, uploader);
    let (tx, _rx) = mpsc::unbounded_channel();
    let options = CycleOptions::new().with_deadline(Some(Duration::from_secs(30)));

    let start = tokio::time::Instant::now();
    let err = coordinator
        .review_attachment(None, &tx, &options)
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() <= Duration::from_secs(30));
    assert!(coordinator.session().is_empty());
    assert!(writer.writes.lock().unwrap().is_empty());
}
