//! Cycles started through the controller, observed through the UI loop.

mod common;

use std::sync::Arc;

use aifun::ui::reporter::CANCELLED_MARKER;
use aifun::{Controller, MarkdownRenderer, UiLoop};
use common::{FixedUploader, Reply, ScriptedBackend, coordinator};

fn controller(replies: Vec<Reply>) -> (Controller, UiLoop) {
    let (coordinator, _) = coordinator(ScriptedBackend::new(replies), FixedUploader::ok());
    let (ui, queue) = UiLoop::new();
    let controller = Controller::new(coordinator, queue, Arc::new(MarkdownRenderer::plain()));
    (controller, ui)
}

#[tokio::test]
async fn completed_cycle_ends_with_one_terminal_redraw() {
    let (controller, mut ui) = controller(vec![Reply::Chunks(vec!["Hello, ", "world", "!"])]);
    let handle = controller.submit_prompt("hi").unwrap();
    assert_eq!(handle.await.unwrap().unwrap(), "Hello, world!");

    ui.apply_pending();
    let view = ui.view();
    assert_eq!(view.transcript(), &["[0] > hi\n", "Hello, world!\n"]);
    assert_eq!(view.provisional(), "");
    assert_eq!(view.progress(), "");
    assert_eq!(view.history_len(), 2);
    assert!(!view.is_busy());
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn second_submission_is_rejected_while_busy() {
    let (controller, mut ui) =
        controller(vec![Reply::Stall(vec!["wait"]), Reply::Chunks(vec!["done"])]);
    let first = controller.submit_prompt("slow").unwrap();
    assert!(controller.is_busy());

    let err = controller.submit_prompt("impatient").unwrap_err();
    assert!(err.is_in_progress());
    assert!(controller.introduce().unwrap_err().is_in_progress());
    assert!(controller.set_system_instruction("x").unwrap_err().is_in_progress());
    assert!(controller.reset().unwrap_err().is_in_progress());

    assert!(controller.cancel());
    assert!(first.await.unwrap().unwrap_err().is_cancelled());
    assert!(!controller.cancel());

    ui.apply_pending();
    assert_eq!(
        ui.view().transcript().last().map(String::as_str),
        Some(&*format!("{CANCELLED_MARKER}\n"))
    );
    assert_eq!(ui.view().history_len(), 0);
    assert!(!ui.view().is_busy());

    let second = controller.submit_prompt("again").unwrap();
    assert_eq!(second.await.unwrap().unwrap(), "done");
    assert_eq!(controller.history().unwrap().len(), 2);
}

#[tokio::test]
async fn failed_cycle_reports_the_error() {
    let (controller, mut ui) = controller(vec![Reply::FailAfter(vec!["par"])]);
    let handle = controller.submit_prompt("hi").unwrap();
    assert!(handle.await.unwrap().is_err());

    ui.apply_pending();
    let last = ui.view().transcript().last().cloned().unwrap();
    assert!(last.starts_with("Error: Streaming error"), "{last}");
    assert_eq!(ui.view().provisional(), "");
    assert_eq!(ui.view().history_len(), 0);
    assert!(controller.history().unwrap().is_empty());
}

#[tokio::test]
async fn reset_clears_history_and_view() {
    let (controller, mut ui) = controller(vec![Reply::Chunks(vec!["ok"])]);
    controller.submit_prompt("hi").unwrap().await.unwrap().unwrap();
    controller.reset().unwrap();
    ui.apply_pending();
    assert!(ui.view().transcript().is_empty());
    assert_eq!(ui.view().history_len(), 0);
    assert!(controller.history().unwrap().is_empty());
}

#[tokio::test]
async fn instruction_is_visible_between_cycles() {
    let (controller, _ui) = controller(vec![]);
    controller.set_system_instruction("be brief").unwrap();
    assert_eq!(controller.system_instruction().unwrap(), "be brief");
}

#[tokio::test]
async fn review_echoes_the_command() {
    let (controller, mut ui) = controller(vec![Reply::Chunks(vec!["LGTM"])]);
    controller
        .review_attachment(None)
        .unwrap()
        .await
        .unwrap()
        .unwrap();
    ui.apply_pending();
    assert_eq!(ui.view().transcript(), &["[0] > review\n", "LGTM\n"]);
    assert_eq!(ui.view().history_len(), 2);
}
