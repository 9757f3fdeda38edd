//! Pause, cancel and resume from the stored checkpoint.

mod common;

use std::sync::Arc;

use common::*;
use process_distributor::constants::NOLEVEL;
use process_distributor::models::{
    Distribution, DistributorIndex, ItemStatus, PauseOrCancelAction, PauseRecover, StatusCode,
    Step,
};
use process_distributor::storage::StepProgress;
use serde_json::json;

fn recovering(distribution: Distribution) -> Arc<Step> {
    Arc::new(
        Step::new(STEP_ID, STEP_NAME, FAMILY, distribution)
            .with_action(PauseOrCancelAction::Recover),
    )
}

fn done(elements: &[&str]) -> ItemStatus {
    let mut status = ItemStatus::new(STEP_NAME);
    for element in elements {
        status.merge(
            ItemStatus::new(STEP_NAME)
                .set_item_status(*element, ItemStatus::new(*element).increment(StatusCode::Ok)),
        );
    }
    status
}

/// Harness whose worker requests a pause through the distributor while
/// processing `trigger`
async fn pausing_harness(trigger: &'static str, action: PauseOrCancelAction) -> Arc<Harness> {
    let harness = Arc::new(Harness::new(test_config(2, 1)));
    harness.add_worker("w1", 1).await;

    let weak = Arc::downgrade(&harness);
    harness.worker.on_call(move |description| {
        if description.object_names().iter().any(|e| e == trigger) {
            if let Some(harness) = weak.upgrade() {
                let requested = match action {
                    PauseOrCancelAction::Cancel => harness.distributor.cancel(OPERATION_ID),
                    _ => harness.distributor.pause(OPERATION_ID),
                };
                assert!(requested);
            }
        }
    });
    harness
}

#[tokio::test]
async fn test_pause_keeps_unstarted_elements_and_resume_submits_them() {
    let harness = pausing_harness("e1", PauseOrCancelAction::Pause).await;
    harness.put_file_listing("units.json", &["e1", "e2", "e3", "e4"]);
    let step = step(Distribution::file_listing("units.json"));

    let paused = harness.run(&step).await;

    assert_eq!(step.action(), PauseOrCancelAction::Pause);
    assert!(paused.item(PauseOrCancelAction::Pause.as_str()).is_some());
    assert_eq!(harness.worker.elements(), vec!["e1"]);

    let writes = harness.checkpoint_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].offset, 0);
    assert_eq!(writes[0].remaining_elements, vec!["e2"]);
    assert!(!writes[0].level_finished);
    assert_eq!(
        harness.metadata.progress(OPERATION_ID, STEP_ID),
        StepProgress {
            total: 4,
            processed: 1
        }
    );

    harness.worker.clear_hook();
    harness.worker.reset_calls();
    step.set_action(PauseOrCancelAction::Recover);
    let resumed = harness
        .resume(&step, PauseRecover::RecoverFromApiPause)
        .await;

    let mut called = harness.worker.elements();
    called.sort();
    assert_eq!(called, vec!["e2", "e3", "e4"]);

    assert_eq!(resumed.global_status(), StatusCode::Ok);
    assert!(resumed.item(PauseOrCancelAction::Pause.as_str()).is_none());
    for element in ["e1", "e2", "e3", "e4"] {
        assert!(resumed.item(element).is_some(), "missing {element}");
    }

    let last = harness.checkpoint_writes().pop().unwrap();
    assert_eq!(last.offset, 4);
    assert!(last.level_finished);
    assert!(last.remaining_elements.is_empty());
    assert_eq!(step.action(), PauseOrCancelAction::Complete);
    assert_eq!(
        harness.metadata.progress(OPERATION_ID, STEP_ID),
        StepProgress {
            total: 4,
            processed: 4
        }
    );
}

#[tokio::test]
async fn test_cancel_checkpoints_and_keeps_the_action() {
    let harness = pausing_harness("e1", PauseOrCancelAction::Cancel).await;
    harness.put_file_listing("units.json", &["e1", "e2", "e3"]);
    let step = step(Distribution::file_listing("units.json"));

    let status = harness.run(&step).await;

    assert_eq!(step.action(), PauseOrCancelAction::Cancel);
    assert!(status.item(PauseOrCancelAction::Cancel.as_str()).is_some());
    assert_eq!(harness.worker.elements(), vec!["e1"]);

    let writes = harness.checkpoint_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].remaining_elements, vec!["e2"]);
    assert!(!harness.distributor.is_running(OPERATION_ID));
}

#[tokio::test]
async fn test_signals_for_unknown_operations_are_ignored() {
    let harness = Harness::new(test_config(2, 1));
    assert!(!harness.distributor.pause("nope"));
    assert!(!harness.distributor.cancel("nope"));
    assert!(!harness.distributor.is_running("nope"));
}

#[tokio::test]
async fn test_resume_without_checkpoint_is_fatal() {
    let harness = Harness::new(test_config(2, 1));
    harness.add_worker("w1", 1).await;
    harness.put_file_listing("units.json", &["e1"]);
    let step = recovering(Distribution::file_listing("units.json"));

    let status = harness
        .resume(&step, PauseRecover::RecoverFromServerPause)
        .await;

    assert_eq!(status.global_status(), StatusCode::Fatal);
    assert!(harness.worker.calls().is_empty());
    assert_eq!(step.action(), PauseOrCancelAction::Complete);
}

#[tokio::test]
async fn test_checkpoint_of_another_step_is_fatal() {
    let harness = Harness::new(test_config(2, 1));
    harness.add_worker("w1", 1).await;
    harness.put_file_listing("units.json", &["e1", "e2"]);
    harness.seed_checkpoint(DistributorIndex::new(
        NOLEVEL,
        1,
        done(&["e1"]),
        "req-1",
        "other-step",
        Vec::new(),
    ));
    let step = recovering(Distribution::file_listing("units.json"));

    let status = harness
        .resume(&step, PauseRecover::RecoverFromApiPause)
        .await;

    assert_eq!(status.global_status(), StatusCode::Fatal);
    assert!(harness.worker.calls().is_empty());
    assert!(harness.checkpoint_writes().is_empty());
}

#[tokio::test]
async fn test_resume_requires_the_recover_action() {
    let harness = Harness::new(test_config(2, 1));
    harness.add_worker("w1", 1).await;
    harness.put_file_listing("units.json", &["e1", "e2", "e3"]);
    harness.seed_checkpoint(DistributorIndex::new(
        NOLEVEL,
        2,
        done(&["e1", "e2"]),
        "req-1",
        STEP_ID,
        Vec::new(),
    ));

    // running action: the checkpoint is ignored
    let running = step(Distribution::file_listing("units.json"));
    harness
        .resume(&running, PauseRecover::RecoverFromApiPause)
        .await;
    assert_eq!(harness.worker.elements(), vec!["e1", "e2", "e3"]);

    // recover action without a resume flag: the checkpoint is ignored too
    harness.worker.reset_calls();
    let recover = recovering(Distribution::file_listing("units.json"));
    harness.resume(&recover, PauseRecover::NoRecover).await;
    assert_eq!(harness.worker.elements(), vec!["e1", "e2", "e3"]);
}

#[tokio::test]
async fn test_resume_continues_from_the_offset() {
    let harness = Harness::new(test_config(2, 1));
    harness.add_worker("w1", 1).await;
    harness.put_file_listing("units.json", &["e1", "e2", "e3", "e4", "e5"]);
    harness.seed_checkpoint(DistributorIndex::new(
        NOLEVEL,
        2,
        done(&["e1", "e2"]),
        "req-1",
        STEP_ID,
        Vec::new(),
    ));
    let step = recovering(Distribution::file_listing("units.json"));

    let status = harness
        .resume(&step, PauseRecover::RecoverFromServerPause)
        .await;

    assert_eq!(harness.worker.elements(), vec!["e3", "e4", "e5"]);
    assert_eq!(status.items_status().len(), 5);

    let offsets: Vec<usize> = harness
        .checkpoint_writes()
        .iter()
        .map(|w| w.offset)
        .collect();
    assert_eq!(offsets, vec![4, 5]);
}

#[tokio::test]
async fn test_finished_checkpoint_is_adopted_as_is() {
    let harness = Harness::new(test_config(2, 1));
    harness.add_worker("w1", 1).await;
    harness.put_file_listing("units.json", &["e1", "e2"]);
    let final_status = done(&["e1", "e2"]);
    harness.seed_checkpoint(
        DistributorIndex::new(NOLEVEL, 2, final_status.clone(), "req-1", STEP_ID, Vec::new())
            .with_level_finished(true),
    );
    let step = recovering(Distribution::file_listing("units.json"));

    let status = harness
        .resume(&step, PauseRecover::RecoverFromApiPause)
        .await;

    assert_eq!(status, final_status);
    assert!(harness.worker.calls().is_empty());
    assert!(harness.checkpoint_writes().is_empty());
    assert_eq!(step.action(), PauseOrCancelAction::Complete);
}

#[tokio::test]
async fn test_multi_level_resume_skips_completed_levels() {
    let harness = Harness::new(test_config(2, 1));
    harness.add_worker("w1", 1).await;
    harness
        .source
        .put_json(
            OPERATION_ID,
            "levels.json",
            &json!({
                "level_0": ["u1", "u2"],
                "level_1": ["u3", "u4"],
                "level_2": ["u5"]
            }),
        )
        .unwrap();
    harness.seed_checkpoint(DistributorIndex::new(
        "level_1",
        1,
        done(&["u1.json", "u2.json", "u3.json"]),
        "req-1",
        STEP_ID,
        Vec::new(),
    ));
    let step = recovering(Distribution::multi_level_file("levels.json"));

    let status = harness
        .resume(&step, PauseRecover::RecoverFromServerPause)
        .await;

    assert_eq!(status.global_status(), StatusCode::Ok);
    assert_eq!(harness.worker.elements(), vec!["u4.json", "u5.json"]);

    let levels: Vec<(String, usize, bool)> = harness
        .checkpoint_writes()
        .into_iter()
        .map(|w| (w.level, w.offset, w.level_finished))
        .collect();
    assert_eq!(
        levels,
        vec![
            ("level_1".to_string(), 2, true),
            ("level_2".to_string(), 1, true),
        ]
    );
}

#[tokio::test]
async fn test_linked_files_resume_continues_with_later_pages() {
    let harness = Harness::new(test_config(2, 1));
    harness.add_worker("w1", 1).await;
    harness
        .source
        .put_json(
            OPERATION_ID,
            "page_a.json",
            &json!({ "elements": ["a1", "a2"], "nextFile": "page_b.json" }),
        )
        .unwrap();
    harness
        .source
        .put_json(
            OPERATION_ID,
            "page_b.json",
            &json!({ "elements": ["b1", "b2"], "nextFile": "page_c.json" }),
        )
        .unwrap();
    harness
        .source
        .put_json(OPERATION_ID, "page_c.json", &json!({ "elements": ["c1"] }))
        .unwrap();
    harness.seed_checkpoint(
        DistributorIndex::new(
            "page_b.json",
            2,
            done(&["a1", "a2", "b1", "b2"]),
            "req-1",
            STEP_ID,
            Vec::new(),
        )
        .with_level_finished(true),
    );
    let step = recovering(Distribution::linked_files("page_a.json"));

    harness
        .resume(&step, PauseRecover::RecoverFromApiPause)
        .await;

    assert_eq!(harness.worker.elements(), vec!["c1"]);
    let last = harness.checkpoint_writes().pop().unwrap();
    assert_eq!(last.level, "page_c.json");
    assert!(last.level_finished);
}

#[tokio::test]
async fn test_jsonl_resume_skips_consumed_lines() {
    let harness = Harness::new(test_config(2, 1));
    harness.add_worker("w1", 1).await;
    harness.source.put(
        OPERATION_ID,
        "units.jsonl",
        "{\"id\":\"a\"}\n{\"id\":\"b\"}\n\n{\"id\":\"c\"}\n{\"params\":{}}\n{\"id\":\"d\"}\n",
    );
    harness.seed_checkpoint(DistributorIndex::new(
        NOLEVEL,
        2,
        done(&["a", "b"]),
        "req-1",
        STEP_ID,
        Vec::new(),
    ));
    let step = recovering(Distribution::jsonl_stream("units.jsonl"));

    let status = harness
        .resume(&step, PauseRecover::RecoverFromApiPause)
        .await;

    assert_eq!(status.global_status(), StatusCode::Ok);
    assert_eq!(harness.worker.elements(), vec!["c", "d"]);

    let writes = harness.checkpoint_writes();
    let offsets: Vec<usize> = writes.iter().map(|w| w.offset).collect();
    assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]));
    let last = writes.last().unwrap();
    assert_eq!(last.offset, 6);
    assert!(last.level_finished);
}

#[tokio::test]
async fn test_jsonl_resume_restricts_first_batch_to_remaining() {
    let harness = Harness::new(test_config(2, 1));
    harness.add_worker("w1", 1).await;
    harness.source.put(
        OPERATION_ID,
        "units.jsonl",
        "{\"id\":\"a\"}\n{\"id\":\"b\"}\n{\"id\":\"c\"}\n",
    );
    harness.seed_checkpoint(DistributorIndex::new(
        NOLEVEL,
        0,
        done(&["a"]),
        "req-1",
        STEP_ID,
        vec!["b".to_string()],
    ));
    let step = recovering(Distribution::jsonl_stream("units.jsonl"));

    harness
        .resume(&step, PauseRecover::RecoverFromApiPause)
        .await;

    assert_eq!(harness.worker.elements(), vec!["b", "c"]);
}
