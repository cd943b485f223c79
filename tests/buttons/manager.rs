use crate::manager;
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::Arc;
use task_buttons::buttons::counter::{COUNTER_PRIORITY, COUNTER_TOOLTIP};
use task_buttons::buttons::LifecycleState;
use task_buttons::config::ButtonsConfig;
use task_buttons::host::memory::MemoryHost;
use task_buttons::host::{CommandCallback, Host, StatusBarAlignment, RUN_TASK_COMMAND};

#[test]
fn activate_creates_one_item_per_entry_plus_counter() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(&host, vec![json!({"task": "a"}), json!({"task": "b"})], true);

    // Act
    buttons.activate();

    // Assert
    let items = host.live_items();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.visible && i.show_calls == 1));
    assert_eq!(buttons.state(), LifecycleState::Active);
    assert_eq!(buttons.buttons().len(), 2);
}

#[test]
fn single_task_button_runs_task_directly() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(&host, vec![json!({"task": "build"})], false);

    // Act
    buttons.activate();

    // Assert
    let items = host.live_items();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.text, "build");
    assert_eq!(item.tooltip, "build");
    assert_eq!(item.alignment, StatusBarAlignment::Left);
    assert_eq!(item.priority, 1000);
    let command = item.command.as_ref().unwrap();
    assert_eq!(command.command_id, RUN_TASK_COMMAND);
    assert_eq!(command.arguments, vec![json!("build")]);
    assert!(host.registered_commands().is_empty());
}

#[test]
fn labels_and_tooltips_fall_back_in_order() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(
        &host,
        vec![
            json!({"task": "build", "label": "Build", "tooltip": "Compile everything"}),
            json!({"task": "lint", "label": "Lint"}),
            json!({"label": "Pick", "tasks": [{"task": "test"}]}),
            json!({"tasks": [{"task": "test"}]}),
        ],
        false,
    );

    // Act
    buttons.activate();

    // Assert
    let shown: Vec<(String, String)> = host
        .live_items()
        .into_iter()
        .map(|i| (i.text, i.tooltip))
        .collect();
    assert_eq!(
        shown,
        vec![
            ("Build".to_string(), "Compile everything".to_string()),
            ("Lint".to_string(), "Lint".to_string()),
            ("Pick".to_string(), "Pick".to_string()),
            ("Task #4".to_string(), "Task #4".to_string()),
        ]
    );
    let texts: Vec<&str> = buttons.buttons().iter().map(|b| b.text()).collect();
    assert_eq!(texts, vec!["Build", "Lint", "Pick", "Task #4"]);
}

#[test]
fn counter_text_follows_valid_entry_count() {
    let cases = [
        (vec![], "0 tasks"),
        (vec![json!({"task": "a"})], "1 task"),
        (vec![json!({"task": "a"}), json!({"task": "b"})], "2 tasks"),
        (vec![json!({"task": "a"}), json!({"label": "invalid"})], "1 task"),
    ];

    for (tasks, expected) in cases {
        // Arrange
        let host = MemoryHost::new();
        let mut buttons = manager(&host, tasks, true);

        // Act
        buttons.activate();

        // Assert
        let counter = host
            .live_items()
            .into_iter()
            .find(|i| i.priority == COUNTER_PRIORITY)
            .unwrap();
        assert_eq!(counter.text, expected);
        assert_eq!(counter.tooltip, COUNTER_TOOLTIP);
        assert_eq!(counter.alignment, StatusBarAlignment::Left);
        assert!(counter.command.is_none());
        assert_eq!(buttons.counter().map(|c| c.text()), Some(expected));
    }
}

#[test]
fn counter_is_skipped_when_disabled() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(&host, vec![json!({"task": "a"})], false);

    // Act
    buttons.activate();

    // Assert
    assert_eq!(host.live_items().len(), 1);
    assert!(buttons.counter().is_none());
}

#[test]
fn right_alignment_is_case_insensitive() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(
        &host,
        vec![
            json!({"task": "a", "alignment": "right"}),
            json!({"task": "b", "alignment": "RIGHT"}),
            json!({"task": "c", "alignment": "center"}),
            json!({"task": "d"}),
        ],
        false,
    );

    // Act
    buttons.activate();

    // Assert
    let alignments: Vec<StatusBarAlignment> =
        host.live_items().iter().map(|i| i.alignment).collect();
    assert_eq!(
        alignments,
        vec![
            StatusBarAlignment::Right,
            StatusBarAlignment::Right,
            StatusBarAlignment::Left,
            StatusBarAlignment::Left,
        ]
    );
    let button_alignments: Vec<StatusBarAlignment> =
        buttons.buttons().iter().map(|b| b.alignment()).collect();
    assert_eq!(button_alignments, alignments);
}

#[test]
fn invalid_entries_are_skipped_without_shifting_priorities() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(
        &host,
        vec![
            json!({"task": "a"}),
            json!({"label": "no task"}),
            json!(42),
            json!({"task": "d"}),
        ],
        false,
    );

    // Act
    buttons.activate();

    // Assert
    let items = host.live_items();
    let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
    let priorities: Vec<i32> = items.iter().map(|i| i.priority).collect();
    assert_eq!(texts, vec!["a", "d"]);
    assert_eq!(priorities, vec![1000, 997]);
    let indices: Vec<usize> = buttons.buttons().iter().map(|b| b.index()).collect();
    assert_eq!(indices, vec![0, 3]);
}

#[test]
fn multi_task_button_registers_quick_pick_command() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(
        &host,
        vec![
            json!({"task": "lint"}),
            json!({"label": "Build/Test", "tasks": [
                {"task": "build", "label": "Build", "description": "Compile"},
                {"task": "test"}
            ]}),
        ],
        false,
    );

    // Act
    buttons.activate();

    // Assert
    assert_eq!(host.registered_commands(), vec!["taskButtons.showQuickPick.1".to_string()]);
    let item = host.live_items().into_iter().find(|i| i.text == "Build/Test").unwrap();
    let command = item.command.unwrap();
    assert_eq!(command.command_id, "taskButtons.showQuickPick.1");
    assert_eq!(command.arguments.len(), 2);
    assert!(buttons.buttons()[1].is_multi_task());
    let ids: Vec<&str> = buttons.buttons().iter().map(|b| b.command_id()).collect();
    assert_eq!(ids, vec![RUN_TASK_COMMAND, "taskButtons.showQuickPick.1"]);
}

#[tokio::test]
async fn picking_a_sub_task_runs_it() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(
        &host,
        vec![json!({"label": "Build/Test", "tasks": [
            {"task": "build", "label": "Build", "description": "Compile"},
            {"task": "test"}
        ]})],
        false,
    );
    buttons.activate();
    host.push_pick_response(Some(0));
    let command = buttons.buttons()[0].descriptor().clone();

    // Act
    host.execute_command(&command.command_id, command.arguments).await.unwrap();

    // Assert
    let picks = host.shown_picks();
    assert_eq!(picks.len(), 1);
    let labels: Vec<(&str, &str)> = picks[0]
        .iter()
        .map(|p| (p.label.as_str(), p.description.as_str()))
        .collect();
    assert_eq!(labels, vec![("Build", "Compile"), ("test", "")]);
    let executed = host.executed_commands();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[1], (RUN_TASK_COMMAND.to_string(), vec![json!("build")]));
}

#[tokio::test]
async fn dismissed_pick_runs_nothing() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(
        &host,
        vec![json!({"tasks": [{"task": "build"}, {"task": "test"}]})],
        false,
    );
    buttons.activate();
    host.push_pick_response(None);

    // Act
    let result = host.execute_command("taskButtons.showQuickPick.0", Vec::new()).await;

    // Assert
    assert!(result.is_ok());
    assert_eq!(host.shown_picks().len(), 1);
    assert!(host
        .executed_commands()
        .iter()
        .all(|(id, _)| id != RUN_TASK_COMMAND));
}

#[tokio::test]
async fn out_of_range_pick_is_an_error() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(&host, vec![json!({"tasks": [{"task": "build"}]})], false);
    buttons.activate();
    host.push_pick_response(Some(5));

    // Act
    let result = host.execute_command("taskButtons.showQuickPick.0", Vec::new()).await;

    // Assert
    assert!(result.is_err());
}

#[test]
fn repeated_updates_do_not_accumulate_handles() {
    // Arrange
    let host = MemoryHost::new();
    let tasks = vec![json!({"task": "a"}), json!({"tasks": [{"task": "b"}]})];
    let mut buttons = manager(&host, tasks.clone(), true);
    buttons.activate();

    // Act
    for _ in 0..5 {
        buttons.update(ButtonsConfig::new(tasks.clone(), true));
    }

    // Assert
    assert_eq!(host.live_items().len(), 3);
    assert_eq!(host.registered_commands(), vec!["taskButtons.showQuickPick.1".to_string()]);
    assert!(host.items().iter().all(|i| i.dispose_calls <= 1));
    let live_registrations = host.registrations().iter().filter(|r| r.dispose_calls == 0).count();
    assert_eq!(live_registrations, 1);
}

#[test]
fn update_to_empty_list_disposes_everything() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(&host, vec![json!({"task": "a"}), json!({"task": "b"})], true);
    buttons.activate();
    let before: Vec<usize> = host.live_items().iter().map(|i| i.id).collect();

    // Act
    buttons.update(ButtonsConfig::new(Vec::new(), true));

    // Assert
    let items = host.items();
    for id in before {
        let record = items.iter().find(|i| i.id == id).unwrap();
        assert_eq!(record.dispose_calls, 1);
        assert!(!record.visible);
    }
    let live = host.live_items();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].text, "0 tasks");
    assert!(buttons.buttons().is_empty());
}

#[test]
fn update_releases_commands_of_removed_multi_task_entries() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(&host, vec![json!({"tasks": [{"task": "a"}]})], false);
    buttons.activate();

    // Act
    buttons.update(ButtonsConfig::new(vec![json!({"task": "a"})], false));

    // Assert
    assert!(host.registered_commands().is_empty());
    assert_eq!(host.registrations()[0].dispose_calls, 1);
}

#[test]
fn deactivate_twice_disposes_once() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(&host, vec![json!({"tasks": [{"task": "a"}]})], true);
    buttons.activate();

    // Act
    buttons.deactivate();
    buttons.deactivate();

    // Assert
    assert!(host.live_items().is_empty());
    assert!(host.items().iter().all(|i| i.dispose_calls == 1));
    assert!(host.registrations().iter().all(|r| r.dispose_calls == 1));
    assert_eq!(buttons.state(), LifecycleState::Inactive);
}

#[test]
fn second_activate_is_ignored() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(&host, vec![json!({"task": "a"})], true);
    buttons.activate();

    // Act
    buttons.activate();

    // Assert
    assert_eq!(host.items().len(), 2);
}

#[test]
fn failed_item_creation_skips_only_that_entry() {
    // Arrange
    let host = MemoryHost::new();
    host.fail_item_creation(2);
    let mut buttons = manager(
        &host,
        vec![json!({"task": "a"}), json!({"task": "b"}), json!({"task": "c"})],
        true,
    );

    // Act
    buttons.activate();

    // Assert
    let texts: Vec<String> = host.live_items().into_iter().map(|i| i.text).collect();
    assert_eq!(texts, vec!["3 tasks", "a", "c"]);
    assert_eq!(buttons.buttons().len(), 2);
    assert_eq!(buttons.state(), LifecycleState::Active);
}

#[test]
fn failed_command_registration_skips_only_that_entry() {
    // Arrange
    let host = MemoryHost::new();
    let taken: CommandCallback = Arc::new(|_: Vec<Value>| async { anyhow::Ok(()) }.boxed());
    let _existing = host.register_command("taskButtons.showQuickPick.0", taken).unwrap();
    let mut buttons = manager(
        &host,
        vec![json!({"tasks": [{"task": "a"}]}), json!({"task": "b"})],
        true,
    );

    // Act
    buttons.activate();

    // Assert
    let texts: Vec<String> = host.live_items().into_iter().map(|i| i.text).collect();
    assert_eq!(texts, vec!["2 tasks", "b"]);
    let multi = host.items().into_iter().find(|i| i.text == "Task #1").unwrap();
    assert_eq!(multi.dispose_calls, 1);
    assert!(!multi.visible);
    assert_eq!(multi.show_calls, 0);
    assert_eq!(buttons.buttons().len(), 1);
    assert_eq!(buttons.buttons()[0].index(), 1);
}

#[test]
fn dropping_the_manager_disposes_its_buttons() {
    // Arrange
    let host = MemoryHost::new();
    let mut buttons = manager(&host, vec![json!({"tasks": [{"task": "a"}]})], true);
    buttons.activate();

    // Act
    drop(buttons);

    // Assert
    assert!(host.live_items().is_empty());
    assert!(host.registered_commands().is_empty());
}
