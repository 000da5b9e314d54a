//! Integration tests for the habit → progress → summary flow.
//!
//! These run the managers against an in-memory SQLite store with the day
//! pinned, and check what ends up persisted in the progress log and the
//! summary row.

mod support;

use std::sync::Arc;

use alphamind_core::focus::FocusCycles;
use alphamind_core::storage::ProgressConfig;
use alphamind_core::{
    GoalKind, HabitRecord, HabitStateManager, ProfileManager, ProgressAggregator, ProgressPatch,
    Store, UserId, UserPatch,
};
use chrono::Utc;
use support::{clock_on, day, loaded_manager, memory_store, names};

#[tokio::test]
async fn two_toggles_persist_a_quarter() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    let mut mgr = loaded_manager(&store, &user, today).await;

    mgr.toggle("Read 30min/day").await.unwrap();
    mgr.toggle("Meditate 10min").await.unwrap();

    let log = store.progress_on(&user, today).await.unwrap().unwrap();
    assert_eq!(log.discipline_score, 25);
    assert_eq!(log.habits_completed, 2);
    assert_eq!(log.total_habits, 8);

    let summary = store.get_user(&user).await.unwrap().unwrap();
    assert_eq!(summary.daily_discipline, 25);
}

#[tokio::test]
async fn removing_three_defaults_changes_the_denominator() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    let mut mgr = loaded_manager(&store, &user, today).await;

    for name in ["Eliminate alcohol", "Avoid parties", "Reduce social media"] {
        mgr.remove(name).await.unwrap();
    }
    assert_eq!(mgr.habits().len(), 5);

    mgr.toggle("Plan the day").await.unwrap();

    let log = store.progress_on(&user, today).await.unwrap().unwrap();
    assert_eq!(log.discipline_score, 20);
    assert_eq!(log.total_habits, 5);
}

#[tokio::test]
async fn removed_default_stays_gone_after_reload() {
    let store = memory_store();
    let user = UserId::generate();
    let mut mgr = loaded_manager(&store, &user, day(3, 10)).await;

    // An older record for the same habit is purged too.
    let old = HabitRecord::new(&user, "Avoid parties", true, day(3, 1), Utc::now());
    store.insert_habit(&old).await.unwrap();

    let deleted = mgr.remove("Avoid parties").await.unwrap();
    assert_eq!(deleted, 1);
    assert!(store.habits_on(&user, day(3, 1)).await.unwrap().is_empty());

    let reloaded = loaded_manager(&store, &user, day(3, 11)).await;
    assert!(!reloaded.habits().contains("Avoid parties"));
    assert_eq!(reloaded.habits().len(), 7);
}

#[tokio::test]
async fn re_adding_a_removed_default_brings_it_back() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    let mut mgr = loaded_manager(&store, &user, today).await;

    mgr.remove("Wake up at 6am").await.unwrap();
    mgr.add("Wake up at 6am").await.unwrap();

    let reloaded = loaded_manager(&store, &user, today).await;
    assert_eq!(reloaded.habits().get("Wake up at 6am"), Some(false));
    // Back in its default slot.
    assert_eq!(names(reloaded.habits()), alphamind_core::storage::default_habits());
}

#[tokio::test]
async fn load_overlays_todays_records_on_defaults() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    let now = Utc::now();
    store
        .insert_habit(&HabitRecord::new(&user, "Exercise daily", true, today, now))
        .await
        .unwrap();
    store
        .insert_habit(&HabitRecord::new(&user, "Journal", true, today, now))
        .await
        .unwrap();
    store
        .insert_habit(&HabitRecord::new(&user, "Plan the day", true, day(3, 9), now))
        .await
        .unwrap();

    let mgr = loaded_manager(&store, &user, today).await;
    let map = mgr.habits();

    assert_eq!(map.len(), 9);
    assert_eq!(map.get("Exercise daily"), Some(true));
    assert_eq!(map.get("Plan the day"), Some(false));
    assert_eq!(names(map).last().map(String::as_str), Some("Journal"));
}

#[tokio::test]
async fn custom_habit_without_todays_record_is_not_carried_over() {
    let store = memory_store();
    let user = UserId::generate();

    let mut yesterday = loaded_manager(&store, &user, day(3, 9)).await;
    yesterday.add("Journal").await.unwrap();

    let today = loaded_manager(&store, &user, day(3, 10)).await;
    assert!(!today.habits().contains("Journal"));
    assert_eq!(today.habits().len(), 8);
}

#[tokio::test]
async fn productive_time_replaces_prior_value() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    let agg = ProgressAggregator::new(Arc::clone(&store), user.clone(), clock_on(today));

    agg.record_productive_time(0.42).await.unwrap();
    let hours = FocusCycles::default().hours(3);
    agg.record_productive_time(hours).await.unwrap();

    let log = store.progress_on(&user, today).await.unwrap().unwrap();
    assert_eq!(log.productive_hours, 1.26);
    let summary = store.get_user(&user).await.unwrap().unwrap();
    assert_eq!(summary.productive_time, 1.26);
}

#[tokio::test]
async fn toggle_keeps_recorded_productive_hours() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    let mut mgr = loaded_manager(&store, &user, today).await;

    mgr.progress().record_productive_time(0.84).await.unwrap();
    mgr.toggle("Exercise daily").await.unwrap();

    let log = store.progress_on(&user, today).await.unwrap().unwrap();
    assert_eq!(log.productive_hours, 0.84);
    assert_eq!(log.habits_completed, 1);
}

#[tokio::test]
async fn deleting_financial_goal_keeps_the_row() {
    let store = memory_store();
    let user = UserId::generate();
    let profile = ProfileManager::new(Arc::clone(&store), user.clone(), clock_on(day(3, 10)));

    profile.set_goal(GoalKind::Personal, "Run a marathon").await.unwrap();
    profile.set_goal(GoalKind::Financial, "Save for a house").await.unwrap();
    let summary = profile.delete_goal(GoalKind::Financial).await.unwrap();

    assert_eq!(summary.financial_goal, "");
    assert_eq!(summary.personal_goal, "Run a marathon");
    assert!(store.get_user(&user).await.unwrap().is_some());
}

#[tokio::test]
async fn load_repairs_a_drifted_summary() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    let mut mgr = loaded_manager(&store, &user, today).await;
    mgr.toggle("Exercise daily").await.unwrap();

    let drift = UserPatch {
        daily_discipline: Some(99),
        ..UserPatch::default()
    };
    store.upsert_user(&user, &drift, Utc::now()).await.unwrap();

    let agg = ProgressAggregator::new(Arc::clone(&store), user.clone(), clock_on(today));
    let report = agg.reconcile(mgr.habits()).await.unwrap();
    assert!(report.summary_repaired);
    assert!(!report.progress_repaired);
    assert_eq!(report.expected.score, 13);

    let summary = store.get_user(&user).await.unwrap().unwrap();
    assert_eq!(summary.daily_discipline, 13);
}

#[tokio::test]
async fn load_writes_a_missing_progress_log() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    store
        .insert_habit(&HabitRecord::new(&user, "Plan the day", true, today, Utc::now()))
        .await
        .unwrap();
    assert!(store.progress_on(&user, today).await.unwrap().is_none());

    let mgr = loaded_manager(&store, &user, today).await;
    assert!(mgr.sync_status().is_synced());

    let log = store.progress_on(&user, today).await.unwrap().unwrap();
    assert_eq!(log.habits_completed, 1);
    assert_eq!(log.total_habits, 8);
    assert_eq!(log.discipline_score, 13);
}

#[tokio::test]
async fn streak_counts_until_first_gap_and_is_stored() {
    let store = memory_store();
    let user = UserId::generate();
    let now = Utc::now();
    let scores = [(10, 75), (9, 50), (8, 100), (7, 20), (6, 100)];
    for (d, score) in scores {
        let patch = ProgressPatch {
            discipline_score: Some(score),
            ..ProgressPatch::default()
        };
        store.upsert_progress(&user, day(3, d), &patch, now).await.unwrap();
    }

    let agg = ProgressAggregator::new(Arc::clone(&store), user.clone(), clock_on(day(3, 10)));
    assert_eq!(agg.refresh_streak().await.unwrap(), 3);
    assert_eq!(store.get_user(&user).await.unwrap().unwrap().streak, 3);

    let strict = agg.clone().with_config(ProgressConfig {
        streak_threshold: 80,
        ..ProgressConfig::default()
    });
    assert_eq!(strict.streak().await.unwrap(), 0);
}

#[tokio::test]
async fn history_is_newest_first_and_capped() {
    let store = memory_store();
    let user = UserId::generate();
    let now = Utc::now();
    let start = day(1, 1);
    for offset in 0..35 {
        let date = start + chrono::Days::new(offset);
        store
            .upsert_progress(&user, date, &ProgressPatch::default(), now)
            .await
            .unwrap();
    }

    let agg = ProgressAggregator::new(Arc::clone(&store), user.clone(), clock_on(day(2, 4)));
    let history = agg.history(100).await.unwrap();
    assert_eq!(history.len(), 30);
    assert_eq!(history[0].date, day(2, 4));
    assert!(history.windows(2).all(|w| w[0].date > w[1].date));
}

#[tokio::test]
async fn users_do_not_see_each_other() {
    let store = memory_store();
    let today = day(3, 10);
    let alice = UserId::generate();
    let bob = UserId::generate();

    let mut a = HabitStateManager::new(Arc::clone(&store), alice.clone(), clock_on(today));
    a.load().await;
    a.remove("Exercise daily").await.unwrap();
    a.toggle("Plan the day").await.unwrap();

    let b = loaded_manager(&store, &bob, today).await;
    assert_eq!(b.habits().len(), 8);
    assert_eq!(b.habits().completed_count(), 0);
}

#[tokio::test]
async fn toggling_an_unknown_name_tracks_it_as_done() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    let mut mgr = loaded_manager(&store, &user, today).await;

    assert!(mgr.toggle("Cold shower").await.unwrap());
    assert_eq!(mgr.habits().get("Cold shower"), Some(true));
    assert_eq!(names(mgr.habits()).last().map(String::as_str), Some("Cold shower"));

    let log = store.progress_on(&user, today).await.unwrap().unwrap();
    assert_eq!(log.total_habits, 9);
    assert_eq!(log.habits_completed, 1);
    assert_eq!(log.discipline_score, 11);

    let reloaded = loaded_manager(&store, &user, today).await;
    assert_eq!(reloaded.habits().get("Cold shower"), Some(true));
}

#[tokio::test]
async fn toggling_a_removed_default_restores_it() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);
    let mut mgr = loaded_manager(&store, &user, today).await;

    mgr.remove("Avoid parties").await.unwrap();
    assert_eq!(store.removed_habits(&user).await.unwrap(), vec!["Avoid parties".to_string()]);

    assert!(mgr.toggle("Avoid parties").await.unwrap());
    assert!(store.removed_habits(&user).await.unwrap().is_empty());

    let reloaded = loaded_manager(&store, &user, today).await;
    assert_eq!(reloaded.habits().get("Avoid parties"), Some(true));
    assert_eq!(reloaded.habits().len(), 8);

    // Back for later days as a default, not completed.
    let tomorrow = loaded_manager(&store, &user, day(3, 11)).await;
    assert_eq!(tomorrow.habits().get("Avoid parties"), Some(false));
}

#[tokio::test]
async fn managers_run_on_spawned_tasks() {
    let store = memory_store();
    let user = UserId::generate();
    let today = day(3, 10);

    let task_store = Arc::clone(&store);
    let task_user = user.clone();
    let done = tokio::spawn(async move {
        let mut mgr = loaded_manager(&task_store, &task_user, today).await;
        mgr.toggle("Exercise daily").await
    })
    .await
    .unwrap()
    .unwrap();

    assert!(done);
    let log = store.progress_on(&user, today).await.unwrap().unwrap();
    assert_eq!(log.habits_completed, 1);
}
