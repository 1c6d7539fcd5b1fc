//! Integration tests for the daily rollover over a real store.

use chrono::Weekday;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use streakbot_core::{
    CoreError, GoalRecord, GoalStore, QueryFacade, RetryPolicy, RolloverEngine, WeeklyGoals,
};

const GROUP: i64 = 1;

fn setup() -> (Arc<GoalStore>, RolloverEngine, QueryFacade) {
    let store = Arc::new(GoalStore::open_in_memory().unwrap());
    let engine = RolloverEngine::new(Arc::clone(&store));
    let queries = QueryFacade::new(Arc::clone(&store));
    (store, engine, queries)
}

fn record(store: &GoalStore, username: &str) -> GoalRecord {
    store.get(username, GROUP).unwrap().unwrap()
}

#[test]
fn scenario_goal_met_extends_streak() {
    let (store, engine, _) = setup();
    store.register("alice", GROUP, &WeeklyGoals::uniform(1)).unwrap();
    store.check_in("alice", GROUP).unwrap();

    engine.run(Weekday::Wed).unwrap();

    let alice = record(&store, "alice");
    assert_eq!(alice.current_streak, 1);
    assert!(!alice.punishment);
    assert_eq!(alice.today_tasks, 0);
}

#[test]
fn scenario_goal_missed_punishes() {
    let (store, engine, _) = setup();
    store.register("bob", GROUP, &WeeklyGoals::uniform(5)).unwrap();

    engine.run(Weekday::Wed).unwrap();

    let bob = record(&store, "bob");
    assert_eq!(bob.current_streak, 0);
    assert!(bob.punishment);
}

#[test]
fn scenario_opt_out_window_freezes_then_reenables() {
    let (store, engine, _) = setup();
    store.register("bob", GROUP, &WeeklyGoals::uniform(5)).unwrap();
    engine.run(Weekday::Mon).unwrap();
    let frozen = record(&store, "bob");
    assert!(frozen.punishment);

    assert!(store.opt_out("bob", GROUP, 2).unwrap());
    store.check_in("bob", GROUP).unwrap();
    assert_eq!(record(&store, "bob").today_tasks, 0);

    engine.run(Weekday::Tue).unwrap();
    let after_first = record(&store, "bob");
    assert_eq!(after_first.opt_out_days, 1);
    assert_eq!(after_first.current_streak, frozen.current_streak);
    assert_eq!(after_first.punishment, frozen.punishment);

    engine.run(Weekday::Wed).unwrap();
    let after_second = record(&store, "bob");
    assert_eq!(after_second.opt_out_days, 0);
    assert_eq!(after_second.punishment, frozen.punishment);

    // back in: five check-ins meet the goal again
    for _ in 0..5 {
        store.check_in("bob", GROUP).unwrap();
    }
    engine.run(Weekday::Thu).unwrap();
    let back = record(&store, "bob");
    assert_eq!(back.current_streak, 1);
    assert!(!back.punishment);
}

#[test]
fn scenario_leaderboard_after_met_and_missed() {
    let (store, engine, queries) = setup();
    store.register("bob", GROUP, &WeeklyGoals::uniform(5)).unwrap();
    store.register("alice", GROUP, &WeeklyGoals::uniform(1)).unwrap();
    store.check_in("alice", GROUP).unwrap();

    engine.run(Weekday::Fri).unwrap();

    let board: Vec<(String, u32)> = queries
        .leaderboard(GROUP)
        .unwrap()
        .into_iter()
        .map(|e| (e.username, e.current_streak))
        .collect();
    assert_eq!(
        board,
        vec![("alice".to_string(), 1), ("bob".to_string(), 0)]
    );
}

#[test]
fn rollover_resets_counters_for_every_record() {
    let (store, engine, _) = setup();
    let users = [("a", 0, 0), ("b", 3, 0), ("c", 1, 4), ("d", 2, 1)];
    for (name, tasks, opt_out) in users {
        store.register(name, GROUP, &WeeklyGoals::uniform(2)).unwrap();
        for _ in 0..tasks {
            store.check_in(name, GROUP).unwrap();
        }
        if opt_out > 0 {
            store.opt_out(name, GROUP, opt_out).unwrap();
        }
    }
    let before: Vec<GoalRecord> = store.list(GROUP).unwrap();

    engine.run(Weekday::Sat).unwrap();

    for old in before {
        let new = record(&store, &old.username);
        assert_eq!(new.today_tasks, 0, "{}", old.username);
        assert_eq!(new.opt_out_days, old.opt_out_days.saturating_sub(1));
        if old.opt_out_days > 0 {
            assert_eq!(new.current_streak, old.current_streak);
            assert_eq!(new.punishment, old.punishment);
        }
    }
}

#[test]
fn modify_keeps_progress_through_rollover() {
    let (store, engine, _) = setup();
    store.register("alice", GROUP, &WeeklyGoals::uniform(3)).unwrap();
    store.check_in("alice", GROUP).unwrap();
    store.modify_goals("alice", GROUP, &WeeklyGoals::uniform(1)).unwrap();
    assert_eq!(record(&store, "alice").today_tasks, 1);

    engine.run(Weekday::Sun).unwrap();
    assert_eq!(record(&store, "alice").current_streak, 1);
}

#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streakbot.db");
    {
        let store = Arc::new(GoalStore::open_at(&path).unwrap());
        store.register("alice", GROUP, &WeeklyGoals::uniform(1)).unwrap();
        store.check_in("alice", GROUP).unwrap();
        RolloverEngine::new(Arc::clone(&store))
            .run(Weekday::Mon)
            .unwrap();
    }

    let reopened = GoalStore::open_at(&path).unwrap();
    let alice = reopened.get("alice", GROUP).unwrap().unwrap();
    assert_eq!(alice.current_streak, 1);
    assert_eq!(reopened.path(), Some(path.as_path()));
}

#[test]
fn contention_exhausts_retries_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streakbot.db");
    let store = Arc::new(GoalStore::open_at(&path).unwrap());
    store.set_busy_timeout(Duration::from_millis(10)).unwrap();
    store.register("bob", GROUP, &WeeklyGoals::uniform(5)).unwrap();
    store.check_in("bob", GROUP).unwrap();

    let blocker = rusqlite::Connection::open(&path).unwrap();
    blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let engine = RolloverEngine::new(Arc::clone(&store)).with_policy(RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_millis(5),
    });
    let err = engine.run(Weekday::Mon).unwrap_err();
    assert!(
        matches!(err, CoreError::RolloverFailed { attempts: 3, .. }),
        "unexpected error: {err}"
    );

    blocker.execute_batch("ROLLBACK;").unwrap();
    let bob = store.get("bob", GROUP).unwrap().unwrap();
    assert_eq!(bob.today_tasks, 1);
    assert_eq!(bob.current_streak, 0);
    assert!(!bob.punishment);
}

#[test]
fn transient_contention_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streakbot.db");
    let store = Arc::new(GoalStore::open_at(&path).unwrap());
    store.set_busy_timeout(Duration::from_millis(10)).unwrap();
    store.register("alice", GROUP, &WeeklyGoals::uniform(0)).unwrap();

    let (locked_tx, locked_rx) = mpsc::channel();
    let blocker_path = path.clone();
    let blocker = thread::spawn(move || {
        let conn = rusqlite::Connection::open(&blocker_path).unwrap();
        conn.execute_batch("BEGIN EXCLUSIVE;").unwrap();
        locked_tx.send(()).unwrap();
        thread::sleep(Duration::from_millis(50));
        conn.execute_batch("COMMIT;").unwrap();
    });
    locked_rx.recv().unwrap();

    let engine = RolloverEngine::new(Arc::clone(&store)).with_policy(RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_millis(300),
    });
    let summary = engine.run(Weekday::Mon).unwrap();
    blocker.join().unwrap();

    assert!(summary.attempt >= 2);
    assert_eq!(record(&store, "alice").current_streak, 1);
}
