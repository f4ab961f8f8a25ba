use super::*;

fn payload(percentage: f32, current: u64, total: u64) -> ProgressPayload {
    ProgressPayload {
        message: "working".into(),
        percentage,
        current,
        total,
        component: "downloading-assets".into(),
    }
}

#[test]
fn counter_pair_wins_over_raw_percentage() {
    let snapshot = payload(99.0, 50, 200).snapshot();
    assert_eq!(snapshot.percent, 25);
    assert_eq!(snapshot.current, 50);
    assert_eq!(snapshot.total, 200);
}

#[test]
fn raw_percentage_used_when_total_is_zero() {
    assert_eq!(payload(42.4, 0, 0).snapshot().percent, 42);
    assert_eq!(payload(42.5, 0, 0).snapshot().percent, 43);
}

#[test]
fn negative_percentage_means_zero() {
    assert_eq!(payload(-1.0, 0, 0).snapshot().percent, 0);
}

#[test]
fn percent_is_clamped_to_one_hundred() {
    assert_eq!(payload(-1.0, 300, 200).snapshot().percent, 100);
    assert_eq!(payload(250.0, 0, 0).snapshot().percent, 100);
}

#[test]
fn events_map_to_their_channel() {
    assert_eq!(
        EngineEvent::Progress(payload(0.0, 0, 0)).channel(),
        EngineChannel::Progress
    );
    assert_eq!(
        EngineEvent::ProcessStarted.channel(),
        EngineChannel::ProcessStarted
    );
    assert_eq!(
        EngineEvent::ProcessExited.channel(),
        EngineChannel::ProcessExited
    );
}

#[test]
fn channel_names_are_stable() {
    let names: Vec<&str> = EngineChannel::ALL.iter().map(|c| c.name()).collect();
    assert_eq!(
        names,
        vec![
            "progress",
            "log",
            "process-started",
            "process-exited",
            "credential-renewed"
        ]
    );
}
