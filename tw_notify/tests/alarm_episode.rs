//! ABOUTME: Tests the notifier against the real shared alarm handle
//! ABOUTME: Ensures operator commands cut a running alert sequence short

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;
use tw_alarm::{Command, SharedAlarm, Thresholds, Transition};
use tw_notify::{
    AlarmNotifier, AlarmTrigger, Alert, AlertManager, AlertSettings, AlertSink, Result,
};

#[derive(Default)]
struct CountingSink {
    alerts: AtomicU32,
}

#[async_trait]
impl AlertSink for CountingSink {
    async fn alert(&self, _alert: &Alert) -> Result<()> {
        self.alerts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn triggered_alarm() -> (SharedAlarm, AlarmTrigger) {
    let alarm = SharedAlarm::new(Thresholds {
        motion_threshold: 0,
        trigger_count: 1,
    });
    alarm.apply(Command::ToggleArm).unwrap();
    let counter = match alarm.on_cycle(1).unwrap() {
        Transition::Triggered { counter } => counter,
        other => panic!("expected trigger, got {:?}", other),
    };
    (alarm, AlarmTrigger::new(counter))
}

fn spawn_notifier(alarm: &SharedAlarm, sink: Arc<CountingSink>) -> tw_notify::NotifierHandle {
    let mut manager = AlertManager::new();
    manager.register_sink(sink);
    let settings = AlertSettings {
        attempts: 5,
        frequency_hz: 1000,
        duration: Duration::from_millis(1000),
    };
    let (handle, _task) = AlarmNotifier::new(manager, settings, alarm.subscribe()).spawn();
    handle
}

#[tokio::test(start_paused = true)]
async fn silence_stops_the_sequence_promptly() {
    let (alarm, trigger) = triggered_alarm();
    let sink = Arc::new(CountingSink::default());
    let handle = spawn_notifier(&alarm, sink.clone());

    handle.trigger(trigger).unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    alarm.apply(Command::Silence).unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(sink.alerts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn unattended_alarm_stops_after_bounded_attempts() {
    let (alarm, trigger) = triggered_alarm();
    let sink = Arc::new(CountingSink::default());
    let handle = spawn_notifier(&alarm, sink.clone());

    handle.trigger(trigger).unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(sink.alerts.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn disarm_stops_the_sequence_promptly() {
    let (alarm, trigger) = triggered_alarm();
    let sink = Arc::new(CountingSink::default());
    let handle = spawn_notifier(&alarm, sink.clone());

    handle.trigger(trigger).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    alarm.apply(Command::ToggleArm).unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(sink.alerts.load(Ordering::SeqCst), 1);
}
