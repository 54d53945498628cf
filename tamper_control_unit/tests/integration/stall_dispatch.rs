//! Stall events crossing threads: simulation driver -> notifier ->
//! handler thread -> controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tamper_common::tamper::config::TamperConfig;
use tamper_common::tamper::event::StallEvent;
use tamper_common::tamper::state::AxisState;
use tamper_control_unit::{
    AxisController, Dispatch, LogSafeStop, StallDisposition, StallEventHandler, TampOutcome,
    stall_channel,
};
use tamper_hal::{SimAxisConfig, SimulatedMotion};

#[test]
fn handler_thread_recovers_every_stalled_tamp() {
    let config = TamperConfig::default();
    let (notifier, rx) = stall_channel();
    let sim = SimulatedMotion::new(config.axis, SimAxisConfig::default().with_material_surface(12.0))
        .with_event_sink(move |event| {
            notifier.send(event);
        });
    let handle = sim.handle();
    let controller = Arc::new(AxisController::new(&config, sim).unwrap());

    let running = Arc::new(AtomicBool::new(true));
    let worker = {
        let handler = StallEventHandler::new(Arc::clone(&controller), rx, LogSafeStop);
        let running = Arc::clone(&running);
        thread::spawn(move || handler.run(&running))
    };

    controller.home().unwrap();
    for _ in 0..3 {
        assert_eq!(controller.tamp_default(17.0).unwrap(), TampOutcome::Stalled);
        let status = controller
            .wait_settled(Duration::from_secs(5))
            .expect("stall not recovered");
        assert_eq!(status.state, AxisState::Idle);
        assert_eq!(status.current_position_mm, 0.0);
        assert_eq!(status.last_stall_detected_at, Some(12.0));
    }

    running.store(false, Ordering::SeqCst);
    assert_eq!(worker.join().unwrap(), 3);
    assert_eq!(handle.position(), 0.0);
}

#[test]
fn unowned_events_reach_safe_stop_in_order() {
    let config = TamperConfig::default();
    let sim = SimulatedMotion::new(config.axis, SimAxisConfig::default());
    let controller = Arc::new(AxisController::new(&config, sim).unwrap());

    let (notifier, rx) = stall_channel();
    let stopped = Arc::new(Mutex::new(Vec::new()));
    let handler = StallEventHandler::new(Arc::clone(&controller), rx, {
        let stopped = Arc::clone(&stopped);
        move |event: &StallEvent| stopped.lock().unwrap().push(event.driver_id)
    });

    notifier.notify(4, 0, "driver-stall");
    notifier.notify(2, 0, "driver-stall");
    notifier.notify(2, 3, "driver-stall");

    let timeout = Duration::from_millis(100);
    assert_eq!(handler.recv_and_dispatch(timeout).unwrap(), Dispatch::SafeStopped);
    assert_eq!(
        handler.recv_and_dispatch(timeout).unwrap(),
        Dispatch::Handled(StallDisposition::Ignored)
    );
    assert_eq!(handler.recv_and_dispatch(timeout).unwrap(), Dispatch::SafeStopped);

    assert_eq!(*stopped.lock().unwrap(), vec![4, 2]);
    assert_eq!(controller.status().state, AxisState::Unhomed);
}
