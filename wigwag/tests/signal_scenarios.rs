//! End-to-end scenarios for a controller driven by its own cycler thread.
//!
//! # Running with tracing
//!
//! ```bash
//! RUST_LOG=wigwag=debug cargo test --features tracing --test signal_scenarios -- --nocapture
//! ```

use std::sync::{Arc, Once};
use std::thread;
use std::time::{Duration, Instant};

use wigwag::signal::{CyclerConfig, Phase, PhaseController, SignalError};
use wigwag::sync::Transport;

static INIT_TRACING: Once = Once::new();

/// Initialize tracing for tests (only once).
fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        wigwag::init_tracing();
    });
}

/// Scheduling slack allowed around each cycle interval.
const TOLERANCE: Duration = Duration::from_millis(50);

fn config_ms(min_ms: u64, max_ms: u64) -> CyclerConfig {
    CyclerConfig::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
        .expect("valid bounds")
}

fn wait_for_subscribers(controller: &PhaseController, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while controller.subscriber_count() < count {
        assert!(Instant::now() < deadline, "waiters never subscribed");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn unstarted_controller_reads_red() {
    init_test_tracing();
    let controller = PhaseController::default();

    assert_eq!(controller.current_phase(), Phase::Red);
    assert_eq!(controller.current_phase(), Phase::Red);
}

#[test]
fn immediate_cycler_releases_client_thread() {
    init_test_tracing();
    let controller = Arc::new(PhaseController::new(CyclerConfig::immediate()));
    controller.start().expect("first start");

    let client = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || {
            let start = Instant::now();
            controller.wait_for_green_timeout(Duration::from_secs(2))?;
            Ok::<_, SignalError>(start.elapsed())
        })
    };

    let elapsed = client.join().expect("client thread").expect("green observed");
    assert!(elapsed < Duration::from_secs(2));
    controller.shutdown();
}

#[test]
fn transport_delivers_phases_in_send_order() {
    init_test_tracing();
    let transport = Transport::new();

    for phase in [Phase::Red, Phase::Green, Phase::Red] {
        transport.send(phase);
    }

    assert_eq!(transport.receive(), Phase::Red);
    assert_eq!(transport.receive(), Phase::Green);
    assert_eq!(transport.receive(), Phase::Red);
}

#[test]
fn both_waiters_return_after_first_transition() {
    init_test_tracing();
    // Long enough that nothing publishes before both waiters are parked.
    let controller = Arc::new(PhaseController::new(config_ms(300, 300)));

    let waiters: Vec<_> = (0..2)
        .map(|_| {
            let controller = Arc::clone(&controller);
            thread::spawn(move || controller.wait_for_green_timeout(Duration::from_secs(5)))
        })
        .collect();
    wait_for_subscribers(&controller, 2);

    controller.start().expect("first start");

    for waiter in waiters {
        waiter.join().expect("waiter thread").expect("green observed");
    }
    // The first transition out of red is the one that released them.
    controller.shutdown();
}

#[test]
fn deliveries_are_spaced_within_bounds() {
    init_test_tracing();
    let min = Duration::from_millis(100);
    let max = Duration::from_millis(200);
    let controller = PhaseController::new(config_ms(100, 200).with_seed(7));
    let subscription = controller.subscribe();
    controller.start().expect("first start");

    let mut expected = Phase::Green;
    let mut last = None;
    for _ in 0..5 {
        let phase = subscription.receive();
        let now = Instant::now();
        assert_eq!(phase, expected);
        expected = expected.toggled();

        if let Some(previous) = last {
            let gap: Duration = now - previous;
            assert!(gap + TOLERANCE >= min, "gap {gap:?} below {min:?}");
            assert!(gap <= max + TOLERANCE, "gap {gap:?} above {max:?}");
        }
        last = Some(now);
    }

    controller.shutdown();
}

#[test]
fn second_start_is_reported() {
    init_test_tracing();
    let controller = PhaseController::new(config_ms(10, 20));

    controller.start().expect("first start");
    assert!(matches!(controller.start(), Err(SignalError::AlreadyStarted)));
    controller.shutdown();
}

#[test]
fn drop_joins_cycler_promptly() {
    init_test_tracing();
    let controller = PhaseController::default();
    controller.start().expect("first start");

    let start = Instant::now();
    drop(controller);
    assert!(start.elapsed() < CyclerConfig::DEFAULT_MIN_INTERVAL);
}

#[test]
fn phase_stays_put_after_shutdown() {
    init_test_tracing();
    let controller = PhaseController::new(CyclerConfig::immediate());
    let subscription = controller.subscribe();
    controller.start().expect("first start");
    assert_eq!(subscription.receive(), Phase::Green);

    controller.shutdown();
    let frozen = controller.current_phase();
    thread::sleep(Duration::from_millis(100));

    assert_eq!(controller.current_phase(), frozen);
    assert!(!controller.is_running());
}

#[test]
fn subscriber_sees_strict_alternation() {
    init_test_tracing();
    let controller = PhaseController::new(CyclerConfig::immediate().with_seed(1));
    let subscription = controller.subscribe();
    controller.start().expect("first start");

    let observed: Vec<Phase> = (0..20).map(|_| subscription.receive()).collect();
    controller.shutdown();

    for (k, phase) in observed.iter().enumerate() {
        let expected = if k % 2 == 0 { Phase::Green } else { Phase::Red };
        assert_eq!(*phase, expected, "delivery #{k}");
    }
}
