//! The main cycle of the telemetry node: a fixed boot sequence followed
//! by an unbounded sample-display-publish-sleep loop.
//!
//! All hardware is reached through the collaborator traits below so the
//! sequence can be exercised on the host with mock implementations.

use std::time::Duration;

use log::{error, info};

use crate::point::Point;
use crate::reading::Reading;

/// Pause between two consecutive samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Pause between two connectivity polls while joining the network.
pub const JOIN_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Length of the onboard indicator pulse that marks liveness.
pub const LIVENESS_PULSE: Duration = Duration::from_millis(150);

/// Measurement name of the published telemetry point.
pub const MEASUREMENT: &str = "Room data";

pub type BoxError = Box<dyn std::error::Error>;

/// The device's wireless station link.
pub trait NetworkLink {
    /// Issues the join request. Returns once the request is underway;
    /// the cycle polls [`NetworkLink::is_connected`] until an address
    /// has been obtained.
    fn start_join(&mut self) -> Result<(), BoxError>;

    fn is_connected(&mut self) -> Result<bool, BoxError>;

    /// The address obtained from the network. Only meaningful after
    /// [`NetworkLink::is_connected`] has reported `true`.
    fn address(&mut self) -> Result<String, BoxError>;
}

/// The on-device status display. Every call fully redraws.
pub trait StatusScreen {
    fn init(&mut self) -> Result<(), BoxError>;

    /// Clears the buffer, writes `lines` from the top, flushes.
    fn show_status(&mut self, lines: &[String]) -> Result<(), BoxError>;

    /// Clears the buffer, writes the two fixed reading lines, flushes.
    fn show_reading(&mut self, reading: &Reading) -> Result<(), BoxError>;
}

/// The environmental sensor producing one [`Reading`] per cycle.
pub trait EnvironmentSensor {
    fn init(&mut self) -> Result<(), BoxError>;

    /// Blocking for the duration of the hardware transaction. A failed
    /// transaction is recoverable: the cycle logs it and drops the
    /// iteration's sample.
    fn sample(&mut self) -> Result<Reading, BoxError>;
}

/// The remote time-series database endpoint.
pub trait TelemetrySink {
    /// Validates connectivity at startup. Failure is fatal.
    fn validate(&mut self) -> Result<(), BoxError>;

    /// Writes one point synchronously. Failure is soft: the caller
    /// logs it and the sample is dropped.
    fn publish(&mut self, point: &Point) -> Result<(), BoxError>;
}

/// One-shot network time synchronization. Fire-and-forget: no outcome
/// is reported to the caller.
pub trait TimeSync {
    fn sync(&mut self);
}

/// Board-level odds and ends: the onboard indicator and blocking sleeps.
pub trait Board {
    fn set_indicator(&mut self, on: bool);
    fn sleep(&mut self, duration: Duration);
}

/// Owns the dependency-injected device handles for the lifetime of the
/// process and drives them in the fixed order: one-time boot, then the
/// repeating sample-display-publish-sleep cycle.
pub struct Cycle<L, D, S, T, Y, B> {
    // The network and time-sync handles are not called again after
    // boot, but the open sessions they own must live for the process
    // lifetime.
    _link: L,
    screen: D,
    sensor: S,
    sink: T,
    _time: Y,
    board: B,
    point: Point,
}

impl<L, D, S, T, Y, B> Cycle<L, D, S, T, Y, B>
where
    L: NetworkLink,
    D: StatusScreen,
    S: EnvironmentSensor,
    T: TelemetrySink,
    Y: TimeSync,
    B: Board,
{
    /// Runs the one-time setup in fixed order: network join (with an
    /// unbounded 1 s retry loop), display, sensor, telemetry endpoint,
    /// time sync. Any error aborts startup; the repeating phase is
    /// never entered after a failed boot.
    pub fn boot(
        mut link: L,
        mut screen: D,
        mut sensor: S,
        mut sink: T,
        mut time: Y,
        mut board: B,
    ) -> Result<Self, BoxError> {
        board.set_indicator(true);

        link.start_join()?;
        info!("Connecting to WiFi ..");
        loop {
            if link.is_connected()? {
                break;
            }
            info!(".");
            board.sleep(JOIN_RETRY_INTERVAL);
        }
        let address = link.address()?;
        info!("OK. {}", address);
        info!("WiFi setup completed");

        screen.init()?;
        let mut lines = vec![address, "Started".to_string()];
        screen.show_status(&lines)?;
        info!("Display setup completed");

        sensor.init()?;
        lines.push("Sensor connected".to_string());
        screen.show_status(&lines)?;
        info!("Sensor setup completed");

        sink.validate()?;
        info!("Telemetry setup completed");

        time.sync();
        info!("Time sync requested");

        board.set_indicator(false);

        Ok(Self {
            _link: link,
            screen,
            sensor,
            sink,
            _time: time,
            board,
            point: Point::new(MEASUREMENT),
        })
    }

    /// One iteration of the repeating phase: indicator pulse, sample,
    /// display, publish, fixed sleep. Publish failures (and failed
    /// samples) are logged and dropped; the timing never changes.
    pub fn run_once(&mut self) {
        self.board.set_indicator(true);
        self.board.sleep(LIVENESS_PULSE);
        self.board.set_indicator(false);

        match self.sensor.sample() {
            Ok(reading) => {
                info!("Temperature: {} C", reading.temperature_c);
                info!("Humidity:    {} %", reading.humidity_pct);

                if let Err(e) = self.screen.show_reading(&reading) {
                    error!("display update failed: {}", e);
                }

                self.point.clear_fields();
                self.point
                    .add_field("temperature", f64::from(reading.temperature_c));
                self.point
                    .add_field("humidity", f64::from(reading.humidity_pct));

                match self.sink.publish(&self.point) {
                    Ok(()) => info!("Data written to telemetry endpoint"),
                    Err(e) => error!("telemetry write failed: {}", e),
                }
            }
            Err(e) => error!("sensor read failed, dropping sample: {}", e),
        }

        self.board.sleep(SAMPLE_INTERVAL);
    }

    /// The repeat-forever phase. Embedded devices run until power loss
    /// or reset, so there is no terminal state.
    pub fn run(mut self) -> ! {
        loop {
            self.run_once();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        StartJoin,
        Poll,
        IndicatorOn,
        IndicatorOff,
        Sleep(Duration),
        ScreenInit,
        ShowStatus(Vec<String>),
        ShowReading(Reading),
        SensorInit,
        Sample,
        Validate,
        Publish(Vec<(String, f64)>),
        TimeSync,
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct MockLink {
        log: Log,
        polls_until_connected: usize,
        polls: usize,
    }

    impl NetworkLink for MockLink {
        fn start_join(&mut self) -> Result<(), BoxError> {
            self.log.borrow_mut().push(Event::StartJoin);
            Ok(())
        }

        fn is_connected(&mut self) -> Result<bool, BoxError> {
            self.log.borrow_mut().push(Event::Poll);
            self.polls += 1;
            Ok(self.polls > self.polls_until_connected)
        }

        fn address(&mut self) -> Result<String, BoxError> {
            Ok("192.168.1.20".to_string())
        }
    }

    struct MockScreen {
        log: Log,
        fail_init: bool,
    }

    impl StatusScreen for MockScreen {
        fn init(&mut self) -> Result<(), BoxError> {
            self.log.borrow_mut().push(Event::ScreenInit);
            if self.fail_init {
                return Err("screen allocation failed".into());
            }
            Ok(())
        }

        fn show_status(&mut self, lines: &[String]) -> Result<(), BoxError> {
            self.log.borrow_mut().push(Event::ShowStatus(lines.to_vec()));
            Ok(())
        }

        fn show_reading(&mut self, reading: &Reading) -> Result<(), BoxError> {
            self.log.borrow_mut().push(Event::ShowReading(*reading));
            Ok(())
        }
    }

    struct MockSensor {
        log: Log,
        fail_init: bool,
        /// Outcomes for successive `sample` calls, consumed front first.
        samples: Vec<Result<Reading, &'static str>>,
    }

    impl EnvironmentSensor for MockSensor {
        fn init(&mut self) -> Result<(), BoxError> {
            self.log.borrow_mut().push(Event::SensorInit);
            if self.fail_init {
                return Err("sensor not found".into());
            }
            Ok(())
        }

        fn sample(&mut self) -> Result<Reading, BoxError> {
            self.log.borrow_mut().push(Event::Sample);
            match self.samples.remove(0) {
                Ok(reading) => Ok(reading),
                Err(e) => Err(e.into()),
            }
        }
    }

    struct MockSink {
        log: Log,
        fail_publish: bool,
    }

    impl TelemetrySink for MockSink {
        fn validate(&mut self) -> Result<(), BoxError> {
            self.log.borrow_mut().push(Event::Validate);
            Ok(())
        }

        fn publish(&mut self, point: &Point) -> Result<(), BoxError> {
            self.log
                .borrow_mut()
                .push(Event::Publish(point.fields().to_vec()));
            if self.fail_publish {
                return Err("HTTP 503".into());
            }
            Ok(())
        }
    }

    struct MockTime {
        log: Log,
    }

    impl TimeSync for MockTime {
        fn sync(&mut self) {
            self.log.borrow_mut().push(Event::TimeSync);
        }
    }

    struct MockBoard {
        log: Log,
    }

    impl Board for MockBoard {
        fn set_indicator(&mut self, on: bool) {
            self.log.borrow_mut().push(if on {
                Event::IndicatorOn
            } else {
                Event::IndicatorOff
            });
        }

        fn sleep(&mut self, duration: Duration) {
            self.log.borrow_mut().push(Event::Sleep(duration));
        }
    }

    struct Fixture {
        log: Log,
        polls_until_connected: usize,
        screen_fail_init: bool,
        sensor_fail_init: bool,
        sink_fail_publish: bool,
        samples: Vec<Result<Reading, &'static str>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                log: Rc::new(RefCell::new(Vec::new())),
                polls_until_connected: 0,
                screen_fail_init: false,
                sensor_fail_init: false,
                sink_fail_publish: false,
                samples: vec![Ok(Reading {
                    temperature_c: 21.5,
                    humidity_pct: 48.25,
                })],
            }
        }

        fn boot(
            self,
        ) -> (
            Log,
            Result<Cycle<MockLink, MockScreen, MockSensor, MockSink, MockTime, MockBoard>, BoxError>,
        ) {
            let log = self.log;
            let cycle = Cycle::boot(
                MockLink {
                    log: log.clone(),
                    polls_until_connected: self.polls_until_connected,
                    polls: 0,
                },
                MockScreen {
                    log: log.clone(),
                    fail_init: self.screen_fail_init,
                },
                MockSensor {
                    log: log.clone(),
                    fail_init: self.sensor_fail_init,
                    samples: self.samples,
                },
                MockSink {
                    log: log.clone(),
                    fail_publish: self.sink_fail_publish,
                },
                MockTime { log: log.clone() },
                MockBoard { log: log.clone() },
            );
            (log, cycle)
        }
    }

    fn count(log: &Log, matches: impl Fn(&Event) -> bool) -> usize {
        log.borrow().iter().filter(|e| matches(e)).count()
    }

    #[test]
    fn test_join_polls_at_fixed_interval_until_connected() {
        let mut fixture = Fixture::new();
        fixture.polls_until_connected = 4;
        let (log, cycle) = fixture.boot();
        assert!(cycle.is_ok());

        // Four "not connected" polls, each followed by one fixed-length
        // retry sleep, then the fifth poll succeeds.
        assert_eq!(count(&log, |e| *e == Event::Poll), 5);
        assert_eq!(
            count(&log, |e| *e == Event::Sleep(JOIN_RETRY_INTERVAL)),
            4
        );
    }

    #[test]
    fn test_boot_order_and_status_lines() {
        let (log, cycle) = Fixture::new().boot();
        assert!(cycle.is_ok());

        let events = log.borrow();
        assert_eq!(
            *events,
            vec![
                Event::IndicatorOn,
                Event::StartJoin,
                Event::Poll,
                Event::ScreenInit,
                Event::ShowStatus(vec!["192.168.1.20".into(), "Started".into()]),
                Event::SensorInit,
                Event::ShowStatus(vec![
                    "192.168.1.20".into(),
                    "Started".into(),
                    "Sensor connected".into()
                ]),
                Event::Validate,
                Event::TimeSync,
                Event::IndicatorOff,
            ]
        );
    }

    #[test]
    fn test_fatal_display_init_never_reaches_cycle() {
        let mut fixture = Fixture::new();
        fixture.screen_fail_init = true;
        let (log, cycle) = fixture.boot();
        assert!(cycle.is_err());

        assert_eq!(count(&log, |e| *e == Event::Sample), 0);
        assert_eq!(count(&log, |e| matches!(e, Event::ShowReading(_))), 0);
        assert_eq!(count(&log, |e| matches!(e, Event::Publish(_))), 0);
        // Later initializers never run either.
        assert_eq!(count(&log, |e| *e == Event::SensorInit), 0);
        assert_eq!(count(&log, |e| *e == Event::Validate), 0);
        assert_eq!(count(&log, |e| *e == Event::TimeSync), 0);
    }

    #[test]
    fn test_fatal_sensor_init_never_reaches_cycle() {
        let mut fixture = Fixture::new();
        fixture.sensor_fail_init = true;
        let (log, cycle) = fixture.boot();
        assert!(cycle.is_err());

        assert_eq!(count(&log, |e| *e == Event::Sample), 0);
        assert_eq!(count(&log, |e| matches!(e, Event::Publish(_))), 0);
        assert_eq!(count(&log, |e| *e == Event::Validate), 0);
    }

    #[test]
    fn test_iteration_runs_sample_display_publish_in_order() {
        let reading = Reading {
            temperature_c: 21.5,
            humidity_pct: 48.25,
        };
        let mut fixture = Fixture::new();
        fixture.samples = vec![Ok(reading), Ok(reading)];
        let (log, cycle) = fixture.boot();
        let mut cycle = cycle.unwrap();

        let boot_events = log.borrow().len();
        cycle.run_once();
        cycle.run_once();

        let events = log.borrow();
        let expected_iteration = [
            Event::IndicatorOn,
            Event::Sleep(LIVENESS_PULSE),
            Event::IndicatorOff,
            Event::Sample,
            Event::ShowReading(reading),
            Event::Publish(vec![
                ("temperature".to_string(), 21.5),
                ("humidity".to_string(), 48.25),
            ]),
            Event::Sleep(SAMPLE_INTERVAL),
        ];
        assert_eq!(events[boot_events..boot_events + 7], expected_iteration);
        assert_eq!(events[boot_events + 7..], expected_iteration);
    }

    #[test]
    fn test_publish_failure_keeps_cycle_and_timing() {
        let reading = Reading {
            temperature_c: 19.0,
            humidity_pct: 55.0,
        };
        let mut fixture = Fixture::new();
        fixture.sink_fail_publish = true;
        fixture.samples = vec![Ok(reading), Ok(reading), Ok(reading)];
        let (log, cycle) = fixture.boot();
        let mut cycle = cycle.unwrap();

        for _ in 0..3 {
            cycle.run_once();
        }

        // Every iteration still samples, publishes (and fails), and
        // sleeps the fixed interval.
        assert_eq!(count(&log, |e| *e == Event::Sample), 3);
        assert_eq!(count(&log, |e| matches!(e, Event::Publish(_))), 3);
        assert_eq!(count(&log, |e| *e == Event::Sleep(SAMPLE_INTERVAL)), 3);
    }

    #[test]
    fn test_sample_failure_drops_iteration_but_keeps_timing() {
        let reading = Reading {
            temperature_c: 22.0,
            humidity_pct: 40.5,
        };
        let mut fixture = Fixture::new();
        fixture.samples = vec![Err("i2c transaction nak"), Ok(reading)];
        let (log, cycle) = fixture.boot();
        let mut cycle = cycle.unwrap();

        cycle.run_once();
        assert_eq!(count(&log, |e| matches!(e, Event::ShowReading(_))), 0);
        assert_eq!(count(&log, |e| matches!(e, Event::Publish(_))), 0);
        assert_eq!(count(&log, |e| *e == Event::Sleep(SAMPLE_INTERVAL)), 1);

        cycle.run_once();
        assert_eq!(count(&log, |e| matches!(e, Event::Publish(_))), 1);
        assert_eq!(count(&log, |e| *e == Event::Sleep(SAMPLE_INTERVAL)), 2);
    }

    #[test]
    fn test_no_field_leak_between_cycles() {
        let first = Reading {
            temperature_c: 21.5,
            humidity_pct: 48.25,
        };
        let second = Reading {
            temperature_c: -3.0,
            humidity_pct: 90.0,
        };
        let mut fixture = Fixture::new();
        fixture.samples = vec![Ok(first), Ok(second)];
        let (log, cycle) = fixture.boot();
        let mut cycle = cycle.unwrap();

        cycle.run_once();
        cycle.run_once();

        let published: Vec<Vec<(String, f64)>> = log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Publish(fields) => Some(fields.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            published[1],
            vec![
                ("temperature".to_string(), -3.0),
                ("humidity".to_string(), 90.0)
            ]
        );
        assert_eq!(published[1].len(), 2);
    }
}
