// Iteration order: frequency outermost, then phi, then theta.
// Direction state only changes between points, never within one.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use rand::Rng;

use crate::angles::compute_window;
use crate::catalog::CommandCatalog;
use crate::config::{AzimuthPass, SweepConfiguration, SweepPoint};
use crate::encoder::{CommandEncoder, CommandSet};
use crate::error::{RunError, SweepError};
use crate::measurement::{Measurement, MeasurementOptions};
use crate::naming::{make_name, Clock, SystemClock};
use crate::plan::{select_phi_angles, select_theta_angles};
use crate::transport::Transport;

/// Where a run currently is. Nesting follows the loop levels: frequency,
/// phi, then one `PointAndSweep` per theta angle, which is the per-theta level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunState {
    Idle,
    PowerCycling,
    PerFrequency { ku_freq_hz: u64 },
    PerPhi { ku_freq_hz: u64, phi: f64 },
    PointAndSweep(SweepPoint),
    Done { completed: bool },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub points: usize,
    pub command_timeouts: usize,
    pub measurement_failures: usize,
    pub artifacts: Vec<PathBuf>,
}

/// Drives a whole chamber run over one transport and one measurement pipeline.
pub struct SweepOrchestrator<'a, T, M, R, C = SystemClock> {
    config: &'a SweepConfiguration,
    encoder: CommandEncoder<'a>,
    transport: T,
    measurement: M,
    rng: R,
    clock: C,
    power_cycle: bool,
    options: MeasurementOptions,
    state: RunState,
    direction_forward: bool,
    summary: RunSummary,
}

impl<'a, T, M, R> SweepOrchestrator<'a, T, M, R>
where
    T: Transport,
    M: Measurement,
    R: Rng,
{
    pub fn new(
        config: &'a SweepConfiguration,
        catalog: &'a CommandCatalog,
        transport: T,
        measurement: M,
        rng: R,
    ) -> Self {
        Self {
            config,
            encoder: CommandEncoder::new(config, catalog),
            transport,
            measurement,
            rng,
            clock: SystemClock,
            power_cycle: true,
            options: MeasurementOptions::default(),
            state: RunState::Idle,
            direction_forward: true,
            summary: RunSummary::default(),
        }
    }
}

impl<'a, T, M, R, C> SweepOrchestrator<'a, T, M, R, C>
where
    T: Transport,
    M: Measurement,
    R: Rng,
    C: Clock,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> SweepOrchestrator<'a, T, M, R, C2> {
        SweepOrchestrator {
            config: self.config,
            encoder: self.encoder,
            transport: self.transport,
            measurement: self.measurement,
            rng: self.rng,
            clock,
            power_cycle: self.power_cycle,
            options: self.options,
            state: self.state,
            direction_forward: self.direction_forward,
            summary: self.summary,
        }
    }

    pub fn with_power_cycle(mut self, enabled: bool) -> Self {
        self.power_cycle = enabled;
        self
    }

    pub fn with_measurement_options(mut self, options: MeasurementOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn direction_forward(&self) -> bool {
        self.direction_forward
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn measurement(&self) -> &M {
        &self.measurement
    }

    /// Runs every point of the configured test matrix.
    ///
    /// Fatal conditions end the run in `Done { completed: false }` and report
    /// the point being processed. A run cannot be restarted.
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        if self.state != RunState::Idle {
            return Err(self.abort(None, SweepError::NotIdle));
        }

        if !self.transport.check_connection() {
            return Err(self.abort(None, SweepError::Connectivity));
        }
        if self.power_cycle {
            self.state = RunState::PowerCycling;
            self.power_cycle_array().map_err(|e| self.abort(None, e))?;
        }

        let config = self.config;
        let mut last_setup = None;
        for &ku_freq_hz in &config.ku_frequencies_hz {
            self.state = RunState::PerFrequency { ku_freq_hz };
            info!("Sweeping at {} GHz", ku_freq_hz as f64 / 1e9);

            if last_setup != Some(ku_freq_hz) {
                self.frequency_setup(ku_freq_hz)
                    .map_err(|e| self.abort(None, e))?;
                last_setup = Some(ku_freq_hz);
            }

            for phi in select_phi_angles(config, &mut self.rng) {
                self.state = RunState::PerPhi { ku_freq_hz, phi };

                for theta in select_theta_angles(config, &mut self.rng) {
                    let point = SweepPoint {
                        ku_freq_hz,
                        l_band_freq_hz: config.l_band_frequency_hz,
                        phi,
                        theta,
                        direction_forward: self.direction_forward,
                    };
                    self.state = RunState::PointAndSweep(point);
                    self.sweep_point(&point)
                        .map_err(|e| self.abort(Some(point), e))?;

                    if config.strategy.azimuth == AzimuthPass::BothDirections {
                        self.direction_forward = !self.direction_forward;
                    }
                }
            }
        }

        self.state = RunState::Done { completed: true };
        info!(
            "Run complete: {} point(s), {} command timeout(s), {} failed measurement(s)",
            self.summary.points, self.summary.command_timeouts, self.summary.measurement_failures
        );
        Ok(self.summary.clone())
    }

    fn power_cycle_array(&mut self) -> Result<(), SweepError> {
        info!("Array Power Cycle");
        let config = self.config;
        let off = self.encoder.power(false)?;
        self.dispatch(&off)?;
        thread::sleep(Duration::from_millis(config.link.power_off_settle_ms));
        let on = self.encoder.power(true)?;
        self.dispatch(&on)?;
        thread::sleep(Duration::from_millis(config.link.power_on_settle_ms));
        Ok(())
    }

    fn frequency_setup(&mut self, ku_freq_hz: u64) -> Result<(), SweepError> {
        if let Some(setup) = self.encoder.frequency_setup(ku_freq_hz)? {
            info!("Frequency setup for {} Hz", ku_freq_hz);
            self.dispatch(&setup)?;
        }
        Ok(())
    }

    fn sweep_point(&mut self, point: &SweepPoint) -> Result<(), SweepError> {
        let config = self.config;
        info!("Pointing antenna to phi: {}, theta: {}", point.phi, point.theta);

        let window = compute_window(point.direction_forward, point.phi, point.theta, config);
        let commands = self.encoder.point(point)?;
        self.dispatch(&commands)?;

        let name = make_name(
            self.clock.now(),
            self.encoder.mode().as_str(),
            &config.system_id,
            point.ku_freq_hz,
            point.l_band_freq_hz,
            point.phi,
            point.theta,
        );
        match self
            .measurement
            .run_sweep(&name, &window, &config.save_path, &self.options)
        {
            Ok(artifact) => self.summary.artifacts.push(artifact),
            Err(e) => {
                warn!("Measurement {} failed: {}", name, e);
                self.summary.measurement_failures += 1;
            }
        }
        self.summary.points += 1;
        Ok(())
    }

    fn dispatch(&mut self, commands: &CommandSet) -> Result<(), SweepError> {
        let report = self.transport.send(commands)?;
        self.summary.command_timeouts += report.timed_out;
        Ok(())
    }

    fn abort(&mut self, stopped_at: Option<SweepPoint>, source: SweepError) -> RunError {
        if !matches!(source, SweepError::NotIdle) {
            self.state = RunState::Done { completed: false };
        }
        match &stopped_at {
            Some(point) => error!("Run aborted at {}: {}", point, source),
            None => error!("Run aborted: {}", source),
        }
        RunError {
            stopped_at,
            completed_points: self.summary.points,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::AngleWindow;
    use crate::config::{AngleAxis, InterfaceMode};
    use crate::encoder::tests::test_catalog;
    use crate::error::{MeasurementError, TemplateError, TransportError};
    use crate::transport::DispatchReport;
    use chrono::{NaiveDate, NaiveDateTime};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::cell::Cell;
    use std::path::Path;

    #[derive(Default)]
    struct FakeLink {
        connected: bool,
        batches: Vec<Vec<String>>,
        fail_on_batch: Option<usize>,
        timeouts_per_batch: usize,
    }

    impl FakeLink {
        fn connected() -> Self {
            Self {
                connected: true,
                ..Self::default()
            }
        }
    }

    impl Transport for FakeLink {
        fn check_connection(&mut self) -> bool {
            self.connected
        }

        fn send(&mut self, commands: &CommandSet) -> Result<DispatchReport, TransportError> {
            if self.fail_on_batch == Some(self.batches.len()) {
                return Err(TransportError::Io {
                    sent: 0,
                    source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"),
                });
            }
            self.batches.push(commands.iter().cloned().collect());
            Ok(DispatchReport {
                sent: commands.len(),
                timed_out: self.timeouts_per_batch,
            })
        }
    }

    #[derive(Default)]
    struct FakeChamber {
        captures: Vec<(String, AngleWindow)>,
        fail_every_other: bool,
    }

    impl Measurement for FakeChamber {
        fn run_sweep(
            &mut self,
            name: &str,
            window: &AngleWindow,
            save_path: &Path,
            _options: &MeasurementOptions,
        ) -> Result<PathBuf, MeasurementError> {
            self.captures.push((name.to_string(), *window));
            if self.fail_every_other && self.captures.len() % 2 == 0 {
                return Err(MeasurementError::Instrument("no trigger".into()));
            }
            Ok(save_path.join(name))
        }
    }

    // advances one second per call so names never collide
    struct TickingClock(Cell<u32>);

    impl Clock for TickingClock {
        fn now(&self) -> NaiveDateTime {
            let s = self.0.get();
            self.0.set(s + 1);
            NaiveDate::from_ymd_opt(2024, 10, 16)
                .unwrap()
                .and_hms_opt(12, s / 60, s % 60)
                .unwrap()
        }
    }

    fn config(mode: InterfaceMode) -> SweepConfiguration {
        let mut config = SweepConfiguration {
            interface_mode: mode,
            system_id: "unit7".into(),
            ..SweepConfiguration::default()
        };
        config.link.power_off_settle_ms = 0;
        config.link.power_on_settle_ms = 0;
        config
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn local_run_visits_phi_major_theta_minor() {
        let catalog = test_catalog();
        let config = config(InterfaceMode::Local);
        let mut orchestrator = SweepOrchestrator::new(
            &config,
            &catalog,
            FakeLink::connected(),
            FakeChamber::default(),
            rng(),
        )
        .with_clock(TickingClock(Cell::new(0)));

        let summary = orchestrator.run().unwrap();
        assert_eq!(summary.points, 14);
        assert_eq!(summary.artifacts.len(), 14);
        assert_eq!(orchestrator.state(), RunState::Done { completed: true });

        let names: Vec<&str> = orchestrator
            .measurement()
            .captures
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert!(names[0].ends_with("Phi_0_Theta_0"));
        assert!(names[6].ends_with("Phi_0_Theta_30"));
        assert!(names[7].ends_with("Phi_180_Theta_0"));

        // power off, power on, then one batch per point
        let batches = &orchestrator.transport().batches;
        assert_eq!(batches.len(), 2 + 14);
        assert_eq!(batches[0], vec!["PWR 0"]);
        assert_eq!(batches[1], vec!["PWR 1"]);
        assert_eq!(batches[2].len(), 7 + 2 * 4);
        assert_eq!(batches[2][7], "STEER A 0 0 0 11600000000 0 1");
    }

    #[test]
    fn unreachable_transport_sends_nothing() {
        let catalog = test_catalog();
        let config = config(InterfaceMode::Local);
        let mut orchestrator = SweepOrchestrator::new(
            &config,
            &catalog,
            FakeLink::default(),
            FakeChamber::default(),
            rng(),
        );
        let err = orchestrator.run().unwrap_err();
        assert!(matches!(err.source, SweepError::Connectivity));
        assert_eq!(err.stopped_at, None);
        assert!(orchestrator.transport().batches.is_empty());
        assert!(orchestrator.measurement().captures.is_empty());
        assert_eq!(orchestrator.state(), RunState::Done { completed: false });
    }

    #[test]
    fn transport_failure_aborts_at_the_current_point() {
        let catalog = test_catalog();
        let config = config(InterfaceMode::PointingGenerator);
        let link = FakeLink {
            fail_on_batch: Some(5),
            ..FakeLink::connected()
        };
        let mut orchestrator =
            SweepOrchestrator::new(&config, &catalog, link, FakeChamber::default(), rng())
                .with_power_cycle(false);

        let err = orchestrator.run().unwrap_err();
        assert!(matches!(err.source, SweepError::Transport(_)));
        assert_eq!(err.completed_points, 5);
        let point = err.stopped_at.unwrap();
        assert_eq!((point.phi, point.theta), (0.0, 25.0));
        assert_eq!(orchestrator.measurement().captures.len(), 5);
        assert_eq!(orchestrator.state(), RunState::Done { completed: false });
    }

    #[test]
    fn timeouts_and_failed_measurements_do_not_stop_the_run() {
        let catalog = test_catalog();
        let mut config = config(InterfaceMode::PointingGenerator);
        config.strategy.azimuth = AzimuthPass::BothDirections;
        let link = FakeLink {
            timeouts_per_batch: 1,
            ..FakeLink::connected()
        };
        let chamber = FakeChamber {
            fail_every_other: true,
            ..FakeChamber::default()
        };
        let mut orchestrator = SweepOrchestrator::new(&config, &catalog, link, chamber, rng())
            .with_power_cycle(false);

        let summary = orchestrator.run().unwrap();
        assert_eq!(summary.points, 14);
        assert_eq!(summary.command_timeouts, 14);
        assert_eq!(summary.measurement_failures, 7);
        // direction still alternated across failed points
        let starts: Vec<f64> = orchestrator
            .measurement()
            .captures
            .iter()
            .map(|(_, w)| w.az_start)
            .collect();
        for (i, az) in starts.iter().enumerate() {
            assert_eq!(*az, if i % 2 == 0 { -35.0 } else { 35.0 });
        }
    }

    #[test]
    fn message_forwarding_sets_up_each_new_frequency_once() {
        let catalog = test_catalog();
        let mut config = config(InterfaceMode::MessageForwarding);
        config.ku_frequencies_hz = vec![11_600_000_000, 11_600_000_000, 12_000_000_000];
        config.phi = AngleAxis::List { values: vec![0.0] };
        config.theta = AngleAxis::List {
            values: vec![0.0, 10.0],
        };
        let mut orchestrator = SweepOrchestrator::new(
            &config,
            &catalog,
            FakeLink::connected(),
            FakeChamber::default(),
            rng(),
        )
        .with_power_cycle(false);

        orchestrator.run().unwrap();
        let batches = &orchestrator.transport().batches;
        let setups: Vec<usize> = batches
            .iter()
            .enumerate()
            .filter(|(_, b)| b.last().map(String::as_str) == Some("POINT"))
            .map(|(i, _)| i)
            .collect();
        // setup, 2 points, 2 points (same frequency), setup, 2 points
        assert_eq!(setups, vec![0, 5]);
        assert_eq!(batches.len(), 8);
        assert_eq!(batches[6][1], "CHAN 0 12000000 1500000");
    }

    #[test]
    fn malformed_catalog_aborts_before_dispatching_the_point() {
        let mut catalog = test_catalog();
        catalog
            .templates
            .insert(crate::catalog::CommandKind::Pose, "POSE {pitch".into());
        let config = config(InterfaceMode::PointingGenerator);
        let mut orchestrator = SweepOrchestrator::new(
            &config,
            &catalog,
            FakeLink::connected(),
            FakeChamber::default(),
            rng(),
        )
        .with_power_cycle(false);

        let err = orchestrator.run().unwrap_err();
        assert!(matches!(
            err.source,
            SweepError::Template(TemplateError::Malformed { .. })
        ));
        assert_eq!(err.completed_points, 0);
        assert!(err.stopped_at.is_some());
        assert!(orchestrator.transport().batches.is_empty());
    }

    #[test]
    fn finished_run_cannot_restart() {
        let catalog = test_catalog();
        let mut config = config(InterfaceMode::PointingGenerator);
        config.theta = AngleAxis::List { values: vec![5.0] };
        let mut orchestrator = SweepOrchestrator::new(
            &config,
            &catalog,
            FakeLink::connected(),
            FakeChamber::default(),
            rng(),
        )
        .with_power_cycle(false);

        orchestrator.run().unwrap();
        let err = orchestrator.run().unwrap_err();
        assert!(matches!(err.source, SweepError::NotIdle));
        assert_eq!(orchestrator.state(), RunState::Done { completed: true });
        assert_eq!(orchestrator.measurement().captures.len(), 2);
    }
}
