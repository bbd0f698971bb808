//! Simulation session
//!
//! Owns the proxy, the frame clock and the last layout read, and is passed
//! explicitly to whatever drives the frame loop.

use crate::bridge::{LayoutConstants, MemoryBridge, SimulationBackend};
use crate::error::HostError;
use crate::renderer::{RenderStyle, Surface, render_frame};
use crate::settings::HostSettings;

use super::clock::{CatchUpPolicy, ClockState, FrameClock, TickReport};
use super::proxy::{ContainerGeometry, SimulationProxy};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Module loaded, `init` not yet called
    Idle,
    /// Initialized and accepting ticks
    Running,
    /// Stopped by the host
    Stopped,
    /// A module call failed; the run is corrupted
    Faulted,
}

/// Result of one tick-and-render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub tick: TickReport,
    pub layout: LayoutConstants,
}

/// A loaded module driven at a fixed timestep
#[derive(Debug)]
pub struct SimulationSession<B> {
    proxy: SimulationProxy<B>,
    clock: Option<FrameClock>,
    phase: SessionPhase,
    layout: Option<LayoutConstants>,
    container_radius: f32,
    body_param: f32,
    step_ms: f64,
    catch_up: CatchUpPolicy,
    style: RenderStyle,
    frames: u64,
}

impl<B: SimulationBackend> SimulationSession<B> {
    /// Wrap a loaded module; `settings` are validated here, before any module call
    pub fn new(bridge: MemoryBridge<B>, settings: &HostSettings) -> Result<Self, HostError> {
        settings.validate()?;
        Ok(Self {
            proxy: SimulationProxy::new(bridge),
            clock: None,
            phase: SessionPhase::Idle,
            layout: None,
            container_radius: settings.container_radius,
            body_param: settings.body_param,
            step_ms: settings.step_ms,
            catch_up: settings.catch_up,
            style: settings.style,
            frames: 0,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn container(&self) -> Option<ContainerGeometry> {
        self.proxy.container()
    }

    pub fn clock_state(&self) -> Option<ClockState> {
        self.clock.as_ref().map(FrameClock::state)
    }

    /// Layout constants read by the most recent render
    pub fn last_layout(&self) -> Option<LayoutConstants> {
        self.layout
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn proxy(&self) -> &SimulationProxy<B> {
        &self.proxy
    }

    /// Initialize the module and start both clocks at `now` (ms)
    pub fn start(&mut self, now: f64) -> Result<ContainerGeometry, HostError> {
        if self.phase != SessionPhase::Idle {
            return Err(HostError::NotRunning(self.phase));
        }

        let geometry = match self.proxy.init(self.container_radius, self.body_param) {
            Ok(geometry) => geometry,
            Err(e) => return Err(self.fail(e)),
        };
        self.clock = Some(FrameClock::new(now, self.step_ms, self.catch_up));
        self.phase = SessionPhase::Running;
        log::info!("Session running ({} ms fixed step)", self.step_ms);
        Ok(geometry)
    }

    /// Issue every fixed step owed up to `now` (ms)
    pub fn tick(&mut self, now: f64) -> Result<TickReport, HostError> {
        self.ensure_running()?;

        let clock = self.clock.as_mut().ok_or(HostError::NotInitialized)?;
        let proxy = &mut self.proxy;
        let result = clock.advance(now, |dt| proxy.step(dt));
        result.map_err(|e| self.fail(e))
    }

    /// Draw the current state, reading layout and positions afresh
    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<LayoutConstants, HostError> {
        self.ensure_running()?;
        let container = self.proxy.container().ok_or(HostError::NotInitialized)?;

        let style = &self.style;
        let drawn = self.proxy.current_positions().map(|(layout, positions)| {
            render_frame(surface, &positions, layout, container, style);
            layout
        });

        match drawn {
            Ok(layout) => {
                self.layout = Some(layout);
                self.frames += 1;
                Ok(layout)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Tick, then render: a frame never shows simulated time behind `now`
    pub fn frame<S: Surface + ?Sized>(&mut self, now: f64, surface: &mut S) -> Result<FrameReport, HostError> {
        let tick = self.tick(now)?;
        let layout = self.render(surface)?;
        Ok(FrameReport { tick, layout })
    }

    /// Stop accepting ticks. The backend stays alive until the session is dropped.
    pub fn stop(&mut self) {
        if self.phase == SessionPhase::Running || self.phase == SessionPhase::Idle {
            log::info!("Session stopped after {} frames", self.frames);
            self.phase = SessionPhase::Stopped;
        }
    }

    /// Stop and release the backend
    pub fn dispose(mut self) -> B {
        self.stop();
        self.proxy.into_backend()
    }

    fn ensure_running(&self) -> Result<(), HostError> {
        match self.phase {
            SessionPhase::Running => Ok(()),
            phase => Err(HostError::NotRunning(phase)),
        }
    }

    fn fail(&mut self, err: HostError) -> HostError {
        if err.is_fatal() {
            log::error!("Simulation run aborted: {}", err);
            self.phase = SessionPhase::Faulted;
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingsError;
    use crate::renderer::RasterSurface;
    use crate::sim::testing::FakeBackend;
    use glam::Vec2;

    fn session(positions: &[(f32, f32)]) -> SimulationSession<FakeBackend> {
        let bridge = MemoryBridge::new(FakeBackend::new(10.0, positions)).unwrap();
        SimulationSession::new(bridge, &HostSettings::default()).unwrap()
    }

    #[test]
    fn test_idle_until_started() {
        let mut session = session(&[(0.0, 0.0)]);
        let mut surface = RasterSurface::new(64, 64);

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(matches!(
            session.tick(10.0),
            Err(HostError::NotRunning(SessionPhase::Idle))
        ));
        assert!(session.render(&mut surface).is_err());
        assert_eq!(session.proxy().bridge().backend().step_calls, 0);
    }

    #[test]
    fn test_start_then_tick() {
        let mut session = session(&[(0.0, 0.0)]);
        let geometry = session.start(1000.0).unwrap();
        assert_eq!(geometry.radius, 200.0);
        assert_eq!(session.phase(), SessionPhase::Running);

        let report = session.tick(1030.0).unwrap();
        assert_eq!(report.steps, 30);

        let backend = session.proxy().bridge().backend();
        assert_eq!(backend.init_calls, vec![(200.0, 20.0)]);
        assert_eq!(backend.step_calls, 30);
        assert!((backend.simulated_seconds - 0.030).abs() < 1e-6);
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut session = session(&[]);
        session.start(0.0).unwrap();
        assert!(matches!(
            session.start(5.0),
            Err(HostError::NotRunning(SessionPhase::Running))
        ));
        assert_eq!(session.proxy().bridge().backend().init_calls.len(), 1);
    }

    #[test]
    fn test_frame_renders_after_steps() {
        let mut session = session(&[(0.0, 50.0), (10.0, 5.0)]);
        let mut surface = RasterSurface::new(500, 450);
        session.start(0.0).unwrap();

        let report = session.frame(30.0, &mut surface).unwrap();
        assert_eq!(report.tick.steps, 30);
        assert_eq!(report.layout.num_balls, 2);
        assert_eq!(report.layout.ball_radius, 20.0);
        assert_eq!(session.last_layout(), Some(report.layout));
        assert_eq!(session.frames(), 1);

        let clock = session.clock_state().unwrap();
        assert_eq!(clock.last_frame_time, 30.0);
        assert_eq!(clock.last_simulated_time, 30.0);
    }

    #[test]
    fn test_fault_is_terminal() {
        let mut backend = FakeBackend::new(10.0, &[(0.0, 0.0)]);
        backend.fail_at_step(5);
        let bridge = MemoryBridge::new(backend).unwrap();
        let mut session = SimulationSession::new(bridge, &HostSettings::default()).unwrap();
        session.start(0.0).unwrap();

        let err = session.tick(10.0).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(session.phase(), SessionPhase::Faulted);
        assert_eq!(session.proxy().bridge().backend().step_calls, 5);

        // No more steps once faulted
        assert!(matches!(
            session.tick(20.0),
            Err(HostError::NotRunning(SessionPhase::Faulted))
        ));
        assert_eq!(session.proxy().bridge().backend().step_calls, 5);
    }

    #[test]
    fn test_init_fault_is_terminal() {
        let mut backend = FakeBackend::new(10.0, &[]);
        backend.fail_init();
        let mut session = SimulationSession::new(MemoryBridge::new(backend).unwrap(), &HostSettings::default()).unwrap();

        assert!(session.start(0.0).is_err());
        assert_eq!(session.phase(), SessionPhase::Faulted);
        assert!(session.clock_state().is_none());
    }

    #[test]
    fn test_stop_and_dispose() {
        let mut session = session(&[(0.0, 0.0)]);
        session.start(0.0).unwrap();
        session.tick(3.0).unwrap();
        session.stop();

        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert!(session.tick(10.0).is_err());

        let backend = session.dispose();
        assert_eq!(backend.step_calls, 3);
    }

    #[test]
    fn test_module_logs_are_forwarded_during_step() {
        let mut backend = FakeBackend::new(10.0, &[(0.0, 0.0)]);
        backend.queue_log(b"bounce \xf0\x28");
        let mut session = SimulationSession::new(MemoryBridge::new(backend).unwrap(), &HostSettings::default()).unwrap();
        session.start(0.0).unwrap();
        session.tick(1.0).unwrap();

        let logs = &session.proxy().bridge().backend().logs;
        assert_eq!(logs.len(), 1);
        assert!(logs[0].text.starts_with("bounce "));
        assert!(logs[0].text.contains('\u{FFFD}'));
        assert!(logs[0].warning.is_some());
    }

    #[test]
    fn test_render_after_growth_during_step() {
        let mut backend = FakeBackend::new(10.0, &[(0.0, 0.0)]);
        backend.queue_log(&vec![b'x'; 1 << 16]);
        let mut session = SimulationSession::new(MemoryBridge::new(backend).unwrap(), &HostSettings::default()).unwrap();
        let mut surface = RasterSurface::new(100, 100);
        session.start(0.0).unwrap();
        let before = session.proxy().bridge().backend().memory().len();

        let report = session.frame(1.0, &mut surface).unwrap();
        assert_eq!(report.layout.num_balls, 1);
        assert!(session.proxy().bridge().backend().memory().len() > before);

        let (_, view) = session.proxy().current_positions().unwrap();
        assert_eq!(view.get(0), Some(Vec2::X * FakeBackend::SPEED * 0.001));
    }

    #[test]
    fn test_default_settings_replay_long_gaps() {
        let mut coalesced = session(&[(0.0, 0.0)]);
        let mut split = session(&[(0.0, 0.0)]);
        coalesced.start(0.0).unwrap();
        split.start(0.0).unwrap();

        let report = coalesced.tick(2000.0).unwrap();
        for t in 1..=2000 {
            split.tick(f64::from(t)).unwrap();
        }

        assert_eq!(report.steps, 2000);
        assert_eq!(report.dropped_steps, 0);
        assert_eq!(coalesced.proxy().bridge().backend().step_calls, 2000);
        assert_eq!(split.proxy().bridge().backend().step_calls, 2000);
        assert_eq!(coalesced.clock_state(), split.clock_state());
    }

    #[test]
    fn test_clamp_is_opt_in() {
        let settings = HostSettings {
            catch_up: CatchUpPolicy::Clamp { max_steps: 100 },
            ..HostSettings::default()
        };
        let bridge = MemoryBridge::new(FakeBackend::new(10.0, &[])).unwrap();
        let mut session = SimulationSession::new(bridge, &settings).unwrap();
        session.start(0.0).unwrap();

        let report = session.tick(250.0).unwrap();
        assert_eq!(report.steps, 100);
        assert_eq!(report.dropped_steps, 150);
        assert_eq!(session.phase(), SessionPhase::Running);
    }

    #[test]
    fn test_invalid_settings_rejected_before_init() {
        let settings = HostSettings {
            step_ms: 0.0,
            ..HostSettings::default()
        };
        let bridge = MemoryBridge::new(FakeBackend::new(10.0, &[])).unwrap();
        let err = SimulationSession::new(bridge, &settings).unwrap_err();

        assert!(matches!(
            err,
            HostError::Settings(SettingsError::Invalid { field: "step_ms", .. })
        ));
        assert!(!err.is_fatal());
    }
}
