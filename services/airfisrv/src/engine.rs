//! Sync engine
//!
//! Drives one controller: negotiates once, then runs a periodic cycle that
//! drains the write queue and, every `read_frequency`-th tick, reads both
//! register banks into the store.
//!
//! ```text
//! tick ──► counter 1 ─────────────► open ─► drain queue ─► read banks ─► close
//!          counter 2..n, queue ───► open ─► drain queue ───────────────► close
//!          counter 2..n, empty ───► skip
//!          previous cycle running ► warn + restart after cooldown
//! ```
//!
//! Cycles run on their own task so ticks keep firing while a slow cycle is
//! in flight; the busy flag makes sure at most one cycle touches the
//! transport at a time.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use airfi_modbus::{DeviceLogger, RegisterBank, RegisterTransport};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::error::{AirfiError, Result};
use crate::negotiator::{DeviceProfile, Negotiator};
use crate::queue::WriteQueue;
use crate::store::RegisterStore;

/// Timing of the periodic sync
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Period of the sync timer
    pub interval: Duration,
    /// Full reads happen on every n-th tick
    pub read_frequency: u8,
    /// Wait before the timer is restarted after an overrun or failure
    pub restart_cooldown: Duration,
    /// Log every bank read as an address → value map
    pub print_modbus_map: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            read_frequency: 3,
            restart_cooldown: Duration::from_secs(10),
            print_modbus_map: false,
        }
    }
}

/// Lifecycle notifications towards the owner of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Negotiation and the first sync finished, periodic sync is running
    Initialized,
    /// The periodic sync should be restarted after `delay`
    RestartRequired { delay: Duration },
    /// Initialization failed for good
    Error { message: String },
}

/// Outcome of the tick bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Skip,
    Busy,
    Run { read: bool },
}

/// Clears a claimed flag (busy cycle, pending restart) when dropped
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlagGuard(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct PeriodicTask {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

struct EngineInner {
    transport: Arc<dyn RegisterTransport>,
    negotiator: Negotiator,
    settings: SyncSettings,
    store: Arc<RegisterStore>,
    queue: Arc<WriteQueue>,
    profile: RwLock<Option<DeviceProfile>>,
    counter: Mutex<u8>,
    busy: AtomicBool,
    restarting: AtomicBool,
    periodic: Mutex<Option<PeriodicTask>>,
    shutdown: CancellationToken,
    events: UnboundedSender<DeviceEvent>,
    logger: DeviceLogger,
}

/// Sync engine for one controller
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("device", &self.inner.logger.device())
            .field("settings", &self.inner.settings)
            .field("counter", &*self.inner.counter.lock())
            .field("busy", &self.inner.busy.load(Ordering::Relaxed))
            .finish()
    }
}

impl SyncEngine {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn RegisterTransport>,
        negotiator: Negotiator,
        settings: SyncSettings,
        events: UnboundedSender<DeviceEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                transport,
                negotiator,
                settings,
                store: Arc::new(RegisterStore::new()),
                queue: Arc::new(WriteQueue::new()),
                profile: RwLock::new(None),
                counter: Mutex::new(0),
                busy: AtomicBool::new(false),
                restarting: AtomicBool::new(false),
                periodic: Mutex::new(None),
                shutdown: CancellationToken::new(),
                events,
                logger: DeviceLogger::new(name),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.logger.device()
    }

    pub fn store(&self) -> &Arc<RegisterStore> {
        &self.inner.store
    }

    pub fn queue(&self) -> &Arc<WriteQueue> {
        &self.inner.queue
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }

    /// Negotiated profile, `None` before initialization
    pub fn profile(&self) -> Option<DeviceProfile> {
        self.inner.profile.read().clone()
    }

    pub fn sync_counter(&self) -> u8 {
        *self.inner.counter.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Whether a restart is waiting out its cooldown
    pub fn is_restart_pending(&self) -> bool {
        self.inner.restarting.load(Ordering::Acquire)
    }

    /// Whether the periodic timer is running
    pub fn is_running(&self) -> bool {
        self.inner
            .periodic
            .lock()
            .as_ref()
            .is_some_and(|task| !task.token.is_cancelled())
    }

    /// Negotiate, populate the store with a first sync and start the timer.
    ///
    /// Negotiation errors are returned as-is and leave the engine stopped.
    pub async fn initialize(&self) -> Result<DeviceProfile> {
        let probe = self
            .inner
            .negotiator
            .probe(self.inner.transport.as_ref())
            .await?;
        let profile = self.inner.negotiator.negotiate(&probe)?;

        self.log_device_info(&profile);
        self.inner.store.reset();
        *self.inner.profile.write() = Some(profile.clone());
        debug!("Feature flags initialized");

        self.sync_once().await?;
        self.start_periodic();
        self.emit(DeviceEvent::Initialized);

        Ok(profile)
    }

    /// Run one tick: skip, report an overrun, or execute a cycle
    pub async fn sync_once(&self) -> Result<()> {
        match self.begin_tick() {
            Tick::Skip => Ok(()),
            Tick::Busy => {
                warn!(
                    device = %self.name(),
                    "{} is busy completing previous operations",
                    self.name()
                );
                self.spawn_restart(self.inner.settings.restart_cooldown);
                Ok(())
            },
            Tick::Run { read } => {
                let _guard = FlagGuard(&self.inner.busy);
                self.run_cycle(read).await
            },
        }
    }

    /// Stop the timer, wait `delay`, then start over with a read tick.
    ///
    /// Only one restart runs at a time; a request made while another is
    /// pending returns immediately.
    pub async fn restart_sync(&self, delay: Duration) {
        let Some(_pending) = FlagGuard::claim(&self.inner.restarting) else {
            debug!("Restart of {} already pending", self.name());
            return;
        };

        self.stop_periodic();
        *self.inner.counter.lock() = 0;
        warn!(
            device = %self.name(),
            "Restarting device data sync in {} seconds...",
            delay.as_secs()
        );

        tokio::select! {
            () = tokio::time::sleep(delay) => {},
            () = self.inner.shutdown.cancelled() => {
                debug!("Restart of {} abandoned, engine is shutting down", self.name());
                return;
            }
        }

        self.start_periodic();
        info!(device = %self.name(), "Device data sync restarted");
    }

    /// Stop the timer for good. Pending restarts are abandoned.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.stop_periodic();
    }

    /// Advance the counter and claim the busy flag
    fn begin_tick(&self) -> Tick {
        let mut counter = self.inner.counter.lock();
        *counter += 1;
        if *counter > self.inner.settings.read_frequency {
            *counter = 1;
        }

        if *counter > 1 && self.inner.queue.is_empty() {
            return Tick::Skip;
        }

        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Tick::Busy;
        }

        Tick::Run {
            read: *counter == 1,
        }
    }

    async fn run_cycle(&self, read: bool) -> Result<()> {
        let transport = &self.inner.transport;
        transport
            .open()
            .await
            .map_err(|source| AirfiError::Connection {
                target: self.name().to_string(),
                source,
            })?;

        let result = self.exchange(read).await;
        transport.close().await;
        result
    }

    async fn exchange(&self, read: bool) -> Result<()> {
        if !self.inner.queue.is_empty() {
            self.write_queue().await;
        }

        if read {
            self.read_registers().await?;
        }
        Ok(())
    }

    async fn write_queue(&self) {
        debug!(device = %self.name(), "Writing values to device");

        let transport = Arc::clone(&self.inner.transport);
        let report = self
            .inner
            .queue
            .drain(|offset, value| {
                let transport = Arc::clone(&transport);
                async move { transport.write_single(offset, value).await }
            })
            .await;

        let succeeded = report.succeeded();
        for failed in report.failed {
            let err = AirfiError::Write {
                offset: failed.offset,
                value: failed.value,
                source: failed.error,
            };
            error!(device = %self.name(), "{}", err);
        }
        debug!(
            "Wrote {}/{} queued values",
            succeeded, report.attempted
        );
    }

    /// Read both banks; the store only changes when both reads succeed
    async fn read_registers(&self) -> Result<()> {
        let lengths = self
            .inner
            .profile
            .read()
            .as_ref()
            .map(|profile| profile.register_lengths)
            .ok_or(AirfiError::NotInitialized)?;
        let transport = &self.inner.transport;

        let holding = transport
            .read_block(RegisterBank::Holding, 1, lengths.holding)
            .await
            .map_err(AirfiError::Read)?;
        let input = transport
            .read_block(RegisterBank::Input, 1, lengths.input)
            .await
            .map_err(AirfiError::Read)?;

        if self.inner.settings.print_modbus_map {
            self.log_register_map(RegisterBank::Holding, &holding);
            self.log_register_map(RegisterBank::Input, &input);
        }

        self.inner.store.apply_sync_read(holding, input);
        Ok(())
    }

    fn log_register_map(&self, bank: RegisterBank, values: &[u16]) {
        let map: BTreeMap<String, u16> = values
            .iter()
            .enumerate()
            .map(|(index, value)| (format!("{}x{:05}", bank.prefix(), index + 1), *value))
            .collect();
        match serde_json::to_string_pretty(&map) {
            Ok(json) => debug!(device = %self.name(), "{} registers:\n{}", bank, json),
            Err(e) => debug!("Failed to format {} register map: {}", bank, e),
        }
    }

    fn log_device_info(&self, profile: &DeviceProfile) {
        let header = format!("----- {} -----", self.name());
        info!(device = %self.name(), "{}", header);
        info!(device = %self.name(), "  Firmware version: {}", profile.firmware_version);
        info!(device = %self.name(), "  Modbus map version: {}", profile.map_version);
        info!(device = %self.name(), "{}", "-".repeat(header.len()));
        debug!(
            device = %self.name(),
            "Hardware revision {}, feature flags {}",
            profile.hardware_revision, profile.features
        );
    }

    pub(crate) fn emit(&self, event: DeviceEvent) {
        if self.inner.events.send(event).is_err() {
            debug!("No listener for events of {}", self.name());
        }
    }

    fn spawn_restart(&self, delay: Duration) {
        let engine = self.clone();
        tokio::spawn(async move { engine.restart_sync(delay).await }.in_current_span());
    }

    /// Start (or replace) the periodic timer
    fn start_periodic(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }

        let token = self.inner.shutdown.child_token();
        let task_token = token.clone();
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.settings.interval;
        let cooldown = self.inner.settings.restart_cooldown;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(engine) = upgrade(&weak) else { break };
                        tokio::spawn(
                            async move {
                                if let Err(e) = engine.sync_once().await {
                                    error!(device = %engine.name(), "Device sync failed: {}", e);
                                    engine.emit(DeviceEvent::RestartRequired { delay: cooldown });
                                }
                            }
                            .in_current_span(),
                        );
                    }
                    () = task_token.cancelled() => {
                        break;
                    }
                }
            }
        }
        .in_current_span());

        let previous = self
            .inner
            .periodic
            .lock()
            .replace(PeriodicTask { handle, token });
        if let Some(previous) = previous {
            previous.token.cancel();
            previous.handle.abort();
        }
        debug!(
            "Periodic sync of {} started, interval {}ms",
            self.name(),
            period.as_millis()
        );
    }

    fn stop_periodic(&self) {
        if let Some(task) = self.inner.periodic.lock().take() {
            task.token.cancel();
            task.handle.abort();
            debug!("Periodic sync of {} stopped", self.name());
        }
    }
}

fn upgrade(weak: &Weak<EngineInner>) -> Option<SyncEngine> {
    weak.upgrade().map(|inner| SyncEngine { inner })
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::testing::{Call, ScriptedTransport};
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tracing_test::traced_test;

    const FIRMWARE_310: u16 = 310;
    const MAP_250: u16 = 250;

    fn engine_with(
        transport: Arc<ScriptedTransport>,
    ) -> (SyncEngine, UnboundedReceiver<DeviceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = SyncEngine::new(
            "Ventilation",
            transport,
            Negotiator::default(),
            SyncSettings::default(),
            tx,
        );
        (engine, rx)
    }

    fn unit() -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport::with_device(FIRMWARE_310, MAP_250, 40, 58))
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_negotiates_and_reads_once() {
        let transport = unit();
        transport.set_holding(5, 180);
        let (engine, mut rx) = engine_with(Arc::clone(&transport));

        let profile = engine.initialize().await.unwrap();
        assert_eq!(profile.firmware_version, "3.1.0");
        assert_eq!(profile.register_lengths.holding, 58);

        assert_eq!(
            transport.calls(),
            vec![
                Call::Open,
                Call::Read(RegisterBank::Input, 1, 3),
                Call::Close,
                Call::Open,
                Call::Read(RegisterBank::Holding, 1, 58),
                Call::Read(RegisterBank::Input, 1, 40),
                Call::Close,
            ]
        );
        assert_eq!(
            engine
                .store()
                .get_value(&airfi_modbus::RegisterAddress::holding(5)),
            Some(180)
        );
        assert_eq!(engine.sync_counter(), 1);
        assert!(engine.is_running());
        assert_eq!(rx.recv().await, Some(DeviceEvent::Initialized));
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_negotiation_failure_never_starts_sync() {
        let transport = Arc::new(ScriptedTransport::with_device(140, 140, 31, 12));
        let (engine, _rx) = engine_with(Arc::clone(&transport));

        let err = engine.initialize().await.unwrap_err();
        assert!(matches!(err, AirfiError::UnsupportedVersion { .. }));
        assert!(!engine.is_running());
        assert!(engine.profile().is_none());
        // only the probe session
        assert_eq!(transport.count(|c| *c == Call::Open), 1);
    }

    #[tokio::test]
    async fn test_idle_ticks_open_no_connection() {
        let transport = unit();
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();
        engine.shutdown();
        transport.clear_calls();

        engine.sync_once().await.unwrap();
        assert_eq!(engine.sync_counter(), 2);
        engine.sync_once().await.unwrap();
        assert_eq!(engine.sync_counter(), 3);
        assert!(transport.calls().is_empty());

        // wraps back to a read tick
        engine.sync_once().await.unwrap();
        assert_eq!(engine.sync_counter(), 1);
        assert_eq!(
            transport.count(|c| matches!(c, Call::Read(RegisterBank::Holding, 1, 58))),
            1
        );
    }

    #[tokio::test]
    async fn test_write_tick_drains_queue_without_reading() {
        let transport = unit();
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();
        engine.shutdown();
        transport.clear_calls();

        engine.queue().insert(5, 200);
        engine.queue().insert(5, 210);
        engine.sync_once().await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![Call::Open, Call::Write(5, 210), Call::Close]
        );
        assert!(engine.queue().is_empty());
        assert_eq!(transport.holding(5), 210);
    }

    #[tokio::test]
    async fn test_failed_write_is_dropped_and_cycle_continues() {
        let transport = unit();
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();
        engine.shutdown();
        transport.fail_write_to(5);
        transport.clear_calls();

        engine.queue().insert(5, 200);
        engine.queue().insert(12, 1);
        engine.sync_once().await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![Call::Open, Call::Write(5, 200), Call::Write(12, 1), Call::Close]
        );
        assert!(engine.queue().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_keeps_previous_values_and_closes() {
        let transport = unit();
        transport.set_input(8, 215);
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();
        engine.shutdown();

        transport.set_input(8, 300);
        transport.fail_reads(true);
        engine.sync_once().await.unwrap();
        engine.sync_once().await.unwrap();
        let err = engine.sync_once().await.unwrap_err();

        assert!(matches!(err, AirfiError::Read(_)));
        assert_eq!(
            engine
                .store()
                .get_value(&airfi_modbus::RegisterAddress::input(8)),
            Some(215)
        );
        assert!(!transport.is_open());
        assert!(!engine.is_busy());
    }

    #[tokio::test]
    async fn test_open_failure_is_a_connection_error() {
        let transport = unit();
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();
        engine.shutdown();

        transport.fail_open(true);
        engine.queue().insert(1, 2);
        let err = engine.sync_once().await.unwrap_err();
        assert!(matches!(err, AirfiError::Connection { .. }));
        assert!(!engine.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_timer_reads_every_third_tick() {
        let transport = unit();
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();
        transport.clear_calls();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(
            transport.count(|c| matches!(c, Call::Read(RegisterBank::Holding, ..))),
            1
        );
        assert_eq!(transport.count(|c| *c == Call::Open), 1);

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(
            transport.count(|c| matches!(c, Call::Read(RegisterBank::Holding, ..))),
            2
        );
        engine.shutdown();
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_overrun_warns_and_restarts_after_cooldown() {
        let transport = unit();
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();
        engine.shutdown_timer_for_test();

        transport.set_read_delay(Duration::from_secs(5));
        *engine.inner.counter.lock() = 0;
        let slow = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.sync_once().await })
        };
        tokio::task::yield_now().await;
        assert!(engine.is_busy());

        engine.queue().insert(5, 200);
        engine.sync_once().await.unwrap();
        assert!(logs_contain("Ventilation is busy completing previous operations"));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(logs_contain("Restarting device data sync in 10 seconds..."));
        assert!(!engine.is_running());

        slow.await.unwrap().unwrap();
        transport.set_read_delay(Duration::ZERO);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(logs_contain("Device data sync restarted"));
        assert!(engine.is_running());
        engine.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_counter_to_read_tick() {
        let transport = unit();
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();
        engine.sync_once().await.unwrap();
        assert_eq!(engine.sync_counter(), 2);

        engine.restart_sync(Duration::from_secs(1)).await;
        assert_eq!(engine.sync_counter(), 0);
        assert!(engine.is_running());

        transport.clear_calls();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(
            transport.count(|c| matches!(c, Call::Read(RegisterBank::Holding, ..))),
            1
        );
        engine.shutdown();
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_failing_cycle_requests_restart() {
        let transport = unit();
        let (engine, mut rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();
        assert_eq!(rx.recv().await, Some(DeviceEvent::Initialized));

        transport.fail_reads(true);
        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(
            rx.recv().await,
            Some(DeviceEvent::RestartRequired {
                delay: Duration::from_secs(10)
            })
        );
        assert!(logs_contain("Device sync failed: Unable to read register"));
        engine.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_pending_restart() {
        let transport = unit();
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();

        let restart = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.restart_sync(Duration::from_secs(10)).await })
        };
        tokio::task::yield_now().await;
        engine.shutdown();
        restart.await.unwrap();
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_overlapping_restarts_run_once() {
        let transport = unit();
        let (engine, _rx) = engine_with(Arc::clone(&transport));
        engine.initialize().await.unwrap();

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.restart_sync(Duration::from_secs(10)).await })
        };
        tokio::task::yield_now().await;
        assert!(engine.is_restart_pending());

        // e.g. an overrun while the owner's restart waits out its cooldown
        engine.restart_sync(Duration::from_secs(10)).await;
        assert!(!engine.is_running());

        first.await.unwrap();
        assert!(engine.is_running());
        assert!(!engine.is_restart_pending());
        engine.shutdown();

        logs_assert(|lines: &[&str]| {
            let restarted = lines
                .iter()
                .filter(|line| line.contains("Device data sync restarted"))
                .count();
            let scheduled = lines
                .iter()
                .filter(|line| line.contains("Restarting device data sync in"))
                .count();
            match (scheduled, restarted) {
                (1, 1) => Ok(()),
                other => Err(format!("expected one restart, got {:?}", other)),
            }
        });
    }

    impl SyncEngine {
        /// Stop the timer but keep restarts possible
        fn shutdown_timer_for_test(&self) {
            self.stop_periodic();
        }
    }
}
