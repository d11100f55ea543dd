use super::farm_priority::FarmPriority;
use super::resolver::Resolver;
use super::runner::DeviceRunner;
use super::scheduler::Scheduler;
use super::types::{AutomationEvent, RunnerCommand, RunnerStatus, TaskKind, TaskSet};
use crate::adb::{AdbError, AdbResult, Device, DeviceBridge, Frame};
use crate::config::Settings;
use crate::state::StateStore;
use crate::tasks::{self, TaskContext};
use image::{GrayImage, Luma};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEVICE: &str = "emulator-5554";

/// Scripted in-memory bridge. Frames pop from the script; once the script
/// runs dry every capture returns the default frame. Taps are recorded.
struct FakeBridge {
    frames: Mutex<VecDeque<AdbResult<Vec<u8>>>>,
    default_frame: Vec<u8>,
    taps: Mutex<Vec<(String, u32, u32)>>,
    captures: AtomicUsize,
}

impl FakeBridge {
    fn new(default_frame: GrayImage) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            default_frame: png_bytes(&default_frame),
            taps: Mutex::new(Vec::new()),
            captures: AtomicUsize::new(0),
        }
    }

    fn script(&self, frame: AdbResult<GrayImage>) {
        self.frames
            .lock()
            .unwrap()
            .push_back(frame.map(|img| png_bytes(&img)));
    }

    fn taps(&self) -> Vec<(String, u32, u32)> {
        self.taps.lock().unwrap().clone()
    }

    fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl DeviceBridge for FakeBridge {
    async fn list_devices(&self) -> AdbResult<Vec<Device>> {
        Ok(vec![Device {
            name: DEVICE.to_string(),
            transport_id: None,
        }])
    }

    async fn capture_bytes(&self, _device: &str) -> AdbResult<Vec<u8>> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        match self.frames.lock().unwrap().pop_front() {
            Some(scripted) => scripted,
            None => Ok(self.default_frame.clone()),
        }
    }

    async fn tap(&self, device: &str, x: u32, y: u32) -> AdbResult<()> {
        self.taps.lock().unwrap().push((device.to_string(), x, y));
        Ok(())
    }
}

/// Square checkerboard patch; different cell sizes stay below the match
/// threshold against each other, identical ones score 1.0.
fn checker(cell: u32) -> GrayImage {
    let size = cell * 4;
    GrayImage::from_fn(size, size, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

fn canvas() -> GrayImage {
    GrayImage::from_pixel(240, 160, Luma([128u8]))
}

fn overlay(canvas: &mut GrayImage, patch: &GrayImage, px: u32, py: u32) {
    for (x, y, pixel) in patch.enumerate_pixels() {
        canvas.put_pixel(px + x, py + y, *pixel);
    }
}

fn png_bytes(img: &GrayImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn save_template(dir: &Path, rel: &str, patch: &GrayImage) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    patch.save(&path).unwrap();
}

fn frame_of(img: &GrayImage) -> Frame {
    Frame::decode(png_bytes(img), 0).unwrap()
}

fn test_settings(template_dir: &Path, state_file: &Path) -> Settings {
    Settings {
        template_dir: template_dir.to_path_buf(),
        state_file: state_file.to_path_buf(),
        poll_interval_ms: 10,
        search_timeout_secs: 1,
        loop_interval_ms: 20,
        retry_delay_ms: 20,
        tap_delay_ms: 1,
        login_cooldown_secs: 1,
        ..Settings::default()
    }
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

// Distinct checker cell sizes per template so they never cross-match.
const DISCONNECT_CELL: u32 = 3;
const GOBACK_CELL: u32 = 4;
const HOME_CELL: u32 = 5;
const READY_CELL: u32 = 6;
const BUTTON_CELL: u32 = 7;
const BUSY_CELL: u32 = 8;
const GATHER_NOW_CELL: u32 = 9;

struct Fixture {
    _tmp: tempfile::TempDir,
    settings: Settings,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let templates = tmp.path().join("images");
        save_template(&templates, "disconnected.png", &checker(DISCONNECT_CELL));
        save_template(&templates, "goback.png", &checker(GOBACK_CELL));
        save_template(&templates, "home.png", &checker(HOME_CELL));
        save_template(&templates, "train/siege/ready.png", &checker(READY_CELL));
        save_template(&templates, "train/siege_button.png", &checker(BUTTON_CELL));
        save_template(&templates, "armies/busy_2.png", &checker(BUSY_CELL));
        save_template(&templates, "farm/gather_now.png", &checker(GATHER_NOW_CELL));
        let settings = test_settings(&templates, &tmp.path().join("state.json"));
        Self {
            _tmp: tmp,
            settings,
        }
    }

    /// Frame showing only the city-view anchor, nothing actionable.
    fn clean_frame(&self) -> GrayImage {
        let mut img = canvas();
        overlay(&mut img, &checker(HOME_CELL), 10, 10);
        img
    }

    fn store(&self) -> Arc<tokio::sync::Mutex<StateStore>> {
        Arc::new(tokio::sync::Mutex::new(
            StateStore::open(&self.settings.state_file).unwrap(),
        ))
    }
}

#[test]
fn resolver_rules_fire_in_priority_order() {
    let fx = Fixture::new();
    let resolver = Resolver::new(&fx.settings);

    // Both the disconnect overlay and the go-back arrow visible: the
    // disconnect rule must win.
    let mut img = canvas();
    overlay(&mut img, &checker(DISCONNECT_CELL), 30, 40);
    overlay(&mut img, &checker(GOBACK_CELL), 160, 90);
    let (rule, point) = resolver.probe(&frame_of(&img)).unwrap();
    assert_eq!(rule.name, "disconnect");
    assert_eq!(
        (point.x, point.y),
        (30 + DISCONNECT_CELL * 2, 40 + DISCONNECT_CELL * 2),
        "match point must be the disconnect patch center"
    );

    // Only the go-back arrow: its rule fires.
    let mut img = canvas();
    overlay(&mut img, &checker(GOBACK_CELL), 160, 90);
    let (rule, _) = resolver.probe(&frame_of(&img)).unwrap();
    assert_eq!(rule.name, "go_back");

    // A clean frame matches nothing.
    let fx_clean = fx.clean_frame();
    // home.png is an anchor, not an interrupt trigger
    assert!(resolver.probe(&frame_of(&fx_clean)).is_none());
}

#[tokio::test(start_paused = true)]
async fn train_taps_building_exactly_once_then_confirms() {
    let fx = Fixture::new();

    // Default frame carries the train button so the in-building wait
    // resolves.
    let mut default = fx.clean_frame();
    overlay(&mut default, &checker(BUTTON_CELL), 60, 40);
    let bridge = FakeBridge::new(default);

    let mut buildings = HashMap::new();
    buildings.insert("siege_workshop".to_string(), (300, 400));
    let ctx = TaskContext {
        bridge: &bridge,
        device: DEVICE,
        settings: &fx.settings,
        buildings: &buildings,
        cancel: None,
    };

    let mut trigger = canvas();
    overlay(&mut trigger, &checker(READY_CELL), 100, 60);
    tasks::train::run(&ctx, &frame_of(&trigger)).await.unwrap();

    let taps: Vec<(u32, u32)> = bridge.taps().iter().map(|(_, x, y)| (*x, *y)).collect();
    let building_taps = taps.iter().filter(|&&t| t == (300, 400)).count();
    assert_eq!(building_taps, 1, "building opened with a single tap");
    assert_eq!(
        taps,
        vec![
            (300, 400),
            (60 + BUTTON_CELL * 2, 40 + BUTTON_CELL * 2),
            (985, 592),
        ],
        "open building, tap train button, confirm at the fixed point"
    );
}

#[tokio::test(start_paused = true)]
async fn busy_army_indicator_skips_gathering_without_taps() {
    let fx = Fixture::new();

    let mut busy_frame = fx.clean_frame();
    overlay(&mut busy_frame, &checker(BUSY_CELL), 120, 20);
    let bridge = FakeBridge::new(busy_frame);

    let buildings = HashMap::new();
    let ctx = TaskContext {
        bridge: &bridge,
        device: DEVICE,
        settings: &fx.settings,
        buildings: &buildings,
        cancel: None,
    };

    let mut tasks_cfg = TaskSet::default();
    tasks_cfg.farm = true;
    tasks_cfg.food = true;
    tasks_cfg.set_army_count(2);
    let mut priority = FarmPriority::default();

    tasks::farm::run(&ctx, &tasks_cfg, &mut priority)
        .await
        .unwrap();

    assert!(bridge.taps().is_empty(), "no gather taps while armies are out");
    assert_eq!(priority.cursor(), 1, "the skipped pick still rotates");
}

#[tokio::test(start_paused = true)]
async fn incomplete_gather_navigation_skips_the_finish_race() {
    let fx = Fixture::new();

    // The search step can never appear (no search.png template exists), but
    // a gather-now button is already visible on screen. The race must not
    // run after the navigation stops, or that stale button gets tapped.
    let mut frame = fx.clean_frame();
    overlay(&mut frame, &checker(GATHER_NOW_CELL), 120, 60);
    let bridge = FakeBridge::new(frame);

    let buildings = HashMap::new();
    let ctx = TaskContext {
        bridge: &bridge,
        device: DEVICE,
        settings: &fx.settings,
        buildings: &buildings,
        cancel: None,
    };

    let mut tasks_cfg = TaskSet::default();
    tasks_cfg.farm = true;
    tasks_cfg.food = true;
    let mut priority = FarmPriority::default();

    tasks::farm::run(&ctx, &tasks_cfg, &mut priority)
        .await
        .unwrap();

    let taps: Vec<(u32, u32)> = bridge.taps().iter().map(|(_, x, y)| (*x, *y)).collect();
    let gather_center = (120 + GATHER_NOW_CELL * 2, 60 + GATHER_NOW_CELL * 2);
    assert!(
        !taps.contains(&gather_center),
        "gather-now must not be tapped when navigation never completed: {taps:?}"
    );
    assert_eq!(
        taps,
        vec![(10 + HOME_CELL * 2, 10 + HOME_CELL * 2)],
        "only the home step of the navigation runs"
    );
}

#[tokio::test(start_paused = true)]
async fn interrupt_short_circuits_task_dispatch() {
    let fx = Fixture::new();
    let bridge = Arc::new(FakeBridge::new(fx.clean_frame()));

    // First frame shows both the disconnect overlay and a trainable unit.
    let mut conflicted = canvas();
    overlay(&mut conflicted, &checker(DISCONNECT_CELL), 30, 40);
    overlay(&mut conflicted, &checker(READY_CELL), 150, 80);
    bridge.script(Ok(conflicted));

    let store = fx.store();
    store.lock().await.update(DEVICE, |d| {
        d.tasks.train = true;
        d.paused = false;
        d.buildings.insert("siege_workshop".to_string(), (111, 222));
    });
    let initial = store.lock().await.device(DEVICE);

    let (commands, rx) = super::runner_channel();
    let (events_tx, mut events) = super::event_channel();
    let runner = DeviceRunner::new(
        DEVICE.to_string(),
        Arc::clone(&bridge),
        Arc::new(fx.settings.clone()),
        store,
        initial,
        rx,
        events_tx,
    );
    let join = tokio::spawn(runner.run());

    let probe = Arc::clone(&bridge);
    eventually(move || probe.captures() >= 4).await;
    commands.send(RunnerCommand::Shutdown).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), join)
        .await
        .unwrap()
        .unwrap();

    let taps: Vec<(u32, u32)> = bridge.taps().iter().map(|(_, x, y)| (*x, *y)).collect();
    assert!(
        taps.contains(&(638, 471)),
        "reconnect point tapped for the disconnect interrupt"
    );
    assert!(
        !taps.contains(&(111, 222)),
        "task dispatch must not run in an interrupted iteration"
    );

    let mut saw_interrupt = false;
    while let Ok(event) = events.try_recv() {
        if let AutomationEvent::InterruptHandled { rule, .. } = event {
            assert_eq!(rule, "disconnect");
            saw_interrupt = true;
        }
    }
    assert!(saw_interrupt);
}

#[tokio::test(start_paused = true)]
async fn capture_failures_back_off_and_recover() {
    let fx = Fixture::new();
    let bridge = Arc::new(FakeBridge::new(fx.clean_frame()));
    for _ in 0..3 {
        bridge.script(Err(AdbError::CaptureFailed {
            device: DEVICE.to_string(),
            detail: "device offline".to_string(),
        }));
    }

    let store = fx.store();
    store.lock().await.update(DEVICE, |d| {
        d.tasks.build = true;
        d.paused = false;
    });
    let initial = store.lock().await.device(DEVICE);

    let (commands, rx) = super::runner_channel();
    let (events_tx, mut events) = super::event_channel();
    let runner = DeviceRunner::new(
        DEVICE.to_string(),
        Arc::clone(&bridge),
        Arc::new(fx.settings.clone()),
        store,
        initial,
        rx,
        events_tx,
    );
    let join = tokio::spawn(runner.run());

    // Three failed iterations must not kill the loop; it keeps capturing.
    let probe = Arc::clone(&bridge);
    eventually(move || probe.captures() >= 5).await;
    assert!(!join.is_finished(), "loop survives transient capture failures");

    commands.send(RunnerCommand::Shutdown).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), join)
        .await
        .unwrap()
        .unwrap();

    let mut failures = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, AutomationEvent::IterationFailed { .. }) {
            failures += 1;
        }
    }
    assert_eq!(failures, 3);
}

#[tokio::test(start_paused = true)]
async fn runner_exits_once_all_tasks_are_disabled() {
    let fx = Fixture::new();
    let bridge = Arc::new(FakeBridge::new(fx.clean_frame()));

    let store = fx.store();
    store.lock().await.update(DEVICE, |d| {
        d.tasks.build = true;
        d.paused = false;
    });
    let initial = store.lock().await.device(DEVICE);

    let (commands, rx) = super::runner_channel();
    let (events_tx, mut events) = super::event_channel();
    let runner = DeviceRunner::new(
        DEVICE.to_string(),
        Arc::clone(&bridge),
        Arc::new(fx.settings.clone()),
        store,
        initial,
        rx,
        events_tx,
    );
    let join = tokio::spawn(runner.run());

    let probe = Arc::clone(&bridge);
    eventually(move || probe.captures() >= 1).await;
    commands
        .send(RunnerCommand::UpdateTasks(TaskSet::default()))
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), join)
        .await
        .unwrap()
        .unwrap();

    let mut stopped = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, AutomationEvent::RunnerStopped { .. }) {
            stopped = true;
        }
    }
    assert!(stopped);
}

#[tokio::test(start_paused = true)]
async fn pause_halts_all_device_io() {
    let fx = Fixture::new();
    let bridge = Arc::new(FakeBridge::new(fx.clean_frame()));
    let store = fx.store();
    let (events_tx, _events) = super::event_channel();
    let mut scheduler = Scheduler::new(
        Arc::clone(&bridge),
        Arc::new(fx.settings.clone()),
        store,
        events_tx,
    );

    scheduler.set_task(DEVICE, TaskKind::Build, true).await;
    scheduler.resume(DEVICE).await;
    assert_eq!(scheduler.status(DEVICE).await, RunnerStatus::Active);

    let probe = Arc::clone(&bridge);
    eventually(move || probe.captures() >= 2).await;

    scheduler.pause(DEVICE).await;
    assert_eq!(scheduler.status(DEVICE).await, RunnerStatus::Paused);

    // Let any in-flight iteration drain, then confirm silence.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let captures = bridge.captures();
    let taps = bridge.taps().len();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(bridge.captures(), captures, "no capture after pause");
    assert_eq!(bridge.taps().len(), taps, "no tap after pause");
}

#[tokio::test(start_paused = true)]
async fn scheduler_status_follows_the_lifecycle() {
    let fx = Fixture::new();
    let bridge = Arc::new(FakeBridge::new(fx.clean_frame()));
    let store = fx.store();
    let (events_tx, _events) = super::event_channel();
    let mut scheduler = Scheduler::new(
        Arc::clone(&bridge),
        Arc::new(fx.settings.clone()),
        store,
        events_tx,
    );

    assert_eq!(scheduler.status(DEVICE).await, RunnerStatus::Idle);

    // Devices start paused, so enabling a task alone does not start a loop.
    scheduler.set_task(DEVICE, TaskKind::Build, true).await;
    assert_eq!(scheduler.status(DEVICE).await, RunnerStatus::Paused);
    assert_eq!(bridge.captures(), 0);

    scheduler.resume(DEVICE).await;
    assert_eq!(scheduler.status(DEVICE).await, RunnerStatus::Active);

    // Disabling the last task lets the runner exit by itself.
    scheduler.set_task(DEVICE, TaskKind::Build, false).await;
    eventually_status(&mut scheduler, RunnerStatus::Idle).await;
}

async fn eventually_status<B: DeviceBridge + 'static>(
    scheduler: &mut Scheduler<B>,
    wanted: RunnerStatus,
) {
    for _ in 0..2000 {
        if scheduler.status(DEVICE).await == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("status never became {wanted:?}");
}

#[tokio::test(start_paused = true)]
async fn list_devices_filters_loopback_entries() {
    struct TwoDevices;
    impl DeviceBridge for TwoDevices {
        async fn list_devices(&self) -> AdbResult<Vec<Device>> {
            Ok(vec![
                Device {
                    name: "emulator-5554".to_string(),
                    transport_id: Some("1".to_string()),
                },
                Device {
                    name: "127.0.0.1:21503".to_string(),
                    transport_id: Some("2".to_string()),
                },
            ])
        }
        async fn capture_bytes(&self, _device: &str) -> AdbResult<Vec<u8>> {
            unimplemented!()
        }
        async fn tap(&self, _device: &str, _x: u32, _y: u32) -> AdbResult<()> {
            unimplemented!()
        }
    }

    let fx = Fixture::new();
    let (events_tx, _events) = super::event_channel();
    let scheduler = Scheduler::new(
        Arc::new(TwoDevices),
        Arc::new(fx.settings.clone()),
        fx.store(),
        events_tx,
    );

    let devices = scheduler.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "emulator-5554");
}
