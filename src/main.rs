use rok_auto::adb::{AdbBackend, DeviceBridge};
use rok_auto::args::{Args, Mode};
use rok_auto::automation::{AutomationEvent, Scheduler, event_channel};
use rok_auto::config::Settings;
use rok_auto::state::StateStore;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let Some(args) = Args::parse() else {
        return ExitCode::SUCCESS;
    };

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };
    let problems = settings.validate();
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("❌ Invalid configuration: {problem}");
        }
        return ExitCode::FAILURE;
    }

    // Backend construction is the one fatal startup check: no adb binary or
    // no reachable server means nothing downstream can work.
    let backend =
        match AdbBackend::new(args.backend, &settings.adb_path, settings.adb_timeout()).await {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                eprintln!("❌ {e}");
                return ExitCode::FAILURE;
            }
        };

    match args.mode {
        Mode::Screenshot => screenshot(backend).await,
        Mode::ListDevices => list_devices(backend, settings).await,
        Mode::Run => run(backend, settings).await,
    }
}

async fn screenshot(backend: Arc<AdbBackend>) -> ExitCode {
    let devices = match backend.list_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            eprintln!("❌ List error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let Some(first) = devices.first() else {
        eprintln!("❌ No devices found");
        return ExitCode::FAILURE;
    };

    match backend.capture(&first.name).await {
        Ok(frame) => {
            if let Err(e) = tokio::fs::write("cli-screenshot.png", &frame.png).await {
                eprintln!("❌ Write failed: {e}");
                return ExitCode::FAILURE;
            }
            println!(
                "✅ {} {}x{} ({}ms) saved to cli-screenshot.png",
                first.name,
                frame.width(),
                frame.height(),
                frame.duration_ms
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Screenshot failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn list_devices(backend: Arc<AdbBackend>, settings: Settings) -> ExitCode {
    let store = match StateStore::open(&settings.state_file) {
        Ok(store) => Arc::new(tokio::sync::Mutex::new(store)),
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };
    let (events, _rx) = event_channel();
    let mut scheduler = Scheduler::new(backend, Arc::new(settings), store, events);

    match scheduler.list_devices().await {
        Ok(devices) if devices.is_empty() => {
            println!("No devices connected");
            ExitCode::SUCCESS
        }
        Ok(devices) => {
            for device in devices {
                let status = scheduler.status(&device.name).await;
                match device.transport_id {
                    Some(id) => println!("📱 {} (transport {id}) — {status:?}", device.name),
                    None => println!("📱 {} — {status:?}", device.name),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ List error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(backend: Arc<AdbBackend>, settings: Settings) -> ExitCode {
    let store = match StateStore::open(&settings.state_file) {
        Ok(store) => Arc::new(tokio::sync::Mutex::new(store)),
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };
    let (events, mut event_rx) = event_channel();
    let mut scheduler = Scheduler::new(backend, Arc::new(settings), store, events);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                AutomationEvent::FrameCaptured { device, png } => {
                    log::debug!("[{device}] frame captured ({} bytes)", png.len());
                }
                AutomationEvent::InterruptHandled { device, rule } => {
                    log::info!("[{device}] interrupt handled: {rule}");
                }
                AutomationEvent::TaskDispatched { device, task } => {
                    log::info!("[{device}] task dispatched: {task:?}");
                }
                AutomationEvent::IterationFailed { device, detail } => {
                    log::warn!("[{device}] iteration failed: {detail}");
                }
                AutomationEvent::RunnerStopped { device } => {
                    log::info!("[{device}] runner stopped");
                }
            }
        }
    });

    let resumable = scheduler.resumable_devices().await;
    if resumable.is_empty() {
        println!("⏸️  All known devices are paused or have no tasks enabled");
        println!("    Edit the state file or resume a device to start automation");
        return ExitCode::SUCCESS;
    }
    for device in &resumable {
        scheduler.resume(device).await;
    }
    println!("🚀 Automation running on {} device(s), Ctrl-C to stop", resumable.len());

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("❌ Failed to wait for Ctrl-C: {e}");
    }
    println!("🛑 Shutting down");
    scheduler.shutdown().await;
    ExitCode::SUCCESS
}
