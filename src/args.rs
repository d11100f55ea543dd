use crate::adb::BackendKind;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Mode {
    Run,
    ListDevices,
    Screenshot,
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub backend: BackendKind,
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn parse() -> Option<Self> {
        let args: Vec<String> = env::args().collect();

        let mut mode: Option<Mode> = None;
        let mut backend = BackendKind::Shell;
        let mut config: Option<PathBuf> = None;

        for arg in args.iter().skip(1) {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!(
                    "rok-auto v{} (build {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("APP_BUILD_YEAR")
                );
                return None;
            } else if arg == "--run" {
                mode = Some(Mode::Run);
            } else if arg == "--list-devices" || arg == "-l" {
                mode = Some(Mode::ListDevices);
            } else if arg == "--screenshot" || arg == "-s" {
                mode = Some(Mode::Screenshot);
            } else if let Some(rest) = arg.strip_prefix("--impl=") {
                backend = match rest {
                    "shell" => BackendKind::Shell,
                    "server" => BackendKind::Server,
                    other => {
                        eprintln!("❌ Unknown impl '{}', expected 'shell' or 'server'", other);
                        return None;
                    }
                };
            } else if let Some(rest) = arg.strip_prefix("--config=") {
                config = Some(PathBuf::from(rest));
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        Some(Args {
            mode: mode.unwrap_or(Mode::Run),
            backend,
            config,
        })
    }
}

fn print_help() {
    println!("🤖 Rise of Kingdoms Automation Tool");
    println!();
    println!("USAGE:");
    println!("    rok-auto [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)            Run automation for all resumable devices");
    println!("    --run                 Run automation for all resumable devices");
    println!("    --list-devices, -l    List connected devices and their automation status");
    println!("    --screenshot, -s      Capture the first device's screen to cli-screenshot.png");
    println!("    --impl=<shell|server> Select the ADB implementation (default: shell)");
    println!("                          The shell implementation requires the adb tool to be installed.");
    println!("    --config=PATH         Load settings from a JSON file");
    println!("    --help, -h            Show this help message");
    println!("    --version, -v         Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    rok-auto --list-devices");
    println!("    rok-auto --screenshot --impl=server");
    println!("    rok-auto --config=settings.json --run");
}
