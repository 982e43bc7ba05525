use std::path::PathBuf;
use std::process::ExitCode;

use touchview_core::message_log::{self, Severity};
use touchview_core::ViewerSettings;
use touchview_host_lib::{default_session, parse_session, run_session, ViewportBridge};
use touchview_renderer::headless::{HeadlessDisplay, RecordingEngine};

const USAGE: &str = "usage: touchview-host [--settings FILE] [--script FILE] [MODEL]";

#[derive(Debug, Default)]
struct Args {
    settings: Option<PathBuf>,
    script: Option<PathBuf>,
    model: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--settings" => {
                args.settings = Some(iter.next().ok_or("--settings needs a file")?.into());
            }
            "--script" => {
                args.script = Some(iter.next().ok_or("--script needs a file")?.into());
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ if args.model.is_none() && !arg.starts_with('-') => args.model = Some(arg),
            _ => return Err(format!("unexpected argument '{}'\n{}", arg, USAGE)),
        }
    }
    Ok(args)
}

fn run(args: Args) -> Result<(), String> {
    let settings = match &args.settings {
        Some(path) => ViewerSettings::load(path).map_err(|e| e.to_string())?,
        None => ViewerSettings::default(),
    };
    let steps = match &args.script {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
            parse_session(&json).map_err(|e| format!("Bad session script: {}", e))?
        }
        None => default_session(args.model.as_deref().unwrap_or("model.brep")),
    };

    let engine = RecordingEngine::new().with_transition_frames(12);
    let mut bridge = ViewportBridge::start(engine, HeadlessDisplay::phone(), &settings)
        .map_err(|e| e.to_string())?;

    run_session(&mut bridge, &steps);
    let stats = bridge.shutdown();
    let report = serde_json::to_string_pretty(&stats).map_err(|e| e.to_string())?;
    println!("{}", report);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    message_log::attach(Box::new(|severity: Severity, text: &str| println!("[{}] {}", severity, text)));

    let result = parse_args().and_then(run);

    message_log::detach();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}
