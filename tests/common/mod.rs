use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Runner variables scrubbed from every child so the host CI cannot leak in.
const SCRUBBED_VARS: &[&str] = &[
    "RUNNER_ENVIRONMENT",
    "RUNNER_OS",
    "GITHUB_STATE",
    "INPUT_LEVEL",
    "ImageOS",
    "ImageVersion",
    "MDS_ROOT",
    "MDS_SPACE_PROBE",
    "MDS_USE_SUDO",
    "MDS_STATE_PREFIX",
    "MDS_ACTIVITY_LOG",
    "MDS_OUTPUT_FORMAT",
];

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_mds") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "mds.exe" } else { "mds" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve mds binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

/// Run the binary in a scrubbed environment plus `envs`. `HOME` points at an
/// empty scratch directory so no user config is picked up.
pub fn run_cli_case_with_env(case_name: &str, args: &[&str], envs: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("mds-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();
    let home = tempfile::tempdir().expect("create scratch home");

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("HOME", home.path())
        .env("RUST_BACKTRACE", "1");
    for name in SCRUBBED_VARS {
        command.env_remove(name);
    }
    for (name, _) in std::env::vars() {
        if name.starts_with("STATE_") {
            command.env_remove(name);
        }
    }
    for (name, value) in envs {
        command.env(name, value);
    }

    let output = command.output().expect("execute mds command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("envs={envs:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
