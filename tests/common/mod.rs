#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

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
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_rcv") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "rcv.exe" } else { "rcv" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve rcv binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

/// Run the binary with the activity log disabled and `HOME` pointed at a
/// scratch directory unless `envs` says otherwise.
pub fn run_cli_case_with_env(case_name: &str, args: &[&str], envs: &[(&str, &str)]) -> CmdResult {
    run_cli_command(case_name, args, envs, &[])
}

/// Like [`run_cli_case`], but with the named variables removed from the environment.
pub fn run_cli_case_without_env(case_name: &str, args: &[&str], unset: &[&str]) -> CmdResult {
    run_cli_command(case_name, args, &[], unset)
}

fn run_cli_command(
    case_name: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    unset: &[&str],
) -> CmdResult {
    let root = std::env::temp_dir().join("rcv-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();
    let scratch_home = root.join("home");

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("HOME", &scratch_home)
        .env("RCV_JSONL_ENABLED", "false")
        .env_remove("RCV_OUTPUT_FORMAT")
        .env("RUST_BACKTRACE", "1");
    for (name, value) in envs {
        command.env(name, value);
    }
    for name in unset {
        command.env_remove(name);
    }
    let output = command.output().expect("execute rcv command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("envs={envs:?} unset={unset:?}\n"));
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

/// Write a small well-formed jar.
pub fn write_jar(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create jar parent");
    }
    let file = fs::File::create(path).expect("create jar");
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.add_directory("META-INF/", options).expect("add dir");
    for (name, body) in [
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".as_slice()),
        ("org/example/App.class", &[0xca, 0xfe, 0xba, 0xbe]),
    ] {
        zip.start_file(name, options).expect("start entry");
        std::io::Write::write_all(&mut zip, body).expect("write entry");
    }
    zip.finish().expect("finish jar");
}

/// Write `<file>.sha1` with the file's real digest and return the sidecar path.
pub fn write_matching_sidecar(file: &Path) -> PathBuf {
    let bytes = fs::read(file).expect("read target");
    let digest = repo_cache_verifier::scanner::digest::Digest::of_bytes(&bytes);
    let sidecar = repo_cache_verifier::core::paths::sidecar_path_for(file);
    fs::write(&sidecar, format!("{digest}\n")).expect("write sidecar");
    sidecar
}

pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
