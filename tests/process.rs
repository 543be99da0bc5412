//! End-to-end tests against the compiled binary.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const BIN: &str = env!("CARGO_BIN_EXE_dice-academy");

fn academy() -> Command {
    let mut cmd = Command::new(BIN);
    cmd.env_remove("RUST_LOG")
        .env_remove("DICE_BIND_ADDRESS")
        .env_remove("DICE_LOG_LEVEL")
        .env_remove("DICE_PERSISTENCE_BACKEND")
        .env_remove("DICE_PERSISTENCE_PATH")
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn check_accepts_valid_config() {
    let file = config_file("[listener]\nbind_address = \"127.0.0.1:0\"\n");
    let status = academy()
        .arg("--config")
        .arg(file.path())
        .arg("--check")
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn invalid_config_exits_with_config_status() {
    let file = config_file("[persistence]\nbackend = \"file\"\n");
    let status = academy()
        .arg("--config")
        .arg(file.path())
        .arg("--check")
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(78));
}

#[test]
fn unreachable_persistence_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let file = config_file(
        "[listener]\nbind_address = \"127.0.0.1:0\"\n\n[persistence]\ncreate_if_missing = false\n",
    );
    let status = academy()
        .arg("--config")
        .arg(file.path())
        .env("DICE_PERSISTENCE_BACKEND", "file")
        .env("DICE_PERSISTENCE_PATH", dir.path().join("absent"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(69));
}

#[cfg(unix)]
#[test]
fn sigterm_stops_gracefully() {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let address = format!("127.0.0.1:{port}");

    let mut child = academy()
        .env("DICE_BIND_ADDRESS", &address)
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while TcpStream::connect(&address).is_err() {
        if let Some(status) = child.try_wait().unwrap() {
            panic!("exited before serving: {status}");
        }
        assert!(Instant::now() < deadline, "never started serving");
        std::thread::sleep(Duration::from_millis(50));
    }

    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let deadline = Instant::now() + Duration::from_secs(40);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("did not stop after SIGTERM");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert_eq!(status.code(), Some(0));
}
