use serde_json::Value;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

const BIN: &str = env!("CARGO_BIN_EXE_feed-calc");

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn server_command() -> Command {
    let mut command = Command::new(BIN);
    command
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("PORT")
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

struct KillOnDrop(Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

async fn wait_for_health(port: u16) -> Option<Value> {
    let url = format!("http://127.0.0.1:{port}/health");
    for _ in 0..100 {
        if let Ok(response) = reqwest::get(&url).await {
            return response.json().await.ok();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    None
}

#[tokio::test]
async fn test_binds_the_port_from_environment() {
    let port = free_port();
    let _server = KillOnDrop(
        server_command()
            .env("PORT", port.to_string())
            .args(["--host", "127.0.0.1"])
            .spawn()
            .unwrap(),
    );

    let health = wait_for_health(port).await.expect("server never became healthy");
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["csv_loaded"], true);
    assert_eq!(health["workers"].as_array().unwrap().len(), 4);
}

#[test]
fn test_invalid_port_fails_to_start() {
    let status = server_command()
        .env("PORT", "not-a-port")
        .status()
        .unwrap();
    assert!(!status.success());

    let status = server_command().env("PORT", "0").status().unwrap();
    assert!(!status.success());
}

#[test]
fn test_missing_templates_fail_to_start() {
    let port = free_port();
    let status = server_command()
        .env("PORT", port.to_string())
        .args(["--host", "127.0.0.1", "--templates-dir", "no-such-templates"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_port_in_use_fails_to_start() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let status = server_command()
        .env("PORT", port.to_string())
        .args(["--host", "127.0.0.1"])
        .status()
        .unwrap();
    assert!(!status.success());
}
