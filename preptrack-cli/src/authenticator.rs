use std::process::Stdio;

use async_trait::async_trait;
use preptrack::{ClientError, PlatformAuthenticator};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const CEREMONY_ENV: &str = "PREPTRACK_CEREMONY";

/// Runs passkey ceremonies through an external helper program.
///
/// The helper gets the WebAuthn options as JSON on stdin and
/// `PREPTRACK_CEREMONY=get|create` in its environment, and prints the
/// resulting credential as JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandAuthenticator {
    program: String,
    args: Vec<String>,
}

impl CommandAuthenticator {
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    async fn run(
        &self,
        ceremony: &str,
        options: &serde_json::Value,
    ) -> preptrack::Result<serde_json::Value> {
        let input = serde_json::to_vec(options).map_err(|e| ClientError::authenticator(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(CEREMONY_ENV, ceremony)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ClientError::authenticator(format!("cannot start `{}`: {}", self.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .await
                .map_err(|e| ClientError::authenticator(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ClientError::authenticator(e.to_string()))?;
        if !output.status.success() {
            return Err(ClientError::authenticator(format!(
                "`{}` exited with {}",
                self.program, output.status
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ClientError::authenticator(format!("invalid credential JSON: {}", e)))
    }
}

#[async_trait]
impl PlatformAuthenticator for CommandAuthenticator {
    async fn authenticate(&self, options: &serde_json::Value) -> preptrack::Result<serde_json::Value> {
        self.run("get", options).await
    }

    async fn register(&self, options: &serde_json::Value) -> preptrack::Result<serde_json::Value> {
        self.run("create", options).await
    }
}
