use std::future::Future;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("write message to {program}")]
    Write {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("wait for {program}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Status { program: String, status: ExitStatus },
}

/// Delivers a finished report to a recipient.
pub trait Notifier {
    fn send(
        &self,
        recipient: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Delivers reports through a mail(1) compatible program:
/// `<program> -s <subject> <recipient>` with the message body on stdin.
pub struct Mailer {
    program: String,
    subject: String,
}

impl Mailer {
    pub fn new(program: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            subject: subject.into(),
        }
    }
}

impl Notifier for Mailer {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), NotifyError> {
        let mut child = Command::new(&self.program)
            .arg("-s")
            .arg(&self.subject)
            .arg(recipient)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| NotifyError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(body.as_bytes())
                .await
                .map_err(|source| NotifyError::Write {
                    program: self.program.clone(),
                    source,
                })?;
            // closing stdin ends the message
            drop(stdin);
        }

        let status = child.wait().await.map_err(|source| NotifyError::Wait {
            program: self.program.clone(),
            source,
        })?;
        if !status.success() {
            return Err(NotifyError::Status {
                program: self.program.clone(),
                status,
            });
        }

        log::info!("Mailed report to {recipient}");
        Ok(())
    }
}
