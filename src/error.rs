use thiserror::Error;

use crate::config::ConfigError;
use crate::notify::NotifyError;

/// Errors that abort a run. Per-domain probe failures never end up here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("no domains")]
    NoDomains,

    #[error("read domains")]
    ReadDomains(#[source] std::io::Error),

    #[error("config")]
    Config(#[from] ConfigError),

    #[error("build TLS connector")]
    Tls(#[from] native_tls::Error),

    #[error("mail report")]
    Notify(#[from] NotifyError),
}
