use crate::model::ResourceKind;

/// Failures surfaced by the browser core. None of these abort the process.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Kubernetes client is not initialized")]
    ClientUninitialized,

    #[error("no namespace selected")]
    NoNamespaceSelected,

    #[error("unsupported resource kind: {0}")]
    UnsupportedResourceKind(String),

    #[error("{action} failed: {cause:#}")]
    Api {
        action: String,
        cause: anyhow::Error,
    },

    #[error("{kind} {name} not found")]
    ResourceNotFound { kind: ResourceKind, name: String },

    #[error("Error opening log stream: {0:#}")]
    StreamOpen(anyhow::Error),

    #[error("Error reading logs: {0}")]
    StreamRead(std::io::Error),
}

impl BrowserError {
    pub fn api(action: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::Api {
            action: action.into(),
            cause,
        }
    }

    /// Single-line form for the status bar.
    pub fn status_line(&self) -> String {
        self.to_string()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
