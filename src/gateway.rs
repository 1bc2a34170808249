use crate::model::{ResourceKind, ResourceObject};
use anyhow::Result;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Raw log bytes as they arrive from the API server.
pub type LogByteStream = BoxStream<'static, std::io::Result<Bytes>>;

pub const DEFAULT_TAIL_LINES: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub tail_lines: i64,
    pub follow: bool,
}

impl LogRequest {
    pub fn follow_tail(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: impl Into<String>,
        tail_lines: i64,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            container: container.into(),
            tail_lines,
            follow: true,
        }
    }
}

/// Everything the browser asks of a cluster. Calls are keyed by kind tag.
#[async_trait::async_trait]
pub trait ClusterGateway: Send + Sync {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<ResourceObject>>;

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<ResourceObject>>;

    async fn delete(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> Result<()>;

    async fn open_pod_log_stream(&self, request: &LogRequest) -> Result<LogByteStream>;

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let namespaces = self.list(ResourceKind::Namespace, None).await?;
        Ok(namespaces
            .iter()
            .map(|namespace| namespace.name().to_string())
            .collect())
    }
}
