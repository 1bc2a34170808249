use anyhow::{Context, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{DeleteParams, ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::io;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, oneshot};
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::gateway::{ClusterGateway, LogByteStream, LogRequest};
use crate::model::{ResourceKind, ResourceObject};

const LOG_CHUNK_BUFFER: usize = 64;

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    default_namespace: String,
}

#[derive(Debug, Clone, Copy)]
enum Operation<'a> {
    List,
    Get(&'a str),
    Delete(&'a str),
}

impl KubeGateway {
    pub async fn new() -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            Config::from_custom_kubeconfig(kubeconfig_value, &KubeConfigOptions::default())
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster = config.cluster_url.to_string();
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        let context = kubeconfig
            .and_then(|cfg| cfg.current_context)
            .unwrap_or_else(|| "in-cluster".to_string());

        info!(context = %context, cluster = %cluster, "kubernetes client ready");
        Ok(Self {
            client,
            context,
            cluster,
            default_namespace,
        })
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    async fn dispatch(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        operation: Operation<'_>,
    ) -> Result<Vec<ResourceObject>> {
        debug!(kind = %kind, namespace = ?namespace, operation = ?operation, "cluster request");
        match kind {
            ResourceKind::Namespace => {
                self.cluster_scoped(operation, ResourceObject::Namespace)
                    .await
            }
            ResourceKind::Pod => {
                self.namespaced(kind, namespace, operation, ResourceObject::Pod)
                    .await
            }
            ResourceKind::Deployment => {
                self.namespaced(kind, namespace, operation, ResourceObject::Deployment)
                    .await
            }
            ResourceKind::ReplicaSet => {
                self.namespaced(kind, namespace, operation, ResourceObject::ReplicaSet)
                    .await
            }
            ResourceKind::StatefulSet => {
                self.namespaced(kind, namespace, operation, ResourceObject::StatefulSet)
                    .await
            }
            ResourceKind::DaemonSet => {
                self.namespaced(kind, namespace, operation, ResourceObject::DaemonSet)
                    .await
            }
            ResourceKind::Job => {
                self.namespaced(kind, namespace, operation, ResourceObject::Job)
                    .await
            }
            ResourceKind::CronJob => {
                self.namespaced(kind, namespace, operation, ResourceObject::CronJob)
                    .await
            }
            ResourceKind::Service => {
                self.namespaced(kind, namespace, operation, ResourceObject::Service)
                    .await
            }
            ResourceKind::ConfigMap => {
                self.namespaced(kind, namespace, operation, ResourceObject::ConfigMap)
                    .await
            }
            ResourceKind::Secret => {
                self.namespaced(kind, namespace, operation, ResourceObject::Secret)
                    .await
            }
            ResourceKind::Ingress => {
                self.namespaced(kind, namespace, operation, ResourceObject::Ingress)
                    .await
            }
            ResourceKind::NetworkPolicy => {
                self.namespaced(kind, namespace, operation, ResourceObject::NetworkPolicy)
                    .await
            }
            ResourceKind::PersistentVolumeClaim => {
                self.namespaced(
                    kind,
                    namespace,
                    operation,
                    ResourceObject::PersistentVolumeClaim,
                )
                .await
            }
            ResourceKind::PersistentVolume => {
                self.cluster_scoped(operation, ResourceObject::PersistentVolume)
                    .await
            }
            ResourceKind::ServiceAccount => {
                self.namespaced(kind, namespace, operation, ResourceObject::ServiceAccount)
                    .await
            }
            ResourceKind::Role => {
                self.namespaced(kind, namespace, operation, ResourceObject::Role)
                    .await
            }
            ResourceKind::RoleBinding => {
                self.namespaced(kind, namespace, operation, ResourceObject::RoleBinding)
                    .await
            }
            ResourceKind::ClusterRole => {
                self.cluster_scoped(operation, ResourceObject::ClusterRole)
                    .await
            }
            ResourceKind::ClusterRoleBinding => {
                self.cluster_scoped(operation, ResourceObject::ClusterRoleBinding)
                    .await
            }
            ResourceKind::Endpoint => {
                self.namespaced(kind, namespace, operation, ResourceObject::Endpoint)
                    .await
            }
            ResourceKind::HorizontalPodAutoscaler => {
                self.namespaced(
                    kind,
                    namespace,
                    operation,
                    ResourceObject::HorizontalPodAutoscaler,
                )
                .await
            }
            ResourceKind::LimitRange => {
                self.namespaced(kind, namespace, operation, ResourceObject::LimitRange)
                    .await
            }
            ResourceKind::ResourceQuota => {
                self.namespaced(kind, namespace, operation, ResourceObject::ResourceQuota)
                    .await
            }
            ResourceKind::Node => {
                self.cluster_scoped(operation, ResourceObject::Node)
                    .await
            }
        }
    }

    async fn namespaced<K>(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        operation: Operation<'_>,
        wrap: fn(K) -> ResourceObject,
    ) -> Result<Vec<ResourceObject>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let namespace = required_namespace(kind, namespace)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        run_operation(api, operation, wrap).await
    }

    async fn cluster_scoped<K>(
        &self,
        operation: Operation<'_>,
        wrap: fn(K) -> ResourceObject,
    ) -> Result<Vec<ResourceObject>>
    where
        K: Resource<Scope = ClusterResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        run_operation(api, operation, wrap).await
    }
}

#[async_trait::async_trait]
impl ClusterGateway for KubeGateway {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<ResourceObject>> {
        self.dispatch(kind, namespace, Operation::List)
            .await
            .with_context(|| format!("failed to list {}", kind.title()))
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<ResourceObject>> {
        let found = self
            .dispatch(kind, namespace, Operation::Get(name))
            .await
            .with_context(|| format!("failed to get {kind} {name}"))?;
        Ok(found.into_iter().next())
    }

    async fn delete(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> Result<()> {
        self.dispatch(kind, namespace, Operation::Delete(name))
            .await
            .with_context(|| format!("failed to delete {kind} {name}"))?;
        info!(kind = %kind, namespace = ?namespace, name, "resource deleted");
        Ok(())
    }

    async fn open_pod_log_stream(&self, request: &LogRequest) -> Result<LogByteStream> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &request.namespace);
        let params = log_params(request);
        let pod = request.pod.clone();
        let target = format!("{}/{}/{}", request.namespace, request.pod, request.container);
        let (opened_tx, opened_rx) = oneshot::channel::<Result<()>>();
        let (chunk_tx, chunk_rx) = mpsc::channel::<io::Result<bytes::Bytes>>(LOG_CHUNK_BUFFER);

        // The reader borrows `pods`, so both live inside the pump task.
        tokio::spawn(async move {
            let reader = match pods.log_stream(&pod, &params).await {
                Ok(reader) => {
                    let _ = opened_tx.send(Ok(()));
                    reader
                }
                Err(error) => {
                    let _ = opened_tx.send(Err(error.into()));
                    return;
                }
            };
            pump_log_chunks(reader.compat(), chunk_tx, &target).await;
        });

        opened_rx
            .await
            .context("log stream task exited before the stream opened")?
            .with_context(|| {
                format!(
                    "failed to open logs for {}/{} container {}",
                    request.namespace, request.pod, request.container
                )
            })?;

        let stream = futures::stream::unfold(chunk_rx, |mut chunk_rx| async move {
            chunk_rx.recv().await.map(|chunk| (chunk, chunk_rx))
        });
        Ok(stream.boxed())
    }
}

async fn run_operation<K>(
    api: Api<K>,
    operation: Operation<'_>,
    wrap: fn(K) -> ResourceObject,
) -> Result<Vec<ResourceObject>>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    match operation {
        Operation::List => {
            let api = &api;
            let items = list_all_pages(|params| async move {
                let list = api.list(&params).await?;
                Ok::<_, anyhow::Error>((list.items, list.metadata.continue_))
            })
            .await?;
            Ok(items.into_iter().map(wrap).collect())
        }
        Operation::Get(name) => Ok(api.get_opt(name).await?.into_iter().map(wrap).collect()),
        Operation::Delete(name) => {
            let _ = api.delete(name, &DeleteParams::default()).await?;
            Ok(Vec::new())
        }
    }
}

/// Requests pages until the server stops handing out continue tokens.
async fn list_all_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(ListParams) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>)>>,
{
    let mut items = Vec::new();
    let mut params = list_params();
    loop {
        let (page, next) = fetch_page(params).await?;
        items.extend(page);
        match next.filter(|token| !token.is_empty()) {
            Some(token) => params = list_params().continue_token(&token),
            None => return Ok(items),
        }
    }
}

/// Forwards body chunks to the session. Returns once the receiver is dropped, even
/// while the body is idle, so a cancelled session releases its HTTP body.
async fn pump_log_chunks<R>(
    reader: R,
    chunk_tx: mpsc::Sender<io::Result<bytes::Bytes>>,
    target: &str,
) where
    R: AsyncRead + Unpin,
{
    let mut chunks = ReaderStream::new(reader);
    loop {
        let chunk = tokio::select! {
            _ = chunk_tx.closed() => {
                debug!(target = %target, "log stream receiver dropped");
                return;
            }
            chunk = chunks.next() => chunk,
        };
        let Some(chunk) = chunk else {
            debug!(target = %target, "log stream finished");
            return;
        };
        let failed = chunk.is_err();
        if chunk_tx.send(chunk).await.is_err() {
            debug!(target = %target, "log stream receiver dropped");
            return;
        }
        if failed {
            warn!(target = %target, "log stream read failed");
            return;
        }
    }
}

fn required_namespace(kind: ResourceKind, namespace: Option<&str>) -> Result<&str> {
    namespace
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .with_context(|| format!("namespace is required for {}", kind.title()))
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}

fn log_params(request: &LogRequest) -> LogParams {
    LogParams {
        container: Some(request.container.clone()),
        follow: request.follow,
        tail_lines: Some(request.tail_lines),
        ..LogParams::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{list_all_pages, list_params, log_params, pump_log_chunks, required_namespace};
    use crate::gateway::LogRequest;
    use crate::model::ResourceKind;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[test]
    fn list_pages_request_500_items() {
        assert_eq!(list_params().limit, Some(500));
    }

    #[test]
    fn log_params_follow_tail_of_container() {
        let request = LogRequest::follow_tail("default", "web-0", "app", 100);
        let params = log_params(&request);
        assert_eq!(params.container.as_deref(), Some("app"));
        assert!(params.follow);
        assert_eq!(params.tail_lines, Some(100));
        assert!(!params.previous);
    }

    #[test]
    fn namespaced_calls_reject_blank_namespace() {
        assert!(required_namespace(ResourceKind::Pod, None).is_err());
        assert!(required_namespace(ResourceKind::Pod, Some("  ")).is_err());
        assert_eq!(
            required_namespace(ResourceKind::Pod, Some("default")).ok(),
            Some("default")
        );
    }

    #[tokio::test]
    async fn list_follows_continue_tokens_until_exhausted() {
        let mut requested = Vec::new();
        let names = list_all_pages(|params| {
            requested.push((params.limit, params.continue_token.clone()));
            let page = match params.continue_token.as_deref() {
                None => (vec!["cm-a"], Some("page2".to_string())),
                Some("page2") => (vec!["cm-b"], Some(String::new())),
                Some(other) => panic!("unexpected continue token {other}"),
            };
            async move { Ok::<_, anyhow::Error>(page) }
        })
        .await
        .unwrap();

        assert_eq!(names, vec!["cm-a", "cm-b"]);
        assert_eq!(
            requested,
            vec![(Some(500), None), (Some(500), Some("page2".to_string()))]
        );
    }

    #[tokio::test]
    async fn list_page_failure_is_returned() {
        let result = list_all_pages(|params| async move {
            match params.continue_token {
                None => Ok((vec![1], Some("next".to_string()))),
                Some(_) => Err(anyhow::anyhow!("expired continue token")),
            }
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dropping_the_receiver_releases_an_idle_log_body() {
        let (mut body, reader) = tokio::io::duplex(64);
        let (chunk_tx, mut chunk_rx) = mpsc::channel(4);
        let pump = tokio::spawn(async move {
            pump_log_chunks(reader, chunk_tx, "default/web-0/app").await;
        });

        body.write_all(b"hello\n").await.unwrap();
        let first = chunk_rx.recv().await.unwrap().unwrap();
        assert_eq!(&first[..], b"hello\n");

        drop(chunk_rx);
        timeout(Duration::from_secs(1), pump)
            .await
            .expect("pump stops without further body traffic")
            .unwrap();
        assert!(body.write_all(b"more\n").await.is_err());
    }

    #[tokio::test]
    async fn finished_body_ends_the_chunk_stream() {
        let (mut body, reader) = tokio::io::duplex(64);
        let (chunk_tx, mut chunk_rx) = mpsc::channel(4);
        let pump = tokio::spawn(async move {
            pump_log_chunks(reader, chunk_tx, "default/web-0/app").await;
        });

        body.write_all(b"bye\n").await.unwrap();
        drop(body);
        assert_eq!(&chunk_rx.recv().await.unwrap().unwrap()[..], b"bye\n");
        assert!(chunk_rx.recv().await.is_none());
        pump.await.unwrap();
    }
}
