use k8s_openapi::api::core::v1::NodeCondition;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::error::BrowserError;
use crate::gateway::ClusterGateway;
use crate::model::{ResourceKind, ResourceObject, ResourceScope, ResourceTable};

/// Produces the one-line summary for a row. `None` when handed another kind.
pub type Summarizer = fn(&ResourceObject) -> Option<String>;

#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub display_name: &'static str,
    pub scope: ResourceScope,
    pub summarize: Summarizer,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    entries: HashMap<ResourceKind, CatalogEntry>,
    order: Vec<ResourceKind>,
    aliases: HashMap<String, ResourceKind>,
}

impl ResourceCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        catalog.register(ResourceKind::Pod, pod_summary);
        catalog.register(ResourceKind::Deployment, deployment_summary);
        catalog.register(ResourceKind::ReplicaSet, replica_set_summary);
        catalog.register(ResourceKind::StatefulSet, stateful_set_summary);
        catalog.register(ResourceKind::DaemonSet, daemon_set_summary);
        catalog.register(ResourceKind::Job, job_summary);
        catalog.register(ResourceKind::CronJob, cron_job_summary);
        catalog.register(ResourceKind::Service, service_summary);
        catalog.register(ResourceKind::Ingress, ingress_summary);
        catalog.register(ResourceKind::ConfigMap, config_map_summary);
        catalog.register(ResourceKind::Secret, secret_summary);
        catalog.register(ResourceKind::PersistentVolumeClaim, pvc_summary);
        catalog.register(ResourceKind::PersistentVolume, pv_summary);
        catalog.register(ResourceKind::ServiceAccount, service_account_summary);
        catalog.register(ResourceKind::Role, role_summary);
        catalog.register(ResourceKind::RoleBinding, role_binding_summary);
        catalog.register(ResourceKind::ClusterRole, cluster_role_summary);
        catalog.register(ResourceKind::ClusterRoleBinding, cluster_role_binding_summary);
        catalog.register(ResourceKind::NetworkPolicy, network_policy_summary);
        catalog.register(ResourceKind::Endpoint, endpoints_summary);
        catalog.register(ResourceKind::HorizontalPodAutoscaler, hpa_summary);
        catalog.register(ResourceKind::LimitRange, limit_range_summary);
        catalog.register(ResourceKind::ResourceQuota, resource_quota_summary);
        catalog.register(ResourceKind::Node, node_summary);
        catalog.register(ResourceKind::Namespace, namespace_summary);
        catalog
    }

    /// Re-registering a kind replaces its summarizer but keeps its position.
    pub fn register(&mut self, kind: ResourceKind, summarize: Summarizer) {
        let entry = CatalogEntry {
            display_name: kind.title(),
            scope: kind.scope(),
            summarize,
        };
        if self.entries.insert(kind, entry).is_none() {
            self.order.push(kind);
        }
    }

    pub fn kinds(&self) -> &[ResourceKind] {
        &self.order
    }

    pub fn entry(&self, kind: ResourceKind) -> Result<&CatalogEntry, BrowserError> {
        self.entries
            .get(&kind)
            .ok_or_else(|| BrowserError::UnsupportedResourceKind(kind.title().to_string()))
    }

    /// Maps an extra token onto the kind `target` resolves to.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<ResourceKind, BrowserError> {
        let alias = alias.trim().to_ascii_lowercase();
        if alias.is_empty() {
            return Err(BrowserError::UnsupportedResourceKind(target.trim().to_string()));
        }
        let kind = self.resolve_token(target)?;
        self.aliases.insert(alias, kind);
        Ok(kind)
    }

    pub fn resolve_token(&self, token: &str) -> Result<ResourceKind, BrowserError> {
        self.aliases
            .get(&token.trim().to_ascii_lowercase())
            .copied()
            .or_else(|| ResourceKind::from_token(token))
            .filter(|kind| self.entries.contains_key(kind))
            .ok_or_else(|| BrowserError::UnsupportedResourceKind(token.trim().to_string()))
    }

    /// Lists every object of `kind`, keeping the order the API returned.
    pub async fn load(
        &self,
        gateway: Option<&dyn ClusterGateway>,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<ResourceTable, BrowserError> {
        let gateway = gateway.ok_or(BrowserError::ClientUninitialized)?;
        let entry = self.entry(kind)?;
        let namespace = scoped_namespace(entry.scope, namespace)?;

        let objects = gateway.list(kind, namespace).await.map_err(|cause| {
            BrowserError::api(format!("list {}", entry.display_name), cause)
        })?;

        let mut table = ResourceTable::new(kind, namespace.unwrap_or_default());
        for object in objects {
            let summary = (entry.summarize)(&object).unwrap_or_default();
            table.push(summary, object);
        }
        debug!(kind = %kind, namespace = ?namespace, rows = table.len(), "resources loaded");
        Ok(table)
    }

    /// Fetches a single object by name.
    pub async fn fetch(
        &self,
        gateway: Option<&dyn ClusterGateway>,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceObject, BrowserError> {
        let gateway = gateway.ok_or(BrowserError::ClientUninitialized)?;
        let entry = self.entry(kind)?;
        let namespace = scoped_namespace(entry.scope, namespace)?;

        gateway
            .get(kind, namespace, name)
            .await
            .map_err(|cause| BrowserError::api(format!("get {kind} {name}"), cause))?
            .ok_or_else(|| BrowserError::ResourceNotFound {
                kind,
                name: name.to_string(),
            })
    }

    pub async fn remove(
        &self,
        gateway: Option<&dyn ClusterGateway>,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), BrowserError> {
        let gateway = gateway.ok_or(BrowserError::ClientUninitialized)?;
        let entry = self.entry(kind)?;
        let namespace = scoped_namespace(entry.scope, namespace)?;

        gateway
            .delete(kind, namespace, name)
            .await
            .map_err(|cause| BrowserError::api(format!("delete {kind} {name}"), cause))?;
        info!(kind = %kind, namespace = ?namespace, name, "resource deleted");
        Ok(())
    }
}

fn scoped_namespace(scope: ResourceScope, namespace: &str) -> Result<Option<&str>, BrowserError> {
    match scope {
        ResourceScope::Namespaced => {
            let namespace = namespace.trim();
            if namespace.is_empty() {
                return Err(BrowserError::NoNamespaceSelected);
            }
            Ok(Some(namespace))
        }
        ResourceScope::Cluster => Ok(None),
    }
}

fn ratio(ready: i32, desired: i32) -> String {
    format!("{ready}/{desired}")
}

fn storage(capacity: Option<&BTreeMap<String, Quantity>>) -> String {
    capacity
        .and_then(|capacity| capacity.get("storage"))
        .map(|quantity| quantity.0.clone())
        .unwrap_or_else(|| "0".to_string())
}

pub(crate) fn node_ready(conditions: Option<&Vec<NodeCondition>>) -> bool {
    conditions
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|condition| condition.type_ == "Ready")
        })
        .is_none_or(|condition| condition.status == "True")
}

fn namespace_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Namespace(namespace) = object else {
        return None;
    };
    Some(
        namespace
            .status
            .as_ref()
            .and_then(|status| status.phase.clone())
            .unwrap_or_else(|| "Active".to_string()),
    )
}

fn pod_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Pod(pod) = object else {
        return None;
    };
    let status = pod.status.as_ref();
    let phase = status
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let total = pod
        .spec
        .as_ref()
        .map(|spec| spec.containers.len())
        .unwrap_or(0);
    let ready = status
        .and_then(|status| status.container_statuses.as_ref())
        .map(|statuses| statuses.iter().filter(|status| status.ready).count())
        .unwrap_or(0);
    Some(format!("{ready}/{total} {phase}"))
}

fn deployment_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Deployment(deployment) = object else {
        return None;
    };
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = deployment
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    Some(ratio(ready, desired))
}

fn replica_set_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::ReplicaSet(replica_set) = object else {
        return None;
    };
    let desired = replica_set
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = replica_set
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    Some(ratio(ready, desired))
}

fn stateful_set_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::StatefulSet(stateful_set) = object else {
        return None;
    };
    let desired = stateful_set
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = stateful_set
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    Some(ratio(ready, desired))
}

fn daemon_set_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::DaemonSet(daemon_set) = object else {
        return None;
    };
    let (ready, desired) = daemon_set
        .status
        .as_ref()
        .map(|status| (status.number_ready, status.desired_number_scheduled))
        .unwrap_or((0, 0));
    Some(ratio(ready, desired))
}

fn job_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Job(job) = object else {
        return None;
    };
    let completions = job
        .spec
        .as_ref()
        .and_then(|spec| spec.completions)
        .unwrap_or(1);
    let succeeded = job
        .status
        .as_ref()
        .and_then(|status| status.succeeded)
        .unwrap_or(0);
    Some(ratio(succeeded, completions))
}

fn cron_job_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::CronJob(cron_job) = object else {
        return None;
    };
    Some(
        cron_job
            .spec
            .as_ref()
            .map(|spec| spec.schedule.clone())
            .unwrap_or_default(),
    )
}

fn service_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Service(service) = object else {
        return None;
    };
    let spec = service.spec.as_ref();
    let service_type = spec
        .and_then(|spec| spec.type_.clone())
        .unwrap_or_else(|| "ClusterIP".to_string());
    let cluster_ip = spec
        .and_then(|spec| spec.cluster_ip.clone())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "None".to_string());
    Some(format!("{service_type} {cluster_ip}"))
}

fn config_map_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::ConfigMap(config_map) = object else {
        return None;
    };
    let keys = config_map.data.as_ref().map(BTreeMap::len).unwrap_or(0)
        + config_map
            .binary_data
            .as_ref()
            .map(BTreeMap::len)
            .unwrap_or(0);
    Some(format!("{keys} keys"))
}

fn secret_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Secret(secret) = object else {
        return None;
    };
    let secret_type = secret.type_.as_deref().unwrap_or("Opaque");
    let keys = secret.data.as_ref().map(BTreeMap::len).unwrap_or(0);
    Some(format!("{secret_type} {keys} keys"))
}

fn ingress_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Ingress(ingress) = object else {
        return None;
    };
    let hosts = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_ref())
        .map(|rules| {
            rules
                .iter()
                .filter_map(|rule| rule.host.clone())
                .filter(|host| !host.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if hosts.is_empty() {
        return Some("No hosts".to_string());
    }
    Some(hosts.join(", "))
}

fn network_policy_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::NetworkPolicy(policy) = object else {
        return None;
    };
    Some(
        policy
            .spec
            .as_ref()
            .and_then(|spec| spec.policy_types.as_ref())
            .map(|types| types.join(","))
            .unwrap_or_default(),
    )
}

fn pvc_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::PersistentVolumeClaim(claim) = object else {
        return None;
    };
    let status = claim.status.as_ref();
    let phase = status
        .and_then(|status| status.phase.clone())
        .unwrap_or_default();
    let capacity = storage(status.and_then(|status| status.capacity.as_ref()));
    Some(format!("{phase} {capacity}"))
}

fn pv_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::PersistentVolume(volume) = object else {
        return None;
    };
    let phase = volume
        .status
        .as_ref()
        .and_then(|status| status.phase.clone())
        .unwrap_or_default();
    let capacity = storage(
        volume
            .spec
            .as_ref()
            .and_then(|spec| spec.capacity.as_ref()),
    );
    Some(format!("{phase} {capacity}"))
}

fn service_account_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::ServiceAccount(account) = object else {
        return None;
    };
    let secrets = account.secrets.as_ref().map(Vec::len).unwrap_or(0);
    Some(format!("{secrets} secrets"))
}

fn role_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Role(role) = object else {
        return None;
    };
    let rules = role.rules.as_ref().map(Vec::len).unwrap_or(0);
    Some(format!("{rules} rules"))
}

fn cluster_role_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::ClusterRole(role) = object else {
        return None;
    };
    let rules = role.rules.as_ref().map(Vec::len).unwrap_or(0);
    Some(format!("{rules} rules"))
}

fn role_binding_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::RoleBinding(binding) = object else {
        return None;
    };
    let subjects = binding.subjects.as_ref().map(Vec::len).unwrap_or(0);
    Some(format!("{subjects} subjects"))
}

fn cluster_role_binding_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::ClusterRoleBinding(binding) = object else {
        return None;
    };
    let subjects = binding.subjects.as_ref().map(Vec::len).unwrap_or(0);
    Some(format!("{subjects} subjects"))
}

fn endpoints_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Endpoint(endpoints) = object else {
        return None;
    };
    let addresses = endpoints
        .subsets
        .as_ref()
        .map(|subsets| {
            subsets
                .iter()
                .map(|subset| subset.addresses.as_ref().map(Vec::len).unwrap_or(0))
                .sum::<usize>()
        })
        .unwrap_or(0);
    Some(format!("{addresses} addresses"))
}

fn hpa_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::HorizontalPodAutoscaler(hpa) = object else {
        return None;
    };
    let current = hpa
        .status
        .as_ref()
        .and_then(|status| status.current_replicas)
        .unwrap_or(0);
    let spec = hpa.spec.as_ref();
    let min = spec.and_then(|spec| spec.min_replicas).unwrap_or(0);
    let max = spec.map(|spec| spec.max_replicas).unwrap_or(0);
    Some(format!("{current}/{min}-{max}"))
}

fn limit_range_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::LimitRange(limit_range) = object else {
        return None;
    };
    let limits = limit_range
        .spec
        .as_ref()
        .map(|spec| spec.limits.len())
        .unwrap_or(0);
    Some(format!("{limits} limits"))
}

fn resource_quota_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::ResourceQuota(quota) = object else {
        return None;
    };
    let hard = quota
        .spec
        .as_ref()
        .and_then(|spec| spec.hard.as_ref())
        .map(BTreeMap::len)
        .unwrap_or(0);
    Some(format!("{hard} hard limits"))
}

fn node_summary(object: &ResourceObject) -> Option<String> {
    let ResourceObject::Node(node) = object else {
        return None;
    };
    let status = node.status.as_ref();
    let kubelet = status
        .and_then(|status| status.node_info.as_ref())
        .map(|info| info.kubelet_version.clone())
        .unwrap_or_default();
    let ready = if node_ready(status.and_then(|status| status.conditions.as_ref())) {
        "Ready"
    } else {
        "NotReady"
    };
    Some(format!("{kubelet} {ready}"))
}
