use k8s_openapi::api::core::v1::{Container, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::jiff::Timestamp;
use std::collections::BTreeMap;

use crate::catalog::node_ready;
use crate::model::ResourceObject;

const VALUE_PREVIEW_CHARS: usize = 100;

struct Section {
    title: &'static str,
    lines: Vec<String>,
}

impl Section {
    fn new(title: &'static str, lines: Vec<String>) -> Self {
        Self { title, lines }
    }
}

#[derive(Default)]
struct Description {
    fields: Vec<(&'static str, String)>,
    sections: Vec<Section>,
}

impl Description {
    fn field(mut self, label: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((label, value.into()));
        self
    }

    fn section(mut self, title: &'static str, lines: Vec<String>) -> Self {
        self.sections.push(Section::new(title, lines));
        self
    }
}

/// Formats a fetched object as a plain multi-line block. Same input and `now`
/// always give the same text.
pub fn render(object: &ResourceObject, now: Timestamp) -> String {
    let metadata = object.metadata();
    let description = describe(object, now);

    let mut lines = vec![format!("{}: {}", object.kind().singular(), object.name())];
    if let Some(namespace) = object.namespace() {
        lines.push(format!("Namespace: {namespace}"));
    }
    for (label, value) in &description.fields {
        lines.push(format!("{label}: {value}"));
    }
    lines.push(format!(
        "Age: {}",
        format_age(metadata.creation_timestamp.as_ref(), now)
    ));

    let mut sections = description.sections;
    sections.push(Section::new("Labels", key_values(metadata.labels.as_ref())));
    sections.push(Section::new(
        "Annotations",
        key_values(metadata.annotations.as_ref()),
    ));
    for section in sections.into_iter().filter(|section| !section.lines.is_empty()) {
        lines.push(String::new());
        lines.push(format!("{}:", section.title));
        lines.extend(section.lines.into_iter().map(|line| format!("  {line}")));
    }

    lines.join("\n")
}

/// Largest whole unit among years, months, days, hours and minutes.
pub fn format_age(created: Option<&Time>, now: Timestamp) -> String {
    let Some(created) = created else {
        return "-".to_string();
    };
    let seconds = (now.as_second() - created.0.as_second()).max(0);
    let days = seconds / 86_400;
    if days > 365 {
        return format!("{}y", days / 365);
    }
    if days > 30 {
        return format!("{}mo", days / 30);
    }
    if days > 0 {
        return format!("{days}d");
    }
    let hours = seconds / 3_600;
    if hours > 0 {
        return format!("{hours}h");
    }
    format!("{}m", seconds / 60)
}

fn describe(object: &ResourceObject, now: Timestamp) -> Description {
    match object {
        ResourceObject::Namespace(namespace) => Description::default().field(
            "Status",
            namespace
                .status
                .as_ref()
                .and_then(|status| status.phase.clone())
                .unwrap_or_else(|| "Active".to_string()),
        ),
        ResourceObject::Pod(pod) => {
            let status = pod.status.as_ref();
            let statuses = status
                .and_then(|status| status.container_statuses.clone())
                .unwrap_or_default();
            let containers = pod
                .spec
                .as_ref()
                .map(|spec| {
                    spec.containers
                        .iter()
                        .map(|container| {
                            let mut line = container_line(container);
                            if let Some(state) =
                                statuses.iter().find(|state| state.name == container.name)
                            {
                                let ready = if state.ready { "ready" } else { "not ready" };
                                line.push_str(&format!(
                                    " {ready}, {} restarts",
                                    state.restart_count
                                ));
                            }
                            line
                        })
                        .collect()
                })
                .unwrap_or_default();
            Description::default()
                .field("Status", optional(status.and_then(|s| s.phase.clone())))
                .field(
                    "Node",
                    optional(pod.spec.as_ref().and_then(|spec| spec.node_name.clone())),
                )
                .field("IP", optional(status.and_then(|s| s.pod_ip.clone())))
                .section("Containers", containers)
        }
        ResourceObject::Deployment(deployment) => {
            let spec = deployment.spec.as_ref();
            let ready = deployment
                .status
                .as_ref()
                .and_then(|status| status.ready_replicas)
                .unwrap_or(0);
            let desired = spec.and_then(|spec| spec.replicas).unwrap_or(1);
            Description::default()
                .field("Status", format!("{ready}/{desired} ready"))
                .field(
                    "Strategy",
                    optional(
                        spec.and_then(|spec| spec.strategy.as_ref())
                            .and_then(|strategy| strategy.type_.clone()),
                    ),
                )
                .section("Containers", template_containers(spec.map(|s| &s.template)))
        }
        ResourceObject::ReplicaSet(replica_set) => {
            let spec = replica_set.spec.as_ref();
            let ready = replica_set
                .status
                .as_ref()
                .and_then(|status| status.ready_replicas)
                .unwrap_or(0);
            let desired = spec.and_then(|spec| spec.replicas).unwrap_or(1);
            Description::default()
                .field("Status", format!("{ready}/{desired} ready"))
                .section(
                    "Containers",
                    template_containers(spec.and_then(|spec| spec.template.as_ref())),
                )
        }
        ResourceObject::StatefulSet(stateful_set) => {
            let spec = stateful_set.spec.as_ref();
            let ready = stateful_set
                .status
                .as_ref()
                .and_then(|status| status.ready_replicas)
                .unwrap_or(0);
            let desired = spec.and_then(|spec| spec.replicas).unwrap_or(1);
            Description::default()
                .field("Status", format!("{ready}/{desired} ready"))
                .section("Containers", template_containers(spec.map(|s| &s.template)))
        }
        ResourceObject::DaemonSet(daemon_set) => {
            let (ready, desired) = daemon_set
                .status
                .as_ref()
                .map(|status| (status.number_ready, status.desired_number_scheduled))
                .unwrap_or((0, 0));
            Description::default()
                .field("Status", format!("{ready}/{desired} ready"))
                .section(
                    "Containers",
                    template_containers(daemon_set.spec.as_ref().map(|s| &s.template)),
                )
        }
        ResourceObject::Job(job) => {
            let spec = job.spec.as_ref();
            let status = job.status.as_ref();
            let completions = spec.and_then(|spec| spec.completions).unwrap_or(1);
            let succeeded = status.and_then(|status| status.succeeded).unwrap_or(0);
            Description::default()
                .field("Status", format!("{succeeded}/{completions} succeeded"))
                .field(
                    "Active",
                    status
                        .and_then(|status| status.active)
                        .unwrap_or(0)
                        .to_string(),
                )
                .field(
                    "Failed",
                    status
                        .and_then(|status| status.failed)
                        .unwrap_or(0)
                        .to_string(),
                )
                .section("Containers", template_containers(spec.map(|s| &s.template)))
        }
        ResourceObject::CronJob(cron_job) => {
            let spec = cron_job.spec.as_ref();
            let status = cron_job.status.as_ref();
            let last_schedule = status
                .and_then(|status| status.last_schedule_time.as_ref())
                .map(|time| format!("{} ago", format_age(Some(time), now)))
                .unwrap_or_else(|| "never".to_string());
            Description::default()
                .field("Schedule", optional(spec.map(|spec| spec.schedule.clone())))
                .field(
                    "Suspended",
                    spec.and_then(|spec| spec.suspend)
                        .unwrap_or(false)
                        .to_string(),
                )
                .field("Last Schedule", last_schedule)
                .field(
                    "Active Jobs",
                    status
                        .and_then(|status| status.active.as_ref())
                        .map(Vec::len)
                        .unwrap_or(0)
                        .to_string(),
                )
                .section(
                    "Containers",
                    template_containers(
                        spec.and_then(|spec| spec.job_template.spec.as_ref())
                            .map(|job| &job.template),
                    ),
                )
        }
        ResourceObject::Service(service) => {
            let spec = service.spec.as_ref();
            let ports = spec
                .and_then(|spec| spec.ports.as_ref())
                .map(|ports| {
                    ports
                        .iter()
                        .map(|port| {
                            let protocol = port.protocol.as_deref().unwrap_or("TCP");
                            let mut line = match port.node_port {
                                Some(node_port) => {
                                    format!("{}:{node_port}/{protocol}", port.port)
                                }
                                None => format!("{}/{protocol}", port.port),
                            };
                            if let Some(target) = &port.target_port {
                                line.push_str(&format!(" -> {}", int_or_string(target)));
                            }
                            line
                        })
                        .collect()
                })
                .unwrap_or_default();
            let load_balancer = service
                .status
                .as_ref()
                .and_then(|status| status.load_balancer.as_ref())
                .and_then(|lb| lb.ingress.as_ref())
                .map(|ingress| {
                    ingress
                        .iter()
                        .filter_map(|entry| entry.ip.clone().or_else(|| entry.hostname.clone()))
                        .collect()
                })
                .unwrap_or_default();
            Description::default()
                .field(
                    "Type",
                    spec.and_then(|spec| spec.type_.clone())
                        .unwrap_or_else(|| "ClusterIP".to_string()),
                )
                .field(
                    "ClusterIP",
                    spec.and_then(|spec| spec.cluster_ip.clone())
                        .filter(|ip| !ip.is_empty())
                        .unwrap_or_else(|| "None".to_string()),
                )
                .section("Ports", ports)
                .section("Selector", key_values(spec.and_then(|spec| spec.selector.as_ref())))
                .section("Load Balancer", load_balancer)
        }
        ResourceObject::ConfigMap(config_map) => {
            let data = config_map
                .data
                .as_ref()
                .map(|data| {
                    data.iter()
                        .map(|(key, value)| format!("{key}: {}", preview(value)))
                        .collect()
                })
                .unwrap_or_default();
            let binary = config_map
                .binary_data
                .as_ref()
                .map(|data| {
                    data.iter()
                        .map(|(key, value)| format!("{key}: {} bytes", value.0.len()))
                        .collect()
                })
                .unwrap_or_default();
            Description::default()
                .section("Data", data)
                .section("Binary Data", binary)
        }
        ResourceObject::Secret(secret) => {
            let data = secret
                .data
                .as_ref()
                .map(|data| {
                    data.iter()
                        .map(|(key, value)| format!("{key}: {} bytes (redacted)", value.0.len()))
                        .collect()
                })
                .unwrap_or_default();
            Description::default()
                .field("Type", secret.type_.as_deref().unwrap_or("Opaque"))
                .section("Data", data)
        }
        ResourceObject::Ingress(ingress) => {
            let spec = ingress.spec.as_ref();
            let mut rules = Vec::new();
            for rule in spec.and_then(|spec| spec.rules.as_ref()).into_iter().flatten() {
                rules.push(format!("Host: {}", rule.host.as_deref().unwrap_or("*")));
                for path in rule.http.iter().flat_map(|http| http.paths.iter()) {
                    let backend = path
                        .backend
                        .service
                        .as_ref()
                        .map(|service| {
                            let port = service
                                .port
                                .as_ref()
                                .and_then(|port| {
                                    port.number
                                        .map(|number| number.to_string())
                                        .or_else(|| port.name.clone())
                                })
                                .unwrap_or_else(|| "-".to_string());
                            format!("{}:{port}", service.name)
                        })
                        .unwrap_or_else(|| "-".to_string());
                    rules.push(format!(
                        "  Path: {} -> {backend}",
                        path.path.as_deref().unwrap_or("/")
                    ));
                }
            }
            let default_backend = spec
                .and_then(|spec| spec.default_backend.as_ref())
                .and_then(|backend| backend.service.as_ref())
                .map(|service| vec![format!("Service: {}", service.name)])
                .unwrap_or_default();
            let load_balancer = ingress
                .status
                .as_ref()
                .and_then(|status| status.load_balancer.as_ref())
                .and_then(|lb| lb.ingress.as_ref())
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| entry.ip.clone().or_else(|| entry.hostname.clone()))
                        .collect()
                })
                .unwrap_or_default();
            Description::default()
                .section("Rules", rules)
                .section("Default Backend", default_backend)
                .section("Load Balancer", load_balancer)
        }
        ResourceObject::NetworkPolicy(policy) => {
            let spec = policy.spec.as_ref();
            let count = |rules: Option<usize>| rules.unwrap_or(0).to_string();
            Description::default()
                .field(
                    "Policy Types",
                    optional(
                        spec.and_then(|spec| spec.policy_types.as_ref())
                            .map(|types| types.join(",")),
                    ),
                )
                .field(
                    "Ingress Rules",
                    count(spec.and_then(|spec| spec.ingress.as_ref()).map(Vec::len)),
                )
                .field(
                    "Egress Rules",
                    count(spec.and_then(|spec| spec.egress.as_ref()).map(Vec::len)),
                )
                .section(
                    "Pod Selector",
                    key_values(
                        spec.and_then(|spec| spec.pod_selector.as_ref())
                            .and_then(|selector| selector.match_labels.as_ref()),
                    ),
                )
        }
        ResourceObject::PersistentVolumeClaim(claim) => {
            let spec = claim.spec.as_ref();
            let status = claim.status.as_ref();
            Description::default()
                .field("Status", optional(status.and_then(|s| s.phase.clone())))
                .field(
                    "Volume",
                    optional(spec.and_then(|spec| spec.volume_name.clone())),
                )
                .field(
                    "Capacity",
                    quantity(status.and_then(|s| s.capacity.as_ref()), "storage"),
                )
                .field(
                    "Access Modes",
                    optional(
                        spec.and_then(|spec| spec.access_modes.as_ref())
                            .map(|modes| modes.join(",")),
                    ),
                )
                .field(
                    "Storage Class",
                    optional(spec.and_then(|spec| spec.storage_class_name.clone())),
                )
        }
        ResourceObject::PersistentVolume(volume) => {
            let spec = volume.spec.as_ref();
            let claim = spec
                .and_then(|spec| spec.claim_ref.as_ref())
                .map(|claim| {
                    format!(
                        "{}/{}",
                        claim.namespace.as_deref().unwrap_or("-"),
                        claim.name.as_deref().unwrap_or("-")
                    )
                });
            Description::default()
                .field(
                    "Status",
                    optional(volume.status.as_ref().and_then(|s| s.phase.clone())),
                )
                .field(
                    "Capacity",
                    quantity(spec.and_then(|spec| spec.capacity.as_ref()), "storage"),
                )
                .field(
                    "Reclaim Policy",
                    optional(spec.and_then(|spec| spec.persistent_volume_reclaim_policy.clone())),
                )
                .field("Claim", optional(claim))
                .field(
                    "Storage Class",
                    optional(spec.and_then(|spec| spec.storage_class_name.clone())),
                )
        }
        ResourceObject::ServiceAccount(account) => Description::default().section(
            "Secrets",
            account
                .secrets
                .iter()
                .flatten()
                .filter_map(|secret| secret.name.clone())
                .collect(),
        ),
        ResourceObject::Role(role) => {
            Description::default().section("Rules", rule_lines(role.rules.as_ref()))
        }
        ResourceObject::ClusterRole(role) => {
            Description::default().section("Rules", rule_lines(role.rules.as_ref()))
        }
        ResourceObject::RoleBinding(binding) => Description::default()
            .field(
                "Role",
                format!("{}/{}", binding.role_ref.kind, binding.role_ref.name),
            )
            .section("Subjects", subject_lines(binding.subjects.as_ref())),
        ResourceObject::ClusterRoleBinding(binding) => Description::default()
            .field(
                "Role",
                format!("{}/{}", binding.role_ref.kind, binding.role_ref.name),
            )
            .section("Subjects", subject_lines(binding.subjects.as_ref())),
        ResourceObject::Endpoint(endpoints) => {
            let mut addresses = Vec::new();
            let mut ports = Vec::new();
            for subset in endpoints.subsets.iter().flatten() {
                for address in subset.addresses.iter().flatten() {
                    match &address.hostname {
                        Some(hostname) => addresses.push(format!("{} ({hostname})", address.ip)),
                        None => addresses.push(address.ip.clone()),
                    }
                }
                for port in subset.ports.iter().flatten() {
                    ports.push(format!(
                        "{}/{}",
                        port.port,
                        port.protocol.as_deref().unwrap_or("TCP")
                    ));
                }
            }
            Description::default()
                .section("Addresses", addresses)
                .section("Ports", ports)
        }
        ResourceObject::HorizontalPodAutoscaler(hpa) => {
            let spec = hpa.spec.as_ref();
            let status = hpa.status.as_ref();
            let current = status.and_then(|s| s.current_replicas).unwrap_or(0);
            let min = spec.and_then(|spec| spec.min_replicas).unwrap_or(0);
            let max = spec.map(|spec| spec.max_replicas).unwrap_or(0);
            Description::default()
                .field(
                    "Target",
                    optional(spec.map(|spec| {
                        format!(
                            "{}/{}",
                            spec.scale_target_ref.kind, spec.scale_target_ref.name
                        )
                    })),
                )
                .field("Replicas", format!("{current} (min {min}, max {max})"))
                .field(
                    "Desired",
                    status
                        .map(|status| status.desired_replicas)
                        .unwrap_or(0)
                        .to_string(),
                )
        }
        ResourceObject::LimitRange(limit_range) => {
            let mut limits = Vec::new();
            for item in limit_range.spec.iter().flat_map(|spec| spec.limits.iter()) {
                limits.push(item.type_.clone());
                for (label, values) in [
                    ("min", item.min.as_ref()),
                    ("max", item.max.as_ref()),
                    ("default", item.default.as_ref()),
                    ("defaultRequest", item.default_request.as_ref()),
                ] {
                    for (resource, value) in values.into_iter().flatten() {
                        limits.push(format!("  {label} {resource}: {}", value.0));
                    }
                }
            }
            Description::default().section("Limits", limits)
        }
        ResourceObject::ResourceQuota(quota) => {
            let status = quota.status.as_ref();
            let used = status.and_then(|status| status.used.as_ref());
            let usage = status
                .and_then(|status| status.hard.as_ref())
                .or_else(|| quota.spec.as_ref().and_then(|spec| spec.hard.as_ref()))
                .map(|hard| {
                    hard.iter()
                        .map(|(resource, limit)| {
                            format!("{resource}: {}/{}", quantity(used, resource), limit.0)
                        })
                        .collect()
                })
                .unwrap_or_default();
            Description::default().section("Usage", usage)
        }
        ResourceObject::Node(node) => {
            let status = node.status.as_ref();
            let info = status.and_then(|status| status.node_info.as_ref());
            let ready = if node_ready(status.and_then(|status| status.conditions.as_ref())) {
                "Ready"
            } else {
                "NotReady"
            };
            let addresses = status
                .and_then(|status| status.addresses.as_ref())
                .map(|addresses| {
                    addresses
                        .iter()
                        .map(|address| format!("{}: {}", address.type_, address.address))
                        .collect()
                })
                .unwrap_or_default();
            Description::default()
                .field("Status", ready)
                .field("OS", optional(info.map(|info| info.os_image.clone())))
                .field("Kernel", optional(info.map(|info| info.kernel_version.clone())))
                .field("Kubelet", optional(info.map(|info| info.kubelet_version.clone())))
                .field(
                    "Container Runtime",
                    optional(info.map(|info| info.container_runtime_version.clone())),
                )
                .section(
                    "Capacity",
                    quantities(status.and_then(|status| status.capacity.as_ref())),
                )
                .section(
                    "Allocatable",
                    quantities(status.and_then(|status| status.allocatable.as_ref())),
                )
                .section("Addresses", addresses)
        }
    }
}

fn optional(value: Option<String>) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "-".to_string())
}

fn container_line(container: &Container) -> String {
    let image = container.image.as_deref().unwrap_or("-");
    let ports = container
        .ports
        .iter()
        .flatten()
        .map(|port| {
            format!(
                "{}/{}",
                port.container_port,
                port.protocol.as_deref().unwrap_or("TCP")
            )
        })
        .collect::<Vec<_>>();
    if ports.is_empty() {
        format!("{} ({image})", container.name)
    } else {
        format!("{} ({image}) ports {}", container.name, ports.join(","))
    }
}

fn template_containers(template: Option<&PodTemplateSpec>) -> Vec<String> {
    template
        .and_then(|template| template.spec.as_ref())
        .map(|spec| spec.containers.iter().map(container_line).collect())
        .unwrap_or_default()
}

fn rule_lines(rules: Option<&Vec<k8s_openapi::api::rbac::v1::PolicyRule>>) -> Vec<String> {
    rules
        .into_iter()
        .flatten()
        .map(|rule| {
            let resources = rule
                .resources
                .as_ref()
                .filter(|resources| !resources.is_empty())
                .map(|resources| resources.join(","))
                .or_else(|| rule.non_resource_urls.as_ref().map(|urls| urls.join(",")))
                .unwrap_or_else(|| "*".to_string());
            let groups = rule
                .api_groups
                .as_ref()
                .map(|groups| {
                    groups
                        .iter()
                        .map(|group| if group.is_empty() { "core" } else { group.as_str() })
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_else(|| "core".to_string());
            format!("{} on {resources} ({groups})", rule.verbs.join(","))
        })
        .collect()
}

fn subject_lines(subjects: Option<&Vec<k8s_openapi::api::rbac::v1::Subject>>) -> Vec<String> {
    subjects
        .into_iter()
        .flatten()
        .map(|subject| match &subject.namespace {
            Some(namespace) => format!("{} {} ({namespace})", subject.kind, subject.name),
            None => format!("{} {}", subject.kind, subject.name),
        })
        .collect()
}

fn key_values(map: Option<&BTreeMap<String, String>>) -> Vec<String> {
    map.into_iter()
        .flatten()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect()
}

fn quantity(map: Option<&BTreeMap<String, Quantity>>, key: &str) -> String {
    map.and_then(|map| map.get(key))
        .map(|value| value.0.clone())
        .unwrap_or_else(|| "0".to_string())
}

fn quantities(map: Option<&BTreeMap<String, Quantity>>) -> Vec<String> {
    map.into_iter()
        .flatten()
        .map(|(resource, value)| format!("{resource}: {}", value.0))
        .collect()
}

fn int_or_string(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(port) => port.to_string(),
        IntOrString::String(name) => name.clone(),
    }
}

fn preview(value: &str) -> String {
    if value.chars().count() <= VALUE_PREVIEW_CHARS {
        return value.to_string();
    }
    let head = value
        .chars()
        .take(VALUE_PREVIEW_CHARS - 3)
        .collect::<String>();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::{format_age, preview, render};
    use crate::model::ResourceObject;
    use k8s_openapi::ByteString;
    use k8s_openapi::api::core::v1::{
        ConfigMap, Container, ContainerStatus, Pod, PodSpec, PodStatus, Secret, Service,
        ServicePort, ServiceSpec,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use k8s_openapi::jiff::Timestamp;
    use std::collections::BTreeMap;

    const NOW: i64 = 1_760_000_000;
    const DAY: i64 = 86_400;

    fn now() -> Timestamp {
        Timestamp::from_second(NOW).unwrap()
    }

    fn created(seconds_ago: i64) -> Time {
        Time(Timestamp::from_second(NOW - seconds_ago).unwrap())
    }

    fn meta(name: &str, seconds_ago: i64) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            creation_timestamp: Some(created(seconds_ago)),
            ..Default::default()
        }
    }

    fn pod() -> ResourceObject {
        ResourceObject::Pod(Pod {
            metadata: meta("web-0", 2 * 3_600),
            spec: Some(PodSpec {
                node_name: Some("node-a".to_string()),
                containers: vec![
                    Container {
                        name: "app".to_string(),
                        image: Some("nginx:1.27".to_string()),
                        ..Default::default()
                    },
                    Container {
                        name: "sidecar".to_string(),
                        image: Some("envoy:1.31".to_string()),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                pod_ip: Some("10.0.0.7".to_string()),
                container_statuses: Some(vec![ContainerStatus {
                    name: "app".to_string(),
                    ready: true,
                    restart_count: 2,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        })
    }

    #[test]
    fn forty_days_is_reported_in_months() {
        assert_eq!(format_age(Some(&created(40 * DAY)), now()), "1mo");
    }

    #[test]
    fn age_uses_largest_whole_unit() {
        assert_eq!(format_age(Some(&created(400 * DAY)), now()), "1y");
        assert_eq!(format_age(Some(&created(3 * DAY + 5)), now()), "3d");
        assert_eq!(format_age(Some(&created(5 * 3_600 + 59)), now()), "5h");
        assert_eq!(format_age(Some(&created(59)), now()), "0m");
        assert_eq!(format_age(Some(&created(-30)), now()), "0m");
        assert_eq!(format_age(None, now()), "-");
    }

    #[test]
    fn pod_detail_lists_identity_status_and_containers() {
        let text = render(&pod(), now());
        let expected = [
            "Pod: web-0",
            "Namespace: default",
            "Status: Running",
            "Node: node-a",
            "IP: 10.0.0.7",
            "Age: 2h",
            "",
            "Containers:",
            "  app (nginx:1.27) ready, 2 restarts",
            "  sidecar (envoy:1.31)",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn labels_and_annotations_only_when_present() {
        let text = render(&pod(), now());
        assert!(!text.contains("Labels:"));
        assert!(!text.contains("Annotations:"));

        let labelled = ResourceObject::ConfigMap(ConfigMap {
            metadata: ObjectMeta {
                labels: Some(BTreeMap::from([
                    ("tier".to_string(), "web".to_string()),
                    ("app".to_string(), "shop".to_string()),
                ])),
                ..meta("settings", 60)
            },
            data: Some(BTreeMap::from([("mode".to_string(), "fast".to_string())])),
            ..Default::default()
        });
        let text = render(&labelled, now());
        assert!(text.ends_with("Labels:\n  app: shop\n  tier: web"));
        assert!(text.contains("Data:\n  mode: fast"));
        assert!(!text.contains("Annotations:"));
    }

    #[test]
    fn rendering_is_repeatable() {
        let object = pod();
        assert_eq!(render(&object, now()), render(&object, now()));
    }

    #[test]
    fn service_ports_show_node_and_target_ports() {
        let service = ResourceObject::Service(Service {
            metadata: meta("web", DAY),
            spec: Some(ServiceSpec {
                type_: Some("NodePort".to_string()),
                cluster_ip: Some("10.96.0.12".to_string()),
                ports: Some(vec![ServicePort {
                    port: 80,
                    node_port: Some(30080),
                    protocol: Some("TCP".to_string()),
                    target_port: Some(IntOrString::Int(8080)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        });
        let text = render(&service, now());
        assert!(text.contains("Type: NodePort\nClusterIP: 10.96.0.12\nAge: 1d"));
        assert!(text.contains("Ports:\n  80:30080/TCP -> 8080"));
    }

    #[test]
    fn secret_values_are_redacted() {
        let secret = ResourceObject::Secret(Secret {
            metadata: meta("db", DAY),
            type_: Some("Opaque".to_string()),
            data: Some(BTreeMap::from([(
                "password".to_string(),
                ByteString(b"hunter2".to_vec()),
            )])),
            ..Default::default()
        });
        let text = render(&secret, now());
        assert!(text.contains("password: 7 bytes (redacted)"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn long_values_are_truncated() {
        let value = "x".repeat(150);
        let shown = preview(&value);
        assert_eq!(shown.chars().count(), 100);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
