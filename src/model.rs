use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, LimitRange, Namespace, Node, PersistentVolume, PersistentVolumeClaim,
    Pod, ResourceQuota, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Namespace,
    Pod,
    Deployment,
    ReplicaSet,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
    Service,
    ConfigMap,
    Secret,
    Ingress,
    NetworkPolicy,
    PersistentVolumeClaim,
    PersistentVolume,
    ServiceAccount,
    Role,
    RoleBinding,
    ClusterRole,
    ClusterRoleBinding,
    Endpoint,
    HorizontalPodAutoscaler,
    LimitRange,
    ResourceQuota,
    Node,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResourceScope {
    Namespaced,
    Cluster,
}

impl ResourceKind {
    pub const ALL: [Self; 25] = [
        Self::Pod,
        Self::Deployment,
        Self::ReplicaSet,
        Self::StatefulSet,
        Self::DaemonSet,
        Self::Job,
        Self::CronJob,
        Self::Service,
        Self::Ingress,
        Self::ConfigMap,
        Self::Secret,
        Self::PersistentVolumeClaim,
        Self::PersistentVolume,
        Self::ServiceAccount,
        Self::Role,
        Self::RoleBinding,
        Self::ClusterRole,
        Self::ClusterRoleBinding,
        Self::NetworkPolicy,
        Self::Endpoint,
        Self::HorizontalPodAutoscaler,
        Self::LimitRange,
        Self::ResourceQuota,
        Self::Node,
        Self::Namespace,
    ];

    /// Plural label shown in the kind list.
    pub fn title(self) -> &'static str {
        match self {
            Self::Namespace => "Namespaces",
            Self::Pod => "Pods",
            Self::Deployment => "Deployments",
            Self::ReplicaSet => "ReplicaSets",
            Self::StatefulSet => "StatefulSets",
            Self::DaemonSet => "DaemonSets",
            Self::Job => "Jobs",
            Self::CronJob => "CronJobs",
            Self::Service => "Services",
            Self::ConfigMap => "ConfigMaps",
            Self::Secret => "Secrets",
            Self::Ingress => "Ingresses",
            Self::NetworkPolicy => "NetworkPolicies",
            Self::PersistentVolumeClaim => "PersistentVolumeClaims",
            Self::PersistentVolume => "PersistentVolumes",
            Self::ServiceAccount => "ServiceAccounts",
            Self::Role => "Roles",
            Self::RoleBinding => "RoleBindings",
            Self::ClusterRole => "ClusterRoles",
            Self::ClusterRoleBinding => "ClusterRoleBindings",
            Self::Endpoint => "Endpoints",
            Self::HorizontalPodAutoscaler => "HorizontalPodAutoscalers",
            Self::LimitRange => "LimitRanges",
            Self::ResourceQuota => "ResourceQuotas",
            Self::Node => "Nodes",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Self::Namespace => "Namespace",
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::ReplicaSet => "ReplicaSet",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
            Self::Service => "Service",
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::Ingress => "Ingress",
            Self::NetworkPolicy => "NetworkPolicy",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::PersistentVolume => "PersistentVolume",
            Self::ServiceAccount => "ServiceAccount",
            Self::Role => "Role",
            Self::RoleBinding => "RoleBinding",
            Self::ClusterRole => "ClusterRole",
            Self::ClusterRoleBinding => "ClusterRoleBinding",
            Self::Endpoint => "Endpoints",
            Self::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            Self::LimitRange => "LimitRange",
            Self::ResourceQuota => "ResourceQuota",
            Self::Node => "Node",
        }
    }

    pub fn scope(self) -> ResourceScope {
        match self {
            Self::Namespace
            | Self::Node
            | Self::PersistentVolume
            | Self::ClusterRole
            | Self::ClusterRoleBinding => ResourceScope::Cluster,
            _ => ResourceScope::Namespaced,
        }
    }

    pub fn is_namespaced(self) -> bool {
        self.scope() == ResourceScope::Namespaced
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "ns" | "namespace" | "namespaces" => Some(Self::Namespace),
            "po" | "pod" | "pods" => Some(Self::Pod),
            "deploy" | "deployment" | "deployments" | "dp" => Some(Self::Deployment),
            "rs" | "replicaset" | "replicasets" | "replica-set" | "replica-sets" => {
                Some(Self::ReplicaSet)
            }
            "sts" | "statefulset" | "statefulsets" => Some(Self::StatefulSet),
            "ds" | "daemonset" | "daemonsets" | "daemon-set" | "daemon-sets" => {
                Some(Self::DaemonSet)
            }
            "job" | "jobs" => Some(Self::Job),
            "cj" | "cronjob" | "cronjobs" | "cron-job" | "cron-jobs" => Some(Self::CronJob),
            "svc" | "service" | "services" => Some(Self::Service),
            "cm" | "configmap" | "configmaps" | "config-map" | "config-maps" => {
                Some(Self::ConfigMap)
            }
            "secret" | "secrets" => Some(Self::Secret),
            "ing" | "ingress" | "ingresses" => Some(Self::Ingress),
            "netpol" | "np" | "networkpolicy" | "networkpolicies" | "network-policy"
            | "network-policies" => Some(Self::NetworkPolicy),
            "pvc"
            | "persistentvolumeclaim"
            | "persistentvolumeclaims"
            | "persistent-volume-claim"
            | "persistent-volume-claims" => Some(Self::PersistentVolumeClaim),
            "pv" | "persistentvolume" | "persistentvolumes" | "persistent-volume"
            | "persistent-volumes" => Some(Self::PersistentVolume),
            "sa" | "serviceaccount" | "serviceaccounts" | "service-account"
            | "service-accounts" => Some(Self::ServiceAccount),
            "role" | "roles" => Some(Self::Role),
            "rb" | "rolebinding" | "rolebindings" | "role-binding" | "role-bindings" => {
                Some(Self::RoleBinding)
            }
            "crole" | "clusterrole" | "clusterroles" | "cluster-role" | "cluster-roles" => {
                Some(Self::ClusterRole)
            }
            "crb"
            | "clusterrolebinding"
            | "clusterrolebindings"
            | "cluster-role-binding"
            | "cluster-role-bindings" => Some(Self::ClusterRoleBinding),
            "ep" | "endpoint" | "endpoints" => Some(Self::Endpoint),
            "hpa" | "horizontalpodautoscaler" | "horizontalpodautoscalers" => {
                Some(Self::HorizontalPodAutoscaler)
            }
            "limits" | "limitrange" | "limitranges" | "limit-range" | "limit-ranges" => {
                Some(Self::LimitRange)
            }
            "quota" | "resourcequota" | "resourcequotas" | "resource-quota"
            | "resource-quotas" => Some(Self::ResourceQuota),
            "no" | "node" | "nodes" => Some(Self::Node),
            _ => None,
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.singular())
    }
}

/// A fetched object, kept whole so detail rendering and drill-down can use it.
#[derive(Debug, Clone)]
pub enum ResourceObject {
    Namespace(Namespace),
    Pod(Pod),
    Deployment(Deployment),
    ReplicaSet(ReplicaSet),
    StatefulSet(StatefulSet),
    DaemonSet(DaemonSet),
    Job(Job),
    CronJob(CronJob),
    Service(Service),
    ConfigMap(ConfigMap),
    Secret(Secret),
    Ingress(Ingress),
    NetworkPolicy(NetworkPolicy),
    PersistentVolumeClaim(PersistentVolumeClaim),
    PersistentVolume(PersistentVolume),
    ServiceAccount(ServiceAccount),
    Role(Role),
    RoleBinding(RoleBinding),
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    Endpoint(Endpoints),
    HorizontalPodAutoscaler(HorizontalPodAutoscaler),
    LimitRange(LimitRange),
    ResourceQuota(ResourceQuota),
    Node(Node),
}

impl ResourceObject {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Namespace(_) => ResourceKind::Namespace,
            Self::Pod(_) => ResourceKind::Pod,
            Self::Deployment(_) => ResourceKind::Deployment,
            Self::ReplicaSet(_) => ResourceKind::ReplicaSet,
            Self::StatefulSet(_) => ResourceKind::StatefulSet,
            Self::DaemonSet(_) => ResourceKind::DaemonSet,
            Self::Job(_) => ResourceKind::Job,
            Self::CronJob(_) => ResourceKind::CronJob,
            Self::Service(_) => ResourceKind::Service,
            Self::ConfigMap(_) => ResourceKind::ConfigMap,
            Self::Secret(_) => ResourceKind::Secret,
            Self::Ingress(_) => ResourceKind::Ingress,
            Self::NetworkPolicy(_) => ResourceKind::NetworkPolicy,
            Self::PersistentVolumeClaim(_) => ResourceKind::PersistentVolumeClaim,
            Self::PersistentVolume(_) => ResourceKind::PersistentVolume,
            Self::ServiceAccount(_) => ResourceKind::ServiceAccount,
            Self::Role(_) => ResourceKind::Role,
            Self::RoleBinding(_) => ResourceKind::RoleBinding,
            Self::ClusterRole(_) => ResourceKind::ClusterRole,
            Self::ClusterRoleBinding(_) => ResourceKind::ClusterRoleBinding,
            Self::Endpoint(_) => ResourceKind::Endpoint,
            Self::HorizontalPodAutoscaler(_) => ResourceKind::HorizontalPodAutoscaler,
            Self::LimitRange(_) => ResourceKind::LimitRange,
            Self::ResourceQuota(_) => ResourceKind::ResourceQuota,
            Self::Node(_) => ResourceKind::Node,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Namespace(object) => object.meta(),
            Self::Pod(object) => object.meta(),
            Self::Deployment(object) => object.meta(),
            Self::ReplicaSet(object) => object.meta(),
            Self::StatefulSet(object) => object.meta(),
            Self::DaemonSet(object) => object.meta(),
            Self::Job(object) => object.meta(),
            Self::CronJob(object) => object.meta(),
            Self::Service(object) => object.meta(),
            Self::ConfigMap(object) => object.meta(),
            Self::Secret(object) => object.meta(),
            Self::Ingress(object) => object.meta(),
            Self::NetworkPolicy(object) => object.meta(),
            Self::PersistentVolumeClaim(object) => object.meta(),
            Self::PersistentVolume(object) => object.meta(),
            Self::ServiceAccount(object) => object.meta(),
            Self::Role(object) => object.meta(),
            Self::RoleBinding(object) => object.meta(),
            Self::ClusterRole(object) => object.meta(),
            Self::ClusterRoleBinding(object) => object.meta(),
            Self::Endpoint(object) => object.meta(),
            Self::HorizontalPodAutoscaler(object) => object.meta(),
            Self::LimitRange(object) => object.meta(),
            Self::ResourceQuota(object) => object.meta(),
            Self::Node(object) => object.meta(),
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or("-")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// Container names in spec order; empty for anything but pods.
    pub fn container_names(&self) -> Vec<String> {
        let Self::Pod(pod) = self else {
            return Vec::new();
        };
        pod.spec
            .as_ref()
            .map(|spec| {
                spec.containers
                    .iter()
                    .map(|container| container.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One listed object. `slot` indexes the owning table's object arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRow {
    pub name: String,
    pub summary: String,
    pub slot: usize,
}

#[derive(Debug, Clone)]
pub struct ResourceTable {
    pub kind: ResourceKind,
    pub namespace: String,
    pub rows: Vec<ResourceRow>,
    objects: Vec<ResourceObject>,
}

impl ResourceTable {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            rows: Vec::new(),
            objects: Vec::new(),
        }
    }

    pub fn push(&mut self, summary: String, object: ResourceObject) {
        let slot = self.objects.len();
        self.rows.push(ResourceRow {
            name: object.name().to_string(),
            summary,
            slot,
        });
        self.objects.push(object);
    }

    pub fn object(&self, slot: usize) -> Option<&ResourceObject> {
        self.objects.get(slot)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FocusPanel {
    Namespaces,
    Kinds,
    Resources,
}

impl FocusPanel {
    pub const ORDER: [Self; 3] = [Self::Namespaces, Self::Kinds, Self::Resources];

    /// Out-of-range indexes resolve to the namespace panel.
    pub fn from_index(index: usize) -> Self {
        Self::ORDER.get(index).copied().unwrap_or(Self::Namespaces)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Namespaces => "Namespaces",
            Self::Kinds => "Resource Types",
            Self::Resources => "Resources",
        }
    }
}

/// Current namespace, kind, resource, container and focused panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    namespace: String,
    kind: ResourceKind,
    resource_name: String,
    container: String,
    focus_index: usize,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            kind: ResourceKind::Pod,
            resource_name: String::new(),
            container: String::new(),
            focus_index: 0,
        }
    }
}

impl SelectionState {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn advance_focus(&mut self, forward: bool) -> FocusPanel {
        let panels = FocusPanel::ORDER.len();
        let step = if forward { 1 } else { panels - 1 };
        self.focus_index = (self.focus_index + step) % panels;
        self.current_focus_panel()
    }

    pub fn current_focus_panel(&self) -> FocusPanel {
        FocusPanel::from_index(self.focus_index)
    }

    pub fn focus(&mut self, panel: FocusPanel) {
        self.focus_index = FocusPanel::ORDER
            .iter()
            .position(|candidate| *candidate == panel)
            .unwrap_or(0);
    }

    /// Switches namespace and falls back to the default kind.
    pub fn select_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.to_string();
        self.kind = ResourceKind::Pod;
        self.resource_name.clear();
        self.container.clear();
    }

    pub fn clear_namespace(&mut self) {
        self.select_namespace("");
    }

    pub fn select_kind(&mut self, kind: ResourceKind) {
        self.kind = kind;
        self.resource_name.clear();
        self.container.clear();
    }

    pub fn select_resource(&mut self, name: &str) {
        self.resource_name = name.to_string();
        self.container.clear();
    }

    pub fn clear_resource(&mut self) {
        self.resource_name.clear();
        self.container.clear();
    }

    /// Ignored unless a pod is selected.
    pub fn select_container(&mut self, container: &str) -> bool {
        if self.kind != ResourceKind::Pod || self.resource_name.is_empty() {
            return false;
        }
        self.container = container.to_string();
        true
    }

    pub fn clear_container(&mut self) {
        self.container.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{FocusPanel, ResourceKind, ResourceObject, ResourceTable, SelectionState};
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn config_map(name: &str) -> ResourceObject {
        ResourceObject::ConfigMap(ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[test]
    fn resource_aliases_map_to_expected_kinds() {
        assert_eq!(ResourceKind::from_token("cj"), Some(ResourceKind::CronJob));
        assert_eq!(
            ResourceKind::from_token("daemonsets"),
            Some(ResourceKind::DaemonSet)
        );
        assert_eq!(ResourceKind::from_token("rs"), Some(ResourceKind::ReplicaSet));
        assert_eq!(
            ResourceKind::from_token("persistent-volume-claims"),
            Some(ResourceKind::PersistentVolumeClaim)
        );
        assert_eq!(
            ResourceKind::from_token("cluster-role-bindings"),
            Some(ResourceKind::ClusterRoleBinding)
        );
        assert_eq!(
            ResourceKind::from_token("HPA"),
            Some(ResourceKind::HorizontalPodAutoscaler)
        );
        assert_eq!(ResourceKind::from_token("widgets"), None);
    }

    #[test]
    fn every_kind_is_listed_once() {
        for kind in ResourceKind::ALL {
            let count = ResourceKind::ALL
                .iter()
                .filter(|candidate| **candidate == kind)
                .count();
            assert_eq!(count, 1, "{kind} listed {count} times");
        }
    }

    #[test]
    fn cluster_scoped_kinds_are_marked() {
        let cluster_scoped = ResourceKind::ALL
            .iter()
            .filter(|kind| !kind.is_namespaced())
            .copied()
            .collect::<Vec<_>>();
        assert_eq!(
            cluster_scoped,
            vec![
                ResourceKind::PersistentVolume,
                ResourceKind::ClusterRole,
                ResourceKind::ClusterRoleBinding,
                ResourceKind::Node,
                ResourceKind::Namespace,
            ]
        );
    }

    #[test]
    fn focus_wraps_forward_and_backward_with_period_three() {
        for start in 0..3 {
            let mut state = SelectionState::default();
            state.focus(FocusPanel::from_index(start));
            let origin = state.current_focus_panel();

            for _ in 0..3 {
                state.advance_focus(true);
            }
            assert_eq!(state.current_focus_panel(), origin);

            for _ in 0..3 {
                state.advance_focus(false);
            }
            assert_eq!(state.current_focus_panel(), origin);
        }
    }

    #[test]
    fn advance_focus_returns_new_panel() {
        let mut state = SelectionState::default();
        assert_eq!(state.advance_focus(true), FocusPanel::Kinds);
        assert_eq!(state.advance_focus(true), FocusPanel::Resources);
        assert_eq!(state.advance_focus(true), FocusPanel::Namespaces);
        assert_eq!(state.advance_focus(false), FocusPanel::Resources);
    }

    #[test]
    fn out_of_range_focus_index_defaults_to_namespaces() {
        assert_eq!(FocusPanel::from_index(3), FocusPanel::Namespaces);
        assert_eq!(FocusPanel::from_index(usize::MAX), FocusPanel::Namespaces);
    }

    #[test]
    fn namespace_change_clears_resource_and_container() {
        let mut state = SelectionState::default();
        state.select_namespace("default");
        state.select_resource("web-0");
        assert!(state.select_container("app"));
        assert_eq!(state.container(), "app");

        state.select_namespace("kube-system");
        assert_eq!(state.namespace(), "kube-system");
        assert_eq!(state.kind(), ResourceKind::Pod);
        assert_eq!(state.resource_name(), "");
        assert_eq!(state.container(), "");
    }

    #[test]
    fn container_requires_selected_pod() {
        let mut state = SelectionState::default();
        state.select_namespace("default");
        assert!(!state.select_container("app"));

        state.select_kind(ResourceKind::Deployment);
        state.select_resource("web");
        assert!(!state.select_container("app"));
        assert_eq!(state.container(), "");
    }

    #[test]
    fn table_rows_point_into_arena_in_push_order() {
        let mut table = ResourceTable::new(ResourceKind::ConfigMap, "default");
        table.push("1 keys".to_string(), config_map("b"));
        table.push("2 keys".to_string(), config_map("a"));

        let names = table
            .rows
            .iter()
            .map(|row| row.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "a"]);
        let second = table.object(table.rows[1].slot).map(ResourceObject::name);
        assert_eq!(second, Some("a"));
        assert!(table.object(5).is_none());
    }
}
