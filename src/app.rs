use crate::detail;
use crate::error::BrowserError;
use crate::input::Action;
use crate::logs::{LogDisplay, LogTarget};
use crate::model::{FocusPanel, ResourceKind, ResourceObject, ResourceTable, SelectionState};
use chrono::{DateTime, Local};
use k8s_openapi::jiff::Timestamp;
use tracing::debug;

const PAGE_STEP: isize = 10;
const LOADING_LOGS: &str = "Loading logs...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Batch(Vec<AppCommand>),
    LoadNamespaces,
    LoadResources {
        kind: ResourceKind,
        namespace: String,
    },
    LoadPod {
        namespace: String,
        pod: String,
    },
    StartLogSession(LogTarget),
    StopLogSession,
    DeleteResource {
        kind: ResourceKind,
        namespace: Option<String>,
        name: String,
    },
}

impl AppCommand {
    /// Flattens nested batches in order and drops no-ops.
    pub fn into_steps(self) -> Vec<AppCommand> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(commands) => commands.into_iter().flat_map(Self::into_steps).collect(),
            command => vec![command],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub prompt: String,
    pub command: AppCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub label: String,
    pub detail: String,
    pub slot: usize,
}

/// A list panel with a clamped cursor.
#[derive(Debug, Clone, Default)]
pub struct SelectableList {
    rows: Vec<ListRow>,
    selected: usize,
}

impl SelectableList {
    pub fn clear(&mut self) {
        self.rows.clear();
        self.selected = 0;
    }

    pub fn add_row(&mut self, label: impl Into<String>, detail: impl Into<String>, slot: usize) {
        self.rows.push(ListRow {
            label: label.into(),
            detail: detail.into(),
            slot,
        });
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn item_count(&self) -> usize {
        self.rows.len()
    }

    pub fn selected_index(&self) -> Option<usize> {
        if self.rows.is_empty() {
            return None;
        }
        Some(self.selected.min(self.rows.len() - 1))
    }

    pub fn selected_row(&self) -> Option<&ListRow> {
        self.selected_index().and_then(|index| self.rows.get(index))
    }

    pub fn move_by(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }
        let max_index = self.rows.len().saturating_sub(1) as isize;
        let current = self.selected.min(max_index as usize) as isize;
        self.selected = (current + delta).clamp(0, max_index) as usize;
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    pub fn select_label(&mut self, label: &str) -> bool {
        match self.rows.iter().position(|row| row.label == label) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    pub fn select_slot(&mut self, slot: usize) -> bool {
        match self.rows.iter().position(|row| row.slot == slot) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }
}

/// Scrollable text. Appended text may end mid-line; the next append
/// continues that line. `max_lines` of zero keeps everything.
#[derive(Debug, Clone)]
pub struct TextView {
    title: String,
    lines: Vec<String>,
    max_lines: usize,
    scroll: usize,
    follow: bool,
    viewport: usize,
}

impl TextView {
    pub fn new(title: impl Into<String>, max_lines: usize, follow: bool) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
            max_lines,
            scroll: 0,
            follow,
            viewport: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
        self.scroll = 0;
        self.trim_to_capacity();
    }

    pub fn append(&mut self, text: &str) {
        let mut pieces = text.split('\n');
        if let Some(first) = pieces.next() {
            match self.lines.last_mut() {
                Some(last) => last.push_str(first),
                None => self.lines.push(first.to_string()),
            }
        }
        self.lines.extend(pieces.map(str::to_string));
        self.trim_to_capacity();
    }

    /// Appends `line` on a line of its own.
    pub fn append_line(&mut self, line: &str) {
        if self.lines.last().is_some_and(|last| !last.is_empty()) {
            self.lines.push(String::new());
        }
        self.append(&format!("{line}\n"));
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn scroll_to_end(&mut self) {
        self.follow = true;
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let current = self.offset() as isize;
        let max_offset = self.lines.len().saturating_sub(1) as isize;
        self.follow = false;
        self.scroll = (current + delta).clamp(0, max_offset.max(0)) as usize;
    }

    pub fn set_viewport(&mut self, rows: usize) {
        self.viewport = rows;
    }

    /// First visible line.
    pub fn offset(&self) -> usize {
        if self.follow {
            return self.lines.len().saturating_sub(self.viewport.max(1));
        }
        self.scroll.min(self.lines.len().saturating_sub(1))
    }

    pub fn visible_lines(&self) -> &[String] {
        let start = self.offset();
        let end = (start + self.viewport.max(1)).min(self.lines.len());
        &self.lines[start..end]
    }

    fn trim_to_capacity(&mut self) {
        if self.max_lines == 0 || self.lines.len() <= self.max_lines {
            return;
        }
        let excess = self.lines.len() - self.max_lines;
        self.lines.drain(..excess);
        self.scroll = self.scroll.saturating_sub(excess);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PodDrill {
    namespace: String,
    pod: String,
}

pub struct App {
    running: bool,
    cluster: String,
    context: String,
    selection: SelectionState,
    kinds: Vec<ResourceKind>,
    namespace_list: SelectableList,
    kind_list: SelectableList,
    resource_list: SelectableList,
    resource_table: Option<ResourceTable>,
    drill: Option<PodDrill>,
    detail_view: TextView,
    log_view: TextView,
    log_view_visible: bool,
    awaiting_first_chunk: bool,
    initial_namespace: Option<String>,
    last_refresh: Option<DateTime<Local>>,
    status: String,
    show_help: bool,
    pending_confirmation: Option<PendingConfirmation>,
}

impl App {
    pub fn new(
        cluster: impl Into<String>,
        context: impl Into<String>,
        kinds: Vec<ResourceKind>,
        log_buffer_lines: usize,
    ) -> Self {
        let mut kind_list = SelectableList::default();
        for (slot, kind) in kinds.iter().enumerate() {
            let scope = if kind.is_namespaced() { "" } else { "cluster" };
            kind_list.add_row(kind.title(), scope, slot);
        }
        let selection = SelectionState::default();
        if let Some(slot) = kinds.iter().position(|kind| *kind == selection.kind()) {
            kind_list.select_slot(slot);
        }

        Self {
            running: true,
            cluster: cluster.into(),
            context: context.into(),
            selection,
            kinds,
            namespace_list: SelectableList::default(),
            kind_list,
            resource_list: SelectableList::default(),
            resource_table: None,
            drill: None,
            detail_view: TextView::new("Details", 0, false),
            log_view: TextView::new("Logs", log_buffer_lines, true),
            log_view_visible: false,
            awaiting_first_chunk: false,
            initial_namespace: None,
            last_refresh: None,
            status: "Loading namespaces".to_string(),
            show_help: false,
            pending_confirmation: None,
        }
    }

    /// Namespace to open once the namespace list first arrives.
    pub fn with_initial_namespace(mut self, namespace: Option<String>) -> Self {
        self.initial_namespace = namespace.filter(|namespace| !namespace.trim().is_empty());
        self
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn focus(&self) -> FocusPanel {
        self.selection.current_focus_panel()
    }

    pub fn namespace_list(&self) -> &SelectableList {
        &self.namespace_list
    }

    pub fn kind_list(&self) -> &SelectableList {
        &self.kind_list
    }

    pub fn resource_list(&self) -> &SelectableList {
        &self.resource_list
    }

    pub fn resource_panel_title(&self) -> String {
        if let Some(drill) = &self.drill {
            return format!("Containers: {}", drill.pod);
        }
        let kind = self.selection.kind();
        if kind.is_namespaced() && !self.selection.namespace().is_empty() {
            format!("{} ({})", kind.title(), self.selection.namespace())
        } else {
            kind.title().to_string()
        }
    }

    pub fn detail_view(&self) -> &TextView {
        &self.detail_view
    }

    pub fn detail_view_mut(&mut self) -> &mut TextView {
        &mut self.detail_view
    }

    pub fn log_view(&self) -> &TextView {
        &self.log_view
    }

    pub fn log_view_mut(&mut self) -> &mut TextView {
        &mut self.log_view
    }

    pub fn log_view_visible(&self) -> bool {
        self.log_view_visible
    }

    pub fn last_refresh(&self) -> Option<DateTime<Local>> {
        self.last_refresh
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn pending_confirmation_prompt(&self) -> Option<&str> {
        self.pending_confirmation
            .as_ref()
            .map(|pending| pending.prompt.as_str())
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if let Some(pending) = self.pending_confirmation.take() {
            match action {
                Action::ConfirmYes | Action::Select => {
                    self.status = format!("Confirmed: {}", pending.prompt);
                    return pending.command;
                }
                Action::ConfirmNo | Action::Back => {
                    self.status = "Action cancelled".to_string();
                    return AppCommand::None;
                }
                _ => {
                    self.pending_confirmation = Some(pending);
                    self.status =
                        "Pending confirmation: press y to confirm or n to cancel".to_string();
                    return AppCommand::None;
                }
            }
        }

        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
        }

        match action {
            Action::Quit => {
                self.running = false;
                AppCommand::None
            }
            Action::FocusNext | Action::FocusPrev => {
                let panel = self
                    .selection
                    .advance_focus(matches!(action, Action::FocusNext));
                self.status = format!("Focus: {}", panel.title());
                AppCommand::None
            }
            Action::Down => self.move_focused(1),
            Action::Up => self.move_focused(-1),
            Action::PageDown => self.move_focused(PAGE_STEP),
            Action::PageUp => self.move_focused(-PAGE_STEP),
            Action::Top => {
                self.focused_list_mut().select_first();
                AppCommand::None
            }
            Action::Bottom => {
                self.focused_list_mut().select_last();
                AppCommand::None
            }
            Action::Select => match self.focus() {
                FocusPanel::Namespaces => self.select_highlighted_namespace(),
                FocusPanel::Kinds => self.select_highlighted_kind(),
                FocusPanel::Resources if self.drill.is_some() => {
                    self.select_highlighted_container()
                }
                FocusPanel::Resources => self.select_highlighted_resource(),
            },
            Action::Back => self.step_back(),
            Action::Refresh => self.refresh(),
            Action::Delete => self.prepare_delete(),
            Action::ConfirmYes | Action::ConfirmNo => AppCommand::None,
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::ScrollOutputUp => {
                self.output_view_mut().scroll_by(-1);
                AppCommand::None
            }
            Action::ScrollOutputDown => {
                self.output_view_mut().scroll_by(1);
                AppCommand::None
            }
            Action::FollowOutput => {
                self.output_view_mut().scroll_to_end();
                self.status = "Following output".to_string();
                AppCommand::None
            }
        }
    }

    /// Replaces the namespace list. Opens the initial namespace on first load.
    pub fn set_namespaces(&mut self, names: Vec<String>) -> AppCommand {
        let previous = self
            .namespace_list
            .selected_row()
            .map(|row| row.label.clone());
        self.namespace_list.clear();
        for (slot, name) in names.iter().enumerate() {
            self.namespace_list.add_row(name, "", slot);
        }
        let current = self.selection.namespace().to_string();
        if !current.is_empty() {
            self.namespace_list.select_label(&current);
        } else if let Some(previous) = previous {
            self.namespace_list.select_label(&previous);
        }
        self.last_refresh = Some(Local::now());

        if let Some(initial) = self.initial_namespace.take() {
            if self.namespace_list.select_label(&initial) {
                return self.activate_namespace(&initial);
            }
            self.status = format!("Namespace {initial} not found");
            return AppCommand::None;
        }

        self.status = format!("{} namespaces", names.len());
        AppCommand::None
    }

    /// Shows a loaded table unless the selection has moved on since the request.
    pub fn set_resource_table(&mut self, table: ResourceTable) {
        if table.kind != self.selection.kind()
            || (table.kind.is_namespaced() && table.namespace != self.selection.namespace())
            || self.drill.is_some()
        {
            debug!(kind = %table.kind, namespace = %table.namespace, "dropping stale resource table");
            return;
        }

        let previous = self
            .resource_list
            .selected_row()
            .map(|row| row.label.clone());
        self.status = if table.namespace.is_empty() {
            format!("{} {}", table.len(), table.kind.title())
        } else {
            format!("{} {} in {}", table.len(), table.kind.title(), table.namespace)
        };
        self.resource_table = Some(table);
        self.rebuild_resource_list();
        if let Some(previous) = previous {
            self.resource_list.select_label(&previous);
        }
        self.last_refresh = Some(Local::now());
    }

    pub fn resource_load_failed(&mut self, kind: ResourceKind, error: &BrowserError) {
        if kind == self.selection.kind() && self.drill.is_none() {
            self.resource_table = None;
            self.resource_list.clear();
        }
        self.show_error(error);
    }

    /// Switches the resource panel to the pod's containers.
    pub fn show_pod(&mut self, pod: ResourceObject) {
        if pod.kind() != ResourceKind::Pod || pod.name() != self.selection.resource_name() {
            debug!(pod = %pod.name(), "dropping pod for a stale selection");
            return;
        }

        let namespace = pod
            .namespace()
            .unwrap_or(self.selection.namespace())
            .to_string();
        let name = pod.name().to_string();
        let containers = pod.container_names();

        self.detail_view
            .set_text(&detail::render(&pod, Timestamp::now()));
        self.resource_list.clear();
        for (slot, container) in containers.iter().enumerate() {
            self.resource_list.add_row(container, "container", slot);
        }
        self.drill = Some(PodDrill {
            namespace,
            pod: name.clone(),
        });
        self.selection.focus(FocusPanel::Resources);

        self.log_view_visible = true;
        self.awaiting_first_chunk = false;
        self.log_view.set_title(format!("Logs: {name}"));
        self.log_view.set_text(if containers.is_empty() {
            "Pod has no containers"
        } else {
            "Select a container to stream its logs"
        });
        self.status = format!("Pod {name}: {} containers", containers.len());
    }

    pub fn apply_log_display(&mut self, display: LogDisplay) {
        match display {
            LogDisplay::Append(text) => {
                self.clear_loading_placeholder();
                self.log_view.append(&text);
            }
            LogDisplay::ErrorLine(line) => {
                self.clear_loading_placeholder();
                self.log_view.append_line(&line);
                self.status = line;
            }
            LogDisplay::Ended => {
                self.status = format!("Log stream for {} ended", self.selection.container());
            }
        }
    }

    /// Result of a confirmed delete. Returns the reload to run next.
    pub fn resource_deleted(&mut self, kind: ResourceKind, name: &str) -> AppCommand {
        self.status = format!("Deleted {kind} {name}");
        if kind == ResourceKind::Namespace {
            if self.selection.namespace() == name {
                self.selection.clear_namespace();
                self.reset_resource_panel();
                return AppCommand::Batch(vec![
                    AppCommand::StopLogSession,
                    AppCommand::LoadNamespaces,
                ]);
            }
            return AppCommand::Batch(vec![AppCommand::LoadNamespaces, self.reload_command()]);
        }

        if self.selection.resource_name() == name {
            self.selection.clear_resource();
            self.detail_view.set_text("");
        }
        self.reload_command()
    }

    pub fn show_error(&mut self, error: &BrowserError) {
        self.status = error.status_line();
    }

    fn move_focused(&mut self, delta: isize) -> AppCommand {
        self.focused_list_mut().move_by(delta);
        AppCommand::None
    }

    fn focused_list_mut(&mut self) -> &mut SelectableList {
        match self.focus() {
            FocusPanel::Namespaces => &mut self.namespace_list,
            FocusPanel::Kinds => &mut self.kind_list,
            FocusPanel::Resources => &mut self.resource_list,
        }
    }

    fn output_view_mut(&mut self) -> &mut TextView {
        if self.log_view_visible {
            &mut self.log_view
        } else {
            &mut self.detail_view
        }
    }

    fn select_highlighted_namespace(&mut self) -> AppCommand {
        let Some(namespace) = self
            .namespace_list
            .selected_row()
            .map(|row| row.label.clone())
        else {
            self.status = "No namespaces loaded".to_string();
            return AppCommand::None;
        };
        self.activate_namespace(&namespace)
    }

    fn activate_namespace(&mut self, namespace: &str) -> AppCommand {
        self.selection.select_namespace(namespace);
        let kind = self.selection.kind();
        if let Some(slot) = self.kinds.iter().position(|candidate| *candidate == kind) {
            self.kind_list.select_slot(slot);
        }
        self.reset_resource_panel();
        self.status = format!("Loading {} in {namespace}", kind.title());
        AppCommand::Batch(vec![AppCommand::StopLogSession, self.reload_command()])
    }

    fn select_highlighted_kind(&mut self) -> AppCommand {
        let Some(kind) = self
            .kind_list
            .selected_row()
            .and_then(|row| self.kinds.get(row.slot))
            .copied()
        else {
            self.status = "No resource types available".to_string();
            return AppCommand::None;
        };
        self.selection.select_kind(kind);
        self.reset_resource_panel();
        self.status = format!("Loading {}", kind.title());
        AppCommand::Batch(vec![AppCommand::StopLogSession, self.reload_command()])
    }

    fn select_highlighted_resource(&mut self) -> AppCommand {
        let Some(table) = self.resource_table.as_ref() else {
            self.status = "No resources loaded".to_string();
            return AppCommand::None;
        };
        let Some(object) = self
            .resource_list
            .selected_row()
            .and_then(|row| table.object(row.slot))
        else {
            self.status = "No resource selected".to_string();
            return AppCommand::None;
        };

        let name = object.name().to_string();
        let kind = object.kind();
        let pod_namespace = (kind == ResourceKind::Pod)
            .then(|| object.namespace().unwrap_or(&table.namespace).to_string());
        self.detail_view
            .set_text(&detail::render(object, Timestamp::now()));
        self.selection.select_resource(&name);

        match pod_namespace {
            Some(namespace) => {
                self.status = format!("Opening pod {name}");
                AppCommand::Batch(vec![
                    AppCommand::StopLogSession,
                    AppCommand::LoadPod {
                        namespace,
                        pod: name,
                    },
                ])
            }
            None => {
                self.status = format!("{kind} {name}");
                AppCommand::None
            }
        }
    }

    fn select_highlighted_container(&mut self) -> AppCommand {
        let Some(drill) = self.drill.clone() else {
            return AppCommand::None;
        };
        let Some(container) = self
            .resource_list
            .selected_row()
            .map(|row| row.label.clone())
        else {
            self.status = "Pod has no containers".to_string();
            return AppCommand::None;
        };
        if !self.selection.select_container(&container) {
            self.status = "Select a pod before choosing a container".to_string();
            return AppCommand::None;
        }

        self.log_view_visible = true;
        self.log_view
            .set_title(format!("Logs: {}/{container}", drill.pod));
        self.log_view.set_text(LOADING_LOGS);
        self.log_view.scroll_to_end();
        self.awaiting_first_chunk = true;
        self.status = format!("Streaming logs for {}/{container}", drill.pod);
        AppCommand::StartLogSession(LogTarget::new(drill.namespace, drill.pod, container))
    }

    fn step_back(&mut self) -> AppCommand {
        if self.drill.is_some() {
            return self.leave_pod();
        }
        if self.focus() != FocusPanel::Namespaces {
            let panel = self.selection.advance_focus(false);
            self.status = format!("Focus: {}", panel.title());
        }
        AppCommand::None
    }

    fn leave_pod(&mut self) -> AppCommand {
        let Some(drill) = self.drill.take() else {
            return AppCommand::None;
        };
        self.selection.clear_container();
        self.log_view_visible = false;
        self.awaiting_first_chunk = false;
        self.rebuild_resource_list();
        self.resource_list.select_label(&drill.pod);
        self.status = format!("Back to {} in {}", ResourceKind::Pod.title(), drill.namespace);
        AppCommand::StopLogSession
    }

    fn refresh(&mut self) -> AppCommand {
        self.status = "Refreshing".to_string();
        if self.drill.is_some() {
            return AppCommand::LoadNamespaces;
        }
        AppCommand::Batch(vec![AppCommand::LoadNamespaces, self.reload_command()])
    }

    fn prepare_delete(&mut self) -> AppCommand {
        let target = match self.focus() {
            FocusPanel::Namespaces => self
                .namespace_list
                .selected_row()
                .map(|row| (ResourceKind::Namespace, None, row.label.clone())),
            FocusPanel::Resources if self.drill.is_some() => {
                self.status = "Containers cannot be deleted".to_string();
                return AppCommand::None;
            }
            FocusPanel::Resources => self.resource_table.as_ref().and_then(|table| {
                let row = self.resource_list.selected_row()?;
                let object = table.object(row.slot)?;
                Some((
                    object.kind(),
                    object.namespace().map(str::to_string),
                    object.name().to_string(),
                ))
            }),
            FocusPanel::Kinds => {
                self.status = "Resource types cannot be deleted".to_string();
                return AppCommand::None;
            }
        };

        let Some((kind, namespace, name)) = target else {
            self.status = "Nothing selected to delete".to_string();
            return AppCommand::None;
        };
        let prompt = match &namespace {
            Some(namespace) => format!("Delete {kind} {namespace}/{name}"),
            None => format!("Delete {kind} {name}"),
        };
        self.status = format!("{prompt}? [y/n]");
        self.pending_confirmation = Some(PendingConfirmation {
            prompt,
            command: AppCommand::DeleteResource {
                kind,
                namespace,
                name,
            },
        });
        AppCommand::None
    }

    fn reload_command(&self) -> AppCommand {
        let kind = self.selection.kind();
        let namespace = self.selection.namespace();
        if kind.is_namespaced() && namespace.is_empty() {
            return AppCommand::None;
        }
        AppCommand::LoadResources {
            kind,
            namespace: namespace.to_string(),
        }
    }

    fn reset_resource_panel(&mut self) {
        self.drill = None;
        self.resource_table = None;
        self.resource_list.clear();
        self.log_view_visible = false;
        self.awaiting_first_chunk = false;
        self.detail_view.set_text("");
    }

    fn rebuild_resource_list(&mut self) {
        self.resource_list.clear();
        if let Some(table) = &self.resource_table {
            for row in &table.rows {
                self.resource_list
                    .add_row(row.name.clone(), row.summary.clone(), row.slot);
            }
        }
    }

    fn clear_loading_placeholder(&mut self) {
        if self.awaiting_first_chunk {
            self.log_view.set_text("");
            self.awaiting_first_chunk = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppCommand, SelectableList, TextView};
    use crate::error::BrowserError;
    use crate::input::Action;
    use crate::logs::{LogDisplay, LogTarget};
    use crate::model::{FocusPanel, ResourceKind, ResourceObject, ResourceTable};
    use k8s_openapi::api::core::v1::{ConfigMap, Container, Pod, PodSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn meta(namespace: &str, name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }
    }

    fn pod(namespace: &str, name: &str, containers: &[&str]) -> ResourceObject {
        ResourceObject::Pod(Pod {
            metadata: meta(namespace, name),
            spec: Some(PodSpec {
                containers: containers
                    .iter()
                    .map(|container| Container {
                        name: container.to_string(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn pod_table(namespace: &str, pods: &[(&str, &[&str])]) -> ResourceTable {
        let mut table = ResourceTable::new(ResourceKind::Pod, namespace);
        for (name, containers) in pods {
            table.push("1/1 Running".to_string(), pod(namespace, name, containers));
        }
        table
    }

    fn app() -> App {
        App::new("kind-dev", "kind-dev", ResourceKind::ALL.to_vec(), 100)
    }

    fn focus(app: &mut App, panel: FocusPanel) {
        while app.focus() != panel {
            app.apply_action(Action::FocusNext);
        }
    }

    /// Namespace `default` selected with pod `web` (containers app, sidecar) opened.
    fn app_in_pod() -> App {
        let mut app = app();
        app.set_namespaces(vec!["default".to_string(), "kube-system".to_string()]);
        app.apply_action(Action::Select);
        app.set_resource_table(pod_table("default", &[("web", &["app", "sidecar"])]));
        focus(&mut app, FocusPanel::Resources);
        let command = app.apply_action(Action::Select);
        assert_eq!(
            command.into_steps(),
            vec![
                AppCommand::StopLogSession,
                AppCommand::LoadPod {
                    namespace: "default".to_string(),
                    pod: "web".to_string(),
                },
            ]
        );
        app.show_pod(pod("default", "web", &["app", "sidecar"]));
        app
    }

    #[test]
    fn focus_actions_cycle_through_three_panels() {
        let mut app = app();
        assert_eq!(app.focus(), FocusPanel::Namespaces);
        for _ in 0..3 {
            app.apply_action(Action::FocusNext);
        }
        assert_eq!(app.focus(), FocusPanel::Namespaces);
        app.apply_action(Action::FocusPrev);
        assert_eq!(app.focus(), FocusPanel::Resources);
    }

    #[test]
    fn selecting_namespace_stops_logs_and_loads_pods() {
        let mut app = app();
        app.set_namespaces(vec!["default".to_string(), "payments".to_string()]);
        app.apply_action(Action::Down);
        let command = app.apply_action(Action::Select);
        assert_eq!(
            command.into_steps(),
            vec![
                AppCommand::StopLogSession,
                AppCommand::LoadResources {
                    kind: ResourceKind::Pod,
                    namespace: "payments".to_string(),
                },
            ]
        );
        assert_eq!(app.selection().namespace(), "payments");
        assert_eq!(app.resource_panel_title(), "Pods (payments)");
    }

    #[test]
    fn initial_namespace_opens_after_first_listing() {
        let mut app = app().with_initial_namespace(Some("kube-system".to_string()));
        let command = app.set_namespaces(vec!["default".to_string(), "kube-system".to_string()]);
        assert_eq!(
            command.into_steps().last(),
            Some(&AppCommand::LoadResources {
                kind: ResourceKind::Pod,
                namespace: "kube-system".to_string(),
            })
        );
        assert_eq!(app.selection().namespace(), "kube-system");
    }

    #[test]
    fn container_selection_starts_a_log_session() {
        let mut app = app_in_pod();
        assert_eq!(app.resource_panel_title(), "Containers: web");
        assert!(app.log_view_visible());

        app.apply_action(Action::Down);
        let command = app.apply_action(Action::Select);
        assert_eq!(
            command,
            AppCommand::StartLogSession(LogTarget::new("default", "web", "sidecar"))
        );
        assert_eq!(app.selection().container(), "sidecar");
        assert_eq!(app.log_view().text(), "Loading logs...");
    }

    #[test]
    fn switching_namespace_clears_the_container_and_hides_logs() {
        let mut app = app_in_pod();
        app.apply_action(Action::Select);
        assert_eq!(app.selection().container(), "app");

        focus(&mut app, FocusPanel::Namespaces);
        app.apply_action(Action::Down);
        let steps = app.apply_action(Action::Select).into_steps();
        assert_eq!(steps.first(), Some(&AppCommand::StopLogSession));
        assert_eq!(app.selection().container(), "");
        assert_eq!(app.selection().resource_name(), "");
        assert!(!app.log_view_visible());
    }

    #[test]
    fn escape_leaves_the_pod_and_stops_logs() {
        let mut app = app_in_pod();
        app.apply_action(Action::Select);
        let command = app.apply_action(Action::Back);
        assert_eq!(command, AppCommand::StopLogSession);
        assert!(!app.log_view_visible());
        assert_eq!(app.selection().container(), "");
        assert_eq!(
            app.resource_list()
                .selected_row()
                .map(|row| row.label.as_str()),
            Some("web")
        );
    }

    #[test]
    fn first_chunk_replaces_loading_text() {
        let mut app = app_in_pod();
        app.apply_action(Action::Select);
        app.apply_log_display(LogDisplay::Append("one\ntw".to_string()));
        app.apply_log_display(LogDisplay::Append("o\n".to_string()));
        assert_eq!(app.log_view().text(), "one\ntwo\n");
    }

    #[test]
    fn error_line_lands_on_its_own_line() {
        let mut app = app_in_pod();
        app.apply_action(Action::Select);
        app.apply_log_display(LogDisplay::Append("partial".to_string()));
        app.apply_log_display(LogDisplay::ErrorLine(
            "Error reading logs: connection reset".to_string(),
        ));
        assert_eq!(
            app.log_view().text(),
            "partial\nError reading logs: connection reset\n"
        );
        assert_eq!(app.status(), "Error reading logs: connection reset");
    }

    #[test]
    fn stale_pod_result_is_ignored() {
        let mut app = app_in_pod();
        app.apply_action(Action::Back);
        focus(&mut app, FocusPanel::Kinds);
        app.apply_action(Action::Select);
        app.show_pod(pod("default", "web", &["app"]));
        assert!(!app.log_view_visible());
    }

    #[test]
    fn non_pod_resource_renders_detail_without_commands() {
        let mut app = app();
        app.set_namespaces(vec!["default".to_string()]);
        app.apply_action(Action::Select);
        focus(&mut app, FocusPanel::Kinds);
        let slot = ResourceKind::ALL
            .iter()
            .position(|kind| *kind == ResourceKind::ConfigMap)
            .unwrap();
        app.apply_action(Action::Top);
        for _ in 0..slot {
            app.apply_action(Action::Down);
        }
        let steps = app.apply_action(Action::Select).into_steps();
        assert_eq!(
            steps.last(),
            Some(&AppCommand::LoadResources {
                kind: ResourceKind::ConfigMap,
                namespace: "default".to_string(),
            })
        );

        let mut table = ResourceTable::new(ResourceKind::ConfigMap, "default");
        table.push(
            "0 keys".to_string(),
            ResourceObject::ConfigMap(ConfigMap {
                metadata: meta("default", "settings"),
                ..Default::default()
            }),
        );
        app.set_resource_table(table);
        focus(&mut app, FocusPanel::Resources);
        assert_eq!(app.apply_action(Action::Select), AppCommand::None);
        assert!(app.detail_view().text().starts_with("ConfigMap: settings"));
    }

    #[test]
    fn stale_table_is_dropped() {
        let mut app = app();
        app.set_namespaces(vec!["default".to_string()]);
        app.apply_action(Action::Select);
        app.set_resource_table(pod_table("other", &[("web", &["app"])]));
        assert_eq!(app.resource_list().item_count(), 0);
    }

    #[test]
    fn delete_waits_for_confirmation() {
        let mut app = app();
        app.set_namespaces(vec!["scratch".to_string()]);
        assert_eq!(app.apply_action(Action::Delete), AppCommand::None);
        assert_eq!(app.pending_confirmation_prompt(), Some("Delete Namespace scratch"));

        assert_eq!(app.apply_action(Action::Down), AppCommand::None);
        assert!(app.pending_confirmation_prompt().is_some());

        let command = app.apply_action(Action::ConfirmYes);
        assert_eq!(
            command,
            AppCommand::DeleteResource {
                kind: ResourceKind::Namespace,
                namespace: None,
                name: "scratch".to_string(),
            }
        );
        assert!(app.pending_confirmation_prompt().is_none());
    }

    #[test]
    fn delete_can_be_cancelled() {
        let mut app = app();
        app.set_namespaces(vec!["scratch".to_string()]);
        app.apply_action(Action::Delete);
        assert_eq!(app.apply_action(Action::ConfirmNo), AppCommand::None);
        assert_eq!(app.status(), "Action cancelled");
        assert!(app.pending_confirmation_prompt().is_none());
    }

    #[test]
    fn deleting_selected_resource_clears_it_and_reloads() {
        let mut app = app();
        app.set_namespaces(vec!["default".to_string()]);
        app.apply_action(Action::Select);
        app.set_resource_table(pod_table("default", &[("web", &["app"])]));
        focus(&mut app, FocusPanel::Resources);
        app.apply_action(Action::Select);
        app.show_pod(pod("default", "web", &["app"]));
        app.apply_action(Action::Back);

        app.apply_action(Action::Delete);
        let command = app.apply_action(Action::ConfirmYes);
        assert_eq!(
            command,
            AppCommand::DeleteResource {
                kind: ResourceKind::Pod,
                namespace: Some("default".to_string()),
                name: "web".to_string(),
            }
        );
        let reload = app.resource_deleted(ResourceKind::Pod, "web");
        assert_eq!(app.selection().resource_name(), "");
        assert_eq!(
            reload,
            AppCommand::LoadResources {
                kind: ResourceKind::Pod,
                namespace: "default".to_string(),
            }
        );
    }

    #[test]
    fn load_failure_is_shown_in_status() {
        let mut app = app();
        app.resource_load_failed(ResourceKind::Pod, &BrowserError::NoNamespaceSelected);
        assert_eq!(app.status(), BrowserError::NoNamespaceSelected.status_line());
    }

    #[test]
    fn list_cursor_is_clamped() {
        let mut list = SelectableList::default();
        list.move_by(3);
        assert_eq!(list.selected_index(), None);
        list.add_row("a", "", 0);
        list.add_row("b", "", 1);
        list.move_by(10);
        assert_eq!(list.selected_index(), Some(1));
        list.move_by(-10);
        assert_eq!(list.selected_index(), Some(0));
    }

    #[test]
    fn text_view_keeps_only_the_newest_lines() {
        let mut view = TextView::new("Logs", 3, true);
        view.append("1\n2\n3\n4\n5");
        assert_eq!(view.text(), "3\n4\n5");
        view.set_viewport(2);
        assert_eq!(view.offset(), 1);
        view.scroll_by(-1);
        assert!(!view.is_following());
        assert_eq!(view.offset(), 0);
    }
}
