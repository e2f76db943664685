// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ProjectError;
use crate::graph::{NodeId, ProtocolNode, WorkflowGraph};
use crate::observability::messages::project::{
    DispatchStarted, ProtocolScheduled, ProtocolSkipped,
};
use crate::observability::messages::StructuredLog;
use crate::project::store::ProjectStore;
use crate::traits::Scheduler;
use std::path::Path;
use tracing::Instrument;

/// What a dispatch pass did, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub scheduled: Vec<NodeId>,
    pub skipped: Vec<NodeId>,
}

/// A protocol is ignored when its class name or its label is listed.
pub fn is_ignored(node: &ProtocolNode, ignore: &[String]) -> bool {
    ignore
        .iter()
        .any(|entry| entry == node.class.class_name() || *entry == node.label)
}

/// Hand every protocol of `graph` to `scheduler`, upstream first.
///
/// Ignored protocols are only logged; what depends on them is still
/// scheduled, the framework holds it back until its inputs exist.
pub async fn schedule_graph(
    project: &Path,
    graph: &WorkflowGraph,
    scheduler: &dyn Scheduler,
    ignore: &[String],
) -> Result<ScheduleReport, ProjectError> {
    let order = graph.execution_order()?;
    let start_msg = DispatchStarted {
        project,
        scheduler: scheduler.name(),
        protocol_count: order.len(),
    };
    let span = start_msg.span("schedule_graph");
    span.in_scope(|| start_msg.log());

    dispatch_in_order(project, graph, &order, scheduler, ignore)
        .instrument(span)
        .await
}

async fn dispatch_in_order(
    project: &Path,
    graph: &WorkflowGraph,
    order: &[NodeId],
    scheduler: &dyn Scheduler,
    ignore: &[String],
) -> Result<ScheduleReport, ProjectError> {
    let mut report = ScheduleReport::default();

    for &id in order {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if is_ignored(node, ignore) {
            ProtocolSkipped {
                node_id: id.0,
                class: node.class.class_name(),
                label: &node.label,
            }
            .log();
            report.skipped.push(id);
            continue;
        }

        scheduler.schedule(project, node).await?;
        ProtocolScheduled {
            node_id: id.0,
            class: node.class.class_name(),
            label: &node.label,
        }
        .log();
        report.scheduled.push(id);
    }

    tracing::info!(
        scheduler = scheduler.name(),
        scheduled = report.scheduled.len(),
        skipped = report.skipped.len(),
        "dispatch finished"
    );
    Ok(report)
}

/// Load a stored project and schedule it.
pub async fn schedule_project(
    store: &ProjectStore,
    scheduler: &dyn Scheduler,
    ignore: &[String],
) -> Result<ScheduleReport, ProjectError> {
    let graph = store.load_graph()?;
    schedule_graph(store.path(), &graph, scheduler, ignore).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, ProtocolClass, Stage};
    use crate::observability::SpanRecorder;
    use crate::traits::LogScheduler;
    use tempfile::TempDir;

    fn picking_graph() -> WorkflowGraph {
        let mut b = GraphBuilder::new();
        let import = b
            .add(ProtocolClass::ImportMovies, "import movies", Stage::Movies)
            .id();
        let trigger = b
            .add(ProtocolClass::TriggerData, "Xmipp - trigger some mics", Stage::Picking)
            .input("inputImages", import.port("outputMovies"))
            .unwrap()
            .id();
        let manual = b
            .add(ProtocolClass::ManualPicking, "Xmipp - manual picking", Stage::Picking)
            .input("inputMicrographs", trigger.port("outputMicrographs"))
            .unwrap()
            .id();
        b.add(ProtocolClass::AutomaticPicking, "Xmipp - auto picking", Stage::Picking)
            .protocols("xmippParticlePicking", vec![manual])
            .unwrap()
            .input("inputMicrographs", trigger.port("outputMicrographs"))
            .unwrap();
        b.finish().unwrap()
    }

    #[tokio::test]
    async fn everything_is_scheduled_in_order() {
        let scheduler = LogScheduler::new();
        let report = schedule_graph(Path::new("/tmp/p"), &picking_graph(), &scheduler, &[])
            .await
            .unwrap();
        let all: Vec<NodeId> = (1..=4).map(NodeId).collect();
        assert_eq!(report.scheduled, all);
        assert!(report.skipped.is_empty());
        assert_eq!(scheduler.scheduled().await, all);
    }

    #[tokio::test]
    async fn ignore_list_matches_class_names_and_labels() {
        let scheduler = LogScheduler::new();
        let ignore = vec![
            "XmippProtParticlePicking".to_string(),
            "import movies".to_string(),
        ];
        let report = schedule_graph(Path::new("/tmp/p"), &picking_graph(), &scheduler, &ignore)
            .await
            .unwrap();
        assert_eq!(report.skipped, vec![NodeId(1), NodeId(3)]);
        assert_eq!(report.scheduled, vec![NodeId(2), NodeId(4)]);
        assert_eq!(scheduler.scheduled().await, report.scheduled);
    }

    #[tokio::test]
    async fn dispatch_events_fire_inside_the_dispatch_span() {
        let recorder = SpanRecorder::default();
        let _default = tracing::dispatcher::set_default(&recorder.dispatch());

        let scheduler = LogScheduler::new();
        let ignore = vec!["import movies".to_string()];
        schedule_graph(Path::new("/tmp/p"), &picking_graph(), &scheduler, &ignore)
            .await
            .unwrap();

        assert!(recorder.spans().contains(&"dispatch".to_string()));
        let events = recorder.event_spans();
        // start, one skip, three scheduled, summary
        assert!(events.len() >= 6);
        assert!(events.iter().all(|s| s.as_deref() == Some("dispatch")));
    }

    #[tokio::test]
    async fn stored_project_is_scheduled() {
        let tmp = TempDir::new().unwrap();
        let store = ProjectStore::create(tmp.path(), "p1").unwrap();
        store.persist(&picking_graph()).unwrap();

        let scheduler = LogScheduler::new();
        let report = schedule_project(&store, &scheduler, &["Xmipp - auto picking".to_string()])
            .await
            .unwrap();
        assert_eq!(report.skipped, vec![NodeId(4)]);
        assert_eq!(report.scheduled.len(), 3);
    }
}
