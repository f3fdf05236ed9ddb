//! Static stage graph: which stages exist, where execution starts, and how
//! control moves between them.
//!
//! ```text
//! research -> verify -+-> await_human_input -> synthesize
//!                     \-------------------->  synthesize -> detect_conflicts -> generate_document -> END
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stages::{
    ConflictDetectionStage, DocumentStage, HumanInputStage, ResearchStage, SharedStage,
    SynthesisStage, VerifyStage,
};
use crate::task::{TaskStage, TaskState};

/// Branch label chosen when the verify stage left a reviewable request.
pub const HUMAN_VERIFICATION_NEEDED: &str = "human_verification_needed";
/// Branch label for continuing straight to synthesis.
pub const SYNTHESIZE_DATA: &str = "synthesize_data";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("no handler registered for stage '{0}'")]
    MissingStage(StageId),

    #[error("stage '{0}' has no outgoing edge")]
    MissingEdge(StageId),

    #[error("router at '{from}' returned undeclared branch '{label}'")]
    UndeclaredBranch { from: StageId, label: String },
}

/// Named node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Research,
    Verify,
    AwaitHumanInput,
    Synthesize,
    DetectConflicts,
    GenerateDocument,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Research => "research",
            StageId::Verify => "verify",
            StageId::AwaitHumanInput => "await_human_input",
            StageId::Synthesize => "synthesize",
            StageId::DetectConflicts => "detect_conflicts",
            StageId::GenerateDocument => "generate_document",
        }
    }

    /// Marker the executor records before the stage runs.
    pub fn entering_marker(&self) -> TaskStage {
        match self {
            StageId::Research => TaskStage::Researching,
            StageId::Verify => TaskStage::Verifying,
            StageId::AwaitHumanInput => TaskStage::AwaitingHumanVerification,
            StageId::Synthesize => TaskStage::Synthesizing,
            StageId::DetectConflicts => TaskStage::DetectingConflicts,
            StageId::GenerateDocument => TaskStage::GeneratingDocument,
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where control goes after a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(StageId),
    End,
}

/// Routing function for a conditional edge. Must return one of the edge's labels.
pub type RoutePredicate = fn(&TaskState) -> &'static str;

/// Edge whose target is picked by a predicate over the state.
#[derive(Clone)]
pub struct ConditionalEdge {
    predicate: RoutePredicate,
    branches: Vec<(&'static str, Transition)>,
}

impl ConditionalEdge {
    pub fn new(predicate: RoutePredicate, branches: Vec<(&'static str, Transition)>) -> Self {
        Self {
            predicate,
            branches,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.branches.iter().map(|(label, _)| *label)
    }

    fn resolve(&self, from: StageId, state: &TaskState) -> Result<Transition, GraphError> {
        let label = (self.predicate)(state);
        self.branches
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, t)| *t)
            .ok_or_else(|| GraphError::UndeclaredBranch {
                from,
                label: label.to_string(),
            })
    }
}

#[derive(Clone)]
pub enum Edge {
    Direct(Transition),
    Conditional(ConditionalEdge),
}

/// Immutable stage graph plus the handler bound to each stage.
#[derive(Clone)]
pub struct StageGraph {
    order: Vec<StageId>,
    entry: StageId,
    edges: BTreeMap<StageId, Edge>,
    handlers: BTreeMap<StageId, SharedStage>,
    /// Stages that wait on outside input and run again when the task resumes
    gates: BTreeSet<StageId>,
}

impl StageGraph {
    /// The research pipeline with its default handlers.
    ///
    /// `review_threshold` is handed to the verify stage; `None` never asks for review.
    pub fn research(review_threshold: Option<f64>) -> Self {
        let mut edges = BTreeMap::new();
        edges.insert(StageId::Research, Edge::Direct(Transition::To(StageId::Verify)));
        edges.insert(
            StageId::Verify,
            Edge::Conditional(ConditionalEdge::new(
                route_after_verify,
                vec![
                    (
                        HUMAN_VERIFICATION_NEEDED,
                        Transition::To(StageId::AwaitHumanInput),
                    ),
                    (SYNTHESIZE_DATA, Transition::To(StageId::Synthesize)),
                ],
            )),
        );
        edges.insert(
            StageId::AwaitHumanInput,
            Edge::Direct(Transition::To(StageId::Synthesize)),
        );
        edges.insert(
            StageId::Synthesize,
            Edge::Direct(Transition::To(StageId::DetectConflicts)),
        );
        edges.insert(
            StageId::DetectConflicts,
            Edge::Direct(Transition::To(StageId::GenerateDocument)),
        );
        edges.insert(StageId::GenerateDocument, Edge::Direct(Transition::End));

        let mut handlers: BTreeMap<StageId, SharedStage> = BTreeMap::new();
        handlers.insert(StageId::Research, Arc::new(ResearchStage));
        handlers.insert(
            StageId::Verify,
            Arc::new(VerifyStage::new(review_threshold)),
        );
        handlers.insert(StageId::AwaitHumanInput, Arc::new(HumanInputStage));
        handlers.insert(StageId::Synthesize, Arc::new(SynthesisStage));
        handlers.insert(StageId::DetectConflicts, Arc::new(ConflictDetectionStage));
        handlers.insert(StageId::GenerateDocument, Arc::new(DocumentStage));

        Self {
            order: vec![
                StageId::Research,
                StageId::Verify,
                StageId::AwaitHumanInput,
                StageId::Synthesize,
                StageId::DetectConflicts,
                StageId::GenerateDocument,
            ],
            entry: StageId::Research,
            edges,
            handlers,
            gates: BTreeSet::from([StageId::AwaitHumanInput]),
        }
    }

    /// Replace the handler bound to `id`.
    pub fn with_stage(mut self, id: StageId, handler: SharedStage) -> Self {
        self.handlers.insert(id, handler);
        self
    }

    pub fn stages(&self) -> &[StageId] {
        &self.order
    }

    pub fn entry(&self) -> StageId {
        self.entry
    }

    pub fn edge(&self, from: StageId) -> Result<&Edge, GraphError> {
        self.edges.get(&from).ok_or(GraphError::MissingEdge(from))
    }

    pub fn is_terminal(&self, transition: Transition) -> bool {
        transition == Transition::End
    }

    pub fn stage(&self, id: StageId) -> Result<SharedStage, GraphError> {
        self.handlers
            .get(&id)
            .cloned()
            .ok_or(GraphError::MissingStage(id))
    }

    /// Follow the edge out of `from`, resolving the predicate if conditional.
    pub fn next(&self, from: StageId, state: &TaskState) -> Result<Transition, GraphError> {
        match self.edge(from)? {
            Edge::Direct(transition) => Ok(*transition),
            Edge::Conditional(edge) => edge.resolve(from, state),
        }
    }

    /// Where a task suspended at `suspended_at` continues.
    ///
    /// Gates re-run so they can consume the injected input; any other stage
    /// already finished, so execution moves on along its edge.
    pub fn resume_point(
        &self,
        suspended_at: StageId,
        state: &TaskState,
    ) -> Result<Transition, GraphError> {
        if self.gates.contains(&suspended_at) {
            Ok(Transition::To(suspended_at))
        } else {
            self.next(suspended_at, state)
        }
    }

    /// Check every stage has a handler and an edge, and every target is a known stage.
    pub fn validate(&self) -> Result<(), GraphError> {
        let check_target = |t: &Transition| match t {
            Transition::To(id) if !self.handlers.contains_key(id) => {
                Err(GraphError::MissingStage(*id))
            }
            _ => Ok(()),
        };
        for id in &self.order {
            self.stage(*id)?;
            match self.edge(*id)? {
                Edge::Direct(t) => check_target(t)?,
                Edge::Conditional(edge) => {
                    for (_, t) in &edge.branches {
                        check_target(t)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Suspend only when there is both a flag and something concrete to review.
fn route_after_verify(state: &TaskState) -> &'static str {
    if state.awaits_human() {
        return HUMAN_VERIFICATION_NEEDED;
    }
    if state.human_in_loop_needed() {
        tracing::warn!(
            task_id = %state.task_id(),
            "HITL flag set without a verification request; continuing to synthesis"
        );
    }
    SYNTHESIZE_DATA
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ResearchRecord, TaskId, VerificationRequest};

    fn state_with_request() -> TaskState {
        let id = TaskId::new();
        let mut state = TaskState::new(id, "topic");
        let record = ResearchRecord::new("x", "https://a", "A", "text", 0.3);
        state.request_verification(VerificationRequest {
            task_id: id,
            data_id: "x".to_string(),
            data_to_verify: record.preview(),
        });
        state
    }

    #[test]
    fn test_research_graph_validates() {
        let graph = StageGraph::research(None);
        graph.validate().unwrap();
        assert_eq!(graph.entry(), StageId::Research);
        assert_eq!(graph.stages().len(), 6);
    }

    #[test]
    fn test_verify_edge_routes_to_human_input_when_request_present() {
        let graph = StageGraph::research(None);
        assert_eq!(
            graph.next(StageId::Verify, &state_with_request()).unwrap(),
            Transition::To(StageId::AwaitHumanInput)
        );
    }

    #[test]
    fn test_verify_edge_routes_to_synthesis_when_flag_lacks_request() {
        let graph = StageGraph::research(None);
        let mut state = TaskState::new(TaskId::new(), "topic");
        state.flag_human_review();
        assert_eq!(
            graph.next(StageId::Verify, &state).unwrap(),
            Transition::To(StageId::Synthesize)
        );
    }

    #[test]
    fn test_verify_edge_is_deterministic() {
        let graph = StageGraph::research(None);
        let state = state_with_request();
        let first = graph.next(StageId::Verify, &state).unwrap();
        for _ in 0..50 {
            assert_eq!(graph.next(StageId::Verify, &state).unwrap(), first);
        }
    }

    #[test]
    fn test_document_stage_is_terminal() {
        let graph = StageGraph::research(None);
        let state = TaskState::new(TaskId::new(), "topic");
        let next = graph.next(StageId::GenerateDocument, &state).unwrap();
        assert!(graph.is_terminal(next));
    }

    #[test]
    fn test_resume_point_reruns_gate_and_advances_past_verify() {
        let graph = StageGraph::research(None);
        let state = state_with_request();
        assert_eq!(
            graph.resume_point(StageId::Verify, &state).unwrap(),
            Transition::To(StageId::AwaitHumanInput)
        );
        assert_eq!(
            graph.resume_point(StageId::AwaitHumanInput, &state).unwrap(),
            Transition::To(StageId::AwaitHumanInput)
        );
    }

    #[test]
    fn test_conditional_edge_with_undeclared_label_errors() {
        fn bogus(_: &TaskState) -> &'static str {
            "nowhere"
        }
        let edge = ConditionalEdge::new(bogus, vec![(SYNTHESIZE_DATA, Transition::End)]);
        let state = TaskState::new(TaskId::new(), "topic");
        assert_eq!(
            edge.resolve(StageId::Verify, &state).unwrap_err(),
            GraphError::UndeclaredBranch {
                from: StageId::Verify,
                label: "nowhere".to_string()
            }
        );
        assert_eq!(edge.labels().collect::<Vec<_>>(), vec![SYNTHESIZE_DATA]);
    }
}
