use crate::edge::EdgeInstance;
use crate::graph::GraphModel;
use crate::registry::Fanout;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Validation severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Info,
    Warning,
    Error,
}

/// Validation issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
    pub affected_nodes: Vec<String>,
    pub issue_type: ValidationIssueType,
}

/// Types of validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssueType {
    Cycle,
    NoStartNode,
    Unreachable,
    UnhandledBranch,
    EmptyPipeline,
}

/// Complete validation result
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Warning)
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.with_severity(ValidationSeverity::Error)
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.with_severity(ValidationSeverity::Warning)
    }

    pub fn info(&self) -> Vec<&ValidationIssue> {
        self.with_severity(ValidationSeverity::Info)
    }

    fn with_severity(&self, severity: ValidationSeverity) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .collect()
    }

    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Highest severity per node, for highlighting on the canvas
    pub fn nodes_with_issues(&self) -> HashMap<String, ValidationSeverity> {
        let mut nodes: HashMap<String, ValidationSeverity> = HashMap::new();

        for issue in &self.issues {
            for node_id in &issue.affected_nodes {
                nodes
                    .entry(node_id.clone())
                    .and_modify(|severity| *severity = (*severity).max(issue.severity))
                    .or_insert(issue.severity);
            }
        }

        nodes
    }
}

type Adjacency<'a> = HashMap<&'a str, Vec<&'a EdgeInstance>>;

/// Advisory checks over a whole pipeline.
///
/// The graph already enforces its structural invariants on every mutation;
/// these are the things a pipeline author probably wants to hear about.
pub struct Validator;

impl Validator {
    /// Run all validations on a graph
    pub fn validate(graph: &GraphModel) -> ValidationResult {
        let mut result = ValidationResult::new();

        let Some(start) = graph.start_node() else {
            result.add_issue(ValidationIssue {
                severity: ValidationSeverity::Error,
                message: "No start node. The pipeline has no entry point.".to_string(),
                affected_nodes: vec![],
                issue_type: ValidationIssueType::NoStartNode,
            });
            return result;
        };

        if graph.node_count() == 1 {
            result.add_issue(ValidationIssue {
                severity: ValidationSeverity::Info,
                message: "Pipeline has no steps yet.".to_string(),
                affected_nodes: vec![start.id.clone()],
                issue_type: ValidationIssueType::EmptyPipeline,
            });
        }

        let outgoing = Self::adjacency(graph);

        if let Some(cycle) = Self::detect_cycle(graph, &outgoing) {
            result.add_issue(ValidationIssue {
                severity: ValidationSeverity::Warning,
                message: format!(
                    "Cycle detected between {} block(s). This pipeline may never finish.",
                    cycle.len()
                ),
                affected_nodes: cycle,
                issue_type: ValidationIssueType::Cycle,
            });
        }

        let unreachable = Self::find_unreachable(graph, &outgoing, &start.id);
        if !unreachable.is_empty() {
            result.add_issue(ValidationIssue {
                severity: ValidationSeverity::Info,
                message: format!(
                    "{} block(s) are not reachable from the start node and will never run.",
                    unreachable.len()
                ),
                affected_nodes: unreachable,
                issue_type: ValidationIssueType::Unreachable,
            });
        }

        for (node_id, handle_id) in Self::find_unhandled_branches(graph, &outgoing) {
            result.add_issue(ValidationIssue {
                severity: ValidationSeverity::Info,
                message: format!("Branch '{}' of block '{}' leads nowhere.", handle_id, node_id),
                affected_nodes: vec![node_id],
                issue_type: ValidationIssueType::UnhandledBranch,
            });
        }

        result
    }

    /// Outgoing edges per node, in insertion order
    fn adjacency(graph: &GraphModel) -> Adjacency<'_> {
        let mut outgoing: Adjacency<'_> = HashMap::new();
        for edge in graph.edges() {
            outgoing
                .entry(edge.source_node_id.as_str())
                .or_default()
                .push(edge);
        }
        outgoing
    }

    /// Detect a directed cycle with an iterative DFS; returns the nodes on it
    fn detect_cycle(graph: &GraphModel, outgoing: &Adjacency<'_>) -> Option<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::new();

        for node in graph.nodes() {
            let root = node.id.as_str();
            if !visited.insert(root) {
                continue;
            }

            // Current path with the index of the next edge to follow
            let mut path: Vec<(&str, usize)> = vec![(root, 0)];
            let mut on_path: HashSet<&str> = HashSet::from([root]);

            while let Some(&(current, next)) = path.last() {
                let edges = outgoing.get(current).map(Vec::as_slice).unwrap_or_default();

                let Some(edge) = edges.get(next) else {
                    on_path.remove(current);
                    path.pop();
                    continue;
                };
                if let Some(top) = path.last_mut() {
                    top.1 += 1;
                }

                let target = edge.target_node_id.as_str();
                if on_path.contains(target) {
                    let pos = path.iter().position(|(id, _)| *id == target).unwrap_or(0);
                    return Some(path[pos..].iter().map(|(id, _)| id.to_string()).collect());
                }
                if visited.insert(target) {
                    on_path.insert(target);
                    path.push((target, 0));
                }
            }
        }

        None
    }

    /// Nodes not reachable from the start node, in graph order
    fn find_unreachable(graph: &GraphModel, outgoing: &Adjacency<'_>, start_id: &str) -> Vec<String> {
        let mut reachable: HashSet<&str> = HashSet::new();
        let mut queue = vec![start_id];

        while let Some(node_id) = queue.pop() {
            if !reachable.insert(node_id) {
                continue;
            }
            if let Some(edges) = outgoing.get(node_id) {
                queue.extend(edges.iter().map(|edge| edge.target_node_id.as_str()));
            }
        }

        graph
            .nodes()
            .filter(|node| !reachable.contains(node.id.as_str()))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Fanout-limited handles with nothing attached
    fn find_unhandled_branches(graph: &GraphModel, outgoing: &Adjacency<'_>) -> Vec<(String, String)> {
        let mut unhandled = Vec::new();

        for node in graph.nodes() {
            let Ok(definition) = graph.registry().lookup(&node.type_id) else {
                continue;
            };
            let edges = outgoing.get(node.id.as_str()).map(Vec::as_slice).unwrap_or_default();
            for handle in definition.outputs.handles() {
                if matches!(handle.fanout, Fanout::Limited(_))
                    && !edges.iter().any(|edge| edge.source_handle_id == handle.id)
                {
                    unhandled.push((node.id.clone(), handle.id.to_string()));
                }
            }
        }

        unhandled
    }
}

/// Extension trait for running diagnostics on a graph
pub trait ValidatedGraph {
    fn validate(&self) -> ValidationResult;
}

impl ValidatedGraph for GraphModel {
    fn validate(&self) -> ValidationResult {
        Validator::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeInstance;
    use crate::node::{NodeInstance, Position};
    use crate::registry::{NodeTypeRegistry, DEFAULT_INPUT, DEFAULT_OUTPUT, FAILED_OUTPUT, SUCCESS_OUTPUT};
    use std::sync::Arc;

    fn block(registry: &NodeTypeRegistry, id: &str, type_id: &str) -> NodeInstance {
        let def = registry.lookup(type_id).unwrap();
        let mut node = NodeInstance::new(id, type_id, Position::default(), def.default_payload.clone());
        node.deletable = def.deletable;
        node
    }

    fn graph_with(blocks: &[(&str, &str)]) -> GraphModel {
        let registry = Arc::new(NodeTypeRegistry::builtin());
        let mut graph = GraphModel::with_start_node(
            Arc::clone(&registry),
            block(&registry, "s1", "start"),
        )
        .unwrap();
        for (id, type_id) in blocks {
            graph.add_node(block(&registry, id, type_id)).unwrap();
        }
        graph
    }

    fn connect(graph: &mut GraphModel, id: &str, source: &str, handle: &str, target: &str) {
        graph
            .add_edge(EdgeInstance::new(id, source, handle, target, DEFAULT_INPUT))
            .unwrap();
    }

    #[test]
    fn test_no_start_node_error() {
        let graph = GraphModel::new(Arc::new(NodeTypeRegistry::builtin()));
        let result = Validator::validate(&graph);
        assert!(result.has_errors());
        assert_eq!(result.errors()[0].issue_type, ValidationIssueType::NoStartNode);
    }

    #[test]
    fn test_empty_pipeline_info() {
        let graph = graph_with(&[]);
        let result = graph.validate();
        assert!(result.is_valid());
        assert_eq!(result.info()[0].issue_type, ValidationIssueType::EmptyPipeline);
    }

    #[test]
    fn test_cycle_detection() {
        let mut graph = graph_with(&[("a", "shell_script"), ("b", "shell_script")]);
        connect(&mut graph, "e0", "s1", DEFAULT_OUTPUT, "a");
        connect(&mut graph, "e1", "a", DEFAULT_OUTPUT, "b");
        connect(&mut graph, "e2", "b", DEFAULT_OUTPUT, "a");

        let result = Validator::validate(&graph);
        assert!(result.has_warnings());

        let cycle = &result.warnings()[0];
        assert_eq!(cycle.issue_type, ValidationIssueType::Cycle);
        assert_eq!(cycle.affected_nodes, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_long_chain_does_not_exhaust_stack() {
        let mut graph = graph_with(&[]);
        let mut previous = "s1".to_string();
        for i in 0..10_000 {
            let id = format!("n{}", i);
            let step = block(graph.registry(), &id, "shell_script");
            graph.add_node(step).unwrap();
            connect(&mut graph, &format!("e{}", i), &previous, DEFAULT_OUTPUT, &id);
            previous = id;
        }
        connect(&mut graph, "back", &previous, DEFAULT_OUTPUT, "n5000");

        let result = Validator::validate(&graph);
        let cycle = &result.warnings()[0];
        assert_eq!(cycle.issue_type, ValidationIssueType::Cycle);
        assert_eq!(cycle.affected_nodes.len(), 5_000);
        assert_eq!(cycle.affected_nodes[0], "n5000");
        assert!(result.info().is_empty());
    }

    #[test]
    fn test_unreachable_detection() {
        let mut graph = graph_with(&[("a", "shell_script"), ("lost", "notify")]);
        connect(&mut graph, "e0", "s1", DEFAULT_OUTPUT, "a");

        let result = Validator::validate(&graph);
        let unreachable: Vec<&ValidationIssue> = result
            .info()
            .into_iter()
            .filter(|i| i.issue_type == ValidationIssueType::Unreachable)
            .collect();
        assert_eq!(unreachable.len(), 1);
        assert_eq!(unreachable[0].affected_nodes, vec!["lost".to_string()]);
    }

    #[test]
    fn test_unhandled_branch() {
        let mut graph = graph_with(&[("t", "run_tests"), ("d", "deploy")]);
        connect(&mut graph, "e0", "s1", DEFAULT_OUTPUT, "t");
        connect(&mut graph, "e1", "t", SUCCESS_OUTPUT, "d");

        let result = graph.validate();
        let branches: Vec<String> = result
            .issues
            .iter()
            .filter(|i| i.issue_type == ValidationIssueType::UnhandledBranch)
            .map(|i| i.message.clone())
            .collect();

        assert_eq!(branches.len(), 3);
        assert!(branches[0].contains(FAILED_OUTPUT));
    }

    #[test]
    fn test_nodes_with_issues_keeps_highest_severity() {
        let mut graph = graph_with(&[("a", "condition"), ("b", "shell_script")]);
        connect(&mut graph, "e1", "a", SUCCESS_OUTPUT, "b");
        connect(&mut graph, "e2", "b", DEFAULT_OUTPUT, "a");

        let result = graph.validate();
        let nodes = result.nodes_with_issues();

        // Unreachable (info), unhandled branch (info), cycle (warning)
        assert_eq!(nodes["a"], ValidationSeverity::Warning);
        assert_eq!(nodes["b"], ValidationSeverity::Warning);
        assert!(!nodes.contains_key("s1"));
    }
}
