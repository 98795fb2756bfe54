// Helper functions to build test graphs with various configurations

use pipeline_canvas::{
    EdgeInstance, GraphModel, NodeInstance, NodeInstanceFactory, NodeTypeRegistry, Position,
    SequentialIdGenerator, DEFAULT_INPUT, DEFAULT_OUTPUT, FAILED_OUTPUT, SUCCESS_OUTPUT,
};
use std::sync::Arc;

pub fn registry() -> Arc<NodeTypeRegistry> {
    Arc::new(NodeTypeRegistry::builtin())
}

/// A factory-built block with a fixed id
pub fn block(registry: &Arc<NodeTypeRegistry>, id: &str, type_id: &str, x: f64, y: f64) -> NodeInstance {
    NodeInstanceFactory::new(Arc::clone(registry), Box::new(SequentialIdGenerator::new("unused_")))
        .create_instance(type_id, Position::new(x, y), Some(id.to_string()))
        .unwrap()
}

pub fn edge(id: &str, source: &str, source_handle: &str, target: &str) -> EdgeInstance {
    EdgeInstance::new(id, source, source_handle, target, DEFAULT_INPUT)
}

/// Graph holding only the protected start node `s1`
pub fn start_graph() -> GraphModel {
    let registry = registry();
    let start = block(&registry, "s1", "start", 250.0, 25.0);
    GraphModel::with_start_node(registry, start).unwrap()
}

/// s1 → n1 (os_package)
pub fn create_start_and_package() -> GraphModel {
    let mut graph = start_graph();
    graph
        .add_node(block(&registry(), "n1", "os_package", 100.0, 100.0))
        .unwrap();
    graph
}

/// n1 (run_tests) with `success-output` already wired to n2
pub fn create_tests_with_success_branch() -> GraphModel {
    let registry = registry();
    let mut graph = start_graph();
    graph.add_node(block(&registry, "n1", "run_tests", 250.0, 150.0)).unwrap();
    graph.add_node(block(&registry, "n2", "deploy", 150.0, 300.0)).unwrap();
    graph.add_node(block(&registry, "n3", "notify", 350.0, 300.0)).unwrap();
    graph.add_edge(edge("e1", "n1", SUCCESS_OUTPUT, "n2")).unwrap();
    graph
}

/// s1 → n1 → n2, shell steps in a line
pub fn create_linear_graph() -> GraphModel {
    let registry = registry();
    let mut graph = start_graph();
    graph.add_node(block(&registry, "n1", "shell_script", 250.0, 150.0)).unwrap();
    graph.add_node(block(&registry, "n2", "shell_script", 250.0, 300.0)).unwrap();
    graph.add_edge(edge("e1", "s1", DEFAULT_OUTPUT, "n1")).unwrap();
    graph.add_edge(edge("e2", "n1", DEFAULT_OUTPUT, "n2")).unwrap();
    graph
}

/// checkout → build → tests, tests branching to deploy and notify
pub fn create_release_pipeline() -> GraphModel {
    let registry = registry();
    let mut graph = start_graph();
    for (id, type_id, y) in [
        ("checkout", "git_checkout", 125.0),
        ("build", "docker_build", 225.0),
        ("tests", "run_tests", 325.0),
        ("deploy", "deploy", 425.0),
        ("alert", "notify", 425.0),
    ] {
        graph.add_node(block(&registry, id, type_id, 250.0, y)).unwrap();
    }
    graph.add_edge(edge("e1", "s1", DEFAULT_OUTPUT, "checkout")).unwrap();
    graph.add_edge(edge("e2", "checkout", DEFAULT_OUTPUT, "build")).unwrap();
    graph.add_edge(edge("e3", "build", DEFAULT_OUTPUT, "tests")).unwrap();
    graph.add_edge(edge("e4", "tests", SUCCESS_OUTPUT, "deploy")).unwrap();
    graph.add_edge(edge("e5", "tests", FAILED_OUTPUT, "alert")).unwrap();
    graph
}
