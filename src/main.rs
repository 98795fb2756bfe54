use anyhow::{Context, Result};
use pipeline_canvas::{
    EngineConfig, PipelineEditor, Position, DEFAULT_INPUT, DEFAULT_OUTPUT, FAILED_OUTPUT,
    SUCCESS_OUTPUT,
};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipeline_canvas=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Optional engine config as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::default(),
    };

    println!("Pipeline Canvas - build, test, deploy");
    println!("=====================================\n");

    let mut editor = PipelineEditor::new(config)?;
    let start = editor
        .graph()
        .start_node()
        .map(|node| node.id.clone())
        .context("editor has no start node")?;

    println!("✓ Palette: {} block types", editor.palette(None).len());

    // Lay the blocks out top to bottom
    let checkout = editor.drop_block("git_checkout", Position::new(250.0, 125.0))?;
    let build = editor.drop_block("docker_build", Position::new(250.0, 225.0))?;
    let tests = editor.drop_block("run_tests", Position::new(250.0, 325.0))?;
    let deploy = editor.drop_block("deploy", Position::new(150.0, 425.0))?;
    let alert = editor.drop_block("notify", Position::new(350.0, 425.0))?;

    let mut payload = editor
        .graph()
        .get_node(&deploy)
        .map(|node| node.payload.clone())
        .context("deploy block missing")?;
    payload["environment"] = "production".into();
    editor.configure_block(&deploy, payload)?;

    editor.connect(&start, DEFAULT_OUTPUT, &checkout, DEFAULT_INPUT)?;
    editor.connect(&checkout, DEFAULT_OUTPUT, &build, DEFAULT_INPUT)?;
    editor.connect(&build, DEFAULT_OUTPUT, &tests, DEFAULT_INPUT)?;
    editor.connect(&tests, SUCCESS_OUTPUT, &deploy, DEFAULT_INPUT)?;
    editor.connect(&tests, FAILED_OUTPUT, &alert, DEFAULT_INPUT)?;

    println!(
        "✓ Built pipeline: {} blocks, {} connections",
        editor.graph().node_count(),
        editor.graph().edge_count()
    );

    // A second edge out of a one-shot outcome handle is refused
    if let Err(err) = editor.connect(&tests, FAILED_OUTPUT, &deploy, DEFAULT_INPUT) {
        println!("✗ Rejected: {}", err);
    }
    if let Err(err) = editor.delete_block(&start) {
        println!("✗ Rejected: {}", err);
    }

    let result = editor.validate();
    println!("\n🔍 Validation:");
    if result.issues.is_empty() {
        println!("  no issues");
    }
    for issue in &result.issues {
        println!("  [{:?}] {}", issue.severity, issue.message);
    }

    let json = editor
        .definition()
        .to_json()
        .context("Failed to serialize pipeline")?;
    println!("\n📄 Definition:\n{}", json);

    println!("\n  Events logged: {}", editor.graph().events().len());
    Ok(())
}
