use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;

/// Handle that receives the incoming flow on every block that has inputs
pub const DEFAULT_INPUT: &str = "default-input";
/// Handle for a block's single, unconstrained output
pub const DEFAULT_OUTPUT: &str = "default-output";
/// Branch taken when a block succeeds
pub const SUCCESS_OUTPUT: &str = "success-output";
/// Branch taken when a block fails
pub const FAILED_OUTPUT: &str = "failed-output";

/// Every block type the canvas knows about.
///
/// The catalog is closed: adding a kind means adding a descriptor in
/// [`BlockKind::definition`], which the compiler forces to stay exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Start,
    GitCheckout,
    OsPackage,
    EnvVariables,
    Cache,
    ShellScript,
    DockerBuild,
    RunTests,
    ArtifactUpload,
    Condition,
    Approval,
    Parallel,
    Deploy,
    Notify,
}

impl BlockKind {
    /// Palette order
    pub const ALL: [BlockKind; 14] = [
        BlockKind::Start,
        BlockKind::GitCheckout,
        BlockKind::OsPackage,
        BlockKind::EnvVariables,
        BlockKind::Cache,
        BlockKind::ShellScript,
        BlockKind::DockerBuild,
        BlockKind::ArtifactUpload,
        BlockKind::RunTests,
        BlockKind::Condition,
        BlockKind::Approval,
        BlockKind::Parallel,
        BlockKind::Deploy,
        BlockKind::Notify,
    ];

    /// The string identifier used on the canvas and in pipeline definitions
    pub fn type_id(self) -> &'static str {
        match self {
            BlockKind::Start => "start",
            BlockKind::GitCheckout => "git_checkout",
            BlockKind::OsPackage => "os_package",
            BlockKind::EnvVariables => "env_variables",
            BlockKind::Cache => "cache",
            BlockKind::ShellScript => "shell_script",
            BlockKind::DockerBuild => "docker_build",
            BlockKind::RunTests => "run_tests",
            BlockKind::ArtifactUpload => "artifact_upload",
            BlockKind::Condition => "condition",
            BlockKind::Approval => "approval",
            BlockKind::Parallel => "parallel",
            BlockKind::Deploy => "deploy",
            BlockKind::Notify => "notify",
        }
    }

    pub fn from_type_id(type_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_id() == type_id)
    }

    /// Build the descriptor for this kind
    pub fn definition(self) -> BlockTypeDefinition {
        match self {
            BlockKind::Start => BlockTypeDefinition::new(
                self,
                "Start",
                Category::Control,
                json!({
                    "trigger": "push",
                    "branches": ["main"],
                }),
            )
            .with_inputs(InputTopology::None)
            .protected(),

            BlockKind::GitCheckout => BlockTypeDefinition::new(
                self,
                "Git Checkout",
                Category::Source,
                json!({
                    "repository": "",
                    "branch": "main",
                    "depth": 1,
                    "submodules": false,
                }),
            ),

            BlockKind::OsPackage => BlockTypeDefinition::new(
                self,
                "OS Packages",
                Category::Setup,
                json!({
                    "manager": "apt",
                    "packages": [],
                    "update_index": true,
                }),
            ),

            BlockKind::EnvVariables => BlockTypeDefinition::new(
                self,
                "Environment Variables",
                Category::Setup,
                json!({
                    "variables": {},
                }),
            ),

            BlockKind::Cache => BlockTypeDefinition::new(
                self,
                "Cache",
                Category::Setup,
                json!({
                    "key": "",
                    "paths": [],
                    "restore_keys": [],
                }),
            ),

            BlockKind::ShellScript => BlockTypeDefinition::new(
                self,
                "Shell Script",
                Category::Build,
                json!({
                    "shell": "bash",
                    "script": "",
                    "working_directory": ".",
                    "continue_on_error": false,
                }),
            ),

            BlockKind::DockerBuild => BlockTypeDefinition::new(
                self,
                "Docker Build",
                Category::Build,
                json!({
                    "image": "",
                    "tag": "latest",
                    "dockerfile": "Dockerfile",
                    "context": ".",
                    "push": false,
                    "build_args": {},
                }),
            ),

            BlockKind::ArtifactUpload => BlockTypeDefinition::new(
                self,
                "Upload Artifact",
                Category::Build,
                json!({
                    "name": "",
                    "paths": [],
                    "retention_days": 7,
                }),
            ),

            BlockKind::RunTests => BlockTypeDefinition::new(
                self,
                "Run Tests",
                Category::Test,
                json!({
                    "command": "",
                    "framework": "",
                    "coverage": false,
                    "timeout_minutes": 30,
                }),
            )
            .with_outputs(OutputTopology::outcome()),

            BlockKind::Condition => BlockTypeDefinition::new(
                self,
                "Condition",
                Category::Control,
                json!({
                    "expression": "",
                }),
            )
            .with_outputs(OutputTopology::outcome()),

            BlockKind::Approval => BlockTypeDefinition::new(
                self,
                "Manual Approval",
                Category::Control,
                json!({
                    "approvers": [],
                    "message": "",
                    "timeout_hours": 24,
                }),
            )
            .with_outputs(OutputTopology::outcome()),

            BlockKind::Parallel => BlockTypeDefinition::new(
                self,
                "Parallel",
                Category::Control,
                json!({
                    "fail_fast": true,
                }),
            )
            .with_outputs(OutputTopology::Fixed(vec![
                "branch-1".to_string(),
                "branch-2".to_string(),
                "branch-3".to_string(),
            ])),

            BlockKind::Deploy => BlockTypeDefinition::new(
                self,
                "Deploy",
                Category::Deploy,
                json!({
                    "environment": "staging",
                    "target": "",
                    "strategy": "rolling",
                    "rollback_on_failure": true,
                }),
            )
            .with_outputs(OutputTopology::outcome()),

            BlockKind::Notify => BlockTypeDefinition::new(
                self,
                "Notify",
                Category::Notify,
                json!({
                    "channel": "email",
                    "recipients": [],
                    "message": "",
                    "on": "always",
                }),
            ),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_id())
    }
}

/// Palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Control,
    Source,
    Setup,
    Build,
    Test,
    Deploy,
    Notify,
}

/// How many edges may leave one handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fanout {
    Unbounded,
    Limited(usize),
}

/// Visual tag carried by edges leaving a handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    #[default]
    Default,
    Success,
    Failure,
}

/// Input side of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTopology {
    /// No incoming connections (the start block)
    None,
    /// One `default-input` handle
    Single,
}

impl InputTopology {
    pub fn has_handle(self, handle_id: &str) -> bool {
        match self {
            InputTopology::None => false,
            InputTopology::Single => handle_id == DEFAULT_INPUT,
        }
    }
}

/// A fixed output handle with its own fanout limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitedHandle {
    pub id: String,
    pub limit: usize,
    pub style: EdgeStyle,
}

/// Output side of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTopology {
    /// One unconstrained `default-output` handle
    Single,
    /// Several named handles, each unconstrained
    Fixed(Vec<String>),
    /// Several named handles, each with its own fanout limit
    Limited(Vec<LimitedHandle>),
}

/// A resolved output handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputHandle<'a> {
    pub id: &'a str,
    pub fanout: Fanout,
    pub style: EdgeStyle,
}

impl OutputTopology {
    /// `success-output` / `failed-output`, one edge each
    pub fn outcome() -> Self {
        OutputTopology::Limited(vec![
            LimitedHandle {
                id: SUCCESS_OUTPUT.to_string(),
                limit: 1,
                style: EdgeStyle::Success,
            },
            LimitedHandle {
                id: FAILED_OUTPUT.to_string(),
                limit: 1,
                style: EdgeStyle::Failure,
            },
        ])
    }

    /// All handles in declaration order
    pub fn handles(&self) -> Vec<OutputHandle<'_>> {
        match self {
            OutputTopology::Single => vec![OutputHandle {
                id: DEFAULT_OUTPUT,
                fanout: Fanout::Unbounded,
                style: EdgeStyle::Default,
            }],
            OutputTopology::Fixed(ids) => ids
                .iter()
                .map(|id| OutputHandle {
                    id: id.as_str(),
                    fanout: Fanout::Unbounded,
                    style: EdgeStyle::Default,
                })
                .collect(),
            OutputTopology::Limited(handles) => handles
                .iter()
                .map(|h| OutputHandle {
                    id: h.id.as_str(),
                    fanout: Fanout::Limited(h.limit),
                    style: h.style,
                })
                .collect(),
        }
    }

    /// Resolve a handle by id
    pub fn handle(&self, handle_id: &str) -> Option<OutputHandle<'_>> {
        self.handles().into_iter().find(|h| h.id == handle_id)
    }
}

/// Descriptor of one block type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTypeDefinition {
    pub kind: BlockKind,
    pub label: String,
    pub category: Category,
    pub default_payload: Value,
    pub inputs: InputTopology,
    pub outputs: OutputTopology,
    /// Default for new instances; only the start block is protected
    pub deletable: bool,
    pub selectable: bool,
}

impl BlockTypeDefinition {
    fn new(kind: BlockKind, label: &str, category: Category, default_payload: Value) -> Self {
        Self {
            kind,
            label: label.to_string(),
            category,
            default_payload,
            inputs: InputTopology::Single,
            outputs: OutputTopology::Single,
            deletable: true,
            selectable: true,
        }
    }

    fn with_inputs(mut self, inputs: InputTopology) -> Self {
        self.inputs = inputs;
        self
    }

    fn with_outputs(mut self, outputs: OutputTopology) -> Self {
        self.outputs = outputs;
        self
    }

    fn protected(mut self) -> Self {
        self.deletable = false;
        self
    }

    pub fn type_id(&self) -> &'static str {
        self.kind.type_id()
    }

    pub fn is_start(&self) -> bool {
        self.kind == BlockKind::Start
    }

    /// Fanout policy for an output handle, `None` if undeclared
    pub fn output_fanout(&self, handle_id: &str) -> Option<Fanout> {
        self.outputs.handle(handle_id).map(|h| h.fanout)
    }
}

/// Catalog of block types, fixed once built
#[derive(Debug, Clone)]
pub struct NodeTypeRegistry {
    definitions: Vec<BlockTypeDefinition>,
    index: HashMap<BlockKind, usize>,
}

impl NodeTypeRegistry {
    /// The full catalog, in palette order
    pub fn builtin() -> Self {
        Self::from_kinds(&BlockKind::ALL)
    }

    /// A catalog restricted to some kinds (duplicates are ignored)
    pub fn from_kinds(kinds: &[BlockKind]) -> Self {
        let mut definitions = Vec::with_capacity(kinds.len());
        let mut index = HashMap::with_capacity(kinds.len());

        for kind in kinds {
            if index.contains_key(kind) {
                continue;
            }
            index.insert(*kind, definitions.len());
            definitions.push(kind.definition());
        }

        Self { definitions, index }
    }

    /// Look up a block type by its string identifier
    pub fn lookup(&self, type_id: &str) -> Result<&BlockTypeDefinition> {
        BlockKind::from_type_id(type_id)
            .and_then(|kind| self.get(kind))
            .ok_or_else(|| GraphError::UnknownNodeType(type_id.to_string()))
    }

    pub fn get(&self, kind: BlockKind) -> Option<&BlockTypeDefinition> {
        self.index.get(&kind).map(|i| &self.definitions[*i])
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.lookup(type_id).is_ok()
    }

    /// Block types in insertion order, optionally restricted to a category
    pub fn list(
        &self,
        category: Option<Category>,
    ) -> impl Iterator<Item = &BlockTypeDefinition> + '_ {
        self.definitions
            .iter()
            .filter(move |def| category.map_or(true, |c| def.category == c))
    }

    /// Categories that have at least one block, in first-seen order
    pub fn categories(&self) -> Vec<Category> {
        let mut seen = Vec::new();
        for def in &self.definitions {
            if !seen.contains(&def.category) {
                seen.push(def.category);
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
