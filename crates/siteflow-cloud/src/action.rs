//! Action types for static-site resource management

use crate::policy::PolicyDocument;
use crate::resource::{PublicAccessBlockSettings, WebsiteConfig};
use serde::{Deserialize, Serialize};

/// The resources a site is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Bucket,
    Website,
    PublicAccessBlock,
    BucketPolicy,
}

impl ResourceKind {
    /// All kinds in dependency order
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Bucket,
        ResourceKind::Website,
        ResourceKind::PublicAccessBlock,
        ResourceKind::BucketPolicy,
    ];
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Bucket => write!(f, "bucket"),
            ResourceKind::Website => write!(f, "website"),
            ResourceKind::PublicAccessBlock => write!(f, "public-access-block"),
            ResourceKind::BucketPolicy => write!(f, "bucket-policy"),
        }
    }
}

/// Remote call an action maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    CreateBucket,
    PutWebsiteConfig,
    PutPublicAccessBlock,
    PutBucketPolicy,
    DeleteBucketPolicy,
    DeletePublicAccessBlock,
    DeleteWebsiteConfig,
    EmptyBucket,
    DeleteBucket,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::CreateBucket => "CreateBucket",
            OperationKind::PutWebsiteConfig => "PutWebsiteConfig",
            OperationKind::PutPublicAccessBlock => "PutPublicAccessBlock",
            OperationKind::PutBucketPolicy => "PutBucketPolicy",
            OperationKind::DeleteBucketPolicy => "DeleteBucketPolicy",
            OperationKind::DeletePublicAccessBlock => "DeletePublicAccessBlock",
            OperationKind::DeleteWebsiteConfig => "DeleteWebsiteConfig",
            OperationKind::EmptyBucket => "EmptyBucket",
            OperationKind::DeleteBucket => "DeleteBucket",
        };
        f.write_str(name)
    }
}

/// A remote call together with its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    CreateBucket {
        bucket: String,
        region: String,
    },
    PutWebsiteConfig {
        bucket: String,
        website: WebsiteConfig,
    },
    PutPublicAccessBlock {
        bucket: String,
        settings: PublicAccessBlockSettings,
    },
    PutBucketPolicy {
        bucket: String,
        policy: PolicyDocument,
    },
    DeleteBucketPolicy {
        bucket: String,
    },
    DeletePublicAccessBlock {
        bucket: String,
    },
    DeleteWebsiteConfig {
        bucket: String,
    },
    EmptyBucket {
        bucket: String,
    },
    DeleteBucket {
        bucket: String,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::CreateBucket { .. } => OperationKind::CreateBucket,
            Operation::PutWebsiteConfig { .. } => OperationKind::PutWebsiteConfig,
            Operation::PutPublicAccessBlock { .. } => OperationKind::PutPublicAccessBlock,
            Operation::PutBucketPolicy { .. } => OperationKind::PutBucketPolicy,
            Operation::DeleteBucketPolicy { .. } => OperationKind::DeleteBucketPolicy,
            Operation::DeletePublicAccessBlock { .. } => OperationKind::DeletePublicAccessBlock,
            Operation::DeleteWebsiteConfig { .. } => OperationKind::DeleteWebsiteConfig,
            Operation::EmptyBucket { .. } => OperationKind::EmptyBucket,
            Operation::DeleteBucket { .. } => OperationKind::DeleteBucket,
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            Operation::CreateBucket { .. }
            | Operation::EmptyBucket { .. }
            | Operation::DeleteBucket { .. } => ResourceKind::Bucket,
            Operation::PutWebsiteConfig { .. } | Operation::DeleteWebsiteConfig { .. } => {
                ResourceKind::Website
            }
            Operation::PutPublicAccessBlock { .. } | Operation::DeletePublicAccessBlock { .. } => {
                ResourceKind::PublicAccessBlock
            }
            Operation::PutBucketPolicy { .. } | Operation::DeleteBucketPolicy { .. } => {
                ResourceKind::BucketPolicy
            }
        }
    }

    pub fn bucket(&self) -> &str {
        match self {
            Operation::CreateBucket { bucket, .. }
            | Operation::PutWebsiteConfig { bucket, .. }
            | Operation::PutPublicAccessBlock { bucket, .. }
            | Operation::PutBucketPolicy { bucket, .. }
            | Operation::DeleteBucketPolicy { bucket }
            | Operation::DeletePublicAccessBlock { bucket }
            | Operation::DeleteWebsiteConfig { bucket }
            | Operation::EmptyBucket { bucket }
            | Operation::DeleteBucket { bucket } => bucket,
        }
    }
}

/// Represents a planned action for one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action (e.g. `create-bucket`)
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Remote call that converges the resource
    pub operation: Operation,

    /// Description of the action
    pub description: String,
}

impl Action {
    pub fn new(action_type: ActionType, operation: Operation, description: impl Into<String>) -> Self {
        let id = format!("{}-{}", action_type, operation.resource_kind());
        Self {
            id,
            action_type,
            operation,
            description: description.into(),
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.operation.resource_kind()
    }

    pub fn is_change(&self) -> bool {
        self.action_type != ActionType::NoOp
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Remote operations that were performed, in order
    pub applied: Vec<ActionResult>,

    /// Actions skipped because the resource already matched
    pub unchanged: usize,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remote mutations performed
    pub fn operation_count(&self) -> usize {
        self.applied.len()
    }

    pub fn add_success(&mut self, action: &Action, message: String) {
        self.applied.push(ActionResult {
            action_id: action.id.clone(),
            operation: action.operation.kind(),
            message,
        });
    }

    pub fn completed_operations(&self) -> Vec<OperationKind> {
        self.applied.iter().map(|r| r.operation).collect()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    pub operation: OperationKind,

    /// Success message
    pub message: String,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Actions in execution order
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(Action::is_change);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Actions that touch the remote provider
    pub fn changes(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.is_change())
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}
