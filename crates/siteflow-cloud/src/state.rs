//! State journal for site resources
//!
//! Manages the `.siteflow/state.json` file which records the last observed
//! snapshot of every resource after apply or destroy. The journal is
//! informational: planning always observes the provider instead.

use crate::action::ResourceKind;
use crate::error::{CloudError, Result};
use crate::resource::{DesiredState, RemoteState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".siteflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";

/// Journal contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by `kind:bucket`
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(kind: ResourceKind, bucket: &str) -> String {
        format!("{}:{}", kind, bucket)
    }

    /// Add or update a resource
    pub fn set_resource(&mut self, key: String, state: ResourceState) {
        self.resources.insert(key, state);
        self.updated_at = Utc::now();
    }

    /// Remove a resource
    pub fn remove_resource(&mut self, key: &str) -> Option<ResourceState> {
        let result = self.resources.remove(key);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    /// Get a resource by key
    pub fn get_resource(&self, key: &str) -> Option<&ResourceState> {
        self.resources.get(key)
    }

    /// Replace every entry of the desired bucket with a fresh observation.
    ///
    /// Resources that exist are recorded as `InSync` or `Drifted`; missing
    /// ones are dropped from the journal.
    pub fn record_observation(&mut self, desired: &DesiredState, observed: &RemoteState) {
        let bucket = &desired.bucket;
        let owned = observed.is_owned();

        for kind in ResourceKind::ALL {
            let key = Self::key(kind, &bucket.name);
            let entry = match kind {
                ResourceKind::Bucket => owned.then(|| {
                    ResourceState::new(&bucket.name, kind)
                        .with_status(ResourceStatus::InSync)
                        .with_attribute("arn", serde_json::json!(bucket.arn()))
                        .with_attribute("region", serde_json::json!(bucket.region))
                }),
                ResourceKind::Website => observed.website.as_ref().filter(|_| owned).map(|w| {
                    ResourceState::new(&bucket.name, kind)
                        .with_status(ResourceStatus::matching(w == &bucket.website))
                        .with_attribute("index_document", serde_json::json!(w.index_document))
                        .with_attribute(
                            "website_endpoint",
                            serde_json::json!(bucket.website_endpoint()),
                        )
                }),
                ResourceKind::PublicAccessBlock => observed
                    .public_access_block
                    .filter(|_| owned)
                    .map(|settings| {
                        ResourceState::new(&bucket.name, kind)
                            .with_status(ResourceStatus::matching(
                                settings == desired.public_access_block,
                            ))
                            .with_attribute(
                                "settings",
                                serde_json::to_value(settings).unwrap_or_default(),
                            )
                    }),
                ResourceKind::BucketPolicy => {
                    observed.policy.as_ref().filter(|_| owned).map(|policy| {
                        ResourceState::new(&bucket.name, kind)
                            .with_status(ResourceStatus::matching(
                                desired.policy.document().is_equivalent(policy),
                            ))
                            .with_attribute("resource", serde_json::json!(desired.policy.resource_pattern()))
                    })
                }
            };

            match entry {
                Some(state) => {
                    let created_at = self.get_resource(&key).map(|s| s.created_at);
                    let mut state = state;
                    if let Some(created_at) = created_at {
                        state.created_at = created_at;
                    }
                    self.set_resource(key, state);
                }
                None => {
                    self.remove_resource(&key);
                }
            }
        }
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Bucket the resource belongs to
    pub id: String,

    /// Resource type
    pub resource_type: ResourceKind,

    /// Current status
    pub status: ResourceStatus,

    /// Resource attributes (ARN, endpoint, etc.)
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// When the resource was first recorded
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: ResourceKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type,
            status: ResourceStatus::Unknown,
            attributes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Matches the desired state
    InSync,
    /// Exists but differs from the desired state
    Drifted,
    /// Status is unknown
    Unknown,
}

impl ResourceStatus {
    fn matching(matches: bool) -> Self {
        if matches {
            ResourceStatus::InSync
        } else {
            ResourceStatus::Drifted
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::InSync => write!(f, "in-sync"),
            ResourceStatus::Drifted => write!(f, "drifted"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// State manager for reading/writing state files
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    /// Get the state directory path
    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    /// Get the state file path
    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    /// Get the backup file path
    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    /// Ensure the state directory exists
    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(GlobalState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: GlobalState = serde_json::from_str(&content)?;

        // Version check
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Save the state
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        // Create backup if state file exists
        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        // Write new state
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }

    /// Load, record a fresh observation, save
    pub async fn record(&self, desired: &DesiredState, observed: &RemoteState) -> Result<GlobalState> {
        let mut state = self.load().await?;
        state.record_observation(desired, observed);
        self.save(&state).await?;
        Ok(state)
    }
}
