//! SiteFlow Cloud
//!
//! Declarative management of a static website bucket: one bucket with
//! website hosting, a public-read bucket policy, and public access block
//! settings that let the policy take effect.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  SiteFlow CLI                    │
//! │          (site plan/apply/destroy/output)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │  DesiredState
//! ┌─────────────────▼───────────────────────────────┐
//! │                siteflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Reconciler: observe → plan → apply       │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Retry/Timeout│  │ State Journal│            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────┬───────────────────────┘
//!         │  trait CloudProvider
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │    aws (S3)   │ │    memory     │
//! └───────────────┘ └───────────────┘
//! ```
//!
//! Concurrent applies against the same bucket are not coordinated; the
//! provider's own ownership rules are the only protection.

pub mod action;
pub mod error;
pub mod memory;
pub mod naming;
pub mod policy;
pub mod provider;
pub mod reconciler;
pub mod resource;
pub mod retry;
pub mod state;

// Re-exports
pub use action::{
    Action, ActionResult, ActionType, ApplyResult, Operation, OperationKind, Plan, PlanSummary,
    ResourceKind,
};
pub use error::{CloudError, Result};
pub use memory::{Fault, MemoryProvider};
pub use policy::PolicyDocument;
pub use provider::{AuthStatus, CloudProvider, RetryConfig};
pub use reconciler::{Reconciler, plan, plan_destroy};
pub use resource::{
    BucketHandle, BucketPresence, BucketSpec, DEFAULT_INDEX_DOCUMENT, DEFAULT_REGION,
    DesiredState, PublicAccessBlockSettings, PublicAccessPolicy, RemoteState, SiteOutputs,
    WebsiteConfig, website_endpoint,
};
pub use state::{GlobalState, ResourceState, ResourceStatus, StateManager};
