//! SiteFlow Core
//!
//! site.kdl のモデル、パーサー、ローダー。
//!
//! ```kdl
//! provider "aws" {
//!     region "us-east-1"
//! }
//!
//! bucket "my-terraform-portfolio-site-12345" {
//!     website {
//!         index-document "index.html"
//!     }
//! }
//! ```

pub mod error;
pub mod loader;
pub mod model;
pub mod parser;

pub use error::{Result, SiteError};
pub use loader::{Overrides, apply_overrides, load_site};
pub use model::{
    BucketConfig, DEFAULT_PROVIDER, ProviderConfig, PublicAccessBlockConfig, RetrySettings,
    Settings, Site, WebsiteBlock,
};
pub use parser::{parse_provider, parse_site_file, parse_site_string};
