pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::{Authorization, DockTool, Person, Project};

/// The slice of the remote service this crate depends on.
///
/// Implementations classify failures into the crate error taxonomy:
/// 404 as `NotFound`, 401 as `Auth`, 429 as `RateLimited`, transport
/// failures as `Http`. No implementation retries.
#[async_trait]
pub trait Remote: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn list_people(&self) -> Result<Vec<Person>>;

    async fn get_project_dock(&self, project_id: &str) -> Result<Vec<DockTool>>;

    /// The signed-in identity and every account it can reach.
    async fn authorization(&self) -> Result<Authorization>;
}
