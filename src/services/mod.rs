//! Business logic services

pub mod catalog;
pub mod members;
pub mod policy;
pub mod stats;
pub mod workflow;

use crate::{config::AuthConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub workflow: workflow::WorkflowService,
    pub policy: policy::PolicyService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig) -> AppResult<Self> {
        Ok(Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            members: members::MembersService::new(repository.clone(), auth_config),
            workflow: workflow::WorkflowService::new(repository.clone()),
            policy: policy::PolicyService::new(repository.clone()),
            stats: stats::StatsService::new(repository),
        })
    }
}
