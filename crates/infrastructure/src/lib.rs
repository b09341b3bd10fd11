//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_subject_lease_coordinator;
mod in_memory_training_store;
mod postgres_assignment_repository;
mod postgres_catalog_repository;
mod postgres_change_log_repository;
mod postgres_completion_repository;
mod postgres_identity_repository;
mod postgres_subject_lease_coordinator;
mod postgres_support;
mod redis_subject_lease_coordinator;

pub use in_memory_subject_lease_coordinator::InMemorySubjectLeaseCoordinator;
pub use in_memory_training_store::InMemoryTrainingStore;
pub use postgres_assignment_repository::PostgresAssignmentRepository;
pub use postgres_catalog_repository::PostgresCatalogRepository;
pub use postgres_change_log_repository::PostgresChangeLogRepository;
pub use postgres_completion_repository::PostgresCompletionRepository;
pub use postgres_identity_repository::PostgresIdentityRepository;
pub use postgres_subject_lease_coordinator::PostgresSubjectLeaseCoordinator;
pub use redis_subject_lease_coordinator::RedisSubjectLeaseCoordinator;
