use async_trait::async_trait;
use tutela_core::{AppResult, DepartmentId, GroupId, RoleId, SubjectId};
use tutela_domain::SubjectProfile;

/// Port over the identity store (users and their memberships).
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Returns the subject with its role, department and group memberships.
    async fn find_subject(&self, subject_id: SubjectId) -> AppResult<Option<SubjectProfile>>;

    /// Persists the subject's role; `None` clears it.
    async fn set_subject_role(&self, subject_id: SubjectId, role_id: Option<RoleId>)
    -> AppResult<()>;

    /// Lists subjects whose direct department is `department_id`.
    async fn list_department_members(&self, department_id: DepartmentId)
    -> AppResult<Vec<SubjectId>>;

    /// Lists members of one group.
    async fn list_group_members(&self, group_id: GroupId) -> AppResult<Vec<SubjectId>>;

    /// Lists every known subject.
    async fn list_subjects(&self) -> AppResult<Vec<SubjectId>>;
}
