use serde::{Deserialize, Serialize};
use tutela_core::{DepartmentId, GroupId, RoleId, SubjectId};

/// Group memberships of one subject as seen by requirement resolution.
///
/// A subject holds at most one role and at most one department; both may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    /// Stable subject identifier.
    pub subject_id: SubjectId,
    /// Current role, if any.
    pub role_id: Option<RoleId>,
    /// Directly assigned department, if any.
    pub department_id: Option<DepartmentId>,
    /// Group memberships.
    pub group_ids: Vec<GroupId>,
}

impl SubjectProfile {
    /// Creates a profile without role, department or groups.
    #[must_use]
    pub fn new(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            role_id: None,
            department_id: None,
            group_ids: Vec::new(),
        }
    }

    /// Sets the role.
    #[must_use]
    pub fn with_role(mut self, role_id: RoleId) -> Self {
        self.role_id = Some(role_id);
        self
    }

    /// Sets the direct department.
    #[must_use]
    pub fn with_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    /// Adds a group membership.
    #[must_use]
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        if !self.group_ids.contains(&group_id) {
            self.group_ids.push(group_id);
        }
        self
    }
}

/// Grouping that mandates a requirement for its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum RequirementSource {
    /// Requirement inherited from the subject's role.
    Role(RoleId),
    /// Requirement inherited from the subject's department.
    Department(DepartmentId),
    /// Requirement inherited from a group membership.
    Group(GroupId),
}

impl RequirementSource {
    /// Returns a stable label for the source kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role(_) => "role",
            Self::Department(_) => "department",
            Self::Group(_) => "group",
        }
    }
}
