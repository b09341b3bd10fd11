use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use tutela_application::{
    AppliedAssignmentChanges, AssignmentChangeSet, AssignmentRepository, CatalogRepository,
    ChangeLogRepository, CompletionRepository, CompletionTransition, DeleteGuard,
    IdentityRepository,
};
use tutela_core::{AppError, AppResult, DepartmentId, GroupId, RoleId, SubjectId};
use tutela_domain::{Assignment, ChangeLogEntry, CompletionRecord, ItemRef, SubjectProfile};

#[cfg(test)]
mod tests;

/// In-memory implementation of every training store port.
#[derive(Debug, Default)]
pub struct InMemoryTrainingStore {
    subjects: RwLock<BTreeMap<SubjectId, SubjectProfile>>,
    roles: RwLock<HashMap<RoleId, Option<DepartmentId>>>,
    departments: RwLock<BTreeSet<DepartmentId>>,
    groups: RwLock<BTreeSet<GroupId>>,
    role_requirements: RwLock<HashMap<RoleId, BTreeSet<ItemRef>>>,
    department_requirements: RwLock<HashMap<DepartmentId, BTreeSet<ItemRef>>>,
    group_requirements: RwLock<HashMap<GroupId, BTreeSet<ItemRef>>>,
    assignments: RwLock<Vec<Assignment>>,
    completions: RwLock<Vec<CompletionRecord>>,
    change_log: RwLock<Vec<ChangeLogEntry>>,
    fail_next_apply: AtomicBool,
}

impl InMemoryTrainingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a department.
    pub async fn insert_department(&self, department_id: DepartmentId) {
        self.departments.write().await.insert(department_id);
    }

    /// Registers a role with an optional fallback department.
    pub async fn insert_role(&self, role_id: RoleId, department_id: Option<DepartmentId>) {
        self.roles.write().await.insert(role_id, department_id);
    }

    /// Registers a group.
    pub async fn insert_group(&self, group_id: GroupId) {
        self.groups.write().await.insert(group_id);
    }

    /// Inserts or replaces a subject and its memberships.
    pub async fn insert_subject(&self, profile: SubjectProfile) {
        self.subjects
            .write()
            .await
            .insert(profile.subject_id, profile);
    }

    /// Removes a subject from the identity store, leaving its assignments behind.
    pub async fn remove_subject(&self, subject_id: SubjectId) {
        self.subjects.write().await.remove(&subject_id);
    }

    /// Links an item to a role.
    pub async fn add_role_requirement(&self, role_id: RoleId, item: ItemRef) {
        self.role_requirements
            .write()
            .await
            .entry(role_id)
            .or_default()
            .insert(item);
    }

    /// Links an item to a department.
    pub async fn add_department_requirement(&self, department_id: DepartmentId, item: ItemRef) {
        self.department_requirements
            .write()
            .await
            .entry(department_id)
            .or_default()
            .insert(item);
    }

    /// Links an item to a group.
    pub async fn add_group_requirement(&self, group_id: GroupId, item: ItemRef) {
        self.group_requirements
            .write()
            .await
            .entry(group_id)
            .or_default()
            .insert(item);
    }

    /// Inserts a row without any uniqueness check, for legacy and duplicate fixtures.
    pub async fn insert_raw_assignment(&self, assignment: Assignment) {
        self.assignments.write().await.push(assignment);
    }

    /// Makes the next `apply_changes` call fail as unavailable without touching state.
    pub fn fail_next_apply(&self) {
        self.fail_next_apply.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityRepository for InMemoryTrainingStore {
    async fn find_subject(&self, subject_id: SubjectId) -> AppResult<Option<SubjectProfile>> {
        Ok(self.subjects.read().await.get(&subject_id).cloned())
    }

    async fn set_subject_role(
        &self,
        subject_id: SubjectId,
        role_id: Option<RoleId>,
    ) -> AppResult<()> {
        let mut subjects = self.subjects.write().await;
        let profile = subjects.get_mut(&subject_id).ok_or_else(|| {
            AppError::NotFound(format!("subject '{subject_id}' does not exist"))
        })?;
        profile.role_id = role_id;
        Ok(())
    }

    async fn list_department_members(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<Vec<SubjectId>> {
        Ok(self
            .subjects
            .read()
            .await
            .values()
            .filter_map(|profile| {
                (profile.department_id == Some(department_id)).then_some(profile.subject_id)
            })
            .collect())
    }

    async fn list_group_members(&self, group_id: GroupId) -> AppResult<Vec<SubjectId>> {
        Ok(self
            .subjects
            .read()
            .await
            .values()
            .filter_map(|profile| {
                profile
                    .group_ids
                    .contains(&group_id)
                    .then_some(profile.subject_id)
            })
            .collect())
    }

    async fn list_subjects(&self) -> AppResult<Vec<SubjectId>> {
        Ok(self.subjects.read().await.keys().copied().collect())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryTrainingStore {
    async fn role_exists(&self, role_id: RoleId) -> AppResult<bool> {
        Ok(self.roles.read().await.contains_key(&role_id))
    }

    async fn department_exists(&self, department_id: DepartmentId) -> AppResult<bool> {
        Ok(self.departments.read().await.contains(&department_id))
    }

    async fn group_exists(&self, group_id: GroupId) -> AppResult<bool> {
        Ok(self.groups.read().await.contains(&group_id))
    }

    async fn role_department(&self, role_id: RoleId) -> AppResult<Option<DepartmentId>> {
        Ok(self.roles.read().await.get(&role_id).copied().flatten())
    }

    async fn role_requirements(&self, role_id: RoleId) -> AppResult<BTreeSet<ItemRef>> {
        Ok(self
            .role_requirements
            .read()
            .await
            .get(&role_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn department_requirements(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<BTreeSet<ItemRef>> {
        Ok(self
            .department_requirements
            .read()
            .await
            .get(&department_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn group_requirements(&self, group_id: GroupId) -> AppResult<BTreeSet<ItemRef>> {
        Ok(self
            .group_requirements
            .read()
            .await
            .get(&group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn items_with_requirement_trail(
        &self,
        items: &BTreeSet<ItemRef>,
    ) -> AppResult<BTreeSet<ItemRef>> {
        let mut linked = BTreeSet::new();
        linked.extend(self.role_requirements.read().await.values().flatten().copied());
        linked.extend(
            self.department_requirements
                .read()
                .await
                .values()
                .flatten()
                .copied(),
        );
        linked.extend(self.group_requirements.read().await.values().flatten().copied());

        Ok(items.intersection(&linked).copied().collect())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryTrainingStore {
    async fn list_assignments(&self, subject_id: SubjectId) -> AppResult<Vec<Assignment>> {
        let mut rows: Vec<Assignment> = self
            .assignments
            .read()
            .await
            .iter()
            .filter(|row| row.subject_id == subject_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.assigned_at, row.assignment_id));
        Ok(rows)
    }

    async fn list_subjects_with_assignments(&self) -> AppResult<Vec<SubjectId>> {
        let subjects: BTreeSet<SubjectId> = self
            .assignments
            .read()
            .await
            .iter()
            .map(|row| row.subject_id)
            .collect();
        Ok(subjects.into_iter().collect())
    }

    async fn apply_changes(
        &self,
        subject_id: SubjectId,
        changes: AssignmentChangeSet,
    ) -> AppResult<AppliedAssignmentChanges> {
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            return Err(AppError::Unavailable(
                "in-memory assignment store is unavailable".to_owned(),
            ));
        }

        let mut assignments = self.assignments.write().await;
        let mut applied = AppliedAssignmentChanges::default();

        let before = assignments.len();
        assignments.retain(|row| {
            let targeted =
                row.subject_id == subject_id && changes.delete.contains(&row.assignment_id);
            let protected =
                changes.delete_guard == DeleteGuard::IncompleteOnly && row.is_completed();
            !targeted || protected
        });
        applied.deleted = u32::try_from(before - assignments.len()).unwrap_or(u32::MAX);

        for row in changes.insert {
            let exists = assignments
                .iter()
                .any(|existing| existing.subject_id == subject_id && existing.item == row.item);
            if exists {
                applied.skipped += 1;
                continue;
            }
            let mut assignment = row.into_assignment();
            assignment.subject_id = subject_id;
            assignments.push(assignment);
            applied.inserted += 1;
        }

        Ok(applied)
    }

    async fn mark_completed(
        &self,
        subject_id: SubjectId,
        item: ItemRef,
        completed_at: DateTime<Utc>,
    ) -> AppResult<Option<CompletionTransition>> {
        let mut assignments = self.assignments.write().await;
        let Some(row) = assignments
            .iter_mut()
            .filter(|row| row.subject_id == subject_id && row.item == item)
            .min_by_key(|row| (row.completed_at.is_none(), row.assigned_at, row.assignment_id))
        else {
            return Ok(None);
        };

        let newly_completed = row.completed_at.is_none();
        if newly_completed {
            row.completed_at = Some(completed_at);
        }

        Ok(Some(CompletionTransition {
            assignment: row.clone(),
            newly_completed,
        }))
    }
}

#[async_trait]
impl CompletionRepository for InMemoryTrainingStore {
    async fn record_completion(&self, record: CompletionRecord) -> AppResult<()> {
        let mut completions = self.completions.write().await;
        let exists = completions.iter().any(|existing| {
            existing.subject_id == record.subject_id
                && existing.item == record.item
                && existing.completed_at == record.completed_at
        });
        if !exists {
            completions.push(record);
        }
        Ok(())
    }

    async fn has_completed(&self, subject_id: SubjectId, item: ItemRef) -> AppResult<bool> {
        Ok(self
            .completions
            .read()
            .await
            .iter()
            .any(|record| record.subject_id == subject_id && record.item == item))
    }

    async fn completed_items(&self, subject_id: SubjectId) -> AppResult<BTreeSet<ItemRef>> {
        Ok(self
            .completions
            .read()
            .await
            .iter()
            .filter(|record| record.subject_id == subject_id)
            .map(|record| record.item)
            .collect())
    }

    async fn list_completions(&self, subject_id: SubjectId) -> AppResult<Vec<CompletionRecord>> {
        let mut records: Vec<CompletionRecord> = self
            .completions
            .read()
            .await
            .iter()
            .filter(|record| record.subject_id == subject_id)
            .cloned()
            .collect();
        records.sort_by(|left, right| right.completed_at.cmp(&left.completed_at));
        Ok(records)
    }
}

#[async_trait]
impl ChangeLogRepository for InMemoryTrainingStore {
    async fn append_entry(&self, entry: ChangeLogEntry) -> AppResult<()> {
        self.change_log.write().await.push(entry);
        Ok(())
    }

    async fn list_entries(
        &self,
        subject_id: SubjectId,
        limit: usize,
    ) -> AppResult<Vec<ChangeLogEntry>> {
        Ok(self
            .change_log
            .read()
            .await
            .iter()
            .rev()
            .filter(|entry| entry.subject_id == subject_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
