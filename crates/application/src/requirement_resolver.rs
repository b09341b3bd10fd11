use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tutela_core::{AppResult, DepartmentId};
use tutela_domain::{ItemRef, RequirementSource, SubjectProfile};

use crate::assignment_ports::CatalogRepository;

/// Computes the set of items a subject must hold.
///
/// Sources are the subject's role, its department (the direct one, or the
/// role's department when the subject has none) and every group membership.
#[derive(Clone)]
pub struct RequirementResolver {
    catalog: Arc<dyn CatalogRepository>,
}

impl RequirementResolver {
    /// Creates a resolver over one catalog.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Returns the union of all required items.
    pub async fn resolve(&self, profile: &SubjectProfile) -> AppResult<BTreeSet<ItemRef>> {
        Ok(self
            .resolve_with_sources(profile)
            .await?
            .into_keys()
            .collect())
    }

    /// Returns required items keyed to the sources that require them.
    pub async fn resolve_with_sources(
        &self,
        profile: &SubjectProfile,
    ) -> AppResult<BTreeMap<ItemRef, Vec<RequirementSource>>> {
        let mut resolved: BTreeMap<ItemRef, Vec<RequirementSource>> = BTreeMap::new();

        if let Some(role_id) = profile.role_id {
            let items = self.catalog.role_requirements(role_id).await?;
            merge(&mut resolved, items, RequirementSource::Role(role_id));
        }

        if let Some(department_id) = self.effective_department(profile).await? {
            let items = self.catalog.department_requirements(department_id).await?;
            merge(
                &mut resolved,
                items,
                RequirementSource::Department(department_id),
            );
        }

        for group_id in &profile.group_ids {
            let items = self.catalog.group_requirements(*group_id).await?;
            merge(&mut resolved, items, RequirementSource::Group(*group_id));
        }

        Ok(resolved)
    }

    /// Returns the department whose requirements apply to the subject.
    pub async fn effective_department(
        &self,
        profile: &SubjectProfile,
    ) -> AppResult<Option<DepartmentId>> {
        if profile.department_id.is_some() {
            return Ok(profile.department_id);
        }

        match profile.role_id {
            Some(role_id) => self.catalog.role_department(role_id).await,
            None => Ok(None),
        }
    }
}

fn merge(
    resolved: &mut BTreeMap<ItemRef, Vec<RequirementSource>>,
    items: BTreeSet<ItemRef>,
    source: RequirementSource,
) {
    for item in items {
        let sources = resolved.entry(item).or_default();
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
}
