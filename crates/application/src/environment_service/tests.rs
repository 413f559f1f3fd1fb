use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::Mutex;

use confidant_core::{
    AppError, AppResult, EnvironmentId, Principal, ProjectId, UserId, WorkspaceId,
};
use confidant_domain::{Authority, Environment, EventKind, Project, WorkspaceRole};

use crate::environment_ports::{
    AuthorityRepository, CreateEnvironmentInput, DefaultTransition, EnvironmentListItem,
    EnvironmentListQuery, EnvironmentRepository, EnvironmentScope, EnvironmentSortField,
    EnvironmentUpdateRecord, EventRecord, EventRepository, SortOrder, UpdateEnvironmentInput,
    UserSummary,
};
use crate::{AuthorityService, EventDispatcher, EventWriterHandle};

use super::EnvironmentService;

#[derive(Default)]
struct FakeStoreState {
    projects: HashMap<ProjectId, Project>,
    environments: HashMap<EnvironmentId, Environment>,
    roles: HashMap<(WorkspaceId, UserId), Vec<WorkspaceRole>>,
    users: HashMap<UserId, String>,
}

/// Single-lock fake store backing both the authority and environment ports,
/// mirroring the atomicity contract of the transactional adapters.
#[derive(Default)]
struct FakeStore {
    state: Mutex<FakeStoreState>,
}

impl FakeStore {
    async fn insert_project(&self, project: Project) {
        self.state
            .lock()
            .await
            .projects
            .insert(project.project_id(), project);
    }

    async fn insert_environment(&self, environment: Environment) {
        self.state
            .lock()
            .await
            .environments
            .insert(environment.environment_id(), environment);
    }

    async fn grant(&self, workspace_id: WorkspaceId, user_id: UserId, role: WorkspaceRole) {
        self.state
            .lock()
            .await
            .roles
            .entry((workspace_id, user_id))
            .or_default()
            .push(role);
    }

    async fn insert_user(&self, user_id: UserId, display_name: &str) {
        self.state
            .lock()
            .await
            .users
            .insert(user_id, display_name.to_owned());
    }

    async fn environment(&self, environment_id: EnvironmentId) -> Option<Environment> {
        self.state
            .lock()
            .await
            .environments
            .get(&environment_id)
            .cloned()
    }

    async fn default_environments(&self, project_id: ProjectId) -> Vec<Environment> {
        self.state
            .lock()
            .await
            .environments
            .values()
            .filter(|environment| {
                environment.project_id() == project_id && environment.is_default()
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuthorityRepository for FakeStore {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        Ok(self.state.lock().await.projects.get(&project_id).cloned())
    }

    async fn find_environment(
        &self,
        environment_id: EnvironmentId,
    ) -> AppResult<Option<EnvironmentScope>> {
        let state = self.state.lock().await;
        let Some(environment) = state.environments.get(&environment_id).cloned() else {
            return Ok(None);
        };
        let Some(project) = state.projects.get(&environment.project_id()) else {
            return Ok(None);
        };

        Ok(Some(EnvironmentScope {
            project_id: project.project_id(),
            workspace_id: project.workspace_id(),
            environment,
        }))
    }

    async fn list_roles_for_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> AppResult<Vec<WorkspaceRole>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .get(&(workspace_id, user_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl EnvironmentRepository for FakeStore {
    async fn create_environment(&self, environment: Environment) -> AppResult<()> {
        let mut state = self.state.lock().await;

        if environment.is_default() {
            clear_project_defaults(&mut state, environment.project_id());
        }

        state
            .environments
            .insert(environment.environment_id(), environment);
        Ok(())
    }

    async fn update_environment(&self, record: EnvironmentUpdateRecord) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let project_id = record.environment.project_id();

        match record.default_transition {
            DefaultTransition::Promote => clear_project_defaults(&mut state, project_id),
            DefaultTransition::Demote => {
                let count = state
                    .environments
                    .values()
                    .filter(|environment| environment.project_id() == project_id)
                    .count();
                if count <= 1 {
                    return Err(AppError::InvalidOperation(format!(
                        "cannot make the last environment of project '{project_id}' non-default"
                    )));
                }
            }
            DefaultTransition::Keep => {}
        }

        state
            .environments
            .insert(record.environment.environment_id(), record.environment);
        Ok(())
    }

    async fn delete_environment(&self, environment_id: EnvironmentId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let Some(environment) = state.environments.get(&environment_id) else {
            return Err(AppError::NotFound(format!(
                "environment '{environment_id}' does not exist"
            )));
        };

        if environment.is_default() {
            return Err(AppError::InvalidOperation(format!(
                "environment '{environment_id}' is its project's default and cannot be deleted"
            )));
        }

        state.environments.remove(&environment_id);
        Ok(())
    }

    async fn environment_name_exists(
        &self,
        project_id: ProjectId,
        name: &str,
    ) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .environments
            .values()
            .any(|environment| {
                environment.project_id() == project_id && environment.name().as_str() == name
            }))
    }

    async fn list_environments(
        &self,
        project_id: ProjectId,
        query: EnvironmentListQuery,
    ) -> AppResult<Vec<EnvironmentListItem>> {
        let state = self.state.lock().await;
        let mut rows: Vec<Environment> = state
            .environments
            .values()
            .filter(|environment| {
                environment.project_id() == project_id
                    && environment.name().as_str().contains(query.search.as_str())
            })
            .cloned()
            .collect();

        match query.sort_field {
            EnvironmentSortField::Name => {
                rows.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
            }
            EnvironmentSortField::CreatedAt => rows.sort_by_key(Environment::created_at),
            EnvironmentSortField::UpdatedAt => rows.sort_by_key(Environment::updated_at),
        }
        if query.sort_order == SortOrder::Desc {
            rows.reverse();
        }

        let skip = query.page as usize * query.limit as usize;
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(query.limit as usize)
            .map(|environment| EnvironmentListItem {
                last_updated_by: environment.last_updated_by().and_then(|user_id| {
                    state.users.get(&user_id).map(|display_name| UserSummary {
                        user_id,
                        display_name: display_name.clone(),
                    })
                }),
                environment,
            })
            .collect())
    }
}

fn clear_project_defaults(state: &mut FakeStoreState, project_id: ProjectId) {
    let cleared: Vec<Environment> = state
        .environments
        .values()
        .filter(|environment| environment.project_id() == project_id && environment.is_default())
        .map(|environment| environment.clone().with_default_flag(false))
        .collect();

    for environment in cleared {
        state
            .environments
            .insert(environment.environment_id(), environment);
    }
}

#[derive(Default)]
struct RecordingEventRepository {
    events: Mutex<Vec<EventRecord>>,
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn append_event(&self, event: EventRecord) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

fn must<T>(result: AppResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => panic!("unexpected error: {error}"),
    }
}

fn environment_named(project_id: ProjectId, name: &str, is_default: bool) -> Environment {
    let now = Utc::now();
    must(Environment::new(
        EnvironmentId::new(),
        project_id,
        name,
        None,
        is_default,
        None,
        now,
        now,
    ))
}

struct Harness {
    store: Arc<FakeStore>,
    events: Arc<RecordingEventRepository>,
    writer: EventWriterHandle,
    service: EnvironmentService,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
    actor: Principal,
}

async fn harness_with_authorities(authorities: &[Authority]) -> Harness {
    let store = Arc::new(FakeStore::default());
    let events = Arc::new(RecordingEventRepository::default());

    let workspace_id = WorkspaceId::new();
    let project = must(Project::new(ProjectId::new(), workspace_id, "backend"));
    let project_id = project.project_id();
    store.insert_project(project).await;

    let user_id = UserId::new();
    let actor = Principal::new(user_id, "alice");
    let role = must(WorkspaceRole::new(
        workspace_id,
        "member",
        false,
        authorities.iter().copied().collect(),
    ));
    store.grant(workspace_id, user_id, role).await;
    store.insert_user(user_id, "alice").await;

    let authority_service = AuthorityService::new(store.clone());
    let (event_dispatcher, writer) = EventDispatcher::spawn(events.clone());
    let service = EnvironmentService::new(store.clone(), authority_service, event_dispatcher);

    Harness {
        store,
        events,
        writer,
        service,
        workspace_id,
        project_id,
        actor,
    }
}

async fn recorded_events(harness: Harness) -> Vec<EventRecord> {
    let Harness {
        service,
        writer,
        events,
        ..
    } = harness;
    drop(service);
    writer.shutdown().await;
    let recorded = events.events.lock().await;
    recorded.clone()
}

#[tokio::test]
async fn create_persists_environment_and_emits_event() {
    let harness = harness_with_authorities(&[Authority::CreateEnvironment]).await;

    let created = must(
        harness
            .service
            .create_environment(
                &harness.actor,
                harness.project_id,
                CreateEnvironmentInput {
                    name: "staging".to_owned(),
                    description: Some("pre-production".to_owned()),
                    is_default: false,
                },
            )
            .await,
    );
    assert_eq!(created.name().as_str(), "staging");
    assert_eq!(created.last_updated_by(), Some(harness.actor.user_id()));

    let stored = harness.store.environment(created.environment_id()).await;
    assert_eq!(stored, Some(created.clone()));

    let workspace_id = harness.workspace_id;
    let project_id = harness.project_id;
    let events = recorded_events(harness).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::EnvironmentAdded);
    assert_eq!(events[0].workspace_id, workspace_id);
    assert_eq!(events[0].project_id, Some(project_id));
    assert_eq!(events[0].environment_id, Some(created.environment_id()));
    assert_eq!(
        events[0].metadata.get("environment_id"),
        Some(&json!(created.environment_id()))
    );
}

#[tokio::test]
async fn create_default_replaces_previous_default_atomically() {
    let harness = harness_with_authorities(&[Authority::CreateEnvironment]).await;
    let previous = environment_named(harness.project_id, "prod", true);
    harness.store.insert_environment(previous.clone()).await;

    let created = must(
        harness
            .service
            .create_environment(
                &harness.actor,
                harness.project_id,
                CreateEnvironmentInput {
                    name: "staging".to_owned(),
                    description: None,
                    is_default: true,
                },
            )
            .await,
    );

    let defaults = harness.store.default_environments(harness.project_id).await;
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].environment_id(), created.environment_id());

    let demoted = harness.store.environment(previous.environment_id()).await;
    assert_eq!(demoted.map(|environment| environment.is_default()), Some(false));
}

#[tokio::test]
async fn duplicate_name_in_project_is_a_conflict() {
    let harness = harness_with_authorities(&[Authority::CreateEnvironment]).await;
    harness
        .store
        .insert_environment(environment_named(harness.project_id, "prod", true))
        .await;

    let result = harness
        .service
        .create_environment(
            &harness.actor,
            harness.project_id,
            CreateEnvironmentInput {
                name: "prod".to_owned(),
                description: None,
                is_default: false,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let events = recorded_events(harness).await;
    assert!(events.is_empty());
}

#[tokio::test]
async fn create_without_authority_is_forbidden() {
    let harness = harness_with_authorities(&[Authority::ReadEnvironment]).await;

    let result = harness
        .service
        .create_environment(
            &harness.actor,
            harness.project_id,
            CreateEnvironmentInput {
                name: "staging".to_owned(),
                description: None,
                is_default: false,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn update_applies_partial_changes_and_emits_event() {
    let harness = harness_with_authorities(&[Authority::UpdateEnvironment]).await;
    let existing = environment_named(harness.project_id, "staging", false);
    harness.store.insert_environment(existing.clone()).await;

    let updated = must(
        harness
            .service
            .update_environment(
                &harness.actor,
                existing.environment_id(),
                UpdateEnvironmentInput {
                    name: Some("qa".to_owned()),
                    description: None,
                    is_default: None,
                },
            )
            .await,
    );
    assert_eq!(updated.name().as_str(), "qa");
    assert!(!updated.is_default());

    let events = recorded_events(harness).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::EnvironmentUpdated);
    assert_eq!(
        events[0].environment_id,
        Some(existing.environment_id())
    );
}

#[tokio::test]
async fn rename_to_current_name_is_a_conflict() {
    // Parity quirk: the rename check does not exempt the environment's own
    // current name.
    let harness = harness_with_authorities(&[Authority::UpdateEnvironment]).await;
    let existing = environment_named(harness.project_id, "staging", false);
    harness.store.insert_environment(existing.clone()).await;

    let result = harness
        .service
        .update_environment(
            &harness.actor,
            existing.environment_id(),
            UpdateEnvironmentInput {
                name: Some("staging".to_owned()),
                description: None,
                is_default: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn promote_on_update_clears_previous_default() {
    let harness = harness_with_authorities(&[Authority::UpdateEnvironment]).await;
    let old_default = environment_named(harness.project_id, "prod", true);
    let target = environment_named(harness.project_id, "staging", false);
    harness.store.insert_environment(old_default.clone()).await;
    harness.store.insert_environment(target.clone()).await;

    let updated = must(
        harness
            .service
            .update_environment(
                &harness.actor,
                target.environment_id(),
                UpdateEnvironmentInput {
                    name: None,
                    description: None,
                    is_default: Some(true),
                },
            )
            .await,
    );
    assert!(updated.is_default());

    let defaults = harness.store.default_environments(harness.project_id).await;
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].environment_id(), target.environment_id());
}

#[tokio::test]
async fn demoting_the_last_environment_is_rejected() {
    let harness = harness_with_authorities(&[Authority::UpdateEnvironment]).await;
    let only = environment_named(harness.project_id, "prod", true);
    harness.store.insert_environment(only.clone()).await;

    let result = harness
        .service
        .update_environment(
            &harness.actor,
            only.environment_id(),
            UpdateEnvironmentInput {
                name: None,
                description: None,
                is_default: Some(false),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidOperation(_))));

    // Stored state is untouched.
    let stored = harness.store.environment(only.environment_id()).await;
    assert_eq!(stored, Some(only));
}

#[tokio::test]
async fn demoting_with_a_sibling_clears_the_flag() {
    let harness = harness_with_authorities(&[Authority::UpdateEnvironment]).await;
    let target = environment_named(harness.project_id, "prod", true);
    let sibling = environment_named(harness.project_id, "staging", false);
    harness.store.insert_environment(target.clone()).await;
    harness.store.insert_environment(sibling).await;

    let updated = must(
        harness
            .service
            .update_environment(
                &harness.actor,
                target.environment_id(),
                UpdateEnvironmentInput {
                    name: None,
                    description: None,
                    is_default: Some(false),
                },
            )
            .await,
    );
    assert!(!updated.is_default());
}

#[tokio::test]
async fn get_returns_environment_for_reader() {
    let harness = harness_with_authorities(&[Authority::ReadEnvironment]).await;
    let existing = environment_named(harness.project_id, "prod", true);
    harness.store.insert_environment(existing.clone()).await;

    let fetched = must(
        harness
            .service
            .get_environment(&harness.actor, existing.environment_id())
            .await,
    );
    assert_eq!(fetched, existing);
}

#[tokio::test]
async fn get_without_read_authority_is_forbidden() {
    let harness = harness_with_authorities(&[Authority::CreateEnvironment]).await;
    let existing = environment_named(harness.project_id, "prod", true);
    harness.store.insert_environment(existing.clone()).await;

    let result = harness
        .service
        .get_environment(&harness.actor, existing.environment_id())
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn get_unknown_environment_is_not_found() {
    let harness = harness_with_authorities(&[Authority::ReadEnvironment]).await;

    let result = harness
        .service
        .get_environment(&harness.actor, EnvironmentId::new())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn list_filters_sorts_and_enriches() {
    let harness = harness_with_authorities(&[Authority::ReadEnvironment]).await;
    let author = UserId::new();
    harness.store.insert_user(author, "bob").await;

    let now = Utc::now();
    for (index, name) in ["staging", "prod", "dev"].iter().enumerate() {
        let environment = must(Environment::new(
            EnvironmentId::new(),
            harness.project_id,
            *name,
            None,
            *name == "prod",
            Some(author),
            now + Duration::seconds(index as i64),
            now + Duration::seconds(index as i64),
        ));
        harness.store.insert_environment(environment).await;
    }

    // An environment in another project must never leak into the listing.
    harness
        .store
        .insert_environment(environment_named(ProjectId::new(), "prod", true))
        .await;

    let items = must(
        harness
            .service
            .list_environments(
                &harness.actor,
                harness.project_id,
                EnvironmentListQuery {
                    page: 0,
                    limit: 10,
                    sort_field: EnvironmentSortField::Name,
                    sort_order: SortOrder::Asc,
                    search: String::new(),
                },
            )
            .await,
    );

    let names: Vec<&str> = items
        .iter()
        .map(|item| item.environment.name().as_str())
        .collect();
    assert_eq!(names, vec!["dev", "prod", "staging"]);
    assert!(
        items
            .iter()
            .all(|item| item.environment.project_id() == harness.project_id)
    );
    assert_eq!(
        items[0]
            .last_updated_by
            .as_ref()
            .map(|summary| summary.display_name.as_str()),
        Some("bob")
    );
}

#[tokio::test]
async fn list_search_is_case_sensitive() {
    let harness = harness_with_authorities(&[Authority::ReadEnvironment]).await;
    harness
        .store
        .insert_environment(environment_named(harness.project_id, "Prod", true))
        .await;
    harness
        .store
        .insert_environment(environment_named(harness.project_id, "prod-eu", false))
        .await;

    let items = must(
        harness
            .service
            .list_environments(
                &harness.actor,
                harness.project_id,
                EnvironmentListQuery {
                    search: "prod".to_owned(),
                    ..EnvironmentListQuery::default()
                },
            )
            .await,
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].environment.name().as_str(), "prod-eu");
}

#[tokio::test]
async fn list_page_offset_is_page_times_limit() {
    // Parity quirk: pages are zero-origin in the offset arithmetic, so a
    // caller passing its one-origin default skips the first page.
    let harness = harness_with_authorities(&[Authority::ReadEnvironment]).await;
    for name in ["a", "b", "c"] {
        harness
            .store
            .insert_environment(environment_named(harness.project_id, name, name == "a"))
            .await;
    }

    let items = must(
        harness
            .service
            .list_environments(
                &harness.actor,
                harness.project_id,
                EnvironmentListQuery {
                    page: 1,
                    limit: 2,
                    ..EnvironmentListQuery::default()
                },
            )
            .await,
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].environment.name().as_str(), "c");
}

#[tokio::test]
async fn list_rejects_zero_limit() {
    let harness = harness_with_authorities(&[Authority::ReadEnvironment]).await;

    let result = harness
        .service
        .list_environments(
            &harness.actor,
            harness.project_id,
            EnvironmentListQuery {
                limit: 0,
                ..EnvironmentListQuery::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn list_without_read_authority_is_forbidden() {
    let harness = harness_with_authorities(&[Authority::CreateEnvironment]).await;

    let result = harness
        .service
        .list_environments(
            &harness.actor,
            harness.project_id,
            EnvironmentListQuery::default(),
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn delete_removes_row_and_emits_metadata_only_event() {
    let harness = harness_with_authorities(&[Authority::DeleteEnvironment]).await;
    let target = environment_named(harness.project_id, "staging", false);
    harness.store.insert_environment(target.clone()).await;

    must(
        harness
            .service
            .delete_environment(&harness.actor, target.environment_id())
            .await,
    );
    assert_eq!(harness.store.environment(target.environment_id()).await, None);

    let events = recorded_events(harness).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::EnvironmentDeleted);
    assert_eq!(events[0].environment_id, None);
    assert_eq!(
        events[0].metadata.get("environment_id"),
        Some(&json!(target.environment_id()))
    );
}

#[tokio::test]
async fn deleting_the_default_environment_is_rejected() {
    let harness = harness_with_authorities(&[Authority::DeleteEnvironment]).await;
    let target = environment_named(harness.project_id, "prod", true);
    harness.store.insert_environment(target.clone()).await;

    let result = harness
        .service
        .delete_environment(&harness.actor, target.environment_id())
        .await;
    assert!(matches!(result, Err(AppError::InvalidOperation(_))));

    // Stored state is untouched.
    let stored = harness.store.environment(target.environment_id()).await;
    assert_eq!(stored, Some(target));
}
