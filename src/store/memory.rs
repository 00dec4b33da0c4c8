//! In-process backend selected by `DATABASE_URL=memory://`.
//!
//! One mutex guards all three collections. Every repository call takes the
//! lock once and does its whole match-mutate-return step under it, so a
//! change-set is never observed half applied. The lock is never held across
//! an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{RepoError, RepoResult};
use crate::cvs::repo::CvRepo;
use crate::cvs::repo_types::{Cv, CvField, NewCv};
use crate::templates::repo::{body_columns, TemplateRepo};
use crate::templates::repo_types::{
    CvTemplate, NewTemplate, TemplateField, TemplateFilter, TemplateRecord, TemplateScope,
};
use crate::update::ChangeSet;
use crate::users::repo::UserRepo;
use crate::users::repo_types::{NewUser, User, UserField};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    cvs: HashMap<Uuid, Cv>,
    templates: HashMap<Uuid, TemplateRecord>,
}

impl Inner {
    /// Mirrors the unique indexes on `users.username` and `users.email`.
    fn check_user_keys(&self, candidate: &User) -> RepoResult<()> {
        for other in self.users.values().filter(|u| u.id != candidate.id) {
            if other.username == candidate.username {
                return Err(RepoError::Duplicate("username"));
            }
            if other.email == candidate.email {
                return Err(RepoError::Duplicate("email"));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, new: NewUser) -> RepoResult<User> {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            roles: new.roles.iter().map(|r| r.as_str().to_string()).collect(),
            token_version: 1,
            first_name: None,
            last_name: None,
            headline: None,
            phone: None,
            location: None,
            avatar_url: None,
            about: None,
            links: Json(Vec::new()),
            reset_token_hash: None,
            reset_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.lock();
        inner.check_user_keys(&user)?;
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn apply_partial_update(
        &self,
        id: Uuid,
        changes: ChangeSet<UserField>,
    ) -> RepoResult<Option<User>> {
        let mut inner = self.lock();
        let Some(current) = inner.users.get(&id) else {
            return Ok(None);
        };
        let mut next = current.clone();
        changes.apply_to(&mut next);
        inner.check_user_keys(&next)?;
        inner.users.insert(id, next.clone());
        Ok(Some(next))
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: String,
        expires_at: OffsetDateTime,
    ) -> RepoResult<Option<User>> {
        let mut inner = self.lock();
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        user.reset_token_hash = Some(token_hash);
        user.reset_expires_at = Some(expires_at);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: String,
    ) -> RepoResult<Option<User>> {
        let now = OffsetDateTime::now_utc();
        let mut inner = self.lock();
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        let token_matches = user.reset_token_hash.as_deref() == Some(token_hash);
        let unexpired = user.reset_expires_at.is_some_and(|at| at > now);
        if !(token_matches && unexpired) {
            return Ok(None);
        }
        user.password_hash = password_hash;
        user.token_version += 1;
        user.reset_token_hash = None;
        user.reset_expires_at = None;
        user.updated_at = now;
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> RepoResult<u64> {
        let mut inner = self.lock();
        if inner.users.remove(&id).is_none() {
            return Ok(0);
        }
        inner.cvs.retain(|_, cv| cv.user_id != id);
        Ok(1)
    }
}

#[async_trait]
impl CvRepo for MemoryStore {
    async fn find_by_id_for_owner(&self, id: Uuid, owner_id: Uuid) -> RepoResult<Option<Cv>> {
        Ok(self
            .lock()
            .cvs
            .get(&id)
            .filter(|cv| cv.user_id == owner_id)
            .cloned())
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Cv>> {
        let mut cvs: Vec<Cv> = self
            .lock()
            .cvs
            .values()
            .filter(|cv| cv.user_id == owner_id)
            .cloned()
            .collect();
        cvs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(cvs)
    }

    async fn insert(&self, new: NewCv) -> RepoResult<Cv> {
        let now = OffsetDateTime::now_utc();
        let cv = Cv {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            first_name: new.first_name,
            last_name: new.last_name,
            city: new.city,
            country: new.country,
            postcode: new.postcode,
            phone: new.phone,
            email: new.email,
            photo: new.photo,
            job_title: new.job_title,
            summary: new.summary,
            skills: new.skills,
            work_experiences: Json(new.work_experiences),
            educations: Json(new.educations),
            links: Json(new.links),
            created_at: now,
            updated_at: now,
        };
        self.lock().cvs.insert(cv.id, cv.clone());
        Ok(cv)
    }

    async fn apply_partial_update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: ChangeSet<CvField>,
    ) -> RepoResult<Option<Cv>> {
        let mut inner = self.lock();
        match inner.cvs.get_mut(&id) {
            Some(cv) if cv.user_id == owner_id => {
                changes.apply_to(cv);
                Ok(Some(cv.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_for_owner(&self, id: Uuid, owner_id: Uuid) -> RepoResult<u64> {
        let mut inner = self.lock();
        let owned = inner.cvs.get(&id).is_some_and(|cv| cv.user_id == owner_id);
        if owned {
            inner.cvs.remove(&id);
        }
        Ok(u64::from(owned))
    }
}

#[async_trait]
impl TemplateRepo for MemoryStore {
    async fn list(&self, filter: &TemplateFilter) -> RepoResult<Vec<CvTemplate>> {
        let mut records: Vec<TemplateRecord> = self
            .lock()
            .templates
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        records.into_iter().map(CvTemplate::try_from).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<CvTemplate>> {
        let record = self.lock().templates.get(&id).cloned();
        record.map(CvTemplate::try_from).transpose()
    }

    async fn insert(&self, new: NewTemplate) -> RepoResult<CvTemplate> {
        let now = OffsetDateTime::now_utc();
        let engine = new.body.engine();
        let (markup, css, tokens, layout) = body_columns(new.body);
        let record = TemplateRecord {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            engine: engine.as_str().to_string(),
            markup,
            css,
            tokens,
            layout,
            version: new.version,
            variables: new.variables,
            tags: new.tags,
            preview_image_url: new.preview_image_url,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };
        self.lock().templates.insert(record.id, record.clone());
        CvTemplate::try_from(record)
    }

    async fn apply_partial_update(
        &self,
        scope: TemplateScope,
        changes: ChangeSet<TemplateField>,
    ) -> RepoResult<Option<CvTemplate>> {
        let mut inner = self.lock();
        let Some(current) = inner.templates.get(&scope.id) else {
            return Ok(None);
        };
        if let Some(engine) = scope.engine {
            if current.engine != engine.as_str() {
                return Ok(None);
            }
        }
        let mut next = current.clone();
        changes.apply_to(&mut next);
        // Same rule as the table CHECK: reject before storing.
        let template = CvTemplate::try_from(next.clone())?;
        inner.templates.insert(scope.id, next);
        Ok(Some(template))
    }

    async fn delete(&self, id: Uuid) -> RepoResult<u64> {
        Ok(u64::from(self.lock().templates.remove(&id).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::templates::repo_types::{TemplateBody, TemplateEngine};
    use crate::update::UpdateBuilder;
    use crate::users::repo_types::Role;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.into(),
            email: format!("{name}@example.com"),
            password_hash: "hash".into(),
            roles: vec![Role::User],
        }
    }

    fn new_cv(owner: Uuid) -> NewCv {
        NewCv {
            user_id: owner,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            city: "London".into(),
            country: "UK".into(),
            postcode: "N1".into(),
            phone: "123".into(),
            email: "ada@example.com".into(),
            photo: None,
            job_title: "Engineer".into(),
            summary: "Old summary".into(),
            skills: vec!["Go".into()],
            work_experiences: vec![],
            educations: vec![],
            links: vec![],
        }
    }

    #[tokio::test]
    async fn new_user_gets_defaults() {
        let store = MemoryStore::new();
        let u = UserRepo::insert(&store, new_user("alice")).await.unwrap();
        assert_eq!(u.token_version, 1);
        assert_eq!(u.roles, vec!["User".to_string()]);
        assert_eq!(u.created_at, u.updated_at);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_and_not_persisted() {
        let store = MemoryStore::new();
        UserRepo::insert(&store, new_user("alice")).await.unwrap();
        let mut dup = new_user("alice");
        dup.email = "other@example.com".into();
        let err = UserRepo::insert(&store, dup).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate("username")));
        assert!(store.find_by_email("other@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn renaming_onto_taken_email_is_rejected() {
        let store = MemoryStore::new();
        UserRepo::insert(&store, new_user("alice")).await.unwrap();
        let bob = UserRepo::insert(&store, new_user("bob")).await.unwrap();
        let changes = UpdateBuilder::new()
            .set_if_present(Some("alice@example.com".to_string()), UserField::Email)
            .finish()
            .unwrap();
        let err = UserRepo::apply_partial_update(&store, bob.id, changes)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate("email")));
        let stored = UserRepo::find_by_id(&store, bob.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "bob@example.com");
    }

    #[tokio::test]
    async fn password_change_bumps_version_by_exactly_one() {
        let store = MemoryStore::new();
        let u = UserRepo::insert(&store, new_user("alice")).await.unwrap();
        let changes = UpdateBuilder::new()
            .set_if_present(Some("Berlin".to_string()), UserField::Location)
            .set_if_present(Some("h2".to_string()), UserField::PasswordHash)
            .set_if_present(Some(()), |()| UserField::BumpTokenVersion)
            .finish()
            .unwrap();
        let after = UserRepo::apply_partial_update(&store, u.id, changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.token_version, u.token_version + 1);
        assert_eq!(after.password_hash, "h2");
        assert_eq!(after.location.as_deref(), Some("Berlin"));

        let profile_only = UpdateBuilder::new()
            .set_if_present(Some("Paris".to_string()), UserField::Location)
            .finish()
            .unwrap();
        let unbumped = UserRepo::apply_partial_update(&store, u.id, profile_only)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unbumped.token_version, after.token_version);
    }

    #[tokio::test]
    async fn rejected_update_writes_nothing() {
        let store = MemoryStore::new();
        UserRepo::insert(&store, new_user("alice")).await.unwrap();
        let bob = UserRepo::insert(&store, new_user("bob")).await.unwrap();
        let changes = UpdateBuilder::new()
            .set_if_present(Some("alice".to_string()), UserField::Username)
            .set_if_present(Some("h2".to_string()), UserField::PasswordHash)
            .set_if_present(Some(()), |()| UserField::BumpTokenVersion)
            .finish()
            .unwrap();
        let err = UserRepo::apply_partial_update(&store, bob.id, changes)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate("username")));

        let stored = UserRepo::find_by_id(&store, bob.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, bob.password_hash);
        assert_eq!(stored.token_version, bob.token_version);
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let store = MemoryStore::new();
        let u = UserRepo::insert(&store, new_user("alice")).await.unwrap();
        let expires = OffsetDateTime::now_utc() + time::Duration::minutes(5);
        store
            .set_reset_token(u.id, "token-hash".into(), expires)
            .await
            .unwrap();

        let done = store
            .complete_password_reset(u.id, "token-hash", "new".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.token_version, 2);
        assert!(done.reset_token_hash.is_none());

        let again = store
            .complete_password_reset(u.id, "token-hash", "newer".into())
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn expired_reset_token_does_not_match() {
        let store = MemoryStore::new();
        let u = UserRepo::insert(&store, new_user("alice")).await.unwrap();
        let expired = OffsetDateTime::now_utc() - time::Duration::minutes(1);
        store
            .set_reset_token(u.id, "token-hash".into(), expired)
            .await
            .unwrap();
        let out = store
            .complete_password_reset(u.id, "token-hash", "new".into())
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn deleting_user_removes_their_cvs() {
        let store = MemoryStore::new();
        let alice = UserRepo::insert(&store, new_user("alice")).await.unwrap();
        let bob = UserRepo::insert(&store, new_user("bob")).await.unwrap();
        CvRepo::insert(&store, new_cv(alice.id)).await.unwrap();
        let bobs = CvRepo::insert(&store, new_cv(bob.id)).await.unwrap();

        assert_eq!(UserRepo::delete(&store, alice.id).await.unwrap(), 1);
        assert!(store.list_for_owner(alice.id).await.unwrap().is_empty());
        assert!(store
            .find_by_id_for_owner(bobs.id, bob.id)
            .await
            .unwrap()
            .is_some());
        assert_eq!(UserRepo::delete(&store, alice.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn summary_only_update_leaves_job_title() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let cv = CvRepo::insert(&store, new_cv(owner)).await.unwrap();
        let changes = UpdateBuilder::new()
            .set_if_present(Some("New summary".to_string()), CvField::Summary)
            .finish()
            .unwrap();
        let updated = CvRepo::apply_partial_update(&store, cv.id, owner, changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.job_title, "Engineer");
        assert_eq!(updated.summary, "New summary");
        assert!(updated.updated_at >= cv.updated_at);
        assert_eq!(updated.created_at, cv.created_at);
    }

    #[tokio::test]
    async fn empty_skills_clear_and_omitted_skills_survive() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let cv = CvRepo::insert(&store, new_cv(owner)).await.unwrap();

        let omitted = UpdateBuilder::new()
            .replace_list_if_present(None, CvField::Skills)
            .finish()
            .unwrap();
        let kept = CvRepo::apply_partial_update(&store, cv.id, owner, omitted)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.skills, vec!["Go".to_string()]);

        let cleared = UpdateBuilder::new()
            .replace_list_if_present(Some(Vec::new()), CvField::Skills)
            .finish()
            .unwrap();
        let cleared = CvRepo::apply_partial_update(&store, cv.id, owner, cleared)
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.skills.is_empty());
    }

    #[tokio::test]
    async fn other_owner_cannot_read_update_or_delete() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let cv = CvRepo::insert(&store, new_cv(a)).await.unwrap();

        assert!(store.find_by_id_for_owner(cv.id, b).await.unwrap().is_none());
        let changes = UpdateBuilder::new()
            .set_if_present(Some("stolen".to_string()), CvField::Summary)
            .finish()
            .unwrap();
        assert!(CvRepo::apply_partial_update(&store, cv.id, b, changes)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.delete_for_owner(cv.id, b).await.unwrap(), 0);

        let still = store.find_by_id_for_owner(cv.id, a).await.unwrap().unwrap();
        assert_eq!(still.summary, "Old summary");
    }

    #[tokio::test]
    async fn concurrent_disjoint_updates_both_land() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let cv_id = CvRepo::insert(store.as_ref(), new_cv(owner)).await.unwrap().id;

        let mut tasks = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let builder = if i % 2 == 0 {
                    UpdateBuilder::new().set_if_present(Some(format!("title {i}")), CvField::JobTitle)
                } else {
                    UpdateBuilder::new().set_if_present(Some(format!("summary {i}")), CvField::Summary)
                };
                let changes = builder.finish().unwrap();
                CvRepo::apply_partial_update(store.as_ref(), cv_id, owner, changes)
                    .await
                    .unwrap()
                    .unwrap()
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        let stored = store.find_by_id_for_owner(cv_id, owner).await.unwrap().unwrap();
        assert!(stored.job_title.starts_with("title "));
        assert!(stored.summary.starts_with("summary "));
    }

    #[tokio::test]
    async fn list_is_ordered_by_creation() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let first = CvRepo::insert(&store, new_cv(owner)).await.unwrap();
        // Distinct creation stamps so the id tiebreak does not decide.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = CvRepo::insert(&store, new_cv(owner)).await.unwrap();
        CvRepo::insert(&store, new_cv(Uuid::new_v4())).await.unwrap();
        assert!(first.created_at < second.created_at);

        let ids: Vec<Uuid> = store
            .list_for_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|cv| cv.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    fn react_template() -> NewTemplate {
        NewTemplate {
            name: "Modern".into(),
            description: "Schema driven".into(),
            body: TemplateBody::ReactSchema {
                tokens: Some(json!({"accent": "#333"})),
                layout: json!([{"type": "header"}]),
            },
            version: "1.0.0".into(),
            variables: vec![],
            tags: vec![],
            preview_image_url: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn engine_switch_clears_other_group() {
        let store = MemoryStore::new();
        let t = TemplateRepo::insert(&store, react_template()).await.unwrap();
        let changes = UpdateBuilder::new()
            .set_if_present(Some(TemplateEngine::Markup), TemplateField::Engine)
            .set_if_present(Some(Some("<main/>".to_string())), TemplateField::Markup)
            .set_if_present(Some(Some("main{}".to_string())), TemplateField::Css)
            .set_if_present(Some(None), TemplateField::Tokens)
            .set_if_present(Some(None), TemplateField::Layout)
            .finish()
            .unwrap();
        let scope = TemplateScope {
            id: t.id,
            engine: None,
        };
        let updated = TemplateRepo::apply_partial_update(&store, scope, changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            updated.body,
            TemplateBody::Markup {
                markup: "<main/>".into(),
                css: Some("main{}".into())
            }
        );
    }

    #[tokio::test]
    async fn engine_scope_mismatch_matches_nothing() {
        let store = MemoryStore::new();
        let t = TemplateRepo::insert(&store, react_template()).await.unwrap();
        let changes = UpdateBuilder::new()
            .set_if_present(Some(Some("main{}".to_string())), TemplateField::Css)
            .finish()
            .unwrap();
        let scope = TemplateScope {
            id: t.id,
            engine: Some(TemplateEngine::Markup),
        };
        let out = TemplateRepo::apply_partial_update(&store, scope, changes)
            .await
            .unwrap();
        assert!(out.is_none());
        let stored = TemplateRepo::find_by_id(&store, t.id).await.unwrap().unwrap();
        assert_eq!(stored.engine(), TemplateEngine::ReactSchema);
    }
}
