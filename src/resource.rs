//! Generic list/create/retrieve/update/delete service. Implemented once and
//! instantiated per owned entity (reviews, comments).

use std::sync::Arc;

use crate::config::ReadPolicy;
use crate::error::{AppError, AppResult};
use crate::guard::{self, Denied, Identity, Operation, Owned};
use crate::store::Store;

/// Per-entity hooks for the generic service.
pub trait Resource: Owned + Send + Sync + Sized + 'static {
    /// Singular name used in log lines and error messages.
    const NAME: &'static str;

    type Filter: Send + Sync;
    type Draft: Send;
    type Patch: Send;

    fn id(&self) -> i64;

    fn validate_draft(draft: &Self::Draft) -> Result<(), String>;

    fn validate_patch(patch: &Self::Patch) -> Result<(), String>;
}

pub struct ResourceService<E: Resource> {
    store: Arc<dyn Store<E>>,
    reads: ReadPolicy,
}

impl<E: Resource> Clone for ResourceService<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            reads: self.reads,
        }
    }
}

impl<E: Resource> ResourceService<E> {
    pub fn new(store: Arc<dyn Store<E>>, reads: ReadPolicy) -> Self {
        Self { store, reads }
    }

    pub async fn list(&self, identity: &Identity, filter: &E::Filter) -> AppResult<Vec<E>> {
        guard::admit(identity, Operation::Read, self.reads)?;
        Ok(self.store.list(filter).await?)
    }

    /// The author is always the acting identity, never a client-supplied field.
    pub async fn create(&self, identity: &Identity, draft: E::Draft) -> AppResult<E> {
        guard::admit(identity, Operation::Create, self.reads)?;
        let actor = identity.require()?;
        E::validate_draft(&draft).map_err(AppError::BadRequest)?;

        let created = self.store.create(actor.id, draft).await?;
        tracing::info!(
            resource = E::NAME,
            id = created.id(),
            author = %actor.id,
            "created"
        );
        Ok(created)
    }

    pub async fn retrieve(&self, identity: &Identity, id: i64) -> AppResult<E> {
        guard::admit(identity, Operation::Read, self.reads)?;
        Ok(self.store.get(id).await?)
    }

    pub async fn update(&self, identity: &Identity, id: i64, patch: E::Patch) -> AppResult<E> {
        let existing = self.load_for(identity, Operation::Update, id).await?;
        E::validate_patch(&patch).map_err(AppError::BadRequest)?;

        let updated = self.store.update(existing.id(), patch).await?;
        tracing::info!(resource = E::NAME, id, "updated");
        Ok(updated)
    }

    pub async fn delete(&self, identity: &Identity, id: i64) -> AppResult<()> {
        let existing = self.load_for(identity, Operation::Delete, id).await?;

        self.store.delete(existing.id()).await?;
        tracing::info!(resource = E::NAME, id, "deleted");
        Ok(())
    }

    /// Authenticate, fetch, then check ownership. Nothing is written here.
    async fn load_for(&self, identity: &Identity, op: Operation, id: i64) -> AppResult<E> {
        guard::admit(identity, op, self.reads)?;
        let existing = self.store.get(id).await?;

        guard::authorize(identity, op, &existing, self.reads).map_err(|denied| {
            tracing::warn!(
                resource = E::NAME,
                id,
                operation = %op,
                actor = ?identity.user().map(|u| u.id),
                "denied: {}",
                denied
            );
            match denied {
                Denied::NotOwner => AppError::Forbidden(format!(
                    "You do not have permission to modify or delete this {}.",
                    E::NAME
                )),
                Denied::AuthenticationRequired => AppError::Unauthorized,
            }
        })?;

        Ok(existing)
    }
}
