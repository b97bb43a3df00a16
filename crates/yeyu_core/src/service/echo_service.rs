//! Echo use-case service.

use crate::model::echo::{Echo, EchoDraft, EchoId};
use crate::repo::echo_repo::{EchoListQuery, EchoRepository};
use crate::service::{ServiceError, ServiceResult};
use log::info;

pub struct EchoService<R: EchoRepository> {
    repo: R,
}

impl<R: EchoRepository> EchoService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create(&self, draft: &EchoDraft) -> ServiceResult<Echo> {
        let draft = draft.normalized()?;
        let id = self.repo.create_echo(&draft)?;
        info!("event=echo_create module=service status=ok id={id}");
        self.read_back(id, "created echo not found in read-back")
    }

    /// Replaces the echo and moves it to the top of the newest-first order.
    pub fn update(&self, id: EchoId, draft: &EchoDraft) -> ServiceResult<Echo> {
        let draft = draft.normalized()?;
        self.repo.update_echo(id, &draft)?;
        info!("event=echo_update module=service status=ok id={id}");
        self.read_back(id, "updated echo not found in read-back")
    }

    pub fn delete(&self, id: EchoId) -> ServiceResult<()> {
        self.repo.delete_echo(id)?;
        info!("event=echo_delete module=service status=ok id={id}");
        Ok(())
    }

    pub fn set_published(&self, id: EchoId, published: bool) -> ServiceResult<()> {
        self.repo.set_published(id, published)?;
        Ok(())
    }

    pub fn list_all(&self) -> ServiceResult<Vec<Echo>> {
        Ok(self.repo.list_echoes(&EchoListQuery::default())?)
    }

    pub fn list_published(&self) -> ServiceResult<Vec<Echo>> {
        Ok(self.repo.list_echoes(&EchoListQuery {
            published_only: true,
            content_contains: None,
        })?)
    }

    pub fn query_by_content(&self, text: &str) -> ServiceResult<Vec<Echo>> {
        Ok(self.repo.list_echoes(&EchoListQuery {
            published_only: false,
            content_contains: Some(text.trim().to_string()),
        })?)
    }

    fn read_back(&self, id: EchoId, details: &'static str) -> ServiceResult<Echo> {
        self.repo
            .get_echo(id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}
