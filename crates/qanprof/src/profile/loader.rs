use super::session::{LoadState, PAGE_SIZE, ProfileSession, SessionError};
use crate::api::{ProfilePage, ProfileRequest, QanApi};
use crate::params::{ViewParameters, should_reload};

/// Loads profile pages into a `ProfileSession`.
///
/// Every page after the first starts with a row that repeats the previous
/// page's header, so it is dropped before appending. No other deduplication
/// happens.
pub struct ProfileLoader<'a, A> {
    api: &'a A,
}

impl<'a, A: QanApi> ProfileLoader<'a, A> {
    pub fn new(api: &'a A) -> Self {
        ProfileLoader { api }
    }

    /// Reset `session` and load the first page for `params`
    pub async fn load(
        &self,
        session: &mut ProfileSession,
        params: &ViewParameters,
    ) -> Result<(), SessionError> {
        session.reset(params);
        session.state = LoadState::Loading;

        let result = self
            .fetch_page(&ProfileRequest::page(params, 0))
            .await
            .and_then(leads_with_aggregate);
        match result {
            Ok(page) => {
                session.total = page.total_queries;
                if page.total_queries > 0 {
                    session.entries = page.queries;
                }
                session.state = LoadState::Loaded;
                log::info!(
                    "Loaded {} of {} queries for {}",
                    session.loaded_count(),
                    session.total,
                    params.host
                );
                Ok(())
            }
            Err(e) => {
                session.last_error = Some(e.clone());
                session.state = LoadState::Failed;
                Err(e)
            }
        }
    }

    /// Load only when `params` differs from what `session` was loaded with.
    /// Returns whether a load happened.
    pub async fn reload_if_changed(
        &self,
        session: &mut ProfileSession,
        params: &ViewParameters,
    ) -> Result<bool, SessionError> {
        if !should_reload(session.params(), params) {
            return Ok(false);
        }
        self.load(session, params).await?;
        Ok(true)
    }

    /// Fetch the next page and append it. Returns the number of rows appended.
    pub async fn load_more(&self, session: &mut ProfileSession) -> Result<usize, SessionError> {
        if session.state != LoadState::Loaded {
            return Err(SessionError::NotReady);
        }
        let Some(params) = session.params.clone() else {
            return Err(SessionError::NotReady);
        };
        if session.remaining() == 0 {
            return Err(SessionError::Exhausted(session.total));
        }

        session.offset += PAGE_SIZE;
        session.state = LoadState::Loading;
        session.last_error = None;

        let result = self
            .fetch_page(&ProfileRequest::page(&params, session.offset))
            .await;
        session.state = LoadState::Loaded;

        match result {
            Ok(page) => {
                let before = session.entries.len();
                // First row overlaps the previous page
                session.entries.extend(page.queries.into_iter().skip(1));
                let appended = session.entries.len() - before;
                log::debug!(
                    "Appended {} queries at offset {}, {} remaining",
                    appended,
                    session.offset,
                    session.remaining()
                );
                Ok(appended)
            }
            Err(e) => {
                session.offset -= PAGE_SIZE;
                session.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Load the first page, then keep loading until nothing remains, a page
    /// adds no rows, or `max_pages` pages are loaded.
    pub async fn load_all(
        &self,
        session: &mut ProfileSession,
        params: &ViewParameters,
        max_pages: Option<usize>,
    ) -> Result<(), SessionError> {
        self.load(session, params).await?;

        let mut pages = 1;
        while session.remaining() > 0 && max_pages.is_none_or(|max| pages < max) {
            if self.load_more(session).await? == 0 {
                log::warn!(
                    "Backend returned an empty page with {} queries remaining",
                    session.remaining()
                );
                break;
            }
            pages += 1;
        }
        Ok(())
    }

    async fn fetch_page(&self, request: &ProfileRequest) -> Result<ProfilePage, SessionError> {
        match self.api.fetch_profile(request).await {
            Ok(page) if !page.error.is_empty() => {
                log::info!("Backend reported: {}", page.error);
                Err(SessionError::Domain(page.error))
            }
            Ok(page) => Ok(page),
            Err(e) => {
                log::warn!(
                    "Profile fetch for {} at offset {} failed: {}",
                    request.instance_id,
                    request.offset,
                    e
                );
                Err(SessionError::Transport(e.to_string()))
            }
        }
    }
}

/// A non-empty first page must start with the aggregate row, or later pages
/// would be appended after a query row
fn leads_with_aggregate(page: ProfilePage) -> Result<ProfilePage, SessionError> {
    if page.total_queries == 0 || page.queries.first().is_some_and(|e| e.is_aggregate()) {
        return Ok(page);
    }
    let detail = format!(
        "first page reports {} queries but {}",
        page.total_queries,
        if page.queries.is_empty() {
            "has no rows"
        } else {
            "does not start with the aggregate row"
        }
    );
    log::warn!("Rejected profile page: {}", detail);
    Err(SessionError::Transport(detail))
}
