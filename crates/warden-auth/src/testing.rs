//! In-memory directory for unit tests

use crate::directory::{BindError, Directory, GroupMembershipSet, SearchError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One account that binds with a fixed password
pub struct MockDirectory {
    password: String,
    /// `None`: the search matches no entry
    groups: Option<Vec<String>>,
    search_error: Option<SearchError>,
    bind_error: Option<BindError>,
    searches: AtomicUsize,
    closes: AtomicUsize,
    open_sessions: Arc<AtomicUsize>,
}

pub struct MockSession {
    open: Arc<AtomicUsize>,
    closed: bool,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if !self.closed {
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl MockDirectory {
    pub fn new(password: &str) -> Self {
        Self {
            password: password.to_string(),
            groups: Some(Vec::new()),
            search_error: None,
            bind_error: None,
            searches: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = Some(groups.iter().map(|g| g.to_string()).collect());
        self
    }

    pub fn without_entry(mut self) -> Self {
        self.groups = None;
        self
    }

    pub fn failing_search(mut self, error: SearchError) -> Self {
        self.search_error = Some(error);
        self
    }

    pub fn failing_bind(mut self, error: BindError) -> Self {
        self.bind_error = Some(error);
        self
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Sessions handed back through `close`; drops are not counted
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Sessions neither closed nor dropped
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for MockDirectory {
    type Session = MockSession;

    async fn bind(&self, identifier: &str, secret: &str) -> Result<MockSession, BindError> {
        if let Some(error) = &self.bind_error {
            return Err(error.clone());
        }
        if identifier.trim().is_empty() || secret.is_empty() {
            return Err(BindError::EmptyCredentials);
        }
        if secret != self.password {
            return Err(BindError::InvalidCredentials);
        }

        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            open: self.open_sessions.clone(),
            closed: false,
        })
    }

    async fn search_groups(
        &self,
        _session: &mut MockSession,
        _identifier: &str,
    ) -> Result<GroupMembershipSet, SearchError> {
        self.searches.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = &self.search_error {
            return Err(error.clone());
        }
        Ok(match &self.groups {
            Some(groups) => groups.iter().cloned().collect(),
            None => GroupMembershipSet::no_entries(),
        })
    }

    async fn close(&self, mut session: MockSession) {
        session.closed = true;
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}
