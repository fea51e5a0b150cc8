//! Permission-based visibility of pages and placeholder owners.
//!
//! The decision is split in two: a fixed login rule applied here, and a
//! pluggable [`ViewPolicy`] for everything else. Callers turn every denial
//! into [`ContentError::NotFound`] so hidden content is indistinguishable from
//! absent content.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cms_storage::{ContentNode, ContentStore, Subject};

use crate::error::ContentError;

/// The identity making a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewer {
    /// Authenticated user id, `None` for anonymous requests.
    pub user_id: Option<u64>,
    /// Staff users may preview unpublished content.
    pub is_staff: bool,
}

impl Viewer {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user(id: u64) -> Self {
        Self {
            user_id: Some(id),
            is_staff: false,
        }
    }

    #[must_use]
    pub fn staff(id: u64) -> Self {
        Self {
            user_id: Some(id),
            is_staff: true,
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Pluggable permission check.
pub trait ViewPolicy: Send + Sync {
    /// Whether `viewer` may see `subject`. Login requirements are already
    /// enforced before this is called.
    fn can_view(&self, viewer: &Viewer, subject: &Subject) -> bool;

    /// Whether `viewer` may request preview mode.
    fn can_preview(&self, viewer: &Viewer) -> bool {
        viewer.is_staff
    }
}

/// Policy granting view access to everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl ViewPolicy for AllowAll {
    fn can_view(&self, _viewer: &Viewer, _subject: &Subject) -> bool {
        true
    }
}

/// Page-content subject of a node.
#[must_use]
pub fn node_subject(node: &ContentNode) -> Subject {
    Subject::PageContent {
        page_id: node.page_id,
        content_id: node.id,
        template: node.template.clone(),
    }
}

/// Applies the login rule and a [`ViewPolicy`].
#[derive(Clone)]
pub struct VisibilityFilter {
    policy: Arc<dyn ViewPolicy>,
}

impl Default for VisibilityFilter {
    fn default() -> Self {
        Self::new(Arc::new(AllowAll))
    }
}

impl VisibilityFilter {
    #[must_use]
    pub fn new(policy: Arc<dyn ViewPolicy>) -> Self {
        Self { policy }
    }

    /// Visibility of a single node, ignoring its ancestors.
    #[must_use]
    pub fn is_visible(&self, viewer: &Viewer, node: &ContentNode) -> bool {
        if node.requires_login && viewer.is_anonymous() {
            return false;
        }
        self.policy.can_view(viewer, &node_subject(node))
    }

    /// Visibility of a node and every ancestor present in `index`.
    ///
    /// `index` maps structural page ids to nodes. Ancestors missing from the
    /// index are treated as the end of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Structural`] if the ancestor chain loops or is
    /// longer than `max_depth`.
    pub fn is_visible_with_ancestors(
        &self,
        viewer: &Viewer,
        node: &ContentNode,
        index: &HashMap<u64, &ContentNode>,
        max_depth: usize,
    ) -> Result<bool, ContentError> {
        let mut seen = HashSet::from([node.page_id]);
        let mut current = node;
        loop {
            if !self.is_visible(viewer, current) {
                return Ok(false);
            }
            let Some(parent) = current
                .parent_page_id
                .and_then(|id| index.get(&id).copied())
            else {
                return Ok(true);
            };
            if !seen.insert(parent.page_id) {
                return Err(ContentError::Structural(format!(
                    "ancestor cycle through page {}",
                    parent.page_id
                )));
            }
            if seen.len() > max_depth {
                return Err(ContentError::Structural(format!(
                    "page {} nested deeper than {max_depth} levels",
                    node.page_id
                )));
            }
            current = parent;
        }
    }

    /// Visibility of a placeholder owner.
    ///
    /// Page content is visible when its page and every ancestor of it in the
    /// page's site and language are. Other records must still exist in the
    /// store and be allowed by the policy.
    ///
    /// # Errors
    ///
    /// Propagates storage failures, and returns [`ContentError::Structural`]
    /// for a looping or overly deep ancestor chain.
    pub fn is_visible_subject(
        &self,
        viewer: &Viewer,
        subject: &Subject,
        store: &dyn ContentStore,
        max_depth: usize,
    ) -> Result<bool, ContentError> {
        match subject {
            Subject::PageContent { content_id, .. } => {
                let Some(node) = store.fetch_node(*content_id)? else {
                    return Ok(false);
                };
                if !self.is_visible(viewer, &node) {
                    return Ok(false);
                }
                let nodes = store.fetch_nodes_for_site(node.site, &node.language)?;
                let index: HashMap<u64, &ContentNode> =
                    nodes.iter().map(|n| (n.page_id, n)).collect();
                self.is_visible_with_ancestors(viewer, &node, &index, max_depth)
            }
            Subject::Record {
                model, object_id, ..
            } => Ok(store.subject_exists(model, *object_id)?
                && self.policy.can_view(viewer, subject)),
        }
    }

    /// Whether `viewer` may request preview mode.
    #[must_use]
    pub fn can_preview(&self, viewer: &Viewer) -> bool {
        self.policy.can_preview(viewer)
    }
}
