//! Navigation menus cut from the page tree.
//!
//! Levels are counted from the menu root (0 for top-level pages, or for the
//! children of `root_path`). Nodes are classified against the selected page:
//! the selected node, its ancestors, its descendants, and everything else
//! ("inactive"). Inactive branches show `extra_inactive` levels below them and
//! the selected node shows `extra_active` levels; ancestors are never cut.

use std::collections::HashSet;

use cms_storage::ContentNode;
use serde::Serialize;

use crate::error::ContentError;
use crate::projection::page_url;
use crate::tree::{NavigationTree, RootSelector, TreeNode};
use crate::visibility::Viewer;

/// Menu shape parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuRequest {
    /// Restrict the menu to this page's descendants.
    pub root_path: Option<String>,
    /// First level to emit; shallower levels are skipped and their children
    /// promoted to menu roots.
    pub from_level: usize,
    /// Last level to emit.
    pub to_level: usize,
    /// Levels shown below nodes off the selected path.
    pub extra_inactive: usize,
    /// Levels shown below the selected node.
    pub extra_active: usize,
    /// Path of the page marked as selected.
    pub selected_path: Option<String>,
}

impl Default for MenuRequest {
    fn default() -> Self {
        Self {
            root_path: None,
            from_level: 0,
            to_level: 100,
            extra_inactive: 0,
            extra_active: 1000,
            selected_path: None,
        }
    }
}

/// One menu entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MenuNode {
    /// Structural page id.
    pub id: u64,
    pub title: String,
    pub url: String,
    /// `None` for menu roots.
    pub parent_id: Option<u64>,
    pub visible: bool,
    pub selected: bool,
    pub level: usize,
    pub children: Vec<MenuNode>,
}

/// Whether the page's menu restriction admits `viewer`.
fn shown_to(node: &ContentNode, viewer: &Viewer) -> bool {
    match node.limit_visibility_in_menu.as_deref() {
        Some("authenticated") => !viewer.is_anonymous(),
        Some("anonymous") => viewer.is_anonymous(),
        _ => true,
    }
}

fn min_budget(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

struct MenuBuilder<'a> {
    request: &'a MenuRequest,
    viewer: &'a Viewer,
    selected: Option<u64>,
    ancestors: HashSet<u64>,
}

impl MenuBuilder<'_> {
    /// `allowed` is how many levels may still be shown at and below `nodes`,
    /// `None` meaning unlimited.
    fn walk(
        &self,
        nodes: &[TreeNode<'_, ContentNode>],
        parent_id: Option<u64>,
        allowed: Option<usize>,
        in_selected: bool,
        out: &mut Vec<MenuNode>,
    ) {
        if allowed == Some(0) {
            return;
        }
        for node in nodes {
            let page = node.item;
            let level = node.depth;
            if level > self.request.to_level
                || !page.in_navigation
                || !shown_to(page, self.viewer)
            {
                continue;
            }

            let selected = self.selected == Some(page.page_id);
            let child_in_selected = in_selected || selected;

            // Budgets count from the first emitted level
            if level < self.request.from_level {
                let child_allowed = if selected {
                    Some(self.request.extra_active)
                } else {
                    allowed
                };
                self.walk(&node.children, None, child_allowed, child_in_selected, out);
                continue;
            }

            let below = allowed.map(|a| a - 1);
            let child_allowed = if selected {
                Some(self.request.extra_active)
            } else if self.ancestors.contains(&page.page_id) {
                None
            } else if in_selected {
                below
            } else {
                min_budget(below, Some(self.request.extra_inactive))
            };

            let mut children = Vec::new();
            self.walk(
                &node.children,
                Some(page.page_id),
                child_allowed,
                child_in_selected,
                &mut children,
            );
            out.push(MenuNode {
                id: page.page_id,
                title: page.menu_title.clone().unwrap_or_else(|| page.title.clone()),
                url: page_url(&page.language, &page.path),
                parent_id: if level == self.request.from_level {
                    None
                } else {
                    parent_id
                },
                visible: true,
                selected,
                level,
                children,
            });
        }
    }
}

/// Cut a menu from an assembled page tree.
///
/// # Errors
///
/// Returns [`ContentError::NotFound`] if `root_path` names no page in the
/// tree and [`ContentError::Structural`] if the tree exceeds `max_depth`.
pub fn build_menu(
    tree: &NavigationTree<ContentNode>,
    request: &MenuRequest,
    viewer: &Viewer,
    max_depth: usize,
) -> Result<Vec<MenuNode>, ContentError> {
    let find = |path: &str| tree.items().find(|node| node.path == path);

    let root = match &request.root_path {
        Some(path) => RootSelector::Node(
            find(path)
                .ok_or_else(|| ContentError::NotFound(format!("menu root {path}")))?
                .page_id,
        ),
        None => RootSelector::Root,
    };
    let nodes = tree.to_tree(&root, max_depth)?;

    let selected = request
        .selected_path
        .as_deref()
        .and_then(find)
        .map(|node| node.page_id);
    let mut ancestors = HashSet::new();
    let mut parent = selected
        .and_then(|id| tree.get(&id))
        .and_then(|node| node.parent_page_id);
    while let Some(id) = parent {
        if !ancestors.insert(id) {
            break;
        }
        parent = tree.get(&id).and_then(|node| node.parent_page_id);
    }

    let builder = MenuBuilder {
        request,
        viewer,
        selected,
        ancestors,
    };
    let mut out = Vec::new();
    builder.walk(&nodes, None, None, false, &mut out);
    Ok(out)
}
