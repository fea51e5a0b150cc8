//! End-to-end behavior of the content API over in-memory and file-backed
//! stores.

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use cms_cache::MemoryCache;
use cms_config::Config;
use cms_content::{
    ContentError, ContentService, MenuRequest, PageTreeNode, RenderMode, ResolveOptions, Viewer,
};
use cms_storage::{ContentStore, JsonStore, MockStore, Snapshot};
use pretty_assertions::assert_eq;
use serde_json::json;

const CONFIG: &str = r#"
[tree]
order = "position"

[[sites]]
id = 1
domain = "example.com"

[[sites.languages]]
code = "en"
name = "English"

[[sites.languages]]
code = "de"
name = "Deutsch"

[[sites.languages]]
code = "fr"
name = "Français"
public = false
"#;

fn config() -> Config {
    Config::from_toml(CONFIG, Path::new("/srv")).unwrap()
}

fn service(store: MockStore) -> ContentService {
    ContentService::new(Arc::new(store), &config())
}

fn count(nodes: &[PageTreeNode]) -> usize {
    nodes.iter().map(|node| 1 + count(&node.children)).sum()
}

/// `(path, children)` outline of a forest.
fn outline(nodes: &[PageTreeNode]) -> Vec<(String, Vec<String>)> {
    nodes
        .iter()
        .map(|node| {
            (
                node.page.path.clone(),
                node.children.iter().map(|c| c.page.path.clone()).collect(),
            )
        })
        .collect()
}

#[test]
fn test_public_languages_resolve_and_private_ones_do_not() {
    let service = service(MockStore::new());

    assert_eq!(service.get_language_config(1, "en").unwrap().code, "en");
    assert_eq!(service.get_language_config(1, "de").unwrap().code, "de");
    let err = service.get_language_config(1, "fr").unwrap_err();
    assert!(matches!(err, ContentError::NotFound(_)));
    assert_eq!(err.public_message(), "Not found.");

    let codes: Vec<_> = service
        .languages(1)
        .unwrap()
        .into_iter()
        .map(|l| l.code)
        .collect();
    assert_eq!(codes, vec!["en", "de", "fr"]);
}

#[test]
fn test_tree_shape_follows_parents_and_positions() {
    let mut a = MockStore::node(1, 1, None, "en", "a");
    let mut b = MockStore::node(2, 2, Some(1), "en", "a/b");
    let mut c = MockStore::node(3, 3, Some(1), "en", "a/c");
    let d = MockStore::node(4, 4, Some(2), "en", "a/b/d");
    a.position = 0;
    b.position = 0;
    c.position = 1;
    let service = service(
        MockStore::new()
            .with_node(d)
            .with_node(c)
            .with_node(b)
            .with_node(a),
    );

    let tree = service.build_tree(1, "en", &Viewer::anonymous()).unwrap();

    assert_eq!(
        outline(&tree),
        vec![("a".to_owned(), vec!["a/b".to_owned(), "a/c".to_owned()])]
    );
    assert_eq!(outline(&tree[0].children)[0].1, vec!["a/b/d".to_owned()]);
}

#[test]
fn test_orphan_becomes_root_and_count_is_preserved() {
    let store = MockStore::new()
        .with_node(MockStore::node(1, 1, None, "en", ""))
        .with_node(MockStore::node(2, 2, Some(1), "en", "about"))
        .with_node(MockStore::node(3, 3, Some(99), "en", "lost"))
        .with_node(MockStore::node(4, 4, Some(3), "en", "lost/child"));
    let service = service(store);

    let tree = service.build_tree(1, "en", &Viewer::anonymous()).unwrap();

    assert_eq!(count(&tree), 4);
    let roots: Vec<_> = tree.iter().map(|node| node.page.path.as_str()).collect();
    assert_eq!(roots, vec!["", "lost"]);
}

#[test]
fn test_cyclic_pages_are_structural_errors() {
    let store = MockStore::new()
        .with_node(MockStore::node(1, 1, None, "en", ""))
        .with_node(MockStore::node(2, 2, Some(3), "en", "a"))
        .with_node(MockStore::node(3, 3, Some(2), "en", "b"));
    let service = service(store);

    let err = service.build_tree(1, "en", &Viewer::anonymous()).unwrap_err();
    assert!(matches!(err, ContentError::Structural(_)));
    assert_eq!(err.public_message(), "Internal server error.");
}

#[test]
fn test_login_required_pages_are_hidden_from_anonymous_viewers() {
    let mut members = MockStore::node(2, 2, Some(1), "en", "members");
    members.requires_login = true;
    let store = MockStore::new()
        .with_node(MockStore::node(1, 1, None, "en", ""))
        .with_node(members)
        .with_node(MockStore::node(3, 3, Some(2), "en", "members/list"));
    let service = service(store);

    let anonymous = service.build_tree(1, "en", &Viewer::anonymous()).unwrap();
    assert_eq!(count(&anonymous), 1);
    assert!(matches!(
        service.page_detail(1, "en", "members/list", &Viewer::anonymous(), RenderMode::Published),
        Err(ContentError::NotFound(_))
    ));

    let user = service.build_tree(1, "en", &Viewer::user(7)).unwrap();
    assert_eq!(count(&user), 3);
}

fn placeholder_store() -> (MockStore, cms_storage::AreaKey) {
    let home = MockStore::node(1, 1, None, "en", "");
    let content = MockStore::page_placeholder(&home, 5, "content");
    let key = content.key.clone();
    let store = MockStore::new()
        .with_node(home)
        .with_placeholder(content)
        .with_template("base.html", ["content"])
        .with_unit(
            &key,
            MockStore::unit(1, "ColumnsPlugin", None, 0, "en", json!({"columns": 2})),
        )
        .with_unit(
            &key,
            MockStore::unit(2, "TextPlugin", Some(1), 1, "en", json!({"body": "right"})),
        )
        .with_unit(
            &key,
            MockStore::unit(3, "TextPlugin", Some(1), 0, "en", json!({"body": "left"})),
        );
    (store, key)
}

#[test]
fn test_placeholder_resolution_is_idempotent() {
    let (store, key) = placeholder_store();
    let service = service(store);
    let resolve = || {
        service
            .resolve_placeholder(
                1,
                &key,
                "en",
                &Viewer::anonymous(),
                RenderMode::Published,
                ResolveOptions::default(),
            )
            .unwrap()
    };

    let first = resolve();
    assert_eq!(first, resolve());
    assert_eq!(
        serde_json::to_value(&first.content).unwrap(),
        json!([{
            "plugin_type": "ColumnsPlugin",
            "columns": 2,
            "stacked": null,
            "children": [
                {"plugin_type": "TextPlugin", "body": "left"},
                {"plugin_type": "TextPlugin", "body": "right"}
            ]
        }])
    );
}

#[test]
fn test_render_cache_hits_until_placeholder_changes() {
    let (store, key) = placeholder_store();
    let store = Arc::new(store);
    let memory = MemoryCache::new();
    let service = ContentService::new(Arc::clone(&store) as Arc<dyn ContentStore>, &config())
        .with_cache(&memory);
    let resolve = |options| {
        service
            .resolve_placeholder(
                1,
                &key,
                "en",
                &Viewer::anonymous(),
                RenderMode::Published,
                options,
            )
            .unwrap()
    };

    let first = resolve(ResolveOptions::default());
    let second = resolve(ResolveOptions::default());
    assert_eq!(first, second);
    assert_eq!(store.unit_fetches(), 1);

    store.push_unit(
        &key,
        MockStore::unit(4, "TextPlugin", None, 1, "en", json!({"body": "new"})),
    );
    assert_eq!(resolve(ResolveOptions::default()).content.len(), 1);
    assert_eq!(store.unit_fetches(), 1);

    store.touch_placeholder(&key, Utc::now() + TimeDelta::seconds(1));
    assert_eq!(resolve(ResolveOptions::default()).content.len(), 2);
    assert_eq!(store.unit_fetches(), 2);

    let bypassed = resolve(ResolveOptions {
        bypass_cache: true,
        ..ResolveOptions::default()
    });
    assert_eq!(bypassed.content.len(), 2);
    assert_eq!(store.unit_fetches(), 3);
}

#[test]
fn test_menu_marks_selected_page() {
    let store = MockStore::new()
        .with_node(MockStore::node(1, 1, None, "en", ""))
        .with_node(MockStore::node(2, 2, Some(1), "en", "about"))
        .with_node(MockStore::node(3, 3, Some(2), "en", "about/team"));
    let service = service(store);

    let menu = service
        .menu(
            1,
            "en",
            &Viewer::anonymous(),
            &MenuRequest {
                selected_path: Some("about".to_owned()),
                ..MenuRequest::default()
            },
        )
        .unwrap();

    let about = &menu[0].children[0];
    assert!(about.selected);
    assert_eq!(about.url, "/en/about/");
    assert_eq!(about.children[0].title, "Page 3");
}

#[test]
fn test_json_store_backed_service() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_file = temp_dir.path().join("content.json");
    let snapshot = Snapshot {
        nodes: vec![
            MockStore::node(1, 1, None, "en", ""),
            MockStore::node(2, 2, Some(1), "en", "about"),
            MockStore::node(3, 3, None, "de", ""),
        ],
        ..Snapshot::default()
    };
    std::fs::write(&data_file, serde_json::to_string(&snapshot).unwrap()).unwrap();

    let store = JsonStore::open(&data_file).unwrap();
    let service = ContentService::new(Arc::new(store), &config());

    assert_eq!(
        count(&service.build_tree(1, "en", &Viewer::anonymous()).unwrap()),
        2
    );
    assert_eq!(
        count(&service.build_tree(1, "de", &Viewer::anonymous()).unwrap()),
        1
    );
}
