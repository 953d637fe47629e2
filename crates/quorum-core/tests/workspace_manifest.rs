//! Workspace manifest invariants: shared version, shared dependency table.

use std::path::{Path, PathBuf};

const MEMBERS: [&str; 2] = ["crates/quorum-core", "crates/quorum-state"];

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap()
}

fn manifest(dir: &Path) -> toml::Value {
    let path = dir.join("Cargo.toml");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    text.parse().unwrap()
}

#[test]
fn members_inherit_workspace_version() {
    let root = workspace_root();
    for member in MEMBERS {
        let doc = manifest(&root.join(member));
        let inherits = doc["package"]["version"]
            .get("workspace")
            .and_then(toml::Value::as_bool);
        assert_eq!(inherits, Some(true), "{member} should use version.workspace = true");
    }
}

#[test]
fn workspace_version_matches_cargo_pkg() {
    let doc = manifest(&workspace_root());
    let ws_version = doc["workspace"]["package"]["version"].as_str().unwrap();
    assert_eq!(ws_version, env!("CARGO_PKG_VERSION"));
    assert_eq!(quorum_core::VERSION, ws_version);
}

#[test]
fn member_dependencies_come_from_workspace_table() {
    let root = workspace_root();
    let shared = manifest(&root);
    let shared = shared["workspace"]["dependencies"].as_table().unwrap();

    for member in MEMBERS {
        let doc = manifest(&root.join(member));
        let Some(deps) = doc.get("dependencies").and_then(toml::Value::as_table) else {
            continue;
        };
        for (name, spec) in deps {
            let inherited = spec
                .get("workspace")
                .and_then(toml::Value::as_bool)
                .unwrap_or(false);
            assert!(inherited, "{member}: {name} should use workspace = true");
            assert!(shared.contains_key(name), "{name} missing from workspace table");
        }
    }
}
