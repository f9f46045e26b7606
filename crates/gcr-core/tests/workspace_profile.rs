//! Build profiles must keep unwinding so a panicking collaborator is
//! contained to its own batch unit.

use std::path::Path;

fn workspace_manifest() -> toml::Value {
    let workspace_root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap();
    let path = workspace_root.join("Cargo.toml");
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    toml::from_str(&content).unwrap_or_else(|e| panic!("invalid {}: {}", path.display(), e))
}

#[test]
fn profiles_keep_panic_unwinding() {
    let manifest = workspace_manifest();
    for name in ["release", "dev", "test", "bench"] {
        let strategy = manifest
            .get("profile")
            .and_then(|p| p.get(name))
            .and_then(|p| p.get("panic"))
            .and_then(|v| v.as_str());
        assert_ne!(
            strategy,
            Some("abort"),
            "profile.{name} aborts on panic, which bypasses per-unit panic capture"
        );
    }
}
