#![allow(dead_code)]

use fixcheck_containment::{
    ArchiveFixContainmentCheck, ArchiveManifest, ChangeType, ConstructChange, ConstructId,
    ConstructKind, ContainmentConfig,
};
use fixcheck_signature::{Entity, EntityLabel, Signature};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const REPO: &str = "https://github.com/acme/parser";
pub const PARSE: &str = "org.acme.Parser.parse(String)";
pub const PATH: &str = "src/main/java/org/acme/Parser.java";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `parse(String)` with one call statement per entry
pub fn method(statements: &[&str]) -> Signature {
    let mut tree = Signature::new(EntityLabel::Method, "parse(String)");
    let root = tree.root();
    for stmt in statements {
        tree.add_child(root, Entity::new(EntityLabel::MethodInvocation, *stmt));
    }
    tree
}

/// `parse(String)` calling `validate(input)` only inside a null guard
pub fn guarded_validation() -> Signature {
    let mut tree = method(&["open(input)"]);
    let root = tree.root();
    let guard = tree.add_child(root, Entity::new(EntityLabel::IfStatement, "input != null"));
    let then = tree.add_child(guard, Entity::new(EntityLabel::ThenStatement, "input != null"));
    tree.add_child(then, Entity::new(EntityLabel::MethodInvocation, "validate(input)"));
    tree.add_child(root, Entity::new(EntityLabel::MethodInvocation, "read()"));
    tree
}

pub fn snapshot(statements: &[&str]) -> String {
    method(statements).to_json().expect("snapshot")
}

pub fn method_id(qname: &str) -> ConstructId {
    ConstructId::java(ConstructKind::Meth, qname)
}

pub fn change(qname: &str, commit: &str, path: &str, at: i64, kind: ChangeType) -> ConstructChange {
    ConstructChange::new(REPO, commit, path, method_id(qname), at, kind)
}

/// MOD of `parse` on the main source path
pub fn modification(commit: &str, at: i64, before: &[&str], after: &[&str]) -> ConstructChange {
    change(PARSE, commit, PATH, at, ChangeType::Mod)
        .with_bodies(Some(snapshot(before)), Some(snapshot(after)))
}

/// Manifest listing `constructs`; `None` marks a construct without body
pub fn manifest(constructs: &[(&str, Option<Signature>)]) -> ArchiveManifest {
    let mut entries = Map::new();
    for (qname, body) in constructs {
        let value = match body {
            Some(signature) => json!({ "snapshot": signature.to_json_value().expect("snapshot") }),
            None => Value::Null,
        };
        entries.insert((*qname).to_string(), value);
    }
    let text = json!({ "constructs": entries }).to_string();
    ArchiveManifest::from_json_str("app.jar", &text).expect("manifest")
}

pub fn archive_check(
    manifest: ArchiveManifest,
    config: ContainmentConfig,
) -> ArchiveFixContainmentCheck {
    ArchiveFixContainmentCheck::with_inspector("BUG-1", "app.jar", Arc::new(manifest), config)
        .expect("archive check")
}
