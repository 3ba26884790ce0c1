mod support;

use anyhow::Result;
use fixcheck_containment::{
    ArchiveFixContainmentCheck, ChangeType, ConstructState, ContainmentConfig, ContainmentError,
};
use pretty_assertions::assert_eq;
use std::fs;
use support::{
    archive_check, change, guarded_validation, init_logging, manifest, method, method_id,
    modification, PARSE, PATH,
};
use tempfile::tempdir;

const BEFORE: &[&str] = &["open(input)", "read()"];
const AFTER: &[&str] = &["open(input)", "validate(input)", "read()"];
const HELPER: &str = "org.acme.Parser.sanitize(String)";

fn bug_changes() -> Vec<fixcheck_containment::ConstructChange> {
    vec![
        modification("c1", 100, BEFORE, AFTER),
        change(HELPER, "c1", PATH, 100, ChangeType::Add),
    ]
}

#[test]
fn archive_with_every_fix_is_fixed() {
    init_logging();
    let mut check = archive_check(
        manifest(&[(PARSE, Some(method(AFTER))), (HELPER, None)]),
        ContainmentConfig::default(),
    );
    assert_eq!(check.add_construct_changes(bug_changes()), 2);

    assert_eq!(check.contains_fix(), Some(true));
    assert_eq!(check.fixed_count(), 2);
    assert_eq!(check.vulnerable_count(), 0);
}

#[test]
fn one_missing_fix_makes_archive_vulnerable() {
    init_logging();
    let mut check = archive_check(
        manifest(&[(PARSE, Some(method(AFTER)))]),
        ContainmentConfig::default(),
    );
    check.add_construct_changes(bug_changes());

    assert_eq!(check.contains_fix(), Some(false));
    assert_eq!(check.fixed_count(), 1);
    assert_eq!(check.vulnerable_count(), 1);
    assert_eq!(
        check.check(&method_id(HELPER)).and_then(|c| c.verdict()).map(|v| v.state),
        Some(ConstructState::Vulnerable)
    );
}

#[test]
fn unmatched_fix_makes_archive_vulnerable() {
    init_logging();
    let mut check = archive_check(
        manifest(&[(PARSE, Some(guarded_validation())), (HELPER, None)]),
        ContainmentConfig::default(),
    );
    check.add_construct_changes(bug_changes());

    assert_eq!(check.contains_fix(), Some(false));
    assert_eq!(check.fixed_count(), 1);
    assert_eq!(check.vulnerable_count(), 1);
    assert_eq!(check.indeterminate_count(), 0);
    assert_eq!(
        check.check(&method_id(PARSE)).and_then(|c| c.verdict()).map(|v| v.state),
        Some(ConstructState::Vulnerable)
    );
}

#[test]
fn undecided_constructs_do_not_count() {
    let mut check = archive_check(
        manifest(&[(PARSE, None), (HELPER, None)]),
        ContainmentConfig::default(),
    );
    check.add_construct_changes(bug_changes());

    assert_eq!(check.contains_fix(), Some(true));
    assert_eq!(check.indeterminate_count(), 1);
    assert_eq!(check.fixed_count(), 1);
}

#[test]
fn nothing_decided_gives_no_verdict() {
    let mut check = archive_check(manifest(&[]), ContainmentConfig::default());
    assert_eq!(check.contains_fix(), None);

    check.add_construct_change(change(PARSE, "c1", PATH, 100, ChangeType::Mod));
    assert_eq!(check.contains_fix(), Some(false));
}

#[test]
fn test_code_never_influences_the_verdict() {
    init_logging();
    let mut check = archive_check(
        manifest(&[(PARSE, Some(method(AFTER)))]),
        ContainmentConfig::default(),
    );
    check.add_construct_change(modification("c1", 100, BEFORE, AFTER));
    check.add_construct_change(change(
        "org.acme.ParserTest.parsesInput()",
        "c1",
        "src/test/java/org/acme/ParserTest.java",
        100,
        ChangeType::Add,
    ));
    check.add_construct_change(change(
        "org.acme.Checks.testParse()",
        "c1",
        "src/main/java/org/acme/Checks.java",
        100,
        ChangeType::Add,
    ));

    assert_eq!(check.len(), 3);
    assert_eq!(check.contains_fix(), Some(true));
    assert_eq!(check.excluded_count(), 2);
    assert_eq!(check.vulnerable_count(), 0);
}

#[test]
fn custom_test_path_patterns() {
    let config = ContainmentConfig {
        test_path_patterns: vec!["**/it/**".to_string()],
        ..Default::default()
    };
    let mut check = archive_check(manifest(&[]), config);
    check.add_construct_change(change(
        "org.acme.Flow.run()",
        "c1",
        "module/it/java/org/acme/Flow.java",
        100,
        ChangeType::Add,
    ));
    assert_eq!(check.excluded_count(), 1);
    assert_eq!(check.contains_fix(), None);
}

#[test]
fn report_json_shape() -> Result<()> {
    let mut check = archive_check(
        manifest(&[(PARSE, Some(method(AFTER)))]),
        ContainmentConfig::default(),
    );
    check.add_construct_changes(bug_changes());

    let json = check.to_json()?;
    assert_eq!(json["bugId"], "BUG-1");
    assert_eq!(json["archive"], "app.jar");
    assert_eq!(json["fixed"], false);
    assert_eq!(json["fixedCount"], 1);
    assert_eq!(json["vulnerableCount"], 1);
    assert_eq!(json["indeterminateCount"], 0);

    let constructs = json["constructs"].as_array().expect("constructs array");
    assert_eq!(constructs.len(), 2);
    let parse = constructs
        .iter()
        .find(|c| c["constructChange"]["constructId"]["qname"] == PARSE)
        .expect("parse construct");
    assert_eq!(parse["state"], "FIXED");
    assert_eq!(parse["affected"], false);
    assert_eq!(parse["inArchive"], true);
    assert_eq!(parse["classInArchive"], true);
    assert_eq!(parse["equalChangeType"], true);
    assert_eq!(parse["overall_chg"], "MOD");
    assert_eq!(parse["paths"][0]["revisions"], "c1");
    assert_eq!(parse["paths"][0]["fixed"], true);
    assert_eq!(parse["paths"][0]["relaxed_comparison"], false);
    let tested: serde_json::Value =
        serde_json::from_str(parse["testedBody"].as_str().expect("snapshot text"))?;
    assert!(tested["ast"].is_array());

    let helper = constructs
        .iter()
        .find(|c| c["constructChange"]["constructId"]["qname"] == HELPER)
        .expect("helper construct");
    assert_eq!(helper["overall_chg"], "ADD");
    assert_eq!(helper["affected"], true);
    assert!(helper.get("testedBody").is_none());
    Ok(())
}

#[test]
fn parallel_evaluation_matches_sequential() {
    let build = |parallel: bool| {
        let config = ContainmentConfig {
            parallel,
            ..Default::default()
        };
        let mut check = archive_check(manifest(&[(PARSE, Some(method(BEFORE)))]), config);
        check.add_construct_changes(bug_changes());
        check.report()
    };
    assert_eq!(build(true), build(false));
}

#[test]
fn archive_from_manifest_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("app.json");
    fs::write(
        &path,
        r#"{"constructs": {"org.acme.Parser.sanitize(String)": {"source": "String sanitize(String s) { return s.trim(); }"}}}"#,
    )?;

    let mut check =
        ArchiveFixContainmentCheck::new("BUG-2", Some(path.as_path()), ContainmentConfig::default())?;
    check.add_construct_change(change(HELPER, "c1", PATH, 100, ChangeType::Add));
    assert_eq!(check.contains_fix(), Some(true));
    assert_eq!(check.archive(), path.as_path());
    Ok(())
}

#[test]
fn unreadable_archive_fails_fast() {
    let dir = tempdir().expect("tempdir");
    let result = ArchiveFixContainmentCheck::new(
        "BUG-2",
        Some(dir.path().join("missing.json").as_path()),
        ContainmentConfig::default(),
    );
    assert!(matches!(result, Err(ContainmentError::ArchiveUnavailable { .. })));

    let result = ArchiveFixContainmentCheck::new("BUG-2", None, ContainmentConfig::default());
    assert!(matches!(result, Err(ContainmentError::MissingArchive)));
}

#[test]
fn diagnostics_are_written_when_enabled() -> Result<()> {
    init_logging();
    let dir = tempdir()?;
    let mut check = archive_check(
        manifest(&[(PARSE, Some(method(AFTER)))]),
        ContainmentConfig::for_diagnostics(dir.path()),
    );
    check.add_construct_change(modification("c1", 100, BEFORE, AFTER));
    assert_eq!(check.contains_fix(), Some(true));

    let names: Vec<String> = fs::read_dir(dir.path())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    for kind in ["overall", "defective_to_test", "test_to_fixed", "intersections"] {
        assert!(
            names.iter().any(|n| n.contains(&format!("_{kind}_"))),
            "missing {kind} dump in {names:?}"
        );
    }
    Ok(())
}
