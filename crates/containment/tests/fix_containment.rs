mod support;

use anyhow::Result;
use fixcheck_containment::{
    ArchiveInspector, ChangeType, CheckContext, ConstructId, ConstructState, ContainmentError,
    FixContainmentCheck,
};
use fixcheck_signature::Signature;
use pretty_assertions::assert_eq;
use support::{
    change, guarded_validation, init_logging, manifest, method, method_id, modification, PARSE,
    PATH,
};

const BEFORE: &[&str] = &["open(input)", "read()"];
const AFTER: &[&str] = &["open(input)", "validate(input)", "read()"];

fn fix_check() -> FixContainmentCheck {
    let mut check = FixContainmentCheck::new(method_id(PARSE));
    check.add_change(modification("c1", 100, BEFORE, AFTER));
    check
}

fn evaluate(check: &FixContainmentCheck, tested: Option<Signature>) -> ConstructState {
    let archive = manifest(&[(PARSE, tested)]);
    let ctx = CheckContext::new(&archive);
    check.evaluate(&ctx).state
}

#[test]
fn tested_version_with_fix_is_fixed() {
    init_logging();
    let check = fix_check();
    assert_eq!(evaluate(&check, Some(method(AFTER))), ConstructState::Fixed);

    let verdict = check.verdict().expect("cached verdict");
    assert!(verdict.in_archive);
    assert!(verdict.class_in_archive);
    assert!(!verdict.relaxed());
    assert_eq!(verdict.matched(), (1, 1));
    assert!(verdict.tested_body.is_some());
}

#[test]
fn tested_version_without_fix_is_vulnerable() {
    init_logging();
    let check = fix_check();
    assert_eq!(evaluate(&check, Some(method(BEFORE))), ConstructState::Vulnerable);
    assert_eq!(check.verdict().expect("cached verdict").matched(), (0, 1));
}

#[test]
fn empty_overall_change_counts_as_fixed() {
    let mut check = FixContainmentCheck::new(method_id(PARSE));
    check.add_change(modification("c1", 100, BEFORE, BEFORE));
    assert_eq!(evaluate(&check, Some(method(&["unrelated()"]))), ConstructState::Fixed);
}

#[test]
fn cosmetic_differences_match_after_normalization() {
    init_logging();
    let check = fix_check();
    let tested = method(&["open(input)", "this.validate(input)", "read()"]);
    assert_eq!(evaluate(&check, Some(tested)), ConstructState::Fixed);
    assert!(check.verdict().expect("cached verdict").relaxed());
}

#[test]
fn added_construct_is_fixed_when_present() {
    let mut check = FixContainmentCheck::new(method_id(PARSE));
    check.add_change(change(PARSE, "c1", PATH, 100, ChangeType::Add));

    let present = manifest(&[(PARSE, None)]);
    assert_eq!(check.evaluate(&CheckContext::new(&present)).state, ConstructState::Fixed);

    let mut check = FixContainmentCheck::new(method_id(PARSE));
    check.add_change(change(PARSE, "c1", PATH, 100, ChangeType::Add));
    let absent = manifest(&[]);
    assert_eq!(check.evaluate(&CheckContext::new(&absent)).state, ConstructState::Vulnerable);
}

#[test]
fn deleted_construct_is_fixed_when_absent() {
    let mut check = FixContainmentCheck::new(method_id(PARSE));
    check.add_change(change(PARSE, "c1", PATH, 100, ChangeType::Del));
    let absent = manifest(&[]);
    assert_eq!(check.evaluate(&CheckContext::new(&absent)).state, ConstructState::Fixed);
}

#[test]
fn modified_construct_missing_from_archive_is_vulnerable() {
    let check = fix_check();
    let absent = manifest(&[]);
    let verdict = check.evaluate(&CheckContext::new(&absent));
    assert_eq!(verdict.state, ConstructState::Vulnerable);
    assert!(!verdict.in_archive);
}

#[test]
fn nested_class_member_is_decided_by_presence() {
    init_logging();
    let nested = "org.acme.Parser$Reader.parse(String)";
    let mut check = FixContainmentCheck::new(method_id(nested));
    check.add_change(
        change(nested, "c1", PATH, 100, ChangeType::Mod).with_bodies(
            Some(support::snapshot(BEFORE)),
            Some(support::snapshot(AFTER)),
        ),
    );

    let archive = manifest(&[(nested, Some(method(BEFORE)))]);
    let verdict = check.evaluate(&CheckContext::new(&archive));
    assert_eq!(verdict.state, ConstructState::Fixed);
    assert!(verdict.tested_body.is_none());
}

#[test]
fn missing_tested_body_is_indeterminate() {
    let check = fix_check();
    assert_eq!(evaluate(&check, None), ConstructState::Indeterminate);
}

#[test]
fn missing_snapshots_are_indeterminate() {
    let mut check = FixContainmentCheck::new(method_id(PARSE));
    check.add_change(change(PARSE, "c1", PATH, 100, ChangeType::Mod));
    assert_eq!(evaluate(&check, Some(method(AFTER))), ConstructState::Indeterminate);
}

#[test]
fn different_change_types_across_paths_are_not_fixed() {
    init_logging();
    let mut check = fix_check();
    check.add_change(change(PARSE, "c2", "legacy/Parser.java", 200, ChangeType::Add));

    let archive = manifest(&[(PARSE, Some(method(AFTER)))]);
    let verdict = check.evaluate(&CheckContext::new(&archive));
    assert_eq!(verdict.state, ConstructState::Vulnerable);
    assert!(!verdict.equal_change_type);
    assert_eq!(verdict.change_type, None);
    assert_eq!(verdict.paths.len(), 2);
    assert!(verdict.paths.iter().all(|p| p.fixed.is_none()));
}

#[test]
fn added_and_removed_path_gives_no_opinion() {
    let mut check = fix_check();
    check.add_change(change(PARSE, "c2", "legacy/Parser.java", 200, ChangeType::Add));
    check.add_change(change(PARSE, "c3", "legacy/Parser.java", 300, ChangeType::Del));

    let archive = manifest(&[(PARSE, Some(method(AFTER)))]);
    let verdict = check.evaluate(&CheckContext::new(&archive));
    assert!(verdict.equal_change_type);
    assert_eq!(verdict.state, ConstructState::Fixed);
}

#[test]
fn partially_applied_fix_is_vulnerable() {
    let mut check = fix_check();
    assert_eq!(evaluate(&check, Some(method(AFTER))), ConstructState::Fixed);

    check.add_change(modification(
        "c2",
        200,
        AFTER,
        &["open(input)", "validate(input)", "read()", "close()"],
    ));
    assert!(check.verdict().is_none());
    assert_eq!(evaluate(&check, Some(method(AFTER))), ConstructState::Vulnerable);

    let verdict = check.verdict().expect("cached verdict");
    assert_eq!(verdict.paths[0].fixed, Some(false));
    assert!(!verdict.paths[0].vulnerable);
}

#[test]
fn fix_found_nowhere_even_after_normalization_is_vulnerable() {
    init_logging();
    let check = fix_check();
    let archive = manifest(&[(PARSE, Some(guarded_validation()))]);
    let verdict = check.evaluate(&CheckContext::new(&archive));

    assert_eq!(verdict.state, ConstructState::Vulnerable);
    assert_eq!(verdict.paths.len(), 1);
    assert_eq!(verdict.paths[0].fixed, Some(false));
    assert_eq!(verdict.paths[0].relaxed, Some(true));
}

struct BrokenArchive;

impl ArchiveInspector for BrokenArchive {
    fn contains_construct(&self, _id: &ConstructId) -> bool {
        true
    }

    fn contains_class(&self, _qname: &str) -> bool {
        true
    }

    fn tested_signature(
        &self,
        id: &ConstructId,
    ) -> fixcheck_containment::Result<Option<Signature>> {
        Err(ContainmentError::invalid_change(format!("no bytecode for {}", id.qname)))
    }
}

#[test]
fn unreadable_tested_body_is_indeterminate() -> Result<()> {
    let check = fix_check();
    let report = check.report(&CheckContext::new(&BrokenArchive));
    assert_eq!(report.state, ConstructState::Indeterminate);
    assert_eq!(report.affected, None);
    assert!(report.in_archive);

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["state"], "INDETERMINATE");
    assert_eq!(json["overall_chg"], "MOD");
    assert_eq!(json["paths"][0]["path"], PATH);
    assert!(json.get("testedBody").is_none());
    Ok(())
}
