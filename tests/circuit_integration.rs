//! End-to-end checks of circuit files: parse, build, elaborate and lint

use std::fs;
use std::path::PathBuf;

use ato_check::{
    check_circuit, check_circuit_file, CheckConfig, CheckError, DesignError, LintCategory,
    LintConfig, LoadError,
};
use pretty_assertions::assert_eq;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read(name: &str) -> String {
    fs::read_to_string(fixture(name)).expect("fixture should exist")
}

#[test]
fn test_oscillator_nets() {
    let report = check_circuit(&read("oscillator.ato"), &CheckConfig::default()).unwrap();
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.netlists.len(), 1);

    let nets = &report.netlists[0];
    assert_eq!(nets.root(), "Oscillator");
    assert_eq!(
        nets.to_string(),
        "Oscillator\n  \
         gnd: gnd, crystal.gnd, load_cap_1.p2, load_cap_2.p2\n  \
         xin: xin, crystal.xin, load_cap_1.p1\n  \
         xout: xout, crystal.xout, load_cap_2.p1\n"
    );
    assert!(nets.are_connected("load_cap_1.p2", "load_cap_2.p2"));
    assert!(!nets.are_connected("xin", "xout"));
}

#[test]
fn test_oscillator_attributes_are_recorded() {
    let report = check_circuit(&read("oscillator.ato"), &CheckConfig::default()).unwrap();
    let id = report.design.find_block("Oscillator").unwrap();
    let osc = report.design.block(id);
    let targets: Vec<String> = osc
        .attributes
        .iter()
        .map(|a| a.target.join("."))
        .collect();
    assert_eq!(targets, vec!["crystal.package", "crystal.frequency"]);
}

#[test]
fn test_undeclared_references() {
    let err = check_circuit(&read("undeclared.ato"), &CheckConfig::default()).unwrap_err();
    let CheckError::Design(errors) = &err else {
        panic!("unexpected {:?}", err);
    };
    assert_eq!(errors.len(), 2);
    assert!(matches!(
        &errors[0],
        DesignError::UnknownType { name, suggestions, .. }
            if name == "Crystl" && suggestions == &vec!["Crystal".to_string()]
    ));
    assert!(matches!(
        &errors[1],
        DesignError::UndeclaredTerminal { path, .. } if path == "clk"
    ));
}

#[test]
fn test_lint_fixture() {
    let report = check_circuit(&read("lint.ato"), &CheckConfig::default()).unwrap();
    let categories: Vec<LintCategory> = report.warnings.iter().map(|w| w.category).collect();
    assert_eq!(
        categories,
        vec![
            LintCategory::Unused,
            LintCategory::Floating,
            LintCategory::Floating,
            LintCategory::Floating,
            LintCategory::UnconnectedInstance,
            LintCategory::SelfConnection,
        ]
    );
    assert!(report.warnings[0].message.contains("'spare'"));
    assert!(report.warnings[4].message.contains("'r3'"));
}

#[test]
fn test_lint_categories_can_be_disabled() {
    let lint = LintConfig {
        floating: false,
        self_connection: false,
        ..LintConfig::default()
    };
    let config = CheckConfig::default().with_lint(lint);
    let report = check_circuit(&read("lint.ato"), &config).unwrap();
    let categories: Vec<LintCategory> = report.warnings.iter().map(|w| w.category).collect();
    assert_eq!(
        categories,
        vec![LintCategory::Unused, LintCategory::UnconnectedInstance]
    );
}

#[test]
fn test_multi_file_design() {
    let report = check_circuit_file(&fixture("multi/main.ato"), &CheckConfig::default()).unwrap();
    let nets = &report.netlists[0];
    assert_eq!(nets.root(), "Oscillator");
    assert!(nets.are_connected("xin", "cap.p1"));
    assert!(nets.are_connected("gnd", "crystal.gnd"));
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn test_multi_file_strict_imports() {
    let config = CheckConfig::from_file(&fixture("strict.toml")).unwrap();
    let err = check_circuit_file(&fixture("multi/main.ato"), &config).unwrap_err();
    let CheckError::Load(LoadError::Design { errors, .. }) = &err else {
        panic!("unexpected {:?}", err);
    };
    let paths: Vec<&str> = errors
        .iter()
        .filter_map(|e| match e {
            DesignError::OpaqueReference { path, .. } => Some(path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(paths, vec!["cap.p2", "cap.p1"]);
}

#[test]
fn test_from_import_without_loader_is_opaque() {
    // Source text alone cannot follow the import, so Crystal stays unchecked
    let report = check_circuit(&read("multi/main.ato"), &CheckConfig::default()).unwrap();
    assert!(report.netlists[0].are_connected("xin", "crystal.xin"));
    assert!(report.design.find_block("Crystal").is_none());
}

#[test]
fn test_instance_wired_through_parent_path() {
    let src = "component R:\n    signal a\nmodule Inner:\n    r = new R\nmodule Top:\n    signal x\n    inner = new Inner\n    x ~ inner.r.a\n";
    let report = check_circuit(src, &CheckConfig::default()).unwrap();
    assert!(report.netlists[0].are_connected("x", "inner.r.a"));
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}
