#![allow(dead_code)]
use std::fs;
use std::path::{Path, PathBuf};

use test_support::load_cases;
use whilec::ast::Program;

/// Bench-enabled fixture programs, as `(label, path, stdin)`.
pub fn workloads() -> Vec<(String, PathBuf, String)> {
    let cases = load_cases(Path::new("tests/programs")).expect("load cases");
    cases
        .into_iter()
        .filter(|case| case.spec.bench.enabled)
        .map(|case| {
            let stdin = case.stdin().expect("read stdin");
            (case.name.clone(), case.program_path.clone(), stdin)
        })
        .collect()
}

pub fn load_source(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}

pub fn load_program(path: &Path) -> Program {
    let source = load_source(path);
    whilec::parse(&source).unwrap_or_else(|err| panic!("parse {}: {err:#}", path.display()))
}
