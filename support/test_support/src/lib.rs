use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;

const PROGRAM_FILE: &str = "program.while";
const SPEC_FILE: &str = "case.yaml";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseClass {
    RuntimeSuccess,
    FrontendError,
    BackendRuntimeError,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BenchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpectedOutcome {
    pub stdout_file: Option<String>,
    pub stdin_file: Option<String>,
    pub error_contains: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaseSpec {
    pub class: CaseClass,
    /// Whether the Jasmin backend is expected to agree on this case.
    #[serde(default)]
    pub parity: bool,
    #[serde(default)]
    pub unsupported_backends: Vec<String>,
    #[serde(default)]
    pub bench: BenchConfig,
    pub expected: ExpectedOutcome,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub name: String,
    pub dir: PathBuf,
    pub program_path: PathBuf,
    pub spec: CaseSpec,
}

impl Case {
    pub fn read_text(&self, relative_path: &str) -> Result<String> {
        fs::read_to_string(self.dir.join(relative_path))
            .with_context(|| format!("Reading {} fixture file {}", self.name, relative_path))
    }

    pub fn source(&self) -> Result<String> {
        fs::read_to_string(&self.program_path)
            .with_context(|| format!("Reading {}", self.program_path.display()))
    }

    /// Program input, empty when the case has no stdin file.
    pub fn stdin(&self) -> Result<String> {
        match self.spec.expected.stdin_file.as_deref() {
            Some(file) => self.read_text(file),
            None => Ok(String::new()),
        }
    }

    pub fn expected_stdout(&self) -> Result<String> {
        let file = self
            .spec
            .expected
            .stdout_file
            .as_deref()
            .with_context(|| format!("Missing stdout_file in {}", self.name))?;
        self.read_text(file)
    }

    pub fn expected_error(&self) -> Result<&str> {
        self.spec
            .expected
            .error_contains
            .as_deref()
            .with_context(|| format!("Missing error_contains in {}", self.name))
    }

    /// Loads `<dir>/case.yaml` and checks that `program.while` sits next to it.
    pub fn load(dir: PathBuf) -> Result<Self> {
        let name = dir
            .file_name()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .with_context(|| format!("Invalid case directory name {}", dir.display()))?;
        let program_path = dir.join(PROGRAM_FILE);
        ensure!(
            program_path.is_file(),
            "Missing {PROGRAM_FILE} for case {name}"
        );
        let spec_path = dir.join(SPEC_FILE);
        let raw = fs::read_to_string(&spec_path)
            .with_context(|| format!("Reading {}", spec_path.display()))?;
        let spec = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing {}", spec_path.display()))?;
        Ok(Self {
            name,
            dir,
            program_path,
            spec,
        })
    }
}

/// Every case directory under `programs_dir`, sorted by name.
pub fn load_cases(programs_dir: &Path) -> Result<Vec<Case>> {
    let entries = fs::read_dir(programs_dir)
        .with_context(|| format!("Reading {}", programs_dir.display()))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.join(SPEC_FILE).is_file() {
            dirs.push(path);
        }
    }
    dirs.sort();
    ensure!(!dirs.is_empty(), "No cases found in {}", programs_dir.display());
    dirs.into_iter().map(Case::load).collect()
}

/// Unix line endings, no trailing whitespace.
pub fn normalize_output(output: &str) -> String {
    output.lines().collect::<Vec<_>>().join("\n").trim_end().to_string()
}

/// Rejects cases that opt out of a backend nobody knows about.
pub fn validate_unsupported_backends(case: &Case, known_backends: &[&str]) -> Result<()> {
    match case
        .spec
        .unsupported_backends
        .iter()
        .find(|name| !known_backends.contains(&name.as_str()))
    {
        Some(unknown) => bail!("Case {} opts out of unknown backend '{unknown}'", case.name),
        None => Ok(()),
    }
}

pub fn is_backend_unsupported(case: &Case, backend_name: &str) -> bool {
    case.spec.unsupported_backends.iter().any(|name| name == backend_name)
}
