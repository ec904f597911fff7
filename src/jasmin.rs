use anyhow::{Context, Result};
use log::{debug, info};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use self::runtime::{
    CLASS_PLACEHOLDER, JASMIN_FOOTER, JASMIN_HEADER, READ_INT, WRITE_INT, WRITE_STRING, assemble,
    escape_jasmin_string, main_prologue, run_class, temp_dir,
};
use crate::ast::Program;
use crate::backend::{Backend, Io, PreparedBackend};
use crate::bytecode::{CompiledProgram, Instruction, compile};

mod runtime;

pub use runtime::run_class_inherited;

/// File extension of emitted assembly.
pub const EXTENSION: &str = "j";

const DEFAULT_JAR: &str = "jasmin.jar";
const DEFAULT_JAVA: &str = "java";

/// Backend that emits Jasmin assembly, assembles it into a class file and
/// runs it on the JVM.
pub struct Jasmin {
    jar: PathBuf,
    java: OsString,
}

pub struct PreparedJasmin {
    dir: PathBuf,
    class_name: String,
    java: OsString,
}

impl Jasmin {
    pub fn new(jar: impl Into<PathBuf>, java: impl Into<OsString>) -> Self {
        Self {
            jar: jar.into(),
            java: java.into(),
        }
    }

    /// Uses `WHILEC_JASMIN` and `JAVA` when set.
    pub fn from_env() -> Self {
        let jar = std::env::var_os("WHILEC_JASMIN").unwrap_or_else(|| DEFAULT_JAR.into());
        let java = std::env::var_os("JAVA").unwrap_or_else(|| DEFAULT_JAVA.into());
        Self::new(jar, java)
    }

    pub fn java(&self) -> &OsString {
        &self.java
    }

    /// Writes `<dir>/<class_name>.j` and assembles it into `dir`.
    pub fn build(&self, compiled: &CompiledProgram, class_name: &str, dir: &Path) -> Result<PathBuf> {
        let source_path = write_assembly(compiled, class_name, dir)?;
        assemble(&self.java, &self.jar, &source_path, dir)?;
        info!("assembled {}", source_path.display());
        Ok(source_path)
    }
}

/// Class name for a source file: its base name, made a valid JVM identifier.
pub fn class_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

/// Full assembly text for `compiled`, with the placeholder in the template
/// replaced by `class_name`.
pub fn render(compiled: &CompiledProgram, class_name: &str) -> String {
    let mut output = JASMIN_HEADER.replace(CLASS_PLACEHOLDER, class_name);
    output.push_str(&main_prologue(compiled.slots));
    for instruction in &compiled.code {
        output.push_str(&render_instruction(instruction, class_name));
    }
    output.push_str(&JASMIN_FOOTER.replace(CLASS_PLACEHOLDER, class_name));
    output
}

fn render_instruction(instruction: &Instruction, class_name: &str) -> String {
    let line = match instruction {
        Instruction::Label(label) => return format!("\n{label}:\n"),
        Instruction::Ldc(value) => format!("ldc {value}"),
        Instruction::LdcString(text) => format!("ldc \"{}\"", escape_jasmin_string(text)),
        Instruction::ILoad(slot) => format!("iload {slot}"),
        Instruction::IStore(slot) => format!("istore {slot}"),
        Instruction::IAdd => "iadd".to_string(),
        Instruction::ISub => "isub".to_string(),
        Instruction::IMul => "imul".to_string(),
        Instruction::IDiv => "idiv".to_string(),
        Instruction::IfICmpEq(label) => format!("if_icmpeq {label}"),
        Instruction::IfICmpNe(label) => format!("if_icmpne {label}"),
        Instruction::IfICmpLe(label) => format!("if_icmple {label}"),
        Instruction::IfICmpGe(label) => format!("if_icmpge {label}"),
        Instruction::Goto(label) => format!("goto {label}"),
        Instruction::ReadInt => READ_INT.replace(CLASS_PLACEHOLDER, class_name),
        Instruction::PrintInt => WRITE_INT.replace(CLASS_PLACEHOLDER, class_name),
        Instruction::PrintString => WRITE_STRING.replace(CLASS_PLACEHOLDER, class_name),
    };
    format!("    {line}\n")
}

pub fn write_assembly(compiled: &CompiledProgram, class_name: &str, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))?;
    let path = dir.join(format!("{class_name}.{EXTENSION}"));
    fs::write(&path, render(compiled, class_name))
        .with_context(|| format!("Writing {}", path.display()))?;
    debug!("wrote {}", path.display());
    Ok(path)
}

impl Backend for Jasmin {
    fn name(&self) -> &'static str {
        "jasmin"
    }

    fn prepare(&self, program: &Program) -> Result<Box<dyn PreparedBackend>> {
        let compiled = compile(program)?;
        let dir = temp_dir()?;
        let class_name = "WhileProgram".to_string();
        let prepared = PreparedJasmin {
            dir,
            class_name,
            java: self.java.clone(),
        };
        self.build(&compiled, &prepared.class_name, &prepared.dir)?;
        Ok(Box::new(prepared))
    }
}

impl PreparedBackend for PreparedJasmin {
    fn run(&self, io: &mut Io<'_>) -> Result<()> {
        run_class(&self.java, &self.dir, &self.class_name, io)
    }
}

impl Drop for PreparedJasmin {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}
