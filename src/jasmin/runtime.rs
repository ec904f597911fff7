use anyhow::{Context, Result, anyhow, bail};
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::Io;

/// Stands in for the class name in the templates.
pub const CLASS_PLACEHOLDER: &str = "XXX";

pub const JASMIN_HEADER: &str = r#".class public XXX.XXX
.super java/lang/Object

.method public static write(I)V
    .limit locals 1
    .limit stack 2
    getstatic java/lang/System/out Ljava/io/PrintStream;
    iload 0
    invokevirtual java/io/PrintStream/println(I)V
    return
.end method

.method public static writes(Ljava/lang/String;)V
    .limit locals 1
    .limit stack 2
    getstatic java/lang/System/out Ljava/io/PrintStream;
    aload 0
    invokevirtual java/io/PrintStream/println(Ljava/lang/String;)V
    return
.end method

; Reads one line and parses it as a signed decimal integer. Malformed or
; missing input throws NumberFormatException.
.method public static read()I
    .limit locals 3
    .limit stack 3
    new java/lang/StringBuilder
    dup
    invokespecial java/lang/StringBuilder/<init>()V
    astore 0
read_next:
    getstatic java/lang/System/in Ljava/io/InputStream;
    invokevirtual java/io/InputStream/read()I
    istore 1
    iload 1
    iflt read_done
    iload 1
    ldc 10
    if_icmpeq read_done
    aload 0
    iload 1
    i2c
    invokevirtual java/lang/StringBuilder/append(C)Ljava/lang/StringBuilder;
    pop
    goto read_next
read_done:
    aload 0
    invokevirtual java/lang/StringBuilder/toString()Ljava/lang/String;
    invokevirtual java/lang/String/trim()Ljava/lang/String;
    invokestatic java/lang/Integer/parseInt(Ljava/lang/String;)I
    ireturn
.end method

"#;

/// Locals `main` declares even when the program uses fewer slots.
pub const MIN_MAIN_LOCALS: usize = 200;

/// Opening of `main`, sized for `slots` variables.
pub fn main_prologue(slots: usize) -> String {
    format!(
        ".method public static main([Ljava/lang/String;)V\n    .limit locals {}\n    .limit stack 200\n\n",
        slots.max(MIN_MAIN_LOCALS)
    )
}

pub const JASMIN_FOOTER: &str = r#"
    return
.end method
"#;

pub const WRITE_INT: &str = "invokestatic XXX/XXX/write(I)V";
pub const WRITE_STRING: &str = "invokestatic XXX/XXX/writes(Ljava/lang/String;)V";
pub const READ_INT: &str = "invokestatic XXX/XXX/read()I";

pub fn escape_jasmin_string(value: &str) -> String {
    let mut escaped = String::new();
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn temp_dir() -> Result<PathBuf> {
    let mut dir = std::env::temp_dir();
    dir.push("whilec");
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("jasmin_{}_{nanos}", std::process::id()));
    fs::create_dir_all(&dir).context("Creating temp directory")?;
    Ok(dir)
}

pub fn assemble(java: &OsStr, jar: &Path, source: &Path, out_dir: &Path) -> Result<()> {
    let output = Command::new(java)
        .arg("-jar")
        .arg(jar)
        .arg("-d")
        .arg(out_dir)
        .arg(source)
        .output()
        .with_context(|| format!("Running the Jasmin assembler {}", jar.display()))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    // Jasmin reports some errors on stdout while still exiting with success.
    if !output.status.success() || stdout.contains("Error") {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Jasmin assembly failed: {stdout}{stderr}");
    }
    Ok(())
}

/// Runs `<class_name>.<class_name>` from `class_dir`, feeding it everything
/// left on the program input and copying its output back.
pub fn run_class(java: &OsStr, class_dir: &Path, class_name: &str, io: &mut Io<'_>) -> Result<()> {
    let mut input = Vec::new();
    io.input()
        .read_to_end(&mut input)
        .context("Reading program input")?;

    let mut child = Command::new(java)
        .arg("-cp")
        .arg(class_dir)
        .arg(format!("{class_name}.{class_name}"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Running java")?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("Java process has no stdin"))?;
    let writer = std::thread::spawn(move || stdin.write_all(&input));
    let output = child.wait_with_output().context("Waiting for java")?;
    // The program may exit without consuming all input; a broken pipe here
    // is not an error.
    let _ = writer.join();

    io.output()
        .write_all(&output.stdout)
        .context("Writing program output")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Compiled program failed: {stderr}");
    }
    Ok(())
}

/// Runs the class with the current process's standard streams.
pub fn run_class_inherited(java: &OsStr, class_dir: &Path, class_name: &str) -> Result<()> {
    let status = Command::new(java)
        .arg("-cp")
        .arg(class_dir)
        .arg(format!("{class_name}.{class_name}"))
        .status()
        .context("Running java")?;
    if !status.success() {
        bail!("Compiled program exited with {status}");
    }
    Ok(())
}
