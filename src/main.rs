use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use log::debug;

use whilec::backend::{Io, backend_by_name};
use whilec::bytecode::compile;
use whilec::jasmin::{self, Jasmin};
use whilec::lexer;

const USAGE: &str = "usage: whilec [--backend <interpreter|vm|jasmin>] [--emit <tokens|ast|asm>] [--out-dir <dir>] [--no-run] [file]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    Tokens,
    Ast,
    Asm,
}

#[derive(Debug, Default)]
struct Options {
    backend: Option<String>,
    emit: Option<Emit>,
    out_dir: Option<PathBuf>,
    no_run: bool,
    input_path: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--backend" | "-b" => {
                let name = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing backend name after {arg}"))?;
                options.backend = Some(name);
            }
            "--emit" | "-e" => {
                let kind = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing output kind after {arg}"))?;
                options.emit = Some(match kind.as_str() {
                    "tokens" => Emit::Tokens,
                    "ast" => Emit::Ast,
                    "asm" => Emit::Asm,
                    other => bail!("Unknown output kind '{other}'\n{USAGE}"),
                });
            }
            "--out-dir" | "-o" => {
                let dir = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing directory after {arg}"))?;
                options.out_dir = Some(PathBuf::from(dir));
            }
            "--no-run" => options.no_run = true,
            "--help" | "-h" => bail!("{USAGE}"),
            _ => {
                if options.input_path.is_some() {
                    bail!("Only one input file is supported");
                }
                options.input_path = Some(PathBuf::from(arg));
            }
        }
    }
    Ok(options)
}

fn main() -> Result<()> {
    env_logger::init();
    let options = parse_args(std::env::args().skip(1))?;

    let source = if let Some(path) = &options.input_path {
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    match options.emit {
        Some(Emit::Tokens) => {
            let tokens = lexer::tokenize(&source)?;
            let mut stdout = io::stdout().lock();
            for token in tokens {
                writeln!(stdout, "{}:{} {}", token.span.line, token.span.column, token.kind)?;
            }
            return Ok(());
        }
        Some(Emit::Ast) => {
            let program = whilec::parse(&source)?;
            println!("{program:#?}");
            return Ok(());
        }
        Some(Emit::Asm) => {
            let program = whilec::parse(&source)?;
            let compiled = compile(&program)?;
            print!("{}", jasmin::render(&compiled, &class_name(&options)));
            return Ok(());
        }
        None => {}
    }

    let program = whilec::parse(&source)?;

    if let Some(name) = &options.backend {
        let backend = backend_by_name(name).ok_or_else(|| anyhow!("Unknown backend '{name}'"))?;
        debug!("running with the {} backend", backend.name());
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout().lock();
        return backend.run(&program, &mut Io::new(&mut input, &mut output));
    }

    let compiled = compile(&program)?;
    let class_name = class_name(&options);
    let out_dir = options.out_dir.clone().unwrap_or_else(|| default_out_dir(&options));
    if options.no_run {
        let path = jasmin::write_assembly(&compiled, &class_name, &out_dir)?;
        println!("{}", path.display());
        return Ok(());
    }

    let assembler = Jasmin::from_env();
    assembler.build(&compiled, &class_name, &out_dir)?;
    jasmin::run_class_inherited(assembler.java(), &out_dir, &class_name)
}

fn class_name(options: &Options) -> String {
    match &options.input_path {
        Some(path) => jasmin::class_name(path),
        None => "Program".to_string(),
    }
}

fn default_out_dir(options: &Options) -> PathBuf {
    options
        .input_path
        .as_deref()
        .and_then(Path::parent)
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
