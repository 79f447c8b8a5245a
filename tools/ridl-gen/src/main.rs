// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ridl::descriptor::{Program, Requiredness};
use ridl::TypeLoader;

fn main() {
    // Initialize tracing for diagnostics
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "compile" => {
            if let Err(e) = compile(&args[2..]) {
                eprintln!("[ERROR] {}", e);
                std::process::exit(1);
            }
        }
        "--help" | "-h" | "help" => {
            print_help();
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_help();
            std::process::exit(1);
        }
    }
}

fn compile(args: &[String]) -> Result<()> {
    let mut include_dirs: Vec<PathBuf> = Vec::new();
    let mut generator: Option<String> = None;
    let mut files: Vec<PathBuf> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-I" | "--include" => {
                let dir = iter
                    .next()
                    .context("missing directory after -I")?;
                include_dirs.push(PathBuf::from(dir));
            }
            "--gen" => {
                let name = iter.next().context("missing generator after --gen")?;
                generator = Some(name.clone());
            }
            other if other.starts_with('-') => bail!("unknown option: {}", other),
            file => files.push(PathBuf::from(file)),
        }
    }

    if files.is_empty() {
        bail!("no input files");
    }
    if let Some(name) = &generator {
        if name != "list" {
            bail!("unknown generator: {}", name);
        }
    }

    let loader = TypeLoader::with_include_dirs(include_dirs);
    for file in &files {
        tracing::info!("compiling {}", file.display());
        let program = loader
            .load(file)
            .with_context(|| format!("failed to compile {}", file.display()))?;
        if generator.as_deref() == Some("list") {
            list_program(&program);
        }
    }
    tracing::info!("{} file(s) compiled", files.len());
    Ok(())
}

/// Print the resolved declarations of a program in declaration order.
fn list_program(program: &Program) {
    println!("program {} ({})", program.name(), program.path().display());
    for e in program.enums() {
        println!("  enum {}", e.name());
        for v in e.values() {
            println!("    {} = {}", v.name, v.id);
        }
    }
    for t in program.typedefs() {
        println!("  typedef {} = {}", t.name, t.target.name());
    }
    for c in program.constants() {
        println!("  const {} : {}", c.name, c.value_type.name());
    }
    for m in program.messages() {
        let kind = match m.variant() {
            ridl::MessageVariant::Struct => "struct",
            ridl::MessageVariant::Union => "union",
            ridl::MessageVariant::Exception => "exception",
        };
        println!("  {} {}", kind, m.name());
        for f in m.fields() {
            let req = match f.requiredness {
                Requiredness::Required => "required ",
                Requiredness::Optional => "optional ",
                Requiredness::Default => "",
            };
            println!("    {}: {}{} {}", f.id, req, f.field_type.name(), f.name);
        }
    }
    for s in program.services() {
        match &s.extends {
            Some(parent) => println!("  service {} extends {}", s.name, parent),
            None => println!("  service {}", s.name),
        }
        for m in &s.methods {
            let returns = m
                .returns
                .as_ref()
                .map(|t| t.name())
                .unwrap_or_else(|| "void".to_string());
            let params: Vec<String> = m
                .params
                .iter()
                .map(|p| format!("{}: {} {}", p.id, p.field_type.name(), p.name))
                .collect();
            let oneway = if m.oneway { "oneway " } else { "" };
            println!("    {}{} {}({})", oneway, returns, m.name, params.join(", "));
        }
    }
}

fn print_help() {
    println!("ridl-gen v0.4");
    println!();
    println!("USAGE:");
    println!("    ridl-gen <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    compile [--gen <name>] [-I <dir>]... <file>...");
    println!("               Load and resolve IDL files, reporting errors");
    println!("    help       Print this help message");
    println!();
    println!("OPTIONS:");
    println!("    -I <dir>      Add an include search directory");
    println!("    --gen list    Print the resolved declarations");
    println!();
    println!("EXAMPLES:");
    println!("    ridl-gen compile -I idl/shared idl/calendar.ridl");
    println!("    ridl-gen compile --gen list idl/calendar.ridl");
    println!();
}
