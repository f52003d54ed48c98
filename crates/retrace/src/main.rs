//! Retrace - compare and decode recorded C state
//!
//! Usage:
//!   retrace match <a.h> <type-a> <b.h> <type-b>
//!   retrace decode <decls.h> <type-or-value> <hex-bytes>
//!   retrace dump <decls.h>

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use retrace::common::DiagnosticReporter;
use retrace::frontend::{FrontendConfig, build_context, parse_type_name, read_source};
use retrace::types::{TargetLayout, TypeContext, TypeId};
use retrace::{decode, render_typed, types_match};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Layout model declarations are interpreted with
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Default)]
enum Target {
    /// The machine running this tool
    #[default]
    Host,
    /// 64-bit Unix
    Lp64,
    /// 32-bit Unix
    Ilp32,
    /// 64-bit Windows
    Llp64,
    /// Motorola 68000
    M68k,
}

impl Target {
    fn layout(self) -> TargetLayout {
        match self {
            Target::Host => TargetLayout::host(),
            Target::Lp64 => TargetLayout::lp64(),
            Target::Ilp32 => TargetLayout::ilp32(),
            Target::Llp64 => TargetLayout::llp64(),
            Target::M68k => TargetLayout::m68k(),
        }
    }
}

#[derive(ClapParser, Debug)]
#[command(name = "retrace")]
#[command(version)]
#[command(about = "Cross-context C type matching and state decoding", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Dump tokens (for debugging)
    #[arg(long, global = true)]
    dump_tokens: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether two types from separate declaration files are equivalent
    Match {
        /// Declarations of the first context
        left: PathBuf,
        /// Type name or value name in the first context
        left_type: String,
        /// Declarations of the second context
        right: PathBuf,
        /// Type name or value name in the second context
        right_type: String,

        /// Layout of the first context
        #[arg(long, value_enum, default_value = "host")]
        target_a: Target,

        /// Layout of the second context
        #[arg(long, value_enum, default_value = "host")]
        target_b: Target,
    },

    /// Decode host-layout bytes as a value of a type
    Decode {
        /// Declaration file
        decls: PathBuf,
        /// Type name or value name
        ty: String,
        /// Bytes as hex, e.g. "2a000000" or "0x2a 0x00"
        bytes: Option<String>,

        /// Read the raw bytes from a file instead
        #[arg(short, long, conflicts_with = "bytes")]
        file: Option<PathBuf>,

        /// Prefix the value with its type, as in `(int)42`
        #[arg(long)]
        typed: bool,
    },

    /// List declared values with their types and sizes
    Dump {
        /// Declaration file
        decls: PathBuf,

        /// Layout to report sizes for
        #[arg(short, long, value_enum, default_value = "host")]
        target: Target,
    },
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("retrace=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns `Ok(false)` when the command ran but the answer is negative
fn run(args: &Args) -> Result<bool> {
    match &args.command {
        Command::Match {
            left,
            left_type,
            right,
            right_type,
            target_a,
            target_b,
        } => {
            let mut a = Loaded::read(left, target_a.layout(), args.dump_tokens)?;
            let mut b = Loaded::read(right, target_b.layout(), args.dump_tokens)?;
            let ty_a = a.resolve(left_type)?;
            let ty_b = b.resolve(right_type)?;

            let matched = types_match(&a.ctx, ty_a, &b.ctx, ty_b);
            println!(
                "{}: {} {} {}",
                if matched { "match" } else { "mismatch" },
                a.ctx.describe(ty_a),
                if matched { "==" } else { "!=" },
                b.ctx.describe(ty_b),
            );
            Ok(matched)
        }
        Command::Decode {
            decls,
            ty,
            bytes,
            file,
            typed,
        } => {
            let mut loaded = Loaded::read(decls, TargetLayout::host(), args.dump_tokens)?;
            let ty = loaded.resolve(ty)?;
            let bytes = match (bytes, file) {
                (Some(text), _) => parse_hex(text)?,
                (None, Some(path)) => fs::read(path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                (None, None) => bail!("no bytes given; pass hex bytes or --file"),
            };

            let value = decode(&loaded.ctx, ty, &bytes);
            if *typed {
                println!("{}", render_typed(&loaded.ctx, ty, Some(&bytes)));
            } else {
                println!("{}", value);
            }
            Ok(!value.is_degraded())
        }
        Command::Dump { decls, target } => {
            let loaded = Loaded::read(decls, target.layout(), args.dump_tokens)?;
            let ctx = &loaded.ctx;
            for decl in ctx.values() {
                let size = ctx
                    .type_info(decl.ty)
                    .map_or_else(|| "?".to_string(), |info| info.size_in_bytes().to_string());
                println!("{}: {} ({} bytes)", ctx.resolve(decl.name), ctx.describe(decl.ty), size);
            }
            Ok(true)
        }
    }
}

/// A parsed declaration file and the reporter that knows its source
struct Loaded {
    ctx: TypeContext,
    reporter: DiagnosticReporter,
}

impl Loaded {
    fn read(path: &Path, target: TargetLayout, dump_tokens: bool) -> Result<Self> {
        let source = read_source(path).with_context(|| format!("cannot read {}", path.display()))?;
        let filename = path.display().to_string();

        let mut reporter = DiagnosticReporter::new();
        let file_id = reporter.add_file(&filename, &source);

        let config = FrontendConfig {
            target,
            dump_tokens,
        };
        match build_context(&filename, &source, &config) {
            Ok(ctx) => Ok(Self { ctx, reporter }),
            Err(e) => {
                reporter.report_error(file_id, &e);
                Err(anyhow!("failed to parse {}", filename))
            }
        }
    }

    /// A value name resolves to its declared type, anything else is parsed as a type name
    fn resolve(&mut self, text: &str) -> Result<TypeId> {
        if let Some(decl) = self.ctx.lookup_value(text.trim()) {
            return Ok(decl.ty);
        }
        match parse_type_name(text, &mut self.ctx) {
            Ok(ty) => Ok(ty),
            Err(e) => {
                let file_id = self.reporter.add_file("<type name>", text);
                self.reporter.report_error(file_id, &e);
                Err(anyhow!("'{}' is neither a value nor a type in {}", text, self.ctx.name()))
            }
        }
    }
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .split_whitespace()
        .map(|word| word.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();
    if !digits.is_ascii() {
        bail!("invalid hex digits in '{}'", text);
    }
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits in '{}'", text);
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("2a000000").unwrap(), vec![0x2a, 0, 0, 0]);
        assert_eq!(parse_hex("0x2a 0xff").unwrap(), vec![0x2a, 0xff]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_decode_args() {
        let args = Args::try_parse_from(["retrace", "decode", "a.h", "int", "2a000000", "--typed"])
            .unwrap();
        assert!(matches!(
            args.command,
            Command::Decode {
                typed: true,
                file: None,
                ..
            }
        ));
        assert!(Args::try_parse_from(["retrace", "decode", "a.h", "int", "00", "-f", "x.bin"]).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["retrace", "dump", "a.h", "--target", "m68k"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Dump {
                target: Target::M68k,
                ..
            }
        ));
    }
}
