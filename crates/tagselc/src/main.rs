//! The tagsel code generator CLI.
//!
//! Provides the `tagselc` command with the following subcommands:
//!
//! - `tagselc gen <types> <insns>` - Generate dispatch code for every
//!   instruction, one `.inc` fragment per instruction
//! - `tagselc types <types>` - Generate the C `#define`s for the tag
//!   encoding and the per-data-type membership predicates
//!
//! Options mirror the synthesizer configuration: merge level, the
//! size-increasing-merge and compatibility-strictness toggles, pass
//! selection, and the cosmetic emission flags. `--json` prints failures as
//! machine-readable JSON (one object) instead of human-readable text.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use tagsel_synth::{
    cmacro, synthesise_instruction, Config, DiagramSynthesiser, SimpleSynthesiser, SynthError,
    Synthesiser,
};
use tagsel_types::def::{InsnFile, OperandSpecFile, TypeDefFile};
use tagsel_types::{fold_operand_specs, DefError, OperandSpecs, Registry};

#[derive(Parser)]
#[command(name = "tagselc", version, about = "Type-dispatch code generator for VM interpreters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate dispatch code for every instruction in a definition file
    Gen {
        /// Path to the type-definition file
        types: PathBuf,

        /// Path to the instruction-definition file
        insns: PathBuf,

        /// Operand-specification overlay file
        #[arg(long = "operand-spec")]
        operand_spec: Option<PathBuf>,

        /// Output directory (one <insn>.inc per instruction); stdout if absent
        #[arg(short, long = "out-dir")]
        out_dir: Option<PathBuf>,

        /// Merge aggressiveness (0 = speed, 2 = size)
        #[arg(long = "merge-level", default_value = "2")]
        merge_level: u8,

        /// Use the naive per-rule backend instead of the decision diagram
        #[arg(long)]
        simple: bool,

        /// Do not open two-operand dispatch with a combined tag-pair switch
        #[arg(long = "no-tagpair")]
        no_tagpair: bool,

        /// Skip the cross-branch merge pass
        #[arg(long = "no-relative")]
        no_relative: bool,

        /// Skip the oracle re-check after each pass
        #[arg(long = "no-verify")]
        no_verify: bool,

        /// Permit merges that may grow the emitted code
        #[arg(long = "size-increasing-merge")]
        size_increasing_merge: bool,

        /// Compare single-child branches by their sole tag instead of
        /// recursing into the children
        #[arg(long = "shallow-compatibility")]
        shallow_compatibility: bool,

        /// Precede each action with a comment naming its types and rule
        #[arg(long = "debug-comment")]
        debug_comment: bool,

        /// Pad switches with explicit cases for the unused tag domain
        #[arg(long = "pad-cases")]
        pad_cases: bool,

        /// Omit the default arm carrying the standard error action
        #[arg(long = "no-default")]
        no_default: bool,

        /// Print failures as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Generate tag #defines and data-type membership predicates
    Types {
        /// Path to the type-definition file
        types: PathBuf,

        /// Output file; stdout if absent
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print failures as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
}

/// Anything that can stop a generation run.
#[derive(Debug, Serialize)]
enum CliError {
    Def(DefError),
    Synth(SynthError),
    Io { path: String, message: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Def(err) => err.fmt(f),
            Self::Synth(err) => err.fmt(f),
            Self::Io { path, message } => write!(f, "{path}: {message}"),
        }
    }
}

impl From<DefError> for CliError {
    fn from(err: DefError) -> Self {
        CliError::Def(err)
    }
}

impl From<SynthError> for CliError {
    fn from(err: SynthError) -> Self {
        CliError::Synth(err)
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path)
        .map_err(|e| CliError::Io { path: path.display().to_string(), message: e.to_string() })
}

fn write(path: &Path, text: &str) -> Result<(), CliError> {
    fs::write(path, text)
        .map_err(|e| CliError::Io { path: path.display().to_string(), message: e.to_string() })
}

fn load_registry(path: &Path) -> Result<Registry, CliError> {
    Ok(TypeDefFile::parse(&read(path)?)?.build()?)
}

fn run_gen(
    types: &Path,
    insns: &Path,
    operand_spec: Option<&Path>,
    out_dir: Option<&Path>,
    cfg: &Config,
    simple: bool,
) -> Result<(), CliError> {
    let reg = load_registry(types)?;
    let instructions = InsnFile::parse(&read(insns)?)?.build(&reg)?;
    let specs = match operand_spec {
        Some(path) => OperandSpecFile::parse(&read(path)?)?.build(&reg)?,
        None => OperandSpecs::new(),
    };
    let synth: Box<dyn Synthesiser> = if simple {
        Box::new(SimpleSynthesiser)
    } else {
        Box::new(DiagramSynthesiser::default())
    };
    if let Some(dir) = out_dir {
        fs::create_dir_all(dir).map_err(|e| CliError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
    }
    for insn in &instructions {
        let folded = fold_operand_specs(insn, &specs, &reg);
        let code = synthesise_instruction(synth.as_ref(), &folded, &reg, cfg)?;
        match out_dir {
            Some(dir) => write(&dir.join(format!("{}.inc", insn.name)), &code)?,
            None => print!("{code}"),
        }
    }
    Ok(())
}

fn run_types(types: &Path, output: Option<&Path>) -> Result<(), CliError> {
    let reg = load_registry(types)?;
    let mut out = String::new();
    out.push_str(&cmacro::define_ptags(&reg));
    out.push_str(&cmacro::define_htags(&reg));
    out.push_str(&cmacro::define_datatype_predicates(&reg));
    match output {
        Some(path) => write(path, &out)?,
        None => print!("{out}"),
    }
    Ok(())
}

fn fail(err: &CliError, json: bool) -> ! {
    if json {
        match serde_json::to_string(err) {
            Ok(line) => eprintln!("{line}"),
            Err(_) => eprintln!("error: {err}"),
        }
    } else {
        eprintln!("error: {err}");
    }
    process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Gen {
            types,
            insns,
            operand_spec,
            out_dir,
            merge_level,
            simple,
            no_tagpair,
            no_relative,
            no_verify,
            size_increasing_merge,
            shallow_compatibility,
            debug_comment,
            pad_cases,
            no_default,
            json,
        } => {
            let cfg = Config {
                merge_level: merge_level.min(2),
                size_increasing_merge,
                correct_compatibility: !shallow_compatibility,
                use_tagpair: !no_tagpair,
                relative_merge: !no_relative,
                verify_diagram: !no_verify,
                debug_comment,
                pad_cases,
                use_default: !no_default,
            };
            if let Err(err) = run_gen(
                &types,
                &insns,
                operand_spec.as_deref(),
                out_dir.as_deref(),
                &cfg,
                simple,
            ) {
                fail(&err, json);
            }
        }
        Commands::Types { types, output, json } => {
            if let Err(err) = run_types(&types, output.as_deref()) {
                fail(&err, json);
            }
        }
    }
}
