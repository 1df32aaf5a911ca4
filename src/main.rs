//! Parses, converts or tokenizes a source file

use std::{
    fs,
    io::{self, Write as _},
};

use base::ln::LineTable;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use polysyn::{
    util::diag::{self, Diagnostic},
    write::options::FormattingOptions,
    Language, ParseError, ParseResult, SurfaceSyntax,
};

#[derive(Parser, Debug)]
#[command(name = "polysyn", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the AST outline
    Parse {
        file: Utf8PathBuf,
        /// Defaults to the file extension
        #[arg(long, value_enum)]
        syntax: Option<SyntaxArg>,
    },
    /// Prints the file in the other surface syntax
    Convert {
        file: Utf8PathBuf,
        #[arg(long, value_enum)]
        to: SyntaxArg,
        /// Defaults to the file extension
        #[arg(long, value_enum)]
        syntax: Option<SyntaxArg>,
        /// JSON formatting options
        #[arg(long)]
        style: Option<Utf8PathBuf>,
    },
    /// Dumps the token stream
    Tokens {
        file: Utf8PathBuf,
        #[arg(long, value_enum)]
        syntax: Option<SyntaxArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SyntaxArg {
    Cs,
    Vb,
}

impl From<SyntaxArg> for SurfaceSyntax {
    fn from(arg: SyntaxArg) -> Self {
        match arg {
            SyntaxArg::Cs => SurfaceSyntax::CSharp,
            SyntaxArg::Vb => SurfaceSyntax::VisualBasic,
        }
    }
}

/// Failures before any source is parsed
#[derive(Debug, Error)]
enum CliError {
    #[error("can't read `{path}`: {source}")]
    Read {
        path: Utf8PathBuf,
        source: io::Error,
    },
    #[error("can't tell the surface syntax of `{0}`; pass `--syntax cs|vb`")]
    UnknownSyntax(Utf8PathBuf),
    #[error("invalid style file `{path}`: {source}")]
    Style {
        path: Utf8PathBuf,
        source: serde_json::Error,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let out = io::stdout();
    let mut out = out.lock();

    let any_error = match self::run(&mut out, cli.command) {
        Ok(any_error) => any_error,
        Err(err) => {
            eprintln!("error: {err}");
            true
        }
    };
    out.flush().ok();

    if any_error {
        std::process::exit(1);
    }
}

/// Returns true on any error diagnostic
fn run(out: &mut impl io::Write, command: Command) -> Result<bool, CliError> {
    match command {
        Command::Parse { file, syntax } => {
            let (lang, src) = self::load(&file, syntax)?;
            let Some(res) = self::parse(out, &lang, &file, &src) else {
                return Ok(true);
            };
            writeln!(out, "{}", res.ast.dump(res.root)).ok();
            Ok(false)
        }
        Command::Convert {
            file,
            to,
            syntax,
            style,
        } => {
            let (lang, src) = self::load(&file, syntax)?;
            let target = Language::new(to.into());
            let options = match style {
                Some(path) => self::load_style(&path)?,
                None => target.default_options(),
            };

            let Some(res) = self::parse(out, &lang, &file, &src) else {
                return Ok(true);
            };
            match target.write(&res.ast, res.root, &options) {
                Ok(text) => {
                    write!(out, "{text}").ok();
                    Ok(false)
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    Ok(true)
                }
            }
        }
        Command::Tokens { file, syntax } => {
            let (lang, src) = self::load(&file, syntax)?;
            match lang.tokenize(&src) {
                Ok(stream) => {
                    for tk in stream.tokens.iter() {
                        writeln!(out, "{:?} {:?} {:?}", tk.kind, tk.span, tk.slice(&src)).ok();
                    }
                    Ok(false)
                }
                Err(err) => {
                    let lines = LineTable::new(&src);
                    self::print_diagnostics(out, &file, &src, &lines, std::slice::from_ref(&err))
                        .ok();
                    Ok(true)
                }
            }
        }
    }
}

fn load(file: &Utf8Path, syntax: Option<SyntaxArg>) -> Result<(Language, String), CliError> {
    let syntax = match syntax {
        Some(arg) => SurfaceSyntax::from(arg),
        None => file
            .extension()
            .and_then(SurfaceSyntax::from_extension)
            .ok_or_else(|| CliError::UnknownSyntax(file.to_path_buf()))?,
    };

    let src = fs::read_to_string(file).map_err(|source| CliError::Read {
        path: file.to_path_buf(),
        source,
    })?;

    Ok((Language::new(syntax), src))
}

fn load_style(path: &Utf8Path) -> Result<FormattingOptions, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Style {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses the file, printing every diagnostic. Returns `None` on a failed parse.
fn parse(
    out: &mut impl io::Write,
    lang: &Language,
    file: &Utf8Path,
    src: &str,
) -> Option<ParseResult> {
    let lines = LineTable::new(src);

    match lang.parse(src) {
        Ok(res) => {
            self::print_diagnostics(out, file, src, &lines, &res.diagnostics).ok();
            Some(res)
        }
        Err(ParseError::Lex(err)) => {
            self::print_diagnostics(out, file, src, &lines, std::slice::from_ref(&err)).ok();
            None
        }
        Err(ParseError::Syntax(errs)) => {
            self::print_diagnostics(out, file, src, &lines, &errs).ok();
            None
        }
        Err(err) => {
            eprintln!("error: {err}");
            None
        }
    }
}

fn print_diagnostics(
    out: &mut impl io::Write,
    file: &Utf8Path,
    src: &str,
    lines: &LineTable,
    diags: &[impl Diagnostic],
) -> io::Result<()> {
    for d in diags {
        writeln!(out, "{}", diag::line(file.as_str(), src, lines, d))?;
    }
    Ok(())
}
