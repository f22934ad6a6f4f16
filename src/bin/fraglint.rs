//! fraglint -- read XML fragments and write them back.
//!
//! Reads each input with the fragment reader, reports parse errors with
//! their location, and prints either the re-serialized fragment or an
//! outline of the node tree.

use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use xmlnode::reader::{FragmentReader, ReaderOptions};
use xmlnode::serial::{write_node, WriteOptions};
use xmlnode::{NodeId, TokenKind, XmlTree};

const EXIT_SUCCESS: u8 = 0;
const EXIT_READ_ERROR: u8 = 1;
const EXIT_PARSE_ERROR: u8 = 2;

/// fraglint -- parse XML fragments and print them back.
#[derive(Parser, Debug)]
#[command(name = "fraglint", version, about, long_about = None)]
struct Cli {
    /// Fragment files to process (use `-` for stdin).
    #[arg(default_value = "-")]
    files: Vec<String>,

    /// Indent element-only content.
    #[arg(long)]
    indent: bool,

    /// Indentation string used with `--indent`.
    #[arg(long, value_name = "STRING", default_value = "  ")]
    indent_str: String,

    /// Print an outline of the node tree instead of XML.
    #[arg(long)]
    tree: bool,

    /// Keep whitespace-only text inside elements.
    #[arg(long, value_name = "BOOL", default_value_t = true, action = clap::ArgAction::Set)]
    keep_whitespace: bool,

    /// Extra root element name to return unwrapped (repeatable).
    #[arg(long = "root-name", value_name = "NAME")]
    root_names: Vec<String>,

    /// Maximum element nesting depth.
    #[arg(long, value_name = "N", default_value_t = 256)]
    max_depth: u32,

    /// Log reader activity to stderr (overridden by `RUST_LOG`).
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut options = ReaderOptions::default()
        .keep_whitespace(cli.keep_whitespace)
        .max_depth(cli.max_depth);
    for name in &cli.root_names {
        options = options.root_name(name);
    }
    let reader = FragmentReader::with_options(options);

    let mut worst_exit = EXIT_SUCCESS;
    for file in &cli.files {
        worst_exit = worst_exit.max(process_file(&cli, &reader, file));
    }
    ExitCode::from(worst_exit)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(filename: &str) -> io::Result<String> {
    if filename == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(filename)
    }
}

/// Processes a single input file and returns an exit code.
fn process_file(cli: &Cli, reader: &FragmentReader, filename: &str) -> u8 {
    let input = match read_input(filename) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{filename}: failed to read: {e}");
            return EXIT_READ_ERROR;
        }
    };

    let (tree, root) = match reader.read(&input) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{filename}:{}: {}", e.location, e.message);
            return EXIT_PARSE_ERROR;
        }
    };

    let output = if cli.tree {
        let mut out = String::new();
        outline(&tree, root, 0, &mut out);
        out
    } else {
        let options = WriteOptions::default()
            .indent(cli.indent)
            .indent_str(&cli.indent_str);
        let mut xml = write_node(&tree, root, &options);
        if !xml.ends_with('\n') {
            xml.push('\n');
        }
        xml
    };

    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(output.as_bytes()) {
        eprintln!("{filename}: failed to write output: {e}");
        return EXIT_READ_ERROR;
    }
    EXIT_SUCCESS
}

/// Writes one line per node: kind, name, attributes and text.
fn outline(tree: &XmlTree, id: NodeId, depth: usize, out: &mut String) {
    use std::fmt::Write as _;

    let token = tree.token(id);
    let pad = "  ".repeat(depth);
    let _ = match token.kind() {
        TokenKind::Text => writeln!(out, "{pad}text {:?}", token.characters()),
        TokenKind::EndOfInput => writeln!(out, "{pad}(fragment)"),
        TokenKind::Start | TokenKind::End => {
            let _ = write!(out, "{pad}element {}", token.qname());
            for (qname, value) in token.attributes().iter() {
                let _ = write!(out, " {}={value:?}", qname.prefixed_name());
            }
            if token.is_end() {
                let _ = write!(out, " (closed)");
            }
            writeln!(out, " @{}:{}", token.line(), token.column())
        }
    };
    for child in tree.children(id) {
        outline(tree, child, depth + 1, out);
    }
}
