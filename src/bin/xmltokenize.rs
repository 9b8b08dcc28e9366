//! Command line driver: print the tokens selected by a path expression.

use std::{
    fs::File,
    io::{BufWriter, Read, Write, stdin, stdout},
};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use xmltokenize::{ExtractMode, TokenizeOptions, XmlTokenizer};

#[derive(clap::Parser, Debug)]
#[command(version, name = "xmltokenize", arg_required_else_help = true)]
struct CmdArgs {
    /// path expression selecting the elements, e.g. "//c:child"
    path: String,
    /// input files, "-" or nothing reads the standard input
    xml_files: Vec<String>,
    /// bind a prefix used in the path expression
    #[arg(short, long = "ns", value_name = "prefix=uri", value_parser = parse_binding)]
    namespaces: Vec<(String, String)>,
    /// extraction mode: i(nject), w(rap), u(nwrap) or t(ext)
    #[arg(short, long, default_value = "i")]
    mode: ExtractMode,
    /// number of matches combined into one token
    #[arg(short, long, default_value_t = 1)]
    group: usize,
    /// encoding of the input, ASCII-compatible only
    #[arg(short, long, value_name = "label")]
    encoding: Option<String>,
    /// printed after each token
    #[arg(long, default_value = "\n")]
    separator: String,
}

fn parse_binding(s: &str) -> Result<(String, String), String> {
    let (prefix, uri) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid binding '{s}', expected prefix=uri"))?;
    Ok((prefix.to_owned(), uri.to_owned()))
}

fn tokenize(
    args: &CmdArgs,
    reader: impl Read,
    name: &str,
    out: &mut impl Write,
) -> Result<usize> {
    let options = TokenizeOptions::new(&args.path)
        .namespaces(args.namespaces.iter().cloned())
        .mode(args.mode)
        .group(args.group);
    let tokenizer = match args.encoding.as_deref() {
        Some(encoding) => XmlTokenizer::with_encoding(options, reader, encoding),
        None => XmlTokenizer::from_reader(options, reader),
    }
    .with_context(|| format!("cannot tokenize '{name}'"))?;

    let mut count = 0;
    for token in tokenizer {
        let token = token.with_context(|| format!("failed to tokenize '{name}'"))?;
        write!(out, "{token}{}", args.separator)?;
        count += 1;
    }
    Ok(count)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = CmdArgs::parse();

    let mut out = BufWriter::new(stdout().lock());
    let files = if args.xml_files.is_empty() {
        vec!["-".to_owned()]
    } else {
        args.xml_files.clone()
    };
    for file in &files {
        let count = if file == "-" {
            tokenize(&args, stdin().lock(), "<stdin>", &mut out)?
        } else {
            let reader = File::open(file).with_context(|| format!("failed to open '{file}'"))?;
            tokenize(&args, reader, file, &mut out)?
        };
        info!("{file}: {count} token(s)");
    }
    out.flush()?;
    Ok(())
}
