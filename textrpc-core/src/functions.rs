//! Built-in functions.
//!
//! Every function takes the request's string arguments and returns a string.
//! Failures are rendered with [`CoreError::to_reply`], so clients see a stable
//! `error: ...` text rather than a dropped connection.

use crate::error::CoreError;
use crate::listing::RecursiveLister;
use crate::registry::{CallContext, Handler, Registry, RegistryBuilder};
use std::fs;
use num_bigint::BigInt;
use std::path::Path;
use walkdir::WalkDir;

/// Builds the registry of built-in functions.
///
/// `lister` backs `list_files3`.
pub fn builtin_registry(lister: impl RecursiveLister) -> Result<Registry, CoreError> {
    let mut builder = RegistryBuilder::new();
    builder
        .register_fn(
            "help",
            help,
            "Online help for the given function, example: help('function')",
        )?
        .register_fn(
            "functions",
            functions,
            "Return the list of the available functions",
        )?
        .register_fn("rot13", rot13, "Return the string encoded with rot13")?
        .register_fn("max_even", max_even, "Return the greater even integer")?
        .register_fn(
            "calls",
            calls,
            "Return the number of calls resolved since the starting of the server (including this one)",
        )?
        .register_fn(
            "file_exists",
            file_exists,
            "Return True if the file exists, looked up in the given path or the current directory",
        )?
        .register_fn(
            "list_files",
            list_files,
            "Return the files' list of the path repository",
        )?
        .register_fn("list_files2", list_files2, "Recursive list of the files")?
        .register(
            "list_files3",
            ListFilesCommand::new(lister),
            "Same as list_files2 but use the system command ls",
        )?;
    Ok(builder.build())
}

/// `help([name])`
pub fn help(ctx: &CallContext<'_>, args: &[String]) -> String {
    ctx.registry().help(args.first().map(String::as_str))
}

/// `functions()`
pub fn functions(ctx: &CallContext<'_>, _args: &[String]) -> String {
    ctx.registry().list_names().join(" ")
}

/// `calls()`
pub fn calls(ctx: &CallContext<'_>, _args: &[String]) -> String {
    format!("{} calls so far ...", ctx.call_number())
}

/// `rot13(text)`
pub fn rot13(_ctx: &CallContext<'_>, args: &[String]) -> String {
    args.first().map(|s| rot13_str(s)).unwrap_or_default()
}

/// Rotates ASCII letters by 13 places, leaving everything else alone.
pub fn rot13_str(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'a'..='z' => rotate(c, b'a'),
            'A'..='Z' => rotate(c, b'A'),
            _ => c,
        })
        .collect()
}

fn rotate(c: char, base: u8) -> char {
    (((c as u8 - base + 13) % 26) + base) as char
}

/// `max_even(int, ...)`
pub fn max_even(_ctx: &CallContext<'_>, args: &[String]) -> String {
    match max_even_value(args) {
        Ok(value) => value.to_string(),
        Err(e) => e.to_reply(),
    }
}

/// Returns the largest even integer among `args`.
///
/// Every argument must parse; see [`parse_int`].
pub fn max_even_value(args: &[String]) -> Result<BigInt, CoreError> {
    let mut best: Option<BigInt> = None;
    for arg in args {
        let value = parse_int(arg)?;
        // Bit 0 of the two's complement form gives the parity of negatives too.
        if !value.bit(0) && best.as_ref().map_or(true, |b| value > *b) {
            best = Some(value);
        }
    }
    best.ok_or(CoreError::NoEvenInteger)
}

/// Parses an integer literal, detecting the base from its prefix.
///
/// Accepts an optional sign, then decimal digits or a `0x`, `0o` or `0b`
/// prefixed literal. Underscores may separate digits. Decimal literals other
/// than zero may not start with `0`. Values have no size limit.
pub fn parse_int(input: &str) -> Result<BigInt, CoreError> {
    let invalid = || CoreError::InvalidInteger(input.to_string());
    let literal = input.trim();

    let (negative, rest) = if let Some(rest) = literal.strip_prefix('-') {
        (true, rest)
    } else {
        (false, literal.strip_prefix('+').unwrap_or(literal))
    };

    let (radix, digits) = match rest.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => (16, &rest[2..]),
        Some("0o") => (8, &rest[2..]),
        Some("0b") => (2, &rest[2..]),
        _ => (10, rest),
    };
    // A single underscore may follow a base prefix.
    let digits = if radix == 10 {
        digits
    } else {
        digits.strip_prefix('_').unwrap_or(digits)
    };

    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
        || !digits.chars().all(|c| c == '_' || c.is_digit(radix))
    {
        return Err(invalid());
    }
    if radix == 10 && digits.starts_with('0') && digits.chars().any(|c| c != '0' && c != '_') {
        return Err(invalid());
    }

    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    let magnitude = BigInt::parse_bytes(cleaned.as_bytes(), radix).ok_or_else(invalid)?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// `file_exists(filename, [path])`
pub fn file_exists(_ctx: &CallContext<'_>, args: &[String]) -> String {
    let Some(filename) = args.first() else {
        return "error: missing filename".to_string();
    };
    let target = match args.get(1) {
        Some(dir) => Path::new(dir).join(filename),
        None => Path::new(filename).to_path_buf(),
    };
    let found = if target.exists() { "True" } else { "False" };
    found.to_string()
}

/// `list_files(path)`
pub fn list_files(_ctx: &CallContext<'_>, args: &[String]) -> String {
    let Some(path) = args.first().map(Path::new) else {
        return String::new();
    };
    if !path.is_dir() {
        return String::new();
    }

    tracing::debug!("Listing directory {} files", path.display());
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => return CoreError::Io(e).to_reply(),
    };

    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `list_files2(path)`
pub fn list_files2(_ctx: &CallContext<'_>, args: &[String]) -> String {
    let Some(path) = args.first().map(Path::new) else {
        return String::new();
    };
    if !path.is_dir() {
        return String::new();
    }

    tracing::debug!("Listing directory {} files recursively", path.display());
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| !entry.file_type().is_dir() && entry.path().is_file())
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `list_files3(path)`, backed by a [`RecursiveLister`].
pub struct ListFilesCommand<L> {
    lister: L,
}

impl<L: RecursiveLister> ListFilesCommand<L> {
    pub fn new(lister: L) -> Self {
        Self { lister }
    }
}

impl<L: RecursiveLister> Handler for ListFilesCommand<L> {
    fn call(&self, _ctx: &CallContext<'_>, args: &[String]) -> String {
        let Some(path) = args.first().map(Path::new) else {
            return String::new();
        };

        tracing::debug!("Listing directory {} files recursively, ls-based", path.display());
        match self.lister.run(path) {
            Ok(Some(output)) => format!("Output\n{}\nErrors\n{}\n", output.stdout, output.stderr),
            Ok(None) => String::new(),
            Err(e) => CoreError::Io(e).to_reply(),
        }
    }
}
