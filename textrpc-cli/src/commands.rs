//! Command resolution and execution.

use textrpc_client::{Client, ClientError, ListingMode};

/// Pseudo-function expanded on the client side into a listing call.
pub const LISTDIR: &str = "listdir";

/// A resolved call: the server function and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub function: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Renders the call the way it is logged, `function arg1 arg2`.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.function.clone()
        } else {
            format!("{} {}", self.function, self.args.join(" "))
        }
    }
}

/// Maps a command line onto a server call.
///
/// `listdir` becomes `list_files`, or `list_files3` when `recursive` is set.
/// Every other name passes through unchanged.
pub fn resolve_invocation(function: &str, args: Vec<String>, recursive: bool) -> Invocation {
    let function = if function == LISTDIR {
        let mode = if recursive {
            ListingMode::Command
        } else {
            ListingMode::Flat
        };
        mode.function_name().to_string()
    } else {
        function.to_string()
    };
    Invocation { function, args }
}

/// Parses one REPL line.
///
/// The first word names the function and the rest are its arguments. For
/// `listdir`, a `-r`/`--recursive` word selects the recursive listing.
pub fn parse_line(line: &str) -> Option<Invocation> {
    let mut words = line.split_whitespace();
    let function = words.next()?;
    let mut recursive = false;
    let args = words
        .filter(|w| {
            if function == LISTDIR && (*w == "-r" || *w == "--recursive") {
                recursive = true;
                false
            } else {
                true
            }
        })
        .map(str::to_string)
        .collect();
    Some(resolve_invocation(function, args, recursive))
}

/// Executes a call and returns the reply text.
pub async fn execute(client: &Client, invocation: &Invocation) -> Result<String, ClientError> {
    tracing::info!("=> {}", invocation.display());
    let response = client
        .call(&invocation.function, &invocation.args[..])
        .await?;
    tracing::info!("<= {}", response);
    Ok(response.into_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_listdir_resolves_to_flat_listing() {
        let inv = resolve_invocation("listdir", args(&["/tmp"]), false);
        assert_eq!(inv.function, "list_files");
        assert_eq!(inv.args, args(&["/tmp"]));
    }

    #[test]
    fn test_listdir_recursive_uses_command_listing() {
        let inv = resolve_invocation("listdir", args(&["/tmp"]), true);
        assert_eq!(inv.function, "list_files3");
    }

    #[test]
    fn test_other_names_pass_through() {
        let inv = resolve_invocation("rot13", args(&["abc"]), true);
        assert_eq!(inv.function, "rot13");
        assert_eq!(inv.args, args(&["abc"]));

        let inv = resolve_invocation("list_files2", args(&["/"]), false);
        assert_eq!(inv.function, "list_files2");
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), None);

        let inv = parse_line("max_even 1 -4 0x10").unwrap();
        assert_eq!(inv.function, "max_even");
        assert_eq!(inv.args, args(&["1", "-4", "0x10"]));

        let inv = parse_line("listdir -r /srv").unwrap();
        assert_eq!(inv.function, "list_files3");
        assert_eq!(inv.args, args(&["/srv"]));

        // Only listdir treats -r as a flag.
        let inv = parse_line("rot13 -r").unwrap();
        assert_eq!(inv.args, args(&["-r"]));
    }

    #[test]
    fn test_display() {
        let inv = resolve_invocation("functions", Vec::new(), false);
        assert_eq!(inv.display(), "functions");
        let inv = resolve_invocation("file_exists", args(&["a", "/tmp"]), false);
        assert_eq!(inv.display(), "file_exists a /tmp");
    }
}
