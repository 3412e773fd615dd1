//! Options files (`@file` response files).
//!
//! Long command lines are written to a file in the spec's temp directory and
//! passed to the tool as `@<path>`.

use std::path::Path;

use anyhow::Result;

use crate::builder::args::{is_command_line_only, ArgStyle};
use crate::util::fs::write_string;
use crate::util::hash::short_hash;

/// Quote an argument for an options file of the given style.
pub fn quote(arg: &str, style: ArgStyle) -> String {
    let needs_quotes = arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'');
    match style {
        ArgStyle::Unix => {
            if !needs_quotes && !arg.contains('\\') {
                return arg.to_string();
            }
            let mut out = String::with_capacity(arg.len() + 2);
            out.push('"');
            for c in arg.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
            out
        }
        ArgStyle::Windows => {
            if !needs_quotes {
                return arg.to_string();
            }
            let mut out = String::with_capacity(arg.len() + 2);
            out.push('"');
            let mut backslashes = 0;
            for c in arg.chars() {
                match c {
                    '\\' => backslashes += 1,
                    '"' => {
                        // Backslashes before a quote are escaped, then the quote itself
                        out.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                        out.push('"');
                        backslashes = 0;
                        continue;
                    }
                    _ => {}
                }
                if c != '\\' {
                    out.extend(std::iter::repeat('\\').take(backslashes));
                    backslashes = 0;
                    out.push(c);
                }
            }
            out.extend(std::iter::repeat('\\').take(backslashes * 2));
            out.push('"');
            out
        }
    }
}

/// Move `args` into an options file under `temp_dir`.
///
/// Returns the arguments to put on the command line: anything that must
/// stay there (`-m32`, `-m64`) followed by `@<file>`. The file name is
/// derived from the contents and `discriminator`, so concurrent invocations
/// for different sources never share a file.
pub fn write_options_file(
    temp_dir: &Path,
    args: Vec<String>,
    style: ArgStyle,
    discriminator: &str,
) -> Result<Vec<String>> {
    let (kept, moved): (Vec<String>, Vec<String>) = match style {
        ArgStyle::Unix => args.into_iter().partition(|a| is_command_line_only(a)),
        ArgStyle::Windows => (Vec::new(), args),
    };

    let mut contents = String::new();
    for arg in &moved {
        contents.push_str(&quote(arg, style));
        contents.push('\n');
    }

    let name = format!(
        "options-{}.txt",
        short_hash(&format!("{}\0{}", discriminator, contents))
    );
    let path = temp_dir.join(name);
    write_string(&path, &contents)?;
    tracing::debug!("Wrote options file {}", path.display());

    let mut command_line = kept;
    command_line.push(format!("@{}", path.display()));
    Ok(command_line)
}
