//! Symbol demangling is an external collaborator per spec §1: this module
//! only describes how the core consumes it. `--demangle-names` shells out to
//! a configurable `c++filt`-equivalent binary with a bounded-size stdout
//! read, mirroring `bdx_elf::debug_info::dwarfdump_fallback`'s subprocess
//! pattern; any failure falls back to the raw name.

use std::process::Command;

const MAX_STDOUT_BYTES: usize = 16 * 1024;
const DEFAULT_DEMANGLER: &str = "c++filt";

pub fn demangler_path() -> String {
    std::env::var("BDX_DEMANGLER").unwrap_or_else(|_| DEFAULT_DEMANGLER.to_string())
}

/// Best-effort demangle of `name`. Returns `name` unchanged if the
/// collaborator binary is missing, fails, or produces nothing useful.
pub fn demangle(demangler_path: &str, name: &str) -> String {
    let Ok(output) = Command::new(demangler_path).arg(name).output() else {
        return name.to_string();
    };
    if !output.status.success() {
        return name.to_string();
    }
    let stdout = if output.stdout.len() > MAX_STDOUT_BYTES {
        &output.stdout[..MAX_STDOUT_BYTES]
    } else {
        &output.stdout[..]
    };
    let text = String::from_utf8_lossy(stdout);
    let demangled = text.lines().next().unwrap_or("").trim();
    if demangled.is_empty() {
        name.to_string()
    } else {
        demangled.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_raw_name_when_demangler_is_missing() {
        assert_eq!(demangle("/no/such/c++filt-tool", "_Z3foov"), "_Z3foov");
    }
}
