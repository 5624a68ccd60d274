//! `IndexerOptions`: one run's tunables. Defaults are sane for a laptop-sized
//! build tree; every field can be overridden from `BDX_*` environment
//! variables or from the CLI's repeated `-o key=value` flags.

use std::env;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerOptions {
    /// Worker thread count for the parsing pool; `0` means "let rayon pick".
    pub num_processes: usize,
    /// Whether to scan relocation sections and attribute targets to symbols.
    pub index_relocations: bool,
    /// Symbols smaller than this (in bytes) are dropped at parse time.
    pub min_symbol_size: u64,
    /// Shell out to an external dwarfdump-equivalent when embedded DWARF is
    /// absent or unparseable.
    pub use_dwarfdump: bool,
    pub dwarfdump_path: String,
    /// Soft cap on how many bytes of pending records a run buffers before a
    /// shard must be flushed; purely a backpressure knob, not a hard limit.
    pub write_buffer_bytes: usize,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        IndexerOptions {
            num_processes: 0,
            index_relocations: true,
            min_symbol_size: 0,
            use_dwarfdump: false,
            dwarfdump_path: "dwarfdump".to_string(),
            write_buffer_bytes: 64 * 1024 * 1024,
        }
    }
}

impl IndexerOptions {
    pub fn load_from_env_or_default() -> Self {
        let mut opts = Self::default();

        if let Some(v) = env_usize("BDX_NUM_PROCESSES") {
            opts.num_processes = v;
        }
        if let Some(v) = env_bool("BDX_INDEX_RELOCATIONS") {
            opts.index_relocations = v;
        }
        if let Some(v) = env_u64("BDX_MIN_SYMBOL_SIZE") {
            opts.min_symbol_size = v;
        }
        if let Some(v) = env_bool("BDX_USE_DWARFDUMP") {
            opts.use_dwarfdump = v;
        }
        if let Ok(v) = env::var("BDX_DWARFDUMP_PATH") {
            opts.dwarfdump_path = v;
        }
        if let Some(v) = env_usize("BDX_WRITE_BUFFER_BYTES") {
            opts.write_buffer_bytes = v;
        }

        opts
    }

    /// Apply one `-o key=value` CLI override. Unknown keys are rejected so a
    /// typo doesn't silently do nothing.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "num_processes" => self.num_processes = parse(key, value)?,
            "index_relocations" => self.index_relocations = parse(key, value)?,
            "min_symbol_size" => self.min_symbol_size = parse(key, value)?,
            "use_dwarfdump" => self.use_dwarfdump = parse(key, value)?,
            "dwarfdump_path" => self.dwarfdump_path = value.to_string(),
            "write_buffer_bytes" => self.write_buffer_bytes = parse(key, value)?,
            other => return Err(format!("unknown option key: {other}")),
        }
        Ok(())
    }

    pub fn elf_parse_options(&self) -> bdx_elf::ParseOptions {
        bdx_elf::ParseOptions {
            index_relocations: self.index_relocations,
            min_symbol_size: self.min_symbol_size,
            use_dwarfdump: self.use_dwarfdump,
            dwarfdump_path: self.dwarfdump_path.clone(),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value.parse().map_err(|_| format!("invalid value for {key}: {value}"))
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_overrides_a_known_key() {
        let mut opts = IndexerOptions::default();
        opts.apply("min_symbol_size", "8").unwrap();
        assert_eq!(opts.min_symbol_size, 8);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut opts = IndexerOptions::default();
        assert!(opts.apply("bogus_flag", "1").is_err());
    }

    #[test]
    fn apply_rejects_malformed_value() {
        let mut opts = IndexerOptions::default();
        assert!(opts.apply("num_processes", "not-a-number").is_err());
    }
}
