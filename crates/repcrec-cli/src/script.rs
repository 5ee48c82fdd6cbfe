//! Operation script parsing
//!
//! One operation per line: `begin(T1)`, `beginRO(T1)`, `R(T1,x2)`,
//! `W(T1,x2,5)`, `end(T1)`, `fail(2)`, `recover(2)` or `dump()`.
//! Whitespace is ignored, blank lines and `//` comments are skipped and a
//! line starting with `===` ends the script. The n-th operation runs at
//! logical time n.

use repcrec_types::{OpKind, Operation, SiteId, Timestamp, TxId, Value, VarId};
use thiserror::Error;

/// A malformed script line
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    /// 1-based line number
    pub line: usize,
    /// What is wrong with it
    pub message: String,
}

/// Parse a whole script into time-stamped operations
pub fn parse_script(source: &str) -> Result<Vec<Operation>, ScriptError> {
    let mut operations = Vec::new();
    let mut time: Timestamp = 0;

    for (index, raw) in source.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.starts_with("===") {
            break;
        }
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        let kind = parse_line(trimmed).map_err(|message| ScriptError {
            line: index + 1,
            message,
        })?;
        time += 1;
        operations.push(Operation::new(time, kind));
    }

    tracing::debug!(operations = operations.len(), "script parsed");
    Ok(operations)
}

/// Parse a single operation
pub fn parse_line(line: &str) -> Result<OpKind, String> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();

    let (name, rest) = compact
        .split_once('(')
        .ok_or_else(|| format!("expected '(' in {compact:?}"))?;
    let inner = rest
        .strip_suffix(')')
        .ok_or_else(|| format!("expected ')' at the end of {compact:?}"))?;
    let args: Vec<&str> = if inner.is_empty() {
        Vec::new()
    } else {
        inner.split(',').collect()
    };

    let kind = match (name, args.as_slice()) {
        ("begin", [tx]) => OpKind::Begin { tx: tx_id(tx)? },
        ("beginRO", [tx]) => OpKind::BeginRo { tx: tx_id(tx)? },
        ("R", [tx, var]) => OpKind::Read {
            tx: tx_id(tx)?,
            var: var_id(var)?,
        },
        ("W", [tx, var, value]) => OpKind::Write {
            tx: tx_id(tx)?,
            var: var_id(var)?,
            value: value
                .parse::<Value>()
                .map_err(|_| format!("invalid value {value:?}"))?,
        },
        ("end", [tx]) => OpKind::End { tx: tx_id(tx)? },
        ("fail", [site]) => OpKind::Fail {
            site: site_id(site)?,
        },
        ("recover", [site]) => OpKind::Recover {
            site: site_id(site)?,
        },
        ("dump", []) => OpKind::Dump,
        ("begin" | "beginRO" | "R" | "W" | "end" | "fail" | "recover" | "dump", _) => {
            return Err(format!("wrong number of arguments for {name}"));
        }
        _ => return Err(format!("unknown operation {name:?}")),
    };
    Ok(kind)
}

fn prefixed(arg: &str, prefix: char, what: &str) -> Result<u32, String> {
    arg.strip_prefix(prefix)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| format!("invalid {what} {arg:?}"))
}

fn tx_id(arg: &str) -> Result<TxId, String> {
    prefixed(arg, 'T', "transaction").map(TxId::new)
}

fn var_id(arg: &str) -> Result<VarId, String> {
    prefixed(arg, 'x', "variable").map(VarId::new)
}

fn site_id(arg: &str) -> Result<SiteId, String> {
    arg.parse()
        .map(SiteId::new)
        .map_err(|_| format!("invalid site {arg:?}"))
}
