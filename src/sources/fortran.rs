//! Light Fortran source parsing.
//!
//! Extracts just enough structure for dependency wiring: provided and used
//! modules, submodule parents, program names, and quoted includes. Statement
//! continuations are folded only for `use ... only:` lines; other continued
//! statements are read line by line, matching the documented limitation of
//! the original tooling.

use std::path::Path;

use anyhow::Result;

use crate::core::source::{is_intrinsic_module, SourceFile, UnitKind};
use crate::util::diagnostic::BuildError;
use crate::util::hash;

/// Parse a Fortran source file.
pub fn parse_fortran_file(path: &Path) -> Result<SourceFile> {
    if !path.is_file() {
        return Err(BuildError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path).map_err(|_| BuildError::FileNotFound {
        path: path.to_path_buf(),
    })?;

    let mut source = parse_fortran_str(&content, path, fixed_form(path))?;
    source.path = path.to_path_buf();
    source.digest = hash::digest_str(&content);
    Ok(source)
}

/// Whether the extension implies fixed-form comment conventions.
fn fixed_form(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("f") | Some("F") | Some("for")
    )
}

/// Parse Fortran source text. `origin` is used only for error messages.
pub fn parse_fortran_str(content: &str, origin: &Path, fixed: bool) -> Result<SourceFile> {
    let mut source = SourceFile::default();
    let mut inside_unit = 0usize;
    let mut pending_use: Option<(String, usize)> = None;

    for (index, raw_line) in content.lines().enumerate() {
        let line_number = index + 1;

        if fixed && is_fixed_comment(raw_line) {
            continue;
        }

        let stripped = strip_comment(raw_line);
        let line = stripped.trim();
        if line.is_empty() {
            continue;
        }

        // Fold continuations, but only for use statements.
        let lowered = line.to_lowercase();
        if let Some((mut acc, start_line)) = pending_use.take() {
            acc.push(' ');
            acc.push_str(lowered.trim_end_matches('&').trim());
            if lowered.ends_with('&') {
                pending_use = Some((acc, start_line));
            } else {
                parse_use(&acc, origin, start_line, &mut source)?;
            }
            continue;
        }

        if tokens(&lowered).first() == Some(&"use") && lowered.ends_with('&') {
            pending_use = Some((
                lowered.trim_end_matches('&').trim().to_string(),
                line_number,
            ));
            continue;
        }

        parse_statement(
            &lowered,
            line,
            origin,
            line_number,
            &mut inside_unit,
            &mut source,
        )?;
    }

    if let Some((acc, start_line)) = pending_use {
        // A trailing continuation with no following line.
        parse_use(&acc, origin, start_line, &mut source)?;
    }

    if source.unit_kind == UnitKind::Unknown && !source.provided_modules.is_empty() {
        source.unit_kind = UnitKind::Module;
    }

    Ok(source)
}

fn is_fixed_comment(line: &str) -> bool {
    matches!(line.chars().next(), Some('c') | Some('C') | Some('*') | Some('!'))
}

/// Strip a trailing `!` comment, respecting quoted strings.
fn strip_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;

    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '!' if !in_single && !in_double => return &line[..i],
            _ => {}
        }
    }

    line
}

/// Split a lowered statement into identifier-ish tokens. Punctuation that
/// carries no information for the light parse is treated as whitespace.
fn tokens(lowered: &str) -> Vec<&str> {
    lowered
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | ';' | '=' | '(' | ')'))
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_statement(
    lowered: &str,
    original: &str,
    origin: &Path,
    line_number: usize,
    inside_unit: &mut usize,
    source: &mut SourceFile,
) -> Result<()> {
    // Includes keep their quoted spelling, so handle them before tokenizing.
    let include_prefix = if lowered.starts_with("#include") {
        "#include".len()
    } else if lowered.starts_with("include") {
        "include".len()
    } else {
        0
    };
    if include_prefix > 0 {
        if let Some(file) = quoted_argument(original, include_prefix) {
            source.include_deps.push(file);
            return Ok(());
        }
        // `include` without a quoted argument could be an identifier such as
        // `include_dims = ...`; fall through to the token walk.
    }

    let toks = tokens(lowered);
    let Some(&first) = toks.first() else {
        return Ok(());
    };

    match first {
        "module" => {
            // `module procedure` inside a submodule is not a declaration.
            if toks.get(1) == Some(&"procedure") {
                return Ok(());
            }
            let name = toks.get(1).copied().ok_or_else(|| BuildError::Parse {
                file: origin.to_path_buf(),
                line: line_number,
                column: lowered.len() + 1,
                message: "module declaration is missing a name".to_string(),
            })?;
            validate_name(name, origin, line_number)?;
            source.provided_modules.insert(name.to_string());
            if source.unit_kind == UnitKind::Unknown {
                source.unit_kind = UnitKind::Module;
            }
            *inside_unit += 1;
        }
        "submodule" => {
            let (parents, name) = parse_submodule(lowered, origin, line_number)?;
            validate_name(&name, origin, line_number)?;
            source.parent_modules.extend(parents);
            source.provided_modules.insert(name);
            source.unit_kind = UnitKind::Submodule;
            *inside_unit += 1;
        }
        "program" => {
            let name = toks.get(1).copied().ok_or_else(|| BuildError::Parse {
                file: origin.to_path_buf(),
                line: line_number,
                column: lowered.len() + 1,
                message: "program declaration is missing a name".to_string(),
            })?;
            validate_name(name, origin, line_number)?;
            source.unit_kind = UnitKind::Program;
            source.exe_name = Some(name.to_string());
            *inside_unit += 1;
        }
        "use" => parse_use(lowered, origin, line_number, source)?,
        "end" => {
            if matches!(
                toks.get(1),
                Some(&"module") | Some(&"submodule") | Some(&"program")
            ) {
                *inside_unit = inside_unit.saturating_sub(1);
            }
        }
        // Free procedures at file level make this a subprogram, not a
        // tree-shakeable module file.
        "subroutine" | "function" | "blockdata" => {
            if *inside_unit == 0 && source.unit_kind != UnitKind::Program {
                source.unit_kind = UnitKind::Subprogram;
            }
        }
        _ => {
            // Type-prefixed functions: `pure real function f(x)` etc.
            if *inside_unit == 0
                && source.unit_kind != UnitKind::Program
                && toks.contains(&"function")
            {
                source.unit_kind = UnitKind::Subprogram;
            }
        }
    }

    Ok(())
}

/// Parse a complete (continuation-folded) use statement.
fn parse_use(
    lowered: &str,
    origin: &Path,
    line_number: usize,
    source: &mut SourceFile,
) -> Result<()> {
    let toks = tokens(lowered);
    debug_assert_eq!(toks.first(), Some(&"use"));

    let mut rest = &toks[1..];

    // `use, intrinsic :: name` never becomes a dependency.
    match rest.first() {
        Some(&"intrinsic") => return Ok(()),
        Some(&"non_intrinsic") => rest = &rest[1..],
        _ => {}
    }

    let name = rest.first().copied().ok_or_else(|| BuildError::Parse {
        file: origin.to_path_buf(),
        line: line_number,
        column: lowered.len() + 1,
        message: "use statement is missing a module name".to_string(),
    })?;
    validate_name(name, origin, line_number)?;

    if !is_intrinsic_module(name) {
        source.used_modules.insert(name.to_string());
    }

    Ok(())
}

/// Parse `submodule ( parent [: grandparent] ) name`.
fn parse_submodule(lowered: &str, origin: &Path, line_number: usize) -> Result<(Vec<String>, String)> {
    let malformed = |message: &str| BuildError::Parse {
        file: origin.to_path_buf(),
        line: line_number,
        column: 1,
        message: message.to_string(),
    };

    let open = lowered
        .find('(')
        .ok_or_else(|| malformed("submodule declaration is missing its parent list"))?;
    let close = lowered
        .find(')')
        .filter(|close| *close > open)
        .ok_or_else(|| malformed("submodule parent list is not closed"))?;

    let parents: Vec<String> = lowered[open + 1..close]
        .split(':')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parents.is_empty() {
        return Err(malformed("submodule parent list is empty").into());
    }

    let name = lowered[close + 1..].trim();
    if name.is_empty() {
        return Err(malformed("submodule declaration is missing a name").into());
    }

    Ok((parents, name.to_string()))
}

/// Extract a quoted argument starting at `from` in the original line.
fn quoted_argument(line: &str, from: usize) -> Option<String> {
    let rest = line.get(from..)?.trim_start();
    let mut chars = rest.chars();
    let quote = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner: String = chars.take_while(|c| *c != quote).collect();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

fn validate_name(name: &str, origin: &Path, line_number: usize) -> Result<()> {
    let valid = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(BuildError::Parse {
            file: origin.to_path_buf(),
            line: line_number,
            column: 1,
            message: format!("invalid identifier `{name}`"),
        }
        .into())
    }
}
