//! Wire Frame Builder: turns a command into a RESP multi-bulk byte string.
//!
//! Both entry points are pure functions — no I/O, no shared state — matching
//! how this codebase keeps its serialization helpers free of side effects.

/// Formats `argv` as a RESP multi-bulk frame, one bulk per entry.
///
/// `*<count>\r\n` followed by `$<len>\r\n<bytes>\r\n` per argument.
pub fn format_argv(argv: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(argv.iter().map(|a| a.len() + 16).sum::<usize>() + 16);
    out.extend_from_slice(format!("*{}\r\n", argv.len()).as_bytes());
    for arg in argv {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Formats `argv` (owned strings) as a RESP multi-bulk frame.
pub fn format_argv_owned(argv: &[Vec<u8>]) -> Vec<u8> {
    let refs: Vec<&[u8]> = argv.iter().map(|v| v.as_slice()).collect();
    format_argv(&refs)
}

/// A substitution argument for [`format`]: either a verbatim string or an
/// integer to be decimal-formatted in place.
pub enum Arg<'a> {
    Str(&'a [u8]),
    Int(i64),
}

/// Formats `template` (a whitespace-separated token string whose tokens may
/// contain `%s`/`%d` specifiers) by substituting `args` positionally, then
/// frames the resulting tokens as a RESP multi-bulk command.
///
/// Each whitespace-separated token in the substituted string becomes exactly
/// one bulk. This mirrors the C source's `redisvFormatCommand` token
/// splitting, simplified to the subset this tool's template catalog needs:
/// no embedded quoting, one specifier per token.
pub fn format(template: &str, args: &[Arg]) -> Vec<u8> {
    let mut arg_iter = args.iter();
    let mut tokens: Vec<Vec<u8>> = Vec::new();
    let mut current = Vec::new();

    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c == '%' {
            match chars.peek() {
                Some('s') => {
                    chars.next();
                    if let Some(Arg::Str(s)) = arg_iter.next() {
                        current.extend_from_slice(s);
                    }
                    continue;
                }
                Some('d') => {
                    chars.next();
                    if let Some(Arg::Int(i)) = arg_iter.next() {
                        current.extend_from_slice(i.to_string().as_bytes());
                    }
                    continue;
                }
                _ => {}
            }
        }
        let mut buf = [0u8; 4];
        current.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    format_argv_owned(&tokens)
}
