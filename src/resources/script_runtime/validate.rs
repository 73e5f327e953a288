//! Static check of the functions a script calls.
//!
//! Before a script runs, every call to a bare global name must resolve to
//! something the actor is allowed to use: a granted action, a builtin from
//! [`ALLOWED_BUILTINS`], or a name the script binds itself (a function,
//! local, parameter or loop variable). Field and method calls (`t.f()`,
//! `t:f()`) are not checked; the sandboxed environment only exposes what is
//! allowed anyway.

use std::collections::BTreeSet;

pub const ALLOWED_BUILTINS: [&str; 11] = [
    "print", "pairs", "ipairs", "type", "tostring", "tonumber", "select", "next", "error",
    "assert", "pcall",
];

const KEYWORDS: [&str; 22] = [
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// A call the script is not allowed to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forbidden {
    pub token: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str,
    Number,
    Sym(String),
}

#[derive(Debug, Clone)]
struct Lexed {
    token: Token,
    line: usize,
}

/// Level of a long bracket (`[[`, `[==[`) opening at `i`.
fn long_bracket_level(bytes: &[u8], i: usize) -> Option<usize> {
    if bytes.get(i) != Some(&b'[') {
        return None;
    }
    let mut j = i + 1;
    while bytes.get(j) == Some(&b'=') {
        j += 1;
    }
    (bytes.get(j) == Some(&b'[')).then_some(j - i - 1)
}

/// Skips a long bracket opening at `i`, returning the index after it closes.
fn skip_long(bytes: &[u8], i: usize, level: usize, line: &mut usize) -> usize {
    let mut j = i + level + 2;
    while j < bytes.len() {
        if bytes[j] == b'\n' {
            *line += 1;
        } else if bytes[j] == b']' {
            let end = j + 1 + level;
            if bytes.get(end) == Some(&b']') && bytes[j + 1..end].iter().all(|b| *b == b'=') {
                return end + 1;
            }
        }
        j += 1;
    }
    bytes.len()
}

fn skip_quoted(bytes: &[u8], i: usize, line: &mut usize) -> usize {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => {
                if bytes.get(j + 1) == Some(&b'\n') {
                    *line += 1;
                }
                j += 2;
                continue;
            }
            b'\n' => *line += 1,
            b if b == quote => return j + 1,
            _ => {}
        }
        j += 1;
    }
    bytes.len()
}

fn lex(source: &str) -> Vec<Lexed> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start_line = line;
        match c {
            b'\n' => {
                line += 1;
                i += 1;
            }
            _ if c.is_ascii_whitespace() => i += 1,
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i += 2;
                if let Some(level) = long_bracket_level(bytes, i) {
                    i = skip_long(bytes, i, level, &mut line);
                } else {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                }
            }
            b'[' if long_bracket_level(bytes, i).is_some() => {
                let level = long_bracket_level(bytes, i).unwrap_or(0);
                i = skip_long(bytes, i, level, &mut line);
                tokens.push(Lexed { token: Token::Str, line: start_line });
            }
            b'"' | b'\'' => {
                i = skip_quoted(bytes, i, &mut line);
                tokens.push(Lexed { token: Token::Str, line: start_line });
            }
            _ if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Lexed {
                    token: Token::Ident(source[start..i].to_string()),
                    line,
                });
            }
            _ if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) => {
                while i < bytes.len() {
                    let b = bytes[i];
                    let exponent_sign = (b == b'+' || b == b'-')
                        && matches!(bytes[i - 1], b'e' | b'E' | b'p' | b'P');
                    if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Lexed { token: Token::Number, line });
            }
            _ => {
                let two = source.get(i..i + 2).unwrap_or("");
                let three = source.get(i..i + 3).unwrap_or("");
                let sym = if three == "..." {
                    three
                } else if matches!(two, "==" | "~=" | "<=" | ">=" | ".." | "::" | "//" | "<<" | ">>") {
                    two
                } else {
                    source.get(i..i + 1).unwrap_or("?")
                };
                i += sym.len().max(1);
                tokens.push(Lexed {
                    token: Token::Sym(sym.to_string()),
                    line,
                });
            }
        }
    }
    tokens
}

fn is_sym(token: Option<&Lexed>, sym: &str) -> bool {
    matches!(token, Some(Lexed { token: Token::Sym(s), .. }) if s == sym)
}

fn is_word(token: Option<&Lexed>, word: &str) -> bool {
    matches!(token, Some(Lexed { token: Token::Ident(s), .. }) if s == word)
}

fn ident(token: Option<&Lexed>) -> Option<&str> {
    match token {
        Some(Lexed { token: Token::Ident(s), .. }) if !KEYWORDS.contains(&s.as_str()) => Some(s),
        _ => None,
    }
}

/// Reads `a, b, c` starting at `i`, adding each name to `out`.
fn collect_name_list(tokens: &[Lexed], mut i: usize, out: &mut BTreeSet<String>) {
    while let Some(name) = ident(tokens.get(i)) {
        out.insert(name.to_string());
        if !is_sym(tokens.get(i + 1), ",") {
            break;
        }
        i += 2;
    }
}

/// Names the script binds itself.
fn bound_names(tokens: &[Lexed]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for (i, lexed) in tokens.iter().enumerate() {
        match &lexed.token {
            Token::Ident(word) if word == "function" => {
                let mut j = i + 1;
                if let Some(name) = ident(tokens.get(j)) {
                    names.insert(name.to_string());
                    j += 1;
                    while (is_sym(tokens.get(j), ".") || is_sym(tokens.get(j), ":"))
                        && ident(tokens.get(j + 1)).is_some()
                    {
                        j += 2;
                    }
                }
                if is_sym(tokens.get(j), "(") {
                    collect_name_list(tokens, j + 1, &mut names);
                }
            }
            Token::Ident(word) if word == "local" || word == "for" => {
                collect_name_list(tokens, i + 1, &mut names);
            }
            Token::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                let field = i > 0 && (is_sym(tokens.get(i - 1), ".") || is_sym(tokens.get(i - 1), ":"));
                if !field && is_sym(tokens.get(i + 1), "=") {
                    names.insert(name.clone());
                }
            }
            _ => {}
        }
    }
    names
}

/// Returns the first call to a name outside `granted`, the builtins and the
/// script's own bindings.
pub fn check_calls<'a>(source: &str, granted: impl IntoIterator<Item = &'a str>) -> Result<(), Forbidden> {
    let tokens = lex(source);
    let bound = bound_names(&tokens);
    let allowed: BTreeSet<&str> = granted.into_iter().chain(ALLOWED_BUILTINS).collect();

    for (i, lexed) in tokens.iter().enumerate() {
        let Some(name) = ident(Some(lexed)) else {
            continue;
        };
        if i > 0 {
            let prev = tokens.get(i - 1);
            if is_sym(prev, ".") || is_sym(prev, ":") || is_word(prev, "function") {
                continue;
            }
        }
        let next = tokens.get(i + 1);
        let is_call = is_sym(next, "(")
            || is_sym(next, "{")
            || matches!(next, Some(Lexed { token: Token::Str, .. }));
        if is_call && !allowed.contains(name) && !bound.contains(name) {
            return Err(Forbidden {
                token: name.to_string(),
                line: lexed.line,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALKER: [&str; 4] = ["turnLeft", "turnRight", "wait", "walk"];

    #[test]
    fn granted_and_builtin_calls_pass() {
        let source = r#"
            for i = 1, 3 do
                if walk() then print("moved", i) else turnLeft() end
            end
        "#;
        assert_eq!(check_calls(source, WALKER), Ok(()));
    }

    #[test]
    fn ungranted_action_is_reported_with_line() {
        let source = "walk()\n\ngrab()\n";
        assert_eq!(
            check_calls(source, WALKER),
            Err(Forbidden {
                token: "grab".to_string(),
                line: 3
            })
        );
    }

    #[test]
    fn script_defined_functions_are_allowed() {
        let source = r#"
            local function step(n) for _ = 1, n do walk() end end
            function spin() turnLeft() turnLeft() end
            local helper = function(f) f() end
            step(2) spin() helper(wait)
        "#;
        assert_eq!(check_calls(source, WALKER), Ok(()));
    }

    #[test]
    fn field_and_method_calls_are_ignored() {
        let source = "local t = {}\nfunction t:go() end\nt:go()\nlocal x = math.floor(2.5)\nstring.format('%d', x)";
        assert_eq!(check_calls(source, WALKER), Ok(()));
    }

    #[test]
    fn comments_and_strings_are_skipped() {
        let source = r#"
            -- grab() in a line comment
            --[[ shred()
                 across lines ]]
            print("grab()", 'shred()', [==[ weld() ]==])
            walk()
        "#;
        assert_eq!(check_calls(source, WALKER), Ok(()));
    }

    #[test]
    fn string_call_sugar_is_a_call() {
        let result = check_calls("require 'os'", WALKER);
        assert_eq!(result.map_err(|f| f.token), Err("require".to_string()));
    }

    #[test]
    fn line_numbers_survive_long_comments() {
        let source = "--[[\n\n]]\nload('x')";
        assert_eq!(check_calls(source, WALKER).map_err(|f| f.line), Err(4));
    }
}
