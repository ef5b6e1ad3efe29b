/// Conservative JavaScript minifier
///
/// Works on a character scanner that knows about strings, template
/// literals (including nested `${}` substitutions), regular expression
/// literals and comments. It only removes comments and indentation and
/// never joins lines, so automatic semicolon insertion is unaffected.
pub struct Minifier;

/// Result of a scan: the rewritten code plus, for every line, whether that
/// line starts inside a template literal or multi-line string.
struct Scanned {
    code: String,
    line_starts_in_literal: Vec<bool>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Template,
}

const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

impl Minifier {
    pub fn new() -> Self {
        Self
    }

    /// Remove comments, keeping line structure
    pub fn strip_comments(&self, content: &str) -> String {
        scan(content).code
    }

    /// Strip comments, indentation, trailing whitespace and blank lines
    pub fn minify(&self, content: &str) -> String {
        let scanned = scan(content);
        let lines: Vec<&str> = scanned.code.split('\n').collect();
        let mut out = String::with_capacity(scanned.code.len());

        for (i, line) in lines.iter().enumerate() {
            let starts_in_literal = scanned.line_starts_in_literal.get(i).copied().unwrap_or(false);
            let ends_in_literal = scanned
                .line_starts_in_literal
                .get(i + 1)
                .copied()
                .unwrap_or(false);

            let mut text: &str = line;
            if !starts_in_literal {
                text = text.trim_start();
            }
            if !ends_in_literal {
                text = text.trim_end();
            }
            if text.is_empty() && !starts_in_literal && !ends_in_literal {
                continue;
            }

            out.push_str(text);
            if i + 1 < lines.len() {
                out.push('\n');
            }
        }

        out.trim_end_matches('\n').to_string()
    }
}

impl Default for Minifier {
    fn default() -> Self {
        Self::new()
    }
}

fn scan(src: &str) -> Scanned {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut line_starts_in_literal = vec![false];

    let mut state = State::Code;
    // Brace depth at which each open `${` substitution returns to its template
    let mut template_stack: Vec<usize> = Vec::new();
    let mut brace_depth = 0usize;
    let mut last_significant: Option<char> = None;
    let mut last_word = String::new();
    let mut i = 0;

    let push_newline = |out: &mut String, flags: &mut Vec<bool>, in_literal: bool| {
        out.push('\n');
        flags.push(in_literal);
    };

    while i < chars.len() {
        let c = chars[i];

        if state == State::Template {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(&next) = chars.get(i + 1) {
                        if next == '\n' {
                            push_newline(&mut out, &mut line_starts_in_literal, true);
                        } else {
                            out.push(next);
                        }
                    }
                    i += 2;
                }
                '`' => {
                    out.push(c);
                    state = State::Code;
                    last_significant = Some('`');
                    last_word.clear();
                    i += 1;
                }
                '$' if chars.get(i + 1) == Some(&'{') => {
                    out.push_str("${");
                    template_stack.push(brace_depth);
                    brace_depth += 1;
                    state = State::Code;
                    last_significant = Some('{');
                    last_word.clear();
                    i += 2;
                }
                '\n' => {
                    push_newline(&mut out, &mut line_starts_in_literal, true);
                    i += 1;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
            continue;
        }

        match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let mut saw_newline = false;
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        saw_newline = true;
                    }
                    i += 1;
                }
                i += 2;
                if saw_newline {
                    push_newline(&mut out, &mut line_starts_in_literal, false);
                } else {
                    out.push(' ');
                }
            }
            '/' if regex_allowed(last_significant, &last_word) => {
                let mut in_class = false;
                out.push(c);
                i += 1;
                while i < chars.len() && chars[i] != '\n' {
                    let rc = chars[i];
                    out.push(rc);
                    i += 1;
                    match rc {
                        '\\' => {
                            if let Some(&next) = chars.get(i) {
                                out.push(next);
                                i += 1;
                            }
                        }
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '/' if !in_class => break,
                        _ => {}
                    }
                }
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    out.push(chars[i]);
                    i += 1;
                }
                last_significant = Some('/');
                last_word = "regex".to_string();
            }
            '"' | '\'' => {
                let quote = c;
                out.push(c);
                i += 1;
                while i < chars.len() {
                    let sc = chars[i];
                    if sc == '\\' {
                        out.push(sc);
                        if let Some(&next) = chars.get(i + 1) {
                            if next == '\n' {
                                push_newline(&mut out, &mut line_starts_in_literal, true);
                            } else {
                                out.push(next);
                            }
                        }
                        i += 2;
                        continue;
                    }
                    if sc == '\n' {
                        break;
                    }
                    out.push(sc);
                    i += 1;
                    if sc == quote {
                        break;
                    }
                }
                last_significant = Some(quote);
                last_word.clear();
            }
            '`' => {
                out.push(c);
                state = State::Template;
                i += 1;
            }
            '{' => {
                brace_depth += 1;
                out.push(c);
                last_significant = Some(c);
                last_word.clear();
                i += 1;
            }
            '}' => {
                brace_depth = brace_depth.saturating_sub(1);
                out.push(c);
                i += 1;
                if template_stack.last() == Some(&brace_depth) {
                    template_stack.pop();
                    state = State::Template;
                } else {
                    last_significant = Some(c);
                    last_word.clear();
                }
            }
            '\n' => {
                push_newline(&mut out, &mut line_starts_in_literal, false);
                i += 1;
            }
            _ if c.is_whitespace() => {
                out.push(c);
                i += 1;
            }
            _ if is_ident_char(c) => {
                last_word.clear();
                while i < chars.len() && is_ident_char(chars[i]) {
                    out.push(chars[i]);
                    last_word.push(chars[i]);
                    i += 1;
                }
                last_significant = last_word.chars().last();
            }
            _ => {
                out.push(c);
                last_significant = Some(c);
                last_word.clear();
                i += 1;
            }
        }
    }

    Scanned {
        code: out,
        line_starts_in_literal,
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn regex_allowed(last: Option<char>, last_word: &str) -> bool {
    if !last_word.is_empty() {
        return REGEX_KEYWORDS.contains(&last_word);
    }
    match last {
        None => true,
        Some(c) => "(,=:[!&|?{};+-*%<>~^}".contains(c),
    }
}
