use thiserror::Error;

/// Errors produced while splitting an input line into words.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unterminated single quote")]
    UnterminatedSingleQuote,
    #[error("unterminated double quote")]
    UnterminatedDoubleQuote,
    #[error("trailing escape character")]
    TrailingEscape,
    #[error("command substitution with backticks is not supported")]
    Backtick,
}

/// Tokenizes shell input into a vector of strings, expanding `$NAME` from the
/// process environment.
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
    tokenize_with(input, |name| std::env::var(name).ok())
}

/// Tokenizes shell input, resolving `$NAME` through `lookup`.
///
/// Quotes and escapes are resolved here, so the returned words are final:
/// - whitespace outside quotes separates words;
/// - a bare backslash takes the next character literally;
/// - single quotes keep everything literal;
/// - double quotes expand variables and honour `\"`, `\\`, `` \` `` and `\$`;
/// - `$` not followed by a name character stays a literal `$`.
pub fn tokenize_with<F>(input: &str, lookup: F) -> Result<Vec<String>, TokenizeError>
where
    F: Fn(&str) -> Option<String>,
{
    if input.contains('`') {
        return Err(TokenizeError::Backtick);
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    // A word has started even if it resolves to nothing (`''`, `$UNSET`).
    let mut in_word = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    tokens.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\\' => {
                let next = chars.next().ok_or(TokenizeError::TrailingEscape)?;
                current.push(next);
                in_word = true;
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(TokenizeError::UnterminatedSingleQuote),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(esc @ ('"' | '\\' | '$')) => current.push(esc),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(TokenizeError::UnterminatedDoubleQuote),
                        },
                        Some('$') => expand_variable(&mut chars, &mut current, &lookup),
                        Some(ch) => current.push(ch),
                        None => return Err(TokenizeError::UnterminatedDoubleQuote),
                    }
                }
            }
            '$' => {
                in_word = true;
                expand_variable(&mut chars, &mut current, &lookup);
            }
            _ => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        tokens.push(current);
    }

    tracing::debug!(target: "tokenize", ?tokens, "tokenized input");
    Ok(tokens)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Consumes a variable name following a `$` and appends its value.
fn expand_variable<I, F>(chars: &mut std::iter::Peekable<I>, out: &mut String, lookup: &F)
where
    I: Iterator<Item = char>,
    F: Fn(&str) -> Option<String>,
{
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if !is_name_char(c) {
            break;
        }
        name.push(c);
        chars.next();
    }

    if name.is_empty() {
        out.push('$');
        return;
    }

    if let Some(value) = lookup(&name) {
        out.push_str(&value);
    }
}
