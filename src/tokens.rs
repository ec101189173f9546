//! Placeholder expansion for configured locations.
//!
//! A location string may contain keyword tokens such as `$HOME` and function
//! tokens such as `${ENDS_WITH='default-release'}`. Keywords are plain
//! substring replacements applied in table order. Functions are evaluated
//! afterwards, left to right, against the directory that precedes the token
//! in the (already keyword-expanded) path.
//!
//! Function tokens that find no matching directory are left verbatim so a
//! later run can resolve them once the directory appears. Tokens naming an
//! unknown function are left verbatim too and reported in
//! [`Resolution::unresolved`].

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Symbol introducing every token
pub const TOKEN_SYMBOL: char = '$';

/// Built-in token functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFunction {
    /// First child directory whose name ends with the argument
    EndsWith,
    /// First child directory whose name begins with the argument
    BeginsWith,
}

impl TokenFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ENDS_WITH" => Some(Self::EndsWith),
            "BEGINS_WITH" => Some(Self::BeginsWith),
            _ => None,
        }
    }

    fn matches(self, name: &str, arg: &str) -> bool {
        match self {
            Self::EndsWith => name.ends_with(arg),
            Self::BeginsWith => name.starts_with(arg),
        }
    }
}

/// A location with its tokens expanded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub value: String,
    /// Function tokens naming an unknown function, still present in `value`
    pub unresolved: Vec<String>,
}

/// Ordered keyword table plus the function-token matcher
#[derive(Debug, Clone)]
pub struct TokenTable {
    symbol: char,
    keywords: Vec<(String, String)>,
    function_re: Regex,
}

impl TokenTable {
    /// Empty table using `symbol` as the token prefix
    pub fn new(symbol: char) -> Result<Self> {
        let escaped = regex::escape(&symbol.to_string());
        let pattern = format!(r#"{escaped}\{{(\w+)=["']([^"'\s]+)["']\}}"#);
        let function_re = Regex::new(&pattern)
            .map_err(|e| Error::config(format!("Invalid token symbol '{symbol}': {e}")))?;

        Ok(Self {
            symbol,
            keywords: Vec::new(),
            function_re,
        })
    }

    /// Append a keyword; earlier keywords are substituted first
    pub fn with_keyword(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    /// The standard keywords derived from a home directory
    pub fn for_home(home: &Path) -> Result<Self> {
        let home_str = home.to_string_lossy().to_string();
        let join = |rel: &str| home.join(rel).to_string_lossy().to_string();

        Ok(Self::new(TOKEN_SYMBOL)?
            .with_keyword("HOME", home_str)
            .with_keyword("CONFIG_DIR", join(".config"))
            .with_keyword("SHARE_DIR", join(".local/share"))
            .with_keyword("BIN_DIR", join(".local/bin")))
    }

    /// Standard table for the current user
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::config("Failed to determine the home directory"))?;
        Self::for_home(&home)
    }

    pub fn symbol(&self) -> char {
        self.symbol
    }

    /// Resolve every token in `raw`.
    ///
    /// Fails with [`Error::UnresolvedToken`] when a function token names an
    /// unknown function. Known functions without a match pass through.
    pub fn resolve(&self, raw: &str) -> Result<String> {
        let resolution = self.resolve_lenient(raw);
        match resolution.unresolved.into_iter().next() {
            Some(token) => Err(Error::UnresolvedToken {
                token,
                location: raw.to_string(),
            }),
            None => Ok(resolution.value),
        }
    }

    /// Resolve every token in `raw`, keeping unknown functions verbatim
    pub fn resolve_lenient(&self, raw: &str) -> Resolution {
        let expanded = self.expand_keywords(raw);
        self.expand_functions(&expanded)
    }

    /// Literal keyword substitution in table order
    pub fn expand_keywords(&self, raw: &str) -> String {
        let mut resolved = raw.to_string();
        for (name, value) in &self.keywords {
            let word = format!("{}{}", self.symbol, name);
            if resolved.contains(&word) {
                resolved = resolved.replace(&word, value);
            }
        }
        resolved
    }

    /// Evaluate function tokens left to right
    pub fn expand_functions(&self, raw: &str) -> Resolution {
        let mut resolved = raw.to_string();
        let mut unresolved = Vec::new();
        let mut cursor = 0;

        while let Some(caps) = self.function_re.captures_at(&resolved, cursor) {
            let (token, start, end) = match caps.get(0) {
                Some(m) => (m.as_str().to_string(), m.start(), m.end()),
                None => break,
            };
            let name = &caps[1];
            let arg = caps[2].to_string();

            let Some(function) = TokenFunction::from_name(name) else {
                unresolved.push(token);
                cursor = end;
                continue;
            };

            let parent = match &resolved[..start] {
                "" => PathBuf::from("."),
                prefix => PathBuf::from(prefix),
            };

            match find_child_dir(&parent, function, &arg) {
                Some(child) => {
                    log::debug!("{} resolved to {} in {}", token, child, parent.display());
                    resolved.replace_range(start..end, &child);
                    cursor = start + child.len();
                }
                None => {
                    log::debug!("{} matched nothing in {}", token, parent.display());
                    cursor = end;
                }
            }
        }

        Resolution {
            value: resolved,
            unresolved,
        }
    }
}

/// First child directory of `parent` (by name) matching `function`.
///
/// Children are sorted by name so several matches resolve the same way on
/// every platform.
fn find_child_dir(parent: &Path, function: TokenFunction, arg: &str) -> Option<String> {
    let entries = fs::read_dir(parent).ok()?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| function.matches(name, arg))
        .collect();

    names.sort();
    names.into_iter().next()
}
