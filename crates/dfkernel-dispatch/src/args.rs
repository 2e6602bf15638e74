//! ディレクティブ行の引数とフラグ
//!
//! `%name arg1 -f value --flag value arg2` の形。`-` で始まる2文字以上の語は
//! フラグとみなし、直後の語をその値にする。

use crate::error::{DirectiveError, Result};
use std::collections::BTreeMap;

/// 受け付けるフラグ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    pub long: &'static str,
    pub short: Option<&'static str>,
    pub desc: &'static str,
}

/// 位置引数の名前と、そのうち必須の個数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub names: &'static [&'static str],
    pub required: usize,
}

impl ArgSpec {
    pub const NONE: ArgSpec = ArgSpec {
        names: &[],
        required: 0,
    };
}

/// 検証済みの入力。フラグはロング名で引く
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveInput {
    pub args: Vec<String>,
    pub flags: BTreeMap<String, String>,
}

impl DirectiveInput {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn flag(&self, long: &str) -> Option<&str> {
        self.flags.get(long).map(String::as_str)
    }
}

/// セルの先頭語が `%` で始まっていれば (名前, 残り) に分ける
pub fn split_directive(code: &str) -> Option<(&str, &str)> {
    let code = code.trim();
    let name = code.strip_prefix('%')?;
    match name.split_once(char::is_whitespace) {
        Some((name, rest)) => Some((name, rest.trim())),
        None => Some((name, "")),
    }
}

/// 引数とフラグを分け、仕様に照らして検証する
pub fn parse_input(rest: &str, args: ArgSpec, flags: &[FlagSpec]) -> Result<DirectiveInput> {
    let mut input = DirectiveInput::default();
    let mut words = rest.split_whitespace();

    while let Some(word) = words.next() {
        if word.starts_with('-') && word.len() >= 2 {
            let spec = find_flag(flags, word)
                .ok_or_else(|| DirectiveError::UnknownFlag(word.to_string()))?;
            let value = words
                .next()
                .ok_or_else(|| DirectiveError::MissingFlagValue(word.to_string()))?;
            if input
                .flags
                .insert(spec.long.to_string(), value.to_string())
                .is_some()
            {
                return Err(DirectiveError::DuplicateFlag(spec.long.to_string()));
            }
        } else {
            input.args.push(word.to_string());
        }
    }

    for (position, name) in args.names.iter().copied().enumerate().take(args.required) {
        if input.args.len() <= position {
            return Err(DirectiveError::MissingArgument {
                name,
                position: position + 1,
            });
        }
    }
    if args.names.is_empty() && !input.args.is_empty() {
        return Err(DirectiveError::NoArgumentNeeded);
    }

    Ok(input)
}

fn find_flag<'a>(flags: &'a [FlagSpec], word: &str) -> Option<&'a FlagSpec> {
    match word.strip_prefix("--") {
        Some(long) => flags.iter().find(|f| f.long == long),
        None => {
            let short = &word[1..];
            flags.iter().find(|f| f.short == Some(short))
        }
    }
}
