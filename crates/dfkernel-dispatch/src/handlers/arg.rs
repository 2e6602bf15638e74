use crate::args::{ArgSpec, DirectiveInput};
use crate::directive::Directive;
use crate::error::{DirectiveError, Result};
use crate::registry::DirectiveHandler;
use dfkernel_build::ArgSelection;

/// `%arg NAME=VALUE...` / `%arg rm [NAME...]` / `%arg ls [NAME...]`
///
/// 引数無しの `%arg` は `%arg ls` と同じ
pub struct ArgHandler;

impl DirectiveHandler for ArgHandler {
    fn name(&self) -> &'static str {
        "arg"
    }

    fn description(&self) -> &'static str {
        "Manipulate build arguments"
    }

    fn arguments(&self) -> ArgSpec {
        ArgSpec {
            names: &["command"],
            required: 0,
        }
    }

    fn parse(&self, input: DirectiveInput) -> Result<Directive> {
        let (first, rest) = match input.args.split_first() {
            Some(split) => split,
            None => return Ok(Directive::ListArgs(Vec::new())),
        };

        match first.to_lowercase().as_str() {
            "rm" | "remove" if rest.is_empty() => Ok(Directive::RemoveArgs(ArgSelection::All)),
            "rm" | "remove" => Ok(Directive::RemoveArgs(ArgSelection::Names(rest.to_vec()))),
            "ls" | "list" => Ok(Directive::ListArgs(rest.to_vec())),
            _ => input
                .args
                .iter()
                .map(|arg| parse_assignment(arg))
                .collect::<Result<Vec<_>>>()
                .map(Directive::SetArgs),
        }
    }
}

fn parse_assignment(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() && !value.is_empty() => {
            Ok((name.to_string(), value.to_string()))
        }
        _ => Err(DirectiveError::InvalidBuildArg(arg.to_string())),
    }
}
