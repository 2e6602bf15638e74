use crate::args::{ArgSpec, DirectiveInput, FlagSpec};
use crate::directive::Directive;
use crate::error::{DirectiveError, Result};
use crate::registry::DirectiveHandler;

/// `%tag [-i <stage>] <name[:tag]>`
pub struct TagHandler;

const FLAGS: &[FlagSpec] = &[FlagSpec {
    long: "image",
    short: Some("i"),
    desc: "Stage (alias or index) to be tagged instead of the current image",
}];

impl DirectiveHandler for TagHandler {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn description(&self) -> &'static str {
        "Save the image with a name and tag"
    }

    fn arguments(&self) -> ArgSpec {
        ArgSpec {
            names: &["target image"],
            required: 1,
        }
    }

    fn flags(&self) -> &'static [FlagSpec] {
        FLAGS
    }

    fn parse(&self, input: DirectiveInput) -> Result<Directive> {
        let target = input.arg(0).ok_or(DirectiveError::MissingArgument {
            name: "target image",
            position: 1,
        })?;
        let invalid = |message: &str| DirectiveError::InvalidArgument {
            position: 1,
            message: message.to_string(),
        };

        if target.starts_with(':') {
            return Err(invalid("Image name can't start with a ':'"));
        }
        if target.matches(':').count() > 1 {
            return Err(invalid("Tag can't contain ':'"));
        }
        if target.ends_with(':') {
            return Err(invalid("Image name can't end in a ':'"));
        }

        let (name, tag) = match target.split_once(':') {
            Some((name, tag)) => (name.to_string(), Some(tag.to_string())),
            None => (target.to_string(), None),
        };
        Ok(Directive::Tag {
            stage: input.flag("image").map(str::to_string),
            name,
            tag,
        })
    }
}
