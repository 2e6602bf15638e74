use crate::args::DirectiveInput;
use crate::directive::Directive;
use crate::error::Result;
use crate::registry::DirectiveHandler;

/// `%stages`
pub struct StagesHandler;

impl DirectiveHandler for StagesHandler {
    fn name(&self) -> &'static str {
        "stages"
    }

    fn description(&self) -> &'static str {
        "List all build stages"
    }

    fn parse(&self, _input: DirectiveInput) -> Result<Directive> {
        Ok(Directive::Stages)
    }
}

/// `%magics`
pub struct MagicsHandler;

impl DirectiveHandler for MagicsHandler {
    fn name(&self) -> &'static str {
        "magics"
    }

    fn description(&self) -> &'static str {
        "List all available directives"
    }

    fn parse(&self, _input: DirectiveInput) -> Result<Directive> {
        Ok(Directive::Magics)
    }
}
