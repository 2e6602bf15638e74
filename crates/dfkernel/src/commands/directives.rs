use colored::Colorize;
use dfkernel_dispatch::DirectiveRegistry;

pub fn handle() {
    let registry = DirectiveRegistry::builtin();
    let mut handlers: Vec<_> = registry.iter().collect();
    handlers.sort_by_key(|h| h.name());

    println!("{}", "Available directives:".bold());
    for handler in handlers {
        println!(
            "  {:<10} {}",
            format!("%{}", handler.name()).cyan(),
            handler.description()
        );
    }
}
