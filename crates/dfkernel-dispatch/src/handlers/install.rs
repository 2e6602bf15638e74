use crate::args::{ArgSpec, DirectiveInput};
use crate::directive::Directive;
use crate::error::{DirectiveError, Result};
use crate::registry::DirectiveHandler;

/// `%install <manager> <package...>`
///
/// パッケージマネージャごとの RUN 命令を組み立てる。
pub struct InstallHandler;

const PRETTY_BREAK: &str = " && \\\n    ";
const INLINE_BREAK: &str = " && ";

impl DirectiveHandler for InstallHandler {
    fn name(&self) -> &'static str {
        "install"
    }

    fn description(&self) -> &'static str {
        "Install additional packages to the image"
    }

    fn arguments(&self) -> ArgSpec {
        ArgSpec {
            names: &["package-manager", "package"],
            required: 2,
        }
    }

    fn parse(&self, input: DirectiveInput) -> Result<Directive> {
        let (manager, packages) = match input.args.split_first() {
            Some((manager, packages)) if !packages.is_empty() => (manager, packages),
            _ => {
                return Err(DirectiveError::MissingArgument {
                    name: "package",
                    position: 2,
                });
            }
        };

        let steps = install_steps(&manager.to_lowercase(), &packages.join(" "))
            .ok_or_else(|| DirectiveError::UnsupportedPackageManager(manager.clone()))?;

        Ok(Directive::Install {
            pretty: format!("RUN {}", steps.join(PRETTY_BREAK)),
            instruction: format!("RUN {}", steps.join(INLINE_BREAK)),
        })
    }
}

fn install_steps(manager: &str, packages: &str) -> Option<Vec<String>> {
    let steps = match manager {
        "apt" | "apt-get" => vec![
            "apt-get update".to_string(),
            format!("apt-get install -y {}", packages),
            "rm -rf /var/lib/apt/lists/*".to_string(),
        ],
        "conda" => vec![
            format!("conda install -y --freeze-installed {}", packages),
            "conda clean -afy".to_string(),
        ],
        "conda-forge" => vec![
            format!("conda install -y --freeze-installed -c conda-forge {}", packages),
            "conda clean -afy".to_string(),
        ],
        "npm" => vec![
            format!("npm install {}", packages),
            "npm cache clean --force".to_string(),
        ],
        "pip" => vec![
            "pip install --upgrade pip".to_string(),
            format!("pip install {}", packages),
            "rm -rf /root/.cache/pip".to_string(),
        ],
        _ => return None,
    };
    Some(steps)
}
