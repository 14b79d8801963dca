//! Administrative commands and their response texts.
//!
//! The table is built once and maps each command name to a fixed action with its declared
//! options. Adapters pass option values as strings and relay the returned text verbatim.

use crate::error::FixerError;
use crate::service::{LinkFixer, RuleRequest};
use std::collections::BTreeMap;
use tracing::debug;

/// Option values keyed by option name.
pub type Options = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Replace,
    RegexReplace,
    Prepend,
    List,
    Delete,
    Import,
}

/// A declared option of a command. All declared options are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub options: &'static [OptionSpec],
    action: Action,
}

const DOMAIN: OptionSpec = OptionSpec { name: "domain", description: "Domain this fixer will apply to" };

const COMMANDS: [CommandSpec; 6] = [
    CommandSpec {
        name: "replace-fixer",
        description: "Register a URL fixer that replaces one substring in a URL with another",
        options: &[
            DOMAIN,
            OptionSpec { name: "old", description: "Substring to replace" },
            OptionSpec { name: "new", description: "What to replace old substring with" },
        ],
        action: Action::Replace,
    },
    CommandSpec {
        name: "regexp-replace-fixer",
        description: "Register a URL fixer that replaces regular expression matches in a URL",
        options: &[
            DOMAIN,
            OptionSpec { name: "pattern", description: "Regular expression to match against URL" },
            OptionSpec {
                name: "replacement",
                description: "Replacement string, reference capture groups with $x",
            },
        ],
        action: Action::RegexReplace,
    },
    CommandSpec {
        name: "prepend-fixer",
        description: "Register a URL fixer that prepends a string to a URL",
        options: &[DOMAIN, OptionSpec { name: "prefix", description: "Prefix to prepend" }],
        action: Action::Prepend,
    },
    CommandSpec {
        name: "list-fixers",
        description: "List all registered URL fixers for this namespace",
        options: &[],
        action: Action::List,
    },
    CommandSpec {
        name: "delete-fixer",
        description: "Delete a fixer for a domain",
        options: &[OptionSpec { name: "domain", description: "Domain of the fixer to delete" }],
        action: Action::Delete,
    },
    CommandSpec {
        name: "register-csv-fixers",
        description: "Register multiple URL fixers from CSV text",
        options: &[OptionSpec { name: "csv", description: "One 'prepend' or 'replace' rule per line" }],
        action: Action::Import,
    },
];

/// Name → command dispatch table over a [`LinkFixer`].
#[derive(Debug, Clone)]
pub struct CommandTable {
    service: LinkFixer,
    commands: BTreeMap<&'static str, CommandSpec>,
}

impl CommandTable {
    #[must_use]
    pub fn new(service: LinkFixer) -> Self {
        Self { service, commands: COMMANDS.into_iter().map(|c| (c.name, c)).collect() }
    }

    /// All commands, ordered by name.
    pub fn describe(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    /// Runs `name` in `namespace` and returns the text to show the user.
    ///
    /// # Errors
    /// [`FixerError::Validation`] for an unknown command or a missing option; otherwise
    /// whatever the underlying operation reports.
    pub async fn run(&self, name: &str, namespace: &str, options: &Options) -> Result<String, FixerError> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| FixerError::validation(format!("unknown command '{name}'")))?;

        let arg = |option: &str| -> Result<String, FixerError> {
            options.get(option).cloned().ok_or_else(|| {
                FixerError::validation(format!("missing option '{option}' for command '{name}'"))
            })
        };
        debug!(command = name, namespace, "Running command");

        match command.action {
            Action::Replace => {
                let request = RuleRequest::Replace { old: arg("old")?, new: arg("new")? };
                self.register(namespace, &arg("domain")?, request).await
            },
            Action::RegexReplace => {
                let request = RuleRequest::RegexReplace {
                    pattern: arg("pattern")?,
                    replacement: arg("replacement")?,
                };
                self.register(namespace, &arg("domain")?, request).await
            },
            Action::Prepend => {
                let request = RuleRequest::Prepend { prefix: arg("prefix")? };
                self.register(namespace, &arg("domain")?, request).await
            },
            Action::List => self.list(namespace),
            Action::Delete => {
                let domain = self.service.delete_rule(namespace, &arg("domain")?).await?;
                Ok(format!("Successfully deleted fixer for domain `{domain}`"))
            },
            Action::Import => {
                let count = self.service.import_rules(namespace, &arg("csv")?).await?;
                Ok(format!("Successfully registered {count} fixers."))
            },
        }
    }

    async fn register(
        &self,
        namespace: &str,
        domain: &str,
        request: RuleRequest,
    ) -> Result<String, FixerError> {
        let rule = self.service.register_rule(namespace, domain, request).await?;
        Ok(format!("Successfully registered fixer `{}` for domain `{}`", rule.fixer, rule.domain))
    }

    fn list(&self, namespace: &str) -> Result<String, FixerError> {
        let rules = self.service.list_rules(namespace)?;
        if rules.is_empty() {
            return Ok("No fixers found!".to_owned());
        }

        let lines: Vec<String> = std::iter::once("Currently registered fixers:".to_owned())
            .chain(rules.iter().map(|(domain, description)| format!("- `{domain}` → `{description}`")))
            .collect();
        Ok(lines.join("\n"))
    }
}
