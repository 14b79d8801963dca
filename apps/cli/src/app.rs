use crate::args::AppCommands;
use anyhow::{Context, Result, bail};
use linkfix_core::{CommandTable, FixedLink, FixerError, LinkFixer, Options, RuleStore};
use linkfix_kernel::config::AppConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::{JoinError, JoinSet};
use tracing::{info, warn};

pub async fn run(command: AppCommands, cfg: &AppConfig) -> Result<()> {
    let store = RuleStore::open(cfg).await.context("Failed to open the rule store")?;
    let service = LinkFixer::new(store);

    match command {
        AppCommands::Fix { namespace, all, text } => fix(&service, &namespace, all, &text.join(" ")),
        AppCommands::Watch { namespace } => watch(service, namespace).await,
        AppCommands::Run { namespace, command, options } => {
            let options = parse_options(&options)?;
            let response = CommandTable::new(service).run(&command, &namespace, &options).await?;
            println!("{response}");
            Ok(())
        },
        AppCommands::Commands {} => {
            for command in CommandTable::new(service).describe() {
                let options: Vec<_> = command.options.iter().map(|o| o.name).collect();
                println!("{:<22} {}", command.name, command.description);
                if !options.is_empty() {
                    println!("{:<22} options: {}", "", options.join(", "));
                }
            }
            Ok(())
        },
        AppCommands::Namespaces {} => {
            for namespace in service.store().namespaces() {
                println!("{namespace}");
            }
            Ok(())
        },
    }
}

fn fix(service: &LinkFixer, namespace: &str, all: bool, text: &str) -> Result<()> {
    if all {
        for link in service.fix_all(namespace, text)? {
            println!("{}", link.fixed);
        }
    } else if let Some(link) = service.fix_message(namespace, text)? {
        println!("{}", link.fixed);
    }
    Ok(())
}

/// Fixes stdin line by line, one task per line, printing in completion order.
async fn watch(service: LinkFixer, namespace: String) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else { break };
                let service = service.clone();
                let namespace = namespace.clone();
                tasks.spawn(async move { service.fix_message(&namespace, &line) });
            },
            res = &mut ctrl_c => {
                res.context("Failed to listen for Ctrl+C")?;
                info!("Interrupted, finishing pending lines");
                break;
            },
            Some(done) = tasks.join_next(), if !tasks.is_empty() => report(done),
        }
    }

    while let Some(done) = tasks.join_next().await {
        report(done);
    }
    Ok(())
}

fn report(done: Result<Result<Option<FixedLink>, FixerError>, JoinError>) {
    match done {
        Ok(Ok(Some(link))) => println!("{}", link.fixed),
        Ok(Ok(None)) => {},
        Ok(Err(e)) => warn!(error = %e, "Could not fix line"),
        Err(e) => warn!(error = %e, "Fix task failed"),
    }
}

/// Turns `key=value` arguments into command options. `@path` values are read from disk.
fn parse_options(raw: &[String]) -> Result<Options> {
    let mut options = Options::new();
    for arg in raw {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("Option '{arg}' is not in key=value form");
        };
        let value = match value.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read option file {path}"))?,
            None => value.to_owned(),
        };
        options.insert(key.trim().to_owned(), value);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_split_on_first_equals() {
        let options = parse_options(&["domain=x.com".to_owned(), "new=a=b".to_owned()]).unwrap();
        assert_eq!(options["domain"], "x.com");
        assert_eq!(options["new"], "a=b");
    }

    #[test]
    fn options_read_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.csv");
        std::fs::write(&path, "prepend,a.com,x\n").unwrap();

        let options = parse_options(&[format!("csv=@{}", path.display())]).unwrap();
        assert_eq!(options["csv"], "prepend,a.com,x\n");
    }

    #[test]
    fn malformed_options_fail() {
        assert!(parse_options(&["domain".to_owned()]).is_err());
        assert!(parse_options(&["csv=@/no/such/file".to_owned()]).is_err());
    }
}
