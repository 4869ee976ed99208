//! zapit command line
//!
//! Applies stored page-edit rules to saved HTML documents and manages the
//! rule store from a terminal.

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::path::PathBuf;
use zapit::rules::hostname_of;
use zapit::selector::synthesize_verified;
use zapit::{
    EngineOptions, JsonFileStore, Page, RuleDraft, RuleEngine, RuleId, RuleRepository,
    SettingsRepository, StoredRuleRepository, StyleProperty, escape_selector,
};

#[derive(Parser)]
#[command(name = "zapit")]
#[command(version)]
#[command(about = "Persistent, reversible page edits keyed by hostname", long_about = None)]
struct Cli {
    /// JSON file holding rules and settings
    #[arg(long, short = 's', value_name = "PATH", default_value = "zapit-rules.json", global = true)]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply the stored rules of a site to an HTML file
    Apply {
        /// Page URL the document was loaded from
        #[arg(long)]
        url: String,

        /// HTML document to edit
        #[arg(long, short = 'i', value_name = "FILE")]
        input: PathBuf,

        /// Where to write the result (default: stdout)
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,

        /// Do not inject the hiding stylesheet
        #[arg(long)]
        no_style: bool,
    },

    /// Print a re-playable selector for an element of an HTML file
    Synthesize {
        #[arg(long, short = 'i', value_name = "FILE")]
        input: PathBuf,

        /// Any selector matching the element
        #[arg(long, short = 't')]
        target: String,
    },

    /// Print the query-safe form of a selector
    Escape { selector: String },

    /// Manage the rules of a site
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },

    /// Show or set the edit-mode flag
    EditMode {
        #[arg(value_parser = ["on", "off"])]
        state: Option<String>,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// One line per rule: id, action, selector and when it was saved
    List {
        #[arg(long)]
        url: String,

        /// Print the stored records as JSON instead
        #[arg(long)]
        json: bool,
    },

    Add {
        #[arg(long)]
        url: String,

        #[arg(long)]
        selector: String,

        /// Hide the element
        #[arg(long, conflicts_with_all = ["style", "text"])]
        remove: bool,

        /// Inline style as property=value, repeatable
        #[arg(long, value_name = "PROP=VALUE", conflicts_with = "text")]
        style: Vec<String>,

        /// Replacement text
        #[arg(long)]
        text: Option<String>,

        /// Text the element showed before the edit
        #[arg(long, requires = "text", default_value = "")]
        original: String,
    },

    Delete {
        #[arg(long)]
        url: String,

        id: String,
    },

    /// Delete every rule of the site
    Clear {
        #[arg(long)]
        url: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let repository = StoredRuleRepository::new(JsonFileStore::new(&cli.store));
    repository.initialize_defaults().await?;

    match cli.command {
        Command::Apply {
            url,
            input,
            output,
            no_style,
        } => {
            let hostname = hostname_of(&url)?;
            let html = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let rules = repository.try_list(&hostname).await?;

            let mut page = Page::parse(url, &html);
            let engine = RuleEngine::new(EngineOptions::new().inject_stylesheet(!no_style));
            let report = engine.apply_all(&mut page, &rules);

            eprintln!(
                "Applied {} rule(s) for {}, {} element(s) touched",
                report.rules_applied, hostname, report.elements_touched
            );
            for skipped in &report.skipped {
                eprintln!("Skipped {} ({}): {}", skipped.rule_id, skipped.selector, skipped.reason);
            }

            let html = page.to_html();
            match output {
                Some(path) => tokio::fs::write(&path, html)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", html),
            }
        }
        Command::Synthesize { input, target } => {
            let html = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let page = Page::parse("about:blank", &html);
            let Some(node) = page.document().query_selector(&escape_selector(&target))? else {
                bail!("No element matches '{}'", target);
            };
            println!("{}", synthesize_verified(page.document(), node)?);
        }
        Command::Escape { selector } => println!("{}", escape_selector(&selector)),
        Command::Rules { command } => run_rules(&repository, command).await?,
        Command::EditMode { state } => match state.as_deref() {
            Some(state) => {
                repository.set_edit_mode(state == "on").await?;
                eprintln!("Edit mode {}", state);
            }
            None => println!("{}", if repository.edit_mode().await { "on" } else { "off" }),
        },
    }

    Ok(())
}

async fn run_rules(
    repository: &StoredRuleRepository<JsonFileStore>,
    command: RulesCommand,
) -> anyhow::Result<()> {
    match command {
        RulesCommand::List { url, json } => {
            let hostname = hostname_of(&url)?;
            let rules = repository.try_list(&hostname).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else if rules.is_empty() {
                eprintln!("No rules for {}", hostname);
            } else {
                let now = Local::now();
                for rule in &rules {
                    println!("{}", rule.summary(&now));
                }
            }
        }
        RulesCommand::Add {
            url,
            selector,
            remove,
            style,
            text,
            original,
        } => {
            let hostname = hostname_of(&url)?;
            let draft = if let Some(text) = text {
                RuleDraft::edit_text(selector, original, text)
            } else if !style.is_empty() {
                RuleDraft::style(selector, parse_styles(&style)?)
            } else if remove {
                RuleDraft::remove(selector)
            } else {
                bail!("One of --remove, --style or --text is required");
            };
            let rule = draft.normalized()?.stamp(url);
            let id = rule.id.clone();
            repository.add(&hostname, rule).await?;
            eprintln!("Saved rule {} for {}", id, hostname);
        }
        RulesCommand::Delete { url, id } => {
            let hostname = hostname_of(&url)?;
            match repository.remove_by_id(&hostname, &RuleId::new(id.clone())).await? {
                Some(rule) => eprintln!("Deleted rule {} ({})", rule.id, rule.selector),
                None => bail!("No rule {} for {}", id, hostname),
            }
        }
        RulesCommand::Clear { url } => {
            let hostname = hostname_of(&url)?;
            repository.clear(&hostname).await?;
            eprintln!("Cleared all rules for {}", hostname);
        }
    }
    Ok(())
}

fn parse_styles(pairs: &[String]) -> anyhow::Result<IndexMap<StyleProperty, String>> {
    let mut styles = IndexMap::new();
    for pair in pairs {
        let Some((property, value)) = pair.split_once('=') else {
            bail!("Expected PROP=VALUE, got '{}'", pair);
        };
        let value = value.trim();
        if !value.is_empty() {
            styles.insert(StyleProperty::parse(property.trim()), value.to_string());
        }
    }
    if styles.is_empty() {
        bail!("No non-empty style values given");
    }
    Ok(styles)
}
