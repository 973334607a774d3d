use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::CONFIG_FILENAME;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the issue proxy and template API. Configured in `issuesmith.toml`.
    Serve {
        /// Override the configured port.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List the built-in issue templates.
    Templates {
        /// Only show templates whose name or description contains this text.
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Substitute field values into a Markdown file and print the rendered preview.
    Preview {
        /// The Markdown file to preview, or `-` to read from stdin.
        input: PathBuf,
        /// A field value, as `name=value`. May be repeated.
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Print the substituted Markdown instead of rendering it.
        #[arg(long)]
        raw: bool,
    },
    /// Fill out a template and file it as an issue.
    Submit(Submit),
}

#[derive(Debug, clap::Args)]
pub struct Submit {
    /// Name of the template to fill out.
    #[arg(short, long)]
    pub template: String,
    /// Text appended to the template's title prefix.
    #[arg(long)]
    pub title: Option<String>,
    /// A field value, as `name=value`. May be repeated.
    #[arg(short, long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
    /// Replace the template body with the contents of this file.
    #[arg(long)]
    pub body_file: Option<PathBuf>,
    /// Extra labels on top of the template's own. May be repeated.
    #[arg(short, long = "label")]
    pub labels: Vec<String>,
    /// Target repository, as `owner/name`.
    #[arg(short, long)]
    pub repo: String,
    /// GitHub personal access token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,
    /// Go through a running issuesmith server (e.g. `http://localhost:8000/api`) instead of GitHub directly.
    #[arg(long)]
    pub proxy: Option<String>,
    /// Print the issue instead of submitting it.
    #[arg(long)]
    pub dry_run: bool,
}

impl Submit {
    /// Splits `--repo` into its owner and name.
    pub fn owner_and_repo(&self) -> Option<(&str, &str)> {
        match self.repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Some((owner, name))
            }
            _ => None,
        }
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected `name=value`, got {raw:?}")),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn field_arguments() {
        let args = Arguments::parse_from([
            "issuesmith",
            "preview",
            "body.md",
            "--field",
            "name=Alice",
            "-f",
            "note=a=b",
        ]);

        let Command::Preview { fields, raw, .. } = args.command else {
            panic!("wrong subcommand")
        };

        assert!(!raw);
        assert_eq!(fields[0], ("name".to_string(), "Alice".to_string()));
        assert_eq!(fields[1], ("note".to_string(), "a=b".to_string()));
    }

    #[test]
    fn bad_field_rejected() {
        let result = Arguments::try_parse_from(["issuesmith", "preview", "-", "--field", "novalue"]);

        assert!(result.is_err());
    }

    #[test]
    fn repo_slug() {
        let args = Arguments::parse_from([
            "issuesmith", "submit", "-t", "bug_report", "-r", "octo/widgets", "--token", "x",
        ]);

        let Command::Submit(submit) = args.command else {
            panic!("wrong subcommand")
        };

        assert_eq!(submit.owner_and_repo(), Some(("octo", "widgets")));
        assert_eq!(args.config, PathBuf::from(CONFIG_FILENAME));
    }

    #[test]
    fn bad_repo_slug() {
        let args = Arguments::parse_from([
            "issuesmith", "submit", "-t", "bug_report", "-r", "widgets", "--token", "x",
        ]);

        let Command::Submit(submit) = args.command else {
            panic!("wrong subcommand")
        };

        assert_eq!(submit.owner_and_repo(), None);
    }
}
