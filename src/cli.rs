//! Implementations of the non-server subcommands.

use std::io::Read;
use std::path::Path;

use console::style;
use itertools::Itertools;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::compose::Session;
use crate::github::{self, Credentials, IssueTracker};
use crate::prelude::*;
use crate::remote::Remote;
use crate::render::{self, FieldValue, FieldValues};
use crate::template::{Catalog, Template, TemplateSource};

#[derive(Tabled)]
struct TemplateRow<'a> {
    #[tabled(rename = "Name")]
    name: &'a str,
    #[tabled(rename = "Description")]
    description: &'a str,
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Fields")]
    fields: String,
    #[tabled(rename = "Public")]
    public: &'static str,
}

impl<'a> From<&'a Template> for TemplateRow<'a> {
    fn from(template: &'a Template) -> Self {
        Self {
            name: &template.name,
            description: &template.description,
            labels: template.labels.join(", "),
            fields: template
                .fields
                .iter()
                .map(|f| match f.required {
                    true => format!("{}*", f.name),
                    false => f.name.clone(),
                })
                .join(", "),
            public: if template.is_public { "yes" } else { "no" },
        }
    }
}

pub fn templates(category: Option<&str>) -> Result<()> {
    let catalog = Catalog::builtin()?;
    let templates = catalog.list(category);

    if templates.is_empty() {
        println!("No templates match {:?}.", category.unwrap_or_default());
        return Ok(());
    }

    let table = Table::new(templates.into_iter().map(TemplateRow::from))
        .with(Style::rounded())
        .to_string();

    println!("{table}");
    println!("{}", style("* required field").dim());
    Ok(())
}

pub fn preview(input: &Path, fields: &[(String, String)], raw: bool) -> Result<()> {
    let body = read_input(input)?;

    let values: FieldValues = fields
        .iter()
        .map(|(name, value)| (name.clone(), FieldValue::Text(value.clone())))
        .collect();

    match raw {
        true => println!("{}", render::substitute(&body, &values)),
        false => println!("{}", render::preview(&body, &values)),
    }

    Ok(())
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("Failed to read from stdin.")?;
        return Ok(buf);
    }

    std::fs::read_to_string(input).wrap_err_with(|| format!("Failed to read {input:?}."))
}

pub fn submit(ctx: &Context, args: &Submit) -> Result<()> {
    let Some((owner, repo)) = args.owner_and_repo() else {
        return Err(eyre!("Invalid repository {:?}.", args.repo))
            .suggestion("Repositories are given as `owner/name`, e.g. `rust-lang/rust`.");
    };

    let credentials = Credentials {
        token: args.token.clone(),
        username: owner.to_owned(),
        repo_name: repo.to_owned(),
    };

    let source: Box<dyn TemplateSource>;
    let tracker: Box<dyn IssueTracker>;

    match &args.proxy {
        Some(base) => {
            info!("Submitting through {base}");
            let remote = Remote::new(base)?;
            source = Box::new(remote.clone());
            tracker = Box::new(remote);
        }
        None => {
            source = Box::new(Catalog::builtin()?);
            tracker = Box::new(github::Client::new(&ctx.config.github)?);
        }
    }

    runtime()?.block_on(async {
        let mut session = Session::new();
        session.set_credentials(credentials);

        let template = session.select_template(source.as_ref(), &args.template).await?;
        let title = format!("{}{}", template.title, args.title.as_deref().unwrap_or_default());

        session.set_title(title);

        for (name, value) in &args.fields {
            session.set_input(name, value);
        }

        if let Some(path) = &args.body_file {
            session.set_body(read_input(path)?);
        }

        for label in &args.labels {
            session.add_label(label.as_str());
        }

        if args.dry_run {
            let issue = session.draft()?;

            println!("{} {}", style("Title:").bold(), issue.title);
            println!("{} {}", style("Labels:").bold(), issue.labels.join(", "));
            println!("{}", style("Body:").bold());
            println!("{}", issue.body);
            return Ok(());
        }

        let created = session.submit(tracker.as_ref()).await?;

        println!(
            "{} Issue #{} created: {}",
            style("[OK]").green().bright().bold(),
            created.number,
            created.html_url
        );

        Ok::<_, Report>(())
    })
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    #[test]
    fn row_marks_required_fields() {
        let catalog = Catalog::builtin().unwrap();
        let row = TemplateRow::from(catalog.get("code_review").unwrap());

        assert_eq!(row.fields, "reference*, overview*");
        assert_eq!(row.public, "yes");
    }

    #[test]
    fn reads_input_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("issuesmith-preview-{}.md", std::process::id()));

        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "Hello {{name}}").unwrap();

        assert_eq!(read_input(&path).unwrap(), "Hello {name}");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_input_file() {
        assert!(read_input(Path::new("definitely/not/here.md")).is_err());
    }
}
