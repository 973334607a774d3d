//! The preview pipeline: placeholder substitution followed by Markdown rendering.

mod markdown;
mod substitute;

pub use markdown::render;
pub use substitute::{placeholders, substitute, FieldValue, FieldValues};

/// Substitutes `values` into `body`, then renders the result as HTML.
///
/// Substitution always runs on the raw Markdown, never on rendered output.
pub fn preview(body: &str, values: &FieldValues) -> String {
    render(&substitute(body, values))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn substitute_then_render() {
        let mut values = FieldValues::new();
        values.insert("name".into(), "Alice".into());
        values.insert("priority".into(), "High".into());

        let html = preview("Hello {name}, priority {priority}", &values);

        assert_eq!(html, "<p>Hello Alice, priority High</p>");
    }

    #[test]
    fn values_are_rendered_as_markdown() {
        let mut values = FieldValues::new();
        values.insert("what".into(), "**broken**".into());

        assert_eq!(preview("It is {what}", &values), "<p>It is <strong>broken</strong></p>");
    }

    #[test]
    fn values_are_escaped() {
        let mut values = FieldValues::new();
        values.insert("evil".into(), "<img onerror=x>".into());

        assert_eq!(preview("{evil}", &values), "<p>&lt;img onerror=x></p>");
    }
}
