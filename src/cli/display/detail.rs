//! Detail view builder for key-value display of a single record.

use console::style;

use super::colors::label;

/// A builder for detail views (key-value display).
pub struct DetailView {
    title: String,
    sections: Vec<DetailSection>,
}

#[derive(Default)]
struct DetailSection {
    header: Option<String>,
    fields: Vec<(String, String)>,
    items: Vec<String>,
    /// Shown instead of the section when it stays empty; `None` hides it
    empty_note: Option<String>,
}

impl DetailView {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            sections: vec![DetailSection::default()],
        }
    }

    /// Add a key-value field to the current section.
    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.fields.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Add a field only if the value is Some.
    pub fn field_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    /// Start a new named section; it is left out if nothing is added.
    pub fn section(mut self, header: &str) -> Self {
        self.sections.push(DetailSection {
            header: Some(header.to_string()),
            ..DetailSection::default()
        });
        self
    }

    /// Start a section that renders `note` when nothing is added to it.
    pub fn section_or(mut self, header: &str, note: &str) -> Self {
        self.sections.push(DetailSection {
            header: Some(header.to_string()),
            empty_note: Some(note.to_string()),
            ..DetailSection::default()
        });
        self
    }

    /// Add a bullet-point item to the current section.
    pub fn item(mut self, text: impl ToString) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.items.push(text.to_string());
        }
        self
    }

    pub fn render(&self) -> String {
        let mut lines = vec![style(&self.title).bold().to_string()];
        let key_width = self
            .sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .map(|(k, _)| k.len())
            .max()
            .unwrap_or(12);

        for section in &self.sections {
            let empty = section.fields.is_empty() && section.items.is_empty();
            if empty && section.empty_note.is_none() {
                continue;
            }
            if let Some(header) = &section.header {
                lines.push(String::new());
                lines.push(style(header).bold().underlined().to_string());
            }
            if let (true, Some(note)) = (empty, &section.empty_note) {
                lines.push(format!("  {}", style(note).dim().italic()));
            }
            for (key, value) in &section.fields {
                let padded = format!("{key:<key_width$}");
                lines.push(format!("  {}  {}", label(&padded), value));
            }
            for item in &section.items {
                lines.push(format!("  - {item}"));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_skips_empty_sections() {
        console::set_colors_enabled(false);
        let view = DetailView::new("Task")
            .field("Title", "Poster")
            .field_opt("Assigned", None)
            .section("Comments")
            .section_or("History", "no entries yet")
            .section("Files")
            .item("proof.pdf");

        let rendered = view.render();
        assert!(rendered.contains("Title"));
        assert!(!rendered.contains("Assigned"));
        assert!(!rendered.contains("Comments"));
        assert!(rendered.contains("History\n  no entries yet"));
        assert!(rendered.contains("- proof.pdf"));
    }
}
