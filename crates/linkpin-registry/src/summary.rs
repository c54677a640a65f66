use crate::entry::LinkEntry;

const SUMMARY_HEADER: &str = "📌 *Saved links*";
/// Legacy Markdown cannot escape these inside a bold entity.
const MARKDOWN_CONTROL: [char; 5] = ['*', '_', '`', '[', ']'];

/// An entry together with its 1-based position in the flat insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionedEntry<'a> {
    pub position: usize,
    pub entry: &'a LinkEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterGroup<'a> {
    pub submitter: &'a str,
    pub entries: Vec<PositionedEntry<'a>>,
}

/// Display view of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing<'a> {
    Empty,
    Grouped(Vec<SubmitterGroup<'a>>),
}

/// Rendered summary. `Empty` must never be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Empty,
    Text(String),
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Text(text) => Some(text),
        }
    }
}

/// Groups entries by submitter, keeping first-seen submitter order and per-submitter
/// insertion order.
pub fn group_by_submitter(entries: &[LinkEntry]) -> Vec<SubmitterGroup<'_>> {
    let mut groups: Vec<SubmitterGroup<'_>> = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let positioned = PositionedEntry {
            position: idx + 1,
            entry,
        };
        match groups
            .iter()
            .position(|group| group.submitter == entry.submitter)
        {
            Some(existing) => groups[existing].entries.push(positioned),
            None => groups.push(SubmitterGroup {
                submitter: &entry.submitter,
                entries: vec![positioned],
            }),
        }
    }
    groups
}

/// Content with its `http://` or `https://` scheme stripped.
pub fn short_display(content: &str) -> &str {
    content
        .strip_prefix("https://")
        .or_else(|| content.strip_prefix("http://"))
        .unwrap_or(content)
}

fn header_name(submitter: &str) -> String {
    submitter.replace(MARKDOWN_CONTROL, "")
}

/// Renders the grouped summary as Telegram legacy Markdown.
pub fn format_summary(entries: &[LinkEntry]) -> Summary {
    if entries.is_empty() {
        return Summary::Empty;
    }

    let mut out = format!("{SUMMARY_HEADER}\n\n");
    for group in group_by_submitter(entries) {
        out.push_str(&format!("*👤 {}*\n", header_name(group.submitter)));
        for item in group.entries {
            out.push_str(&format!(
                "• {}. [{}]({}) · _{}_\n",
                item.position,
                short_display(&item.entry.content),
                item.entry.content,
                item.entry.recorded_at
            ));
        }
        out.push('\n');
    }
    Summary::Text(out.trim_end().to_string())
}
