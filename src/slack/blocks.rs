use serde::Serialize;

/// Slack limit for section text
pub const MAX_SECTION_TEXT: usize = 3000;
/// Slack limit for a single section field
pub const MAX_FIELD_TEXT: usize = 2000;
/// Slack limit for header text
pub const MAX_HEADER_TEXT: usize = 150;
/// Slack limit for blocks in one message
pub const MAX_BLOCKS: usize = 50;

/// Block Kit layout block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: Text,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
    },
    Context {
        elements: Vec<Text>,
    },
    Divider,
}

/// Block Kit text object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Text {
    #[serde(rename = "plain_text")]
    Plain { text: String, emoji: bool },
    #[serde(rename = "mrkdwn")]
    Markdown { text: String },
}

impl Block {
    pub fn header(text: &str) -> Self {
        Block::Header {
            text: Text::plain(truncate(text, MAX_HEADER_TEXT)),
        }
    }

    pub fn section(text: &str) -> Self {
        Block::Section {
            text: Some(Text::markdown(truncate(text, MAX_SECTION_TEXT))),
            fields: Vec::new(),
        }
    }

    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Block::Section {
            text: None,
            fields: fields
                .into_iter()
                .map(|f| Text::markdown(truncate(f.as_ref(), MAX_FIELD_TEXT)))
                .collect(),
        }
    }

    pub fn context(text: &str) -> Self {
        Block::Context {
            elements: vec![Text::markdown(truncate(text, MAX_FIELD_TEXT))],
        }
    }

    /// Whether this block carries content rather than layout
    pub fn has_content(&self) -> bool {
        match self {
            Block::Section { text, fields } => text.is_some() || !fields.is_empty(),
            Block::Header { .. } | Block::Context { .. } | Block::Divider => false,
        }
    }
}

impl Text {
    pub fn plain<S: Into<String>>(text: S) -> Self {
        Text::Plain {
            text: text.into(),
            emoji: true,
        }
    }

    pub fn markdown<S: Into<String>>(text: S) -> Self {
        Text::Markdown { text: text.into() }
    }
}

/// Escape the characters Slack treats as control sequences in mrkdwn
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
