use crate::node::Node;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for CLI chrome and for the three kinds of term
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    pub muted: Style,
    pub uri: Style,
    pub blank: Style,
    pub literal: Style,
}

impl Theme {
    /// Colored unless stdout is not a terminal or `NO_COLOR`/`CLICOLOR=0` is set
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() && console::colors_enabled() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            uri: Style::new().blue(),
            blank: Style::new().yellow(),
            literal: Style::new().green(),
        }
    }

    pub fn plain() -> Self {
        let none = Style::new();
        Self {
            header: none.clone(),
            success: none.clone(),
            warn: none.clone(),
            info: none.clone(),
            dim: none.clone(),
            muted: none.clone(),
            uri: none.clone(),
            blank: none.clone(),
            literal: none,
        }
    }

    /// Style for a term of `node`'s kind
    pub fn term(&self, node: &Node) -> Style {
        match node {
            Node::Uri(_) => self.uri.clone(),
            Node::Blank(_) => self.blank.clone(),
            Node::Literal(_) => self.literal.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
