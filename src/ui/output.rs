use crate::node::Node;
use crate::storage::Match;
use crate::ui::{theme, Icons, Theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// A node in N-Triples syntax, colored by kind
pub fn term(node: &Node, theme: &Theme) -> String {
    node.to_term_string().style(theme.term(node)).to_string()
}

/// One search result as an N-Quads style line
pub fn statement_line(found: &Match, theme: &Theme) -> String {
    let statement = &found.statement;
    let subject = Node::from(statement.subject.clone());
    let mut line = format!(
        "{} {} {}",
        term(&subject, theme),
        term(&Node::uri(statement.predicate.as_str()), theme),
        term(&statement.object, theme)
    );
    if let Some(context) = &found.context {
        line.push(' ');
        line.push_str(&term(&Node::uri(context.as_str()), theme));
    }
    line.push_str(" .");
    line
}

pub fn statement(found: &Match) {
    println!("{}  {}", statement_line(found, theme()), muted(&format!("#{}", found.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Literal, Statement, Subject};

    #[test]
    fn test_statement_line_plain() {
        let found = Match {
            id: 7,
            statement: Statement::new(
                Subject::blank("b0"),
                "http://p",
                Node::literal(Literal::with_language("chat", "fr")),
            ),
            context: Some("http://g".to_string()),
        };
        let line = statement_line(&found, &Theme::plain());
        assert!(line.contains("_:b0"));
        assert!(line.contains("<http://p>"));
        assert!(line.contains("\"chat\"@fr"));
        assert!(line.ends_with("<http://g> ."), "{}", line);
    }
}
