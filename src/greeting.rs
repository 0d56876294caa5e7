//! Greeting and farewell texts.

use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;
use thiserror::Error;

const DEFAULT_TEMPLATES: &[&str] = &[
    "Welcome to {server}, {name}! We saved you a seat.",
    "{name} just showed up. {server} is officially cooler now.",
    "Look who it is! {name} has arrived in {server}.",
    "Hey {name}, {server} missed you.",
    "{name}! The legend returns to {server}.",
    "Everyone say hi to {name}, the best thing to happen to {server} today.",
    "{server} just got a little brighter. Hi {name}!",
];

#[derive(Error, Debug)]
pub enum GreetingError {
    #[error("Greeting pool has no templates")]
    EmptyPool,
    #[error("Failed to read greeting templates: {0}")]
    Io(#[from] std::io::Error),
}

/// Templates with `{name}` and `{server}` placeholders.
#[derive(Debug, Clone)]
pub struct GreetingPool {
    templates: Vec<String>,
}

impl GreetingPool {
    pub fn new(templates: Vec<String>) -> Result<Self, GreetingError> {
        if templates.is_empty() {
            return Err(GreetingError::EmptyPool);
        }
        Ok(Self { templates })
    }

    /// One template per line. Blank lines and lines starting with `#` are
    /// skipped.
    pub fn from_file(path: &Path) -> Result<Self, GreetingError> {
        let contents = std::fs::read_to_string(path)?;
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    pub fn compose(&self, name: &str, server: &str) -> String {
        self.compose_with(&mut rand::thread_rng(), name, server)
    }

    pub fn compose_with<R: Rng + ?Sized>(&self, rng: &mut R, name: &str, server: &str) -> String {
        // never empty, checked in `new`
        let template = self.templates.choose(rng).map(String::as_str).unwrap_or_default();
        fill(template, name, server)
    }
}

impl Default for GreetingPool {
    fn default() -> Self {
        Self {
            templates: DEFAULT_TEMPLATES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Substitutes placeholders in a single pass; substituted text is never
/// scanned again, so a name containing `{server}` stays as written.
fn fill(template: &str, name: &str, server: &str) -> String {
    let mut filled = String::with_capacity(template.len() + name.len() + server.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        filled.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{name}") {
            filled.push_str(name);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{server}") {
            filled.push_str(server);
            rest = after;
        } else {
            filled.push('{');
            rest = &tail[1..];
        }
    }

    filled.push_str(rest);
    filled
}

pub fn farewell(name: &str) -> String {
    format!("Okay bye {}... thanks for the warm goodbye...", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_pool_is_rejected() {
        assert!(matches!(GreetingPool::new(Vec::new()), Err(GreetingError::EmptyPool)));
    }

    #[test]
    fn test_default_templates_mention_member_and_server() {
        for template in GreetingPool::default().templates() {
            assert!(template.contains("{name}"), "{template}");
            assert!(template.contains("{server}"), "{template}");
        }
    }

    #[test]
    fn test_compose_substitutes_placeholders() {
        let pool = GreetingPool::new(vec!["{name} joined {server}, hi {name}".to_string()]).unwrap();
        assert_eq!(pool.compose("Alice", "Home"), "Alice joined Home, hi Alice");
    }

    #[test]
    fn test_compose_with_picks_from_pool() {
        let pool = GreetingPool::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let greeting = pool.compose_with(&mut rng, "Alice", "Home");
            assert!(greeting.contains("Alice"));
            assert!(greeting.contains("Home"));
            assert!(!greeting.contains('{'));
        }
    }

    #[test]
    fn test_compose_with_reaches_every_template() {
        let pool = GreetingPool::new(vec!["a {name}".to_string(), "b {name}".to_string()]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let picks: std::collections::HashSet<String> =
            (0..100).map(|_| pool.compose_with(&mut rng, "x", "y")).collect();

        assert_eq!(picks.len(), 2);
    }

    #[test]
    fn test_compose_keeps_placeholders_in_names() {
        let pool = GreetingPool::new(vec!["Hi {name}, welcome to {server}".to_string()]).unwrap();
        assert_eq!(pool.compose("{server}", "Home"), "Hi {server}, welcome to Home");
        assert_eq!(pool.compose("Alice", "{name}"), "Hi Alice, welcome to {name}");
    }

    #[test]
    fn test_fill_leaves_other_braces() {
        assert_eq!(fill("{ {name} }{nam{server}", "a", "b"), "{ a }{namb");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greetings.txt");
        std::fs::write(&path, "# greetings\n\nHello {name}!\n  Welcome to {server}  \n").unwrap();

        let pool = GreetingPool::from_file(&path).unwrap();

        assert_eq!(pool.templates(), ["Hello {name}!", "Welcome to {server}"]);
    }

    #[test]
    fn test_from_file_without_templates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greetings.txt");
        std::fs::write(&path, "# nothing yet\n\n").unwrap();

        assert!(matches!(GreetingPool::from_file(&path), Err(GreetingError::EmptyPool)));
        assert!(matches!(
            GreetingPool::from_file(&dir.path().join("missing.txt")),
            Err(GreetingError::Io(_))
        ));
    }

    #[test]
    fn test_farewell() {
        assert_eq!(farewell("Bob"), "Okay bye Bob... thanks for the warm goodbye...");
    }
}
