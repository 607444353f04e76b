use crate::provider::CredentialsView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Domains,
    Domain(String),
    Credentials(CredentialsView),
}

/// Navigation stack. The domain list is the root and is never popped.
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<Screen>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self { stack: vec![Screen::Domains] }
    }

    pub fn push(&mut self, screen: Screen) {
        self.stack.push(screen);
    }

    pub fn pop(&mut self) -> Option<Screen> {
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    pub fn top(&self) -> &Screen {
        // root is never removed
        self.stack.last().unwrap_or(&Screen::Domains)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_presenting_credentials(&self) -> bool {
        matches!(self.top(), Screen::Credentials(_))
    }
}
