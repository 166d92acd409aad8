use crate::error::Result;
use crate::layout::Layout;
use crate::system::{self, Runner};

/// State shared by every command.
pub struct Ctx<'a> {
    pub layout: Layout,
    pub runner: &'a dyn Runner,
    pub user: String,
    pub repo_url: Option<String>,
    /// Off only in tests, which run unprivileged against a temp root.
    pub check_root: bool,
}

impl<'a> Ctx<'a> {
    pub fn require_root(&self) -> Result<()> {
        if self.check_root {
            system::require_root()
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
impl<'a> Ctx<'a> {
    pub fn for_test(root: &std::path::Path, runner: &'a dyn Runner) -> Self {
        Ctx {
            layout: Layout::rooted(root),
            runner,
            user: crate::layout::DEFAULT_USER.to_string(),
            repo_url: None,
            check_root: false,
        }
    }
}
