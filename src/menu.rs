//! Toolbar menu tree. Built once at startup and handed to the [`Workspace`].

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::panel::PanelKind;
use crate::workspace::Workspace;

pub type MenuAction = Rc<dyn Fn(&mut Workspace)>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuError {
    #[error("empty menu path")]
    EmptyPath,
    #[error("no menu entry {0:?}")]
    NotFound(String),
    #[error("{0:?} is a category, not an action")]
    IsCategory(String),
    #[error("{0:?} is an action and has no children")]
    NotACategory(String),
}

#[derive(Clone)]
pub enum MenuItem {
    Category {
        label: String,
        children: Vec<MenuItem>,
    },
    Action {
        label: String,
        action: MenuAction,
    },
}

impl MenuItem {
    pub fn category(label: impl Into<String>, children: Vec<MenuItem>) -> Self {
        MenuItem::Category {
            label: label.into(),
            children,
        }
    }

    pub fn action(label: impl Into<String>, action: impl Fn(&mut Workspace) + 'static) -> Self {
        MenuItem::Action {
            label: label.into(),
            action: Rc::new(action),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            MenuItem::Category { label, .. } | MenuItem::Action { label, .. } => label,
        }
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Category { label, children } => f
                .debug_struct("Category")
                .field("label", label)
                .field("children", children)
                .finish(),
            MenuItem::Action { label, .. } => {
                f.debug_struct("Action").field("label", label).finish_non_exhaustive()
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Walks `path` label by label and returns the action at its end.
    pub fn resolve(&self, path: &[&str]) -> Result<MenuAction, MenuError> {
        let Some((last, parents)) = path.split_last() else {
            return Err(MenuError::EmptyPath);
        };
        let mut level = self.items.as_slice();
        for (depth, label) in parents.iter().enumerate() {
            let walked = path[..=depth].join("/");
            match level.iter().find(|item| item.label() == *label) {
                Some(MenuItem::Category { children, .. }) => level = children.as_slice(),
                Some(MenuItem::Action { .. }) => return Err(MenuError::NotACategory(walked)),
                None => return Err(MenuError::NotFound(walked)),
            }
        }
        match level.iter().find(|item| item.label() == *last) {
            Some(MenuItem::Action { action, .. }) => Ok(Rc::clone(action)),
            Some(MenuItem::Category { .. }) => Err(MenuError::IsCategory(path.join("/"))),
            None => Err(MenuError::NotFound(path.join("/"))),
        }
    }

    /// Every action path, depth first, joined with `/`.
    pub fn action_paths(&self) -> Vec<String> {
        fn walk(items: &[MenuItem], prefix: &str, out: &mut Vec<String>) {
            for item in items {
                let path = if prefix.is_empty() {
                    item.label().to_string()
                } else {
                    format!("{prefix}/{}", item.label())
                };
                match item {
                    MenuItem::Category { children, .. } => walk(children, &path, out),
                    MenuItem::Action { .. } => out.push(path),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.items, "", &mut out);
        out
    }
}

/// File/Exit and the View tools of the debugger.
pub fn default_menu() -> Menu {
    Menu::new(vec![
        MenuItem::category(
            "File",
            vec![MenuItem::action("Exit", |workspace| workspace.request_exit())],
        ),
        MenuItem::category(
            "View",
            vec![
                MenuItem::category(
                    "Data",
                    vec![MenuItem::action("Strings", |workspace| {
                        workspace.open_panel(PanelKind::Strings);
                    })],
                ),
                MenuItem::category(
                    "Debug",
                    vec![MenuItem::action("Breakpoints", |workspace| {
                        workspace.open_panel(PanelKind::Breakpoints);
                    })],
                ),
                MenuItem::action("Graph View", |workspace| {
                    workspace.open_panel(PanelKind::Graph);
                }),
                MenuItem::action("Clock View", |workspace| {
                    workspace.open_panel(PanelKind::Clock);
                }),
            ],
        ),
    ])
}
