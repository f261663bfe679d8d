use shared::{domain::Panel, protocol::NavigationState};

/// One visibility flag per panel, in `Panel::ALL` order. Built only from a single
/// active panel, so exactly one flag is ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility([bool; Panel::COUNT]);

impl Visibility {
    pub fn for_panel(panel: Panel) -> Self {
        let mut flags = [false; Panel::COUNT];
        flags[panel.index()] = true;
        Self(flags)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn is_visible(&self, panel: Panel) -> bool {
        self.0[panel.index()]
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.0.to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    active: Panel,
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            active: Panel::Home,
        }
    }

    pub fn active(&self) -> Panel {
        self.active
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::for_panel(self.active)
    }

    pub fn activate(&mut self, panel: Panel) -> Visibility {
        self.active = panel;
        self.visibility()
    }

    pub fn go_home(&mut self) -> Visibility {
        self.activate(Panel::Home)
    }

    pub fn state(&self) -> NavigationState {
        NavigationState {
            active_panel: self.active,
            visibility: self.visibility().to_vec(),
        }
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}
