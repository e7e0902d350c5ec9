//! Single-page section switching.

use std::fmt;
use std::str::FromStr;

/// A top-level section of the shell document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Products,
    Cart,
}

impl Section {
    pub const ALL: [Self; 2] = [Self::Products, Self::Cart];

    /// Element id and `?section=` value.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Cart => "cart",
        }
    }

    /// Navigation link label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Products => "Products",
            Self::Cart => "Cart",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.id() == s)
            .ok_or_else(|| format!("unknown section: {s}"))
    }
}

/// Which section is visible. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Navigation {
    active: Section,
}

impl Navigation {
    #[must_use]
    pub const fn new(active: Section) -> Self {
        Self { active }
    }

    #[must_use]
    pub const fn active(&self) -> Section {
        self.active
    }

    #[must_use]
    pub fn is_active(&self, section: Section) -> bool {
        self.active == section
    }

    /// Show `section`. Returns `true` when the cart view needs a refresh.
    pub fn navigate(&mut self, section: Section) -> bool {
        self.active = section;
        section == Section::Cart
    }
}
