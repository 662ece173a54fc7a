// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

use super::{BuildContext, Component, ComponentCore, Node};
use crate::errors::GenoflowResult;

/// A named bag of settings. Operators export it as process environment.
pub struct PropertiesComponent {
    core: ComponentCore,
}

impl PropertiesComponent {
    pub const KIND: &'static str = "properties";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::KIND),
        }
    }
}

impl Default for PropertiesComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for PropertiesComponent {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn initialize(&mut self, _ctx: &BuildContext<'_>, _children: &[Node]) -> GenoflowResult<()> {
        Ok(())
    }
}
