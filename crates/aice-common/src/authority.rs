use aice_types::Address;
use serde::{Deserialize, Serialize};

/// The single controlling authority of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    holder: Address,
}

impl Authority {
    pub fn new(holder: Address) -> Self {
        Self { holder }
    }

    pub fn holder(&self) -> Address {
        self.holder
    }

    pub fn is_held_by(&self, caller: &Address) -> bool {
        !caller.is_null() && self.holder == *caller
    }

    /// Hand control to `new_holder`, returning the previous holder
    pub fn replace(&mut self, new_holder: Address) -> Address {
        std::mem::replace(&mut self.holder, new_holder)
    }
}
