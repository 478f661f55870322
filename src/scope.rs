//! A scope is the compile time picture of an environment frame of the machine. Each function
//! gets one frame with its parameters, and frames are chained to the frame of the function they
//! are lexically declared in.

use im::HashMap;

/// Location of a variable in the machine environment: `depth` frames outwards, at `index`
/// inside that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub depth: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    slots: HashMap<String, usize>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Creates a frame where the parameter `i` lives at slot `i`.
    pub fn new<I, S>(parameters: I, parent: Option<&'a Scope<'a>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = parameters
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.into(), index))
            .collect();

        Self { slots, parent }
    }

    pub fn root() -> Self {
        Self::default()
    }

    /// Walks the chain outwards and returns the address of the first frame that binds `name`.
    pub fn lookup(&self, name: &str) -> Option<Address> {
        let mut scope = self;
        let mut depth = 0;

        loop {
            if let Some(&index) = scope.slots.get(name) {
                return Some(Address { depth, index });
            }

            scope = scope.parent?;
            depth += 1;
        }
    }
}
