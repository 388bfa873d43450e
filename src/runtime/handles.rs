//! Opaque handles into the running process.
//!
//! The host's reflection facility owns every live type, field and method. The crate only ever
//! holds these handles; what a handle's value means is up to the host.

use std::fmt;

macro_rules! live_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{:X})", stringify!($name), self.0)
            }
        }
    };
}

live_handle!(
    /// A loaded module
    ModuleHandle
);
live_handle!(
    /// A loaded type, including constructed generic types and generic parameters
    TypeHandle
);
live_handle!(
    /// A field of a loaded type
    FieldHandle
);
live_handle!(
    /// A loaded method, including instantiated generic methods
    MethodHandle
);
live_handle!(
    /// A replacement method built by a [`crate::runtime::MethodEmitter`]
    ExecutableHandle
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(MethodHandle(0x2A).to_string(), "MethodHandle(0x2A)");
        assert_eq!(TypeHandle(1), TypeHandle(1));
    }
}
