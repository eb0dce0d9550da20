use bitflags::bitflags;

bitflags! {
    /// Attributes on type declarations
    pub struct TypeFlags: u16 {
        const PUBLIC = 0x0001;
        const NESTED = 0x0002;
        const INTERFACE = 0x0020;
        const ABSTRACT = 0x0080;
        const SEALED = 0x0100;
        const VALUE_TYPE = 0x0200;
    }
}

bitflags! {
    /// Attributes on methods
    pub struct MethodFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const FAMILY = 0x0004;
        const STATIC = 0x0010;
        const VIRTUAL = 0x0040;
        const ABSTRACT = 0x0400;
        const SPECIAL_NAME = 0x0800;
    }
}
