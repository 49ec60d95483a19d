use core::fmt;

// -----------------------------------------------------------------------------
// ValueKind

/// The kind tag of an erased [`Value`].
///
/// Every exposed type maps to exactly one kind; conversions and call-time
/// argument checks reason about kinds, never about concrete Rust types.
///
/// The declaration order defines a total order over kinds, used as the
/// fallback when two values of different kinds are compared.
///
/// [`Value`]: crate::value::Value
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    /// The absence of a value.
    None,
    /// `bool`.
    Boolean,
    /// Any integer type up to 64 bits.
    Integer,
    /// An integer carrying the full 64-bit range.
    LongInteger,
    /// Any floating-point type.
    Real,
    /// Owned or borrowed strings.
    String,
    /// A value of a registered enum.
    Enum,
    /// A sequence property; kind-only, an array never travels as a [`Value`].
    ///
    /// [`Value`]: crate::value::Value
    Array,
    /// A raw pointer to an unregistered type.
    Reference,
    /// An instance of a registered metaclass.
    User,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::LongInteger => "long integer",
            Self::Real => "real",
            Self::String => "string",
            Self::Enum => "enum",
            Self::Array => "array",
            Self::Reference => "reference",
            Self::User => "user",
        };
        f.write_str(name)
    }
}

// -----------------------------------------------------------------------------
// RefKind

/// How an exposed type refers to its data.
///
/// Drives the choice of accessor when a member is registered: plain instances
/// bind by value, smart pointers bind as internal references.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// A plain instance, copied in and out.
    Instance,
    /// A raw pointer.
    Pointer,
    /// An owning indirection such as `Box`.
    SmartPointer,
    /// A fixed-size inline array.
    BuiltinArray,
}

#[cfg(test)]
mod tests {
    use super::ValueKind;

    #[test]
    fn kind_order_follows_declaration() {
        assert!(ValueKind::None < ValueKind::Boolean);
        assert!(ValueKind::Integer < ValueKind::Real);
        assert!(ValueKind::String < ValueKind::User);
    }
}
