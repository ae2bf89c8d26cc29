/// Declare a closed set of integer constants as an enum, with checked
/// conversion from the raw value.
macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $kind:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )+
        }

        impl From<$name> for i32 {
            #[inline]
            fn from(value: $name) -> i32 {
                value as i32
            }
        }

        impl TryFrom<i32> for $name {
            type Error = crate::errors::Error;

            fn try_from(value: i32) -> crate::errors::Result<Self> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(crate::errors::Error::new(
                        crate::errors::ErrorKind::InvalidConstant { kind: $kind, value },
                    )),
                }
            }
        }
    };
}
